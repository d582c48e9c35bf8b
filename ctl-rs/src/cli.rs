//! Command-line argument parsing.
//!
//! Usage:
//!   ctl [-f[<file>]] [-c<cmd>] [-qd] [<script>]

use std::path::PathBuf;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Config-file specification.
    pub config: ConfigFile,
    /// Dispatcher line to execute after startup (`-c<cmd>`).
    pub command: Option<String>,
    /// No banner and no prompt (`-q`).
    pub quiet: bool,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Script file to store and run on startup.
    pub script: Option<PathBuf>,
}

/// How to choose the user config file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// Search `~/.ctlrc`, `~/ctlrc`, `./.ctlrc`, `./ctlrc` in order (default).
    #[default]
    Search,
    /// `-f` with no file argument: skip user config.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            positional.extend(argv[i + 1..].iter().cloned());
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                'q' => args.quiet = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else {
                        // A bare -f never takes the next word: that is the script.
                        args.config = ConfigFile::Skip;
                    }
                }

                // -c<cmd>
                'c' => {
                    let cmd = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err("-c requires a command argument".to_owned());
                    };
                    args.command = Some(cmd);
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    match positional.len() {
        0 => {}
        1 => args.script = positional.pop().map(PathBuf::from),
        n => return Err(format!("too many arguments ({n})")),
    }

    Ok(args)
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the user config file in the standard locations.
/// Returns the first path that exists, or `None`.
pub fn find_user_config() -> Option<PathBuf> {
    let home = std::env::var("HOME").unwrap_or_default();
    [
        format!("{home}/.ctlrc"),
        format!("{home}/ctlrc"),
        "./.ctlrc".to_owned(),
        "./ctlrc".to_owned(),
    ]
    .into_iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}

/// Resolve the config path to load, if any.
pub fn config_path(spec: &ConfigFile) -> Option<PathBuf> {
    match spec {
        ConfigFile::Search => find_user_config(),
        ConfigFile::Skip => None,
        ConfigFile::Explicit(p) => Some(p.clone()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn empty_args() {
        let a = parse_argv(&argv(&[])).unwrap();
        assert!(!a.quiet && !a.debug);
        assert!(a.script.is_none());
        assert!(matches!(a.config, ConfigFile::Search));
    }

    #[test]
    fn script_positional() {
        let a = parse_argv(&argv(&["blink.ctl"])).unwrap();
        assert_eq!(a.script, Some(PathBuf::from("blink.ctl")));
    }

    #[test]
    fn combined_bool_flags() {
        let a = parse_argv(&argv(&["-qd"])).unwrap();
        assert!(a.quiet && a.debug);
    }

    #[test]
    fn config_skip_does_not_eat_script() {
        let a = parse_argv(&argv(&["-f", "blink.ctl"])).unwrap();
        assert!(matches!(a.config, ConfigFile::Skip));
        assert_eq!(a.script, Some(PathBuf::from("blink.ctl")));
        assert!(config_path(&a.config).is_none());
    }

    #[test]
    fn config_explicit_embedded() {
        let a = parse_argv(&argv(&["-fboard.rc"])).unwrap();
        assert!(matches!(&a.config, ConfigFile::Explicit(p) if p == &PathBuf::from("board.rc")));
        assert_eq!(config_path(&a.config), Some(PathBuf::from("board.rc")));
    }

    #[test]
    fn command_embedded_and_separate() {
        let a = parse_argv(&argv(&["-cx = 1"])).unwrap();
        assert_eq!(a.command.as_deref(), Some("x = 1"));
        let a = parse_argv(&argv(&["-c", "run"])).unwrap();
        assert_eq!(a.command.as_deref(), Some("run"));
        assert!(parse_argv(&argv(&["-c"])).is_err());
    }

    #[test]
    fn double_dash_ends_flags() {
        let a = parse_argv(&argv(&["--", "-odd-name"])).unwrap();
        assert_eq!(a.script, Some(PathBuf::from("-odd-name")));
    }

    #[test]
    fn too_many_positional() {
        assert!(parse_argv(&argv(&["a", "b"])).is_err());
    }

    #[test]
    fn unknown_flag() {
        assert!(parse_argv(&argv(&["-z"])).is_err());
    }
}
