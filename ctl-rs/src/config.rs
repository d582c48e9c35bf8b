//! `.ctlrc` configuration file parser.
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | set an engine or board limit |
//! | `/var <name>=<value>` or `/var <name> <value>` | predefine a script variable |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |
//!
//! Recognised `/set` names: `max_vars`, `max_name_len`, `max_iterations`,
//! `max_depth`, `buffer_size`, `digital_pins`, `analog_pins`.

use std::path::Path;

use thiserror::Error;

use crate::board::BoardSpec;
use crate::script::expr::{is_identifier, parse_number};
use crate::script::Limits;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Engine limits, board geometry and startup variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub limits: Limits,
    pub board: BoardSpec,
    /// Variables assigned before any script runs, in file order.
    pub vars: Vec<(String, f32)>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Returns the config and a list of any errors on recognised lines; a bad
    /// line leaves the corresponding setting at its previous value.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));
            let args_str = args_str.trim();

            let result = match cmd {
                "set" => split_assignment(cmd, args_str)
                    .and_then(|(name, value)| config.apply_setting(name, value)),
                "var" => split_assignment(cmd, args_str)
                    .and_then(|(name, value)| config.add_var(name, value)),
                _ => Ok(()), // silently skip unknown commands
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    fn apply_setting(&mut self, name: &str, value: &str) -> Result<(), String> {
        let n: usize = value
            .parse()
            .map_err(|_| format!("/set {name}: expected a whole number, got '{value}'"))?;
        if n == 0 {
            return Err(format!("/set {name}: must be at least 1"));
        }
        match name {
            "max_vars" => self.limits.max_vars = n,
            "max_name_len" => self.limits.max_name_len = n,
            "max_iterations" => {
                self.limits.max_iterations = u32::try_from(n)
                    .map_err(|_| format!("/set {name}: {n} is too large"))?;
            }
            "max_depth" => self.limits.max_depth = n,
            "buffer_size" => self.limits.buffer_size = n,
            "digital_pins" => self.board.digital_pins = n,
            "analog_pins" => self.board.analog_pins = n,
            _ => return Err(format!("/set: unknown setting '{name}'")),
        }
        Ok(())
    }

    fn add_var(&mut self, name: &str, value: &str) -> Result<(), String> {
        if !is_identifier(name) {
            return Err(format!("/var: '{name}' is not a valid variable name"));
        }
        let v = parse_number(value)
            .ok_or_else(|| format!("/var {name}: '{value}' is not a number"))?;
        match self.vars.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = v,
            None => self.vars.push((name.to_owned(), v)),
        }
        Ok(())
    }
}

// ── /set and /var arguments ───────────────────────────────────────────────────

/// Parse `<name>=<value>` or `<name> <value>`.
fn split_assignment<'a>(cmd: &str, args: &'a str) -> Result<(&'a str, &'a str), String> {
    if args.is_empty() {
        return Err(format!("/{cmd}: requires an argument"));
    }

    let (name, value) = if let Some((name, value)) = args.split_once('=') {
        (name.trim(), value.trim())
    } else if let Some((name, value)) = args.split_once(|c: char| c.is_ascii_whitespace()) {
        (name, value.trim())
    } else {
        return Err(format!("/{cmd}: missing value for '{args}'"));
    };

    if name.is_empty() {
        return Err(format!("/{cmd}: name cannot be empty"));
    }
    Ok((name, value))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
