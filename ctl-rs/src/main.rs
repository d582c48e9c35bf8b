use std::io::Write;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use ctlscript::board::{Board, BoardSpec};
use ctlscript::cli;
use ctlscript::config::Config;
use ctlscript::dispatch::{Dispatcher, Flow};
use ctlscript::script::Interpreter;

#[tokio::main]
async fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("ctl: {e}");
            eprintln!("Usage: ctl [-f[<file>]] [-c<cmd>] [-qd] [<script>]");
            std::process::exit(1);
        }
    };

    // ── Logging (stderr, so script output on stdout stays clean) ─────────────
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // ── Load user config ──────────────────────────────────────────────────────
    let config = match cli::config_path(&args.config) {
        None => Config::default(),
        Some(path) => match Config::load_file(&path) {
            Ok((config, errors)) => {
                for e in &errors {
                    warn!(file = %path.display(), "{e}");
                }
                info!(file = %path.display(), "config loaded");
                config
            }
            Err(e) => {
                eprintln!("ctl: warning: {}: {e}", path.display());
                Config::default()
            }
        },
    };

    let mut interp = Interpreter::with_limits(config.limits);
    for (name, value) in &config.vars {
        if let Err(e) = interp.vars_mut().set(name, *value) {
            warn!(%e, "config variable dropped");
        }
    }

    let is_tty = unsafe {
        libc::isatty(libc::STDIN_FILENO) != 0 && libc::isatty(libc::STDOUT_FILENO) != 0
    };
    let mut board = Board::stdout(config.board, is_tty);
    let mut dispatcher = Dispatcher::new(interp);

    // ── Startup script ────────────────────────────────────────────────────────
    if let Some(path) = &args.script {
        if let Err(e) = load_script(&mut dispatcher, path).await {
            eprintln!("ctl: {}: {e}", path.display());
            std::process::exit(1);
        }
        tokio::task::block_in_place(|| dispatcher.interpreter_mut().run_buffer(&mut board));
    }

    // ── Execute startup command (-c<cmd>) ─────────────────────────────────────
    if let Some(cmd) = &args.command {
        let flow = tokio::task::block_in_place(|| handle(&mut dispatcher, &mut board, cmd));
        if flow == Flow::Quit {
            return;
        }
    }

    if !args.quiet {
        let ver = env!("CARGO_PKG_VERSION");
        let BoardSpec { digital_pins, analog_pins } = config.board;
        println!("ctl version {ver}: simulated board, {digital_pins} digital / {analog_pins} analog pins");
        println!("Type `help' for commands, `pins' for board state, `send <text>' for serial input, `quit' to quit.");
    }

    // ── Input loop ────────────────────────────────────────────────────────────
    let show_prompt = is_tty && !args.quiet;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if show_prompt {
            print!("{}", dispatcher.prompt());
            let _ = std::io::stdout().flush();
        }
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("ctl: stdin: {e}");
                break;
            }
        };
        let flow = tokio::task::block_in_place(|| handle(&mut dispatcher, &mut board, &line));
        if flow == Flow::Quit {
            break;
        }
    }
}

/// Route one line, handling the host-only board verbs here.
///
/// `pins` prints the pin table.  `send <text>` queues `text` plus a newline
/// on the board's serial input, where `available()` and `read()` see it.
fn handle<W: Write>(dispatcher: &mut Dispatcher, board: &mut Board<W>, line: &str) -> Flow {
    if dispatcher.is_capturing() {
        return dispatcher.handle_line(line, board);
    }
    let trimmed = line.trim();
    if trimmed == "pins" {
        board.print_pins();
        return Flow::Continue;
    }
    if let Some(text) = trimmed.strip_prefix("send ") {
        debug!(bytes = text.len() + 1, "serial input queued");
        board.push_input(text.as_bytes());
        board.push_input(b"\n");
        return Flow::Continue;
    }
    dispatcher.handle_line(line, board)
}

/// Store every line of a script file in the buffer.
async fn load_script(dispatcher: &mut Dispatcher, path: &Path) -> Result<(), String> {
    let src = tokio::fs::read_to_string(path).await.map_err(|e| e.to_string())?;
    let interp = dispatcher.interpreter_mut();
    interp.clear_buffer();
    for (i, raw) in src.lines().enumerate() {
        interp
            .store_line(raw)
            .map_err(|e| format!("line {}: {e}", i + 1))?;
    }
    info!(lines = interp.buffer().line_count(), "script loaded");
    Ok(())
}
