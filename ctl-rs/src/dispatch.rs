//! Line-oriented command dispatcher.
//!
//! Every input line is either a verb from [`VERBS`] or a script line to run
//! immediately.  Between `begin` and `done` the dispatcher is in capture
//! mode and lines are stored in the interpreter's compressed buffer instead
//! of being executed.
//!
//! All output, including errors, goes through [`Effector::print`].

use tracing::{debug, info};

use crate::effector::Effector;
use crate::script::interp::format_number;
use crate::script::Interpreter;

/// What the host loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// A dispatcher verb and its one-line description.
#[derive(Debug, Clone, Copy)]
pub struct Verb {
    pub name: &'static str,
    pub help: &'static str,
}

pub const VERBS: &[Verb] = &[
    Verb { name: "help", help: "list commands" },
    Verb { name: "begin", help: "start storing lines into the script buffer" },
    Verb { name: "done", help: "stop storing lines" },
    Verb { name: "run", help: "run the stored script" },
    Verb { name: "list", help: "show the stored script" },
    Verb { name: "clear", help: "erase the stored script" },
    Verb { name: "vars", help: "show all variables" },
    Verb { name: "reset", help: "erase all variables" },
    Verb { name: "mem", help: "show buffer and variable usage" },
    Verb { name: "quit", help: "exit" },
];

// ── Dispatcher ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Dispatcher {
    interp: Interpreter,
    capturing: bool,
}

impl Dispatcher {
    pub fn new(interp: Interpreter) -> Self {
        Dispatcher { interp, capturing: false }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interp
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Prompt text for an interactive host.
    pub fn prompt(&self) -> &'static str {
        if self.capturing {
            "... "
        } else {
            "> "
        }
    }

    /// Handle one raw input line.
    pub fn handle_line(&mut self, raw: &str, host: &mut dyn Effector) -> Flow {
        let line = raw.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));

        if self.capturing {
            if verb == "done" && rest.trim().is_empty() {
                self.capturing = false;
                info!(lines = self.interp.buffer().line_count(), "capture finished");
                host.print(&format!("OK: {} lines stored", self.interp.buffer().line_count()));
            } else if let Err(e) = self.interp.store_line(raw) {
                debug!(%e, line, "line not stored");
                host.print(&format!("ERR: {e}"));
            }
            return Flow::Continue;
        }

        if line.is_empty() {
            return Flow::Continue;
        }

        // `run = 1` assigns to a variable that happens to share a verb's name.
        let assigns = rest.trim_start().starts_with('=');
        if assigns || !VERBS.iter().any(|v| v.name == verb) {
            self.interp.exec_line(raw, host);
            return Flow::Continue;
        }
        if !rest.trim().is_empty() {
            host.print(&format!("ERR: {verb} takes no arguments"));
            return Flow::Continue;
        }

        match verb {
            "help" => {
                for v in VERBS {
                    host.print(&format!("{:<6} {}", v.name, v.help));
                }
                host.print("anything else runs as a script line");
            }
            "begin" => {
                self.capturing = true;
                info!("capture started");
                host.print("OK: storing lines, finish with done");
            }
            "done" => host.print("ERR: not storing lines"),
            "run" => self.interp.run_buffer(host),
            "list" => {
                for (n, line) in self.interp.buffer().lines().iter().enumerate() {
                    host.print(&format!("{:>3}  {line}", n + 1));
                }
            }
            "clear" => {
                self.interp.clear_buffer();
                host.print("OK: script cleared");
            }
            "vars" => {
                let lines: Vec<String> = self
                    .interp
                    .vars()
                    .iter()
                    .map(|(name, value)| format!("{name} = {}", format_number(value)))
                    .collect();
                for line in lines {
                    host.print(&line);
                }
            }
            "reset" => {
                self.interp.reset();
                host.print("OK: variables cleared");
            }
            "mem" => {
                let buf = self.interp.buffer();
                let vars = self.interp.vars();
                host.print(&format!(
                    "script {}/{} bytes, {} lines; vars {}/{}",
                    buf.used(),
                    buf.capacity(),
                    buf.line_count(),
                    vars.len(),
                    vars.capacity(),
                ));
            }
            "quit" => return Flow::Quit,
            _ => {}
        }
        Flow::Continue
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
