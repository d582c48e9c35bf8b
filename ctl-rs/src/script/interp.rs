//! Script interpreter.
//!
//! The [`Interpreter`] owns the variable store and the compressed script
//! buffer, and executes line sequences against an [`Effector`] host.  Block
//! execution is a recursive walk over an immutable line slice: a header
//! locates its matching `end`, evaluates, and recurses into the chosen body;
//! plain lines go to the statement executor.
//!
//! Nothing here returns an error to the caller.  Problems are reported as
//! text through [`Effector::print`] and execution carries on.

use tracing::{debug, warn};

use super::{
    block::{find_end, if_branches, parse_header, ForHeader, Header},
    buffer::{BufferError, ScriptBuffer, DEFAULT_BUFFER_SIZE},
    codec::MAX_PAYLOAD,
    expr::{eval_condition, eval_expr},
    source::{clean_line, clean_script},
    stmt::{classify, parse_call, split_args, Stmt},
};
use crate::effector::{Call, Effector};
use crate::var::{VarStore, DEFAULT_MAX_NAME_LEN, DEFAULT_MAX_VARS};

/// Default per-loop iteration cap.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

/// Default block nesting limit.
pub const DEFAULT_MAX_DEPTH: usize = 16;

// ── Limits ────────────────────────────────────────────────────────────────────

/// Resource limits for one interpreter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Variable slots.
    pub max_vars: usize,
    /// Variable names are truncated to this many characters.
    pub max_name_len: usize,
    /// Iterations a single `while` or `for` may run before it is stopped.
    pub max_iterations: u32,
    /// Deepest block nesting that will be entered.
    pub max_depth: usize,
    /// Compressed script buffer size in bytes.
    pub buffer_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_vars: DEFAULT_MAX_VARS,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_depth: DEFAULT_MAX_DEPTH,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Format a number the way every report does.
pub fn format_number(value: f32) -> String {
    // Avoid printing "-0.00".
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value:.2}")
}

// ── Interpreter ───────────────────────────────────────────────────────────────

/// One independent script context.
#[derive(Debug)]
pub struct Interpreter {
    vars: VarStore,
    buffer: ScriptBuffer,
    limits: Limits,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Interpreter {
            vars: VarStore::new(limits.max_vars, limits.max_name_len),
            buffer: ScriptBuffer::new(limits.buffer_size),
            limits,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn vars(&self) -> &VarStore {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut VarStore {
        &mut self.vars
    }

    pub fn buffer(&self) -> &ScriptBuffer {
        &self.buffer
    }

    /// Current value of `name` (`0.0` if undefined).
    pub fn get_var(&self, name: &str) -> f32 {
        self.vars.get(name)
    }

    /// Drop all variables.
    pub fn reset(&mut self) {
        debug!(count = self.vars.len(), "variable store reset");
        self.vars.reset();
    }

    // ── Stored scripts ────────────────────────────────────────────────────────

    /// Clean `raw` and append it to the script buffer.
    ///
    /// Returns `Ok(false)` for blank or comment-only lines, which are not
    /// stored.
    pub fn store_line(&mut self, raw: &str) -> Result<bool, BufferError> {
        let Some(line) = clean_line(raw) else {
            return Ok(false);
        };
        self.buffer.push_line(line)?;
        Ok(true)
    }

    /// Empty the script buffer.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Decompress the stored script and run it.
    pub fn run_buffer(&mut self, host: &mut dyn Effector) {
        let lines = self.buffer.lines();
        debug!(lines = lines.len(), bytes = self.buffer.used(), "running stored script");
        self.run_lines(&lines, host);
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    /// Execute a script given as source text.
    pub fn exec_script(&mut self, src: &str, host: &mut dyn Effector) {
        let lines = clean_script(src);
        self.run_lines(&lines, host);
    }

    /// Execute one line directly.
    ///
    /// A lone control header has no matching `end` here, so it degrades to a
    /// plain statement like any other unmatched header.  Lines longer than the
    /// stored-line payload limit are refused.
    pub fn exec_line(&mut self, raw: &str, host: &mut dyn Effector) {
        let Some(line) = clean_line(raw) else {
            return;
        };
        if line.len() > MAX_PAYLOAD {
            warn!(len = line.len(), "direct line too long");
            host.print(&format!("ERR: line too long ({} > {MAX_PAYLOAD} chars)", line.len()));
            return;
        }
        self.run_lines(&[line], host);
    }

    /// Execute an ordered sequence of cleaned lines.
    pub fn run_lines<S: AsRef<str>>(&mut self, lines: &[S], host: &mut dyn Effector) {
        self.exec_range(lines, 0, lines.len(), 0, host);
    }

    /// Walk lines `[start, end)` at nesting `depth`.
    fn exec_range<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        start: usize,
        end: usize,
        depth: usize,
        host: &mut dyn Effector,
    ) {
        let mut i = start;
        while i < end {
            let line = lines[i].as_ref();
            let header = parse_header(line);
            let opens = header.as_ref().is_some_and(Header::opens_block);
            if !opens {
                if header.is_some() {
                    self.degrade(line, "stray block keyword", host);
                } else {
                    self.exec_statement(line, host);
                }
                i += 1;
                continue;
            }

            let Some(close) = find_end(lines, i, end) else {
                self.degrade(line, "no matching end", host);
                i += 1;
                continue;
            };
            match header {
                Some(Header::If { .. }) => self.exec_if(lines, i, close, depth, host),
                Some(Header::While { cond }) => self.exec_while(lines, cond, i, close, depth, host),
                Some(Header::For(ref f)) => self.exec_for(lines, f, i, close, depth, host),
                _ => {}
            }
            i = close + 1;
        }
    }

    /// Execute a header line as a plain statement.
    fn degrade(&mut self, line: &str, reason: &str, host: &mut dyn Effector) {
        debug!(line, reason, "control line treated as statement");
        self.exec_statement(line, host);
    }

    /// Run a block body one level deeper, unless that exceeds the depth
    /// limit.  Returns `false` if the body was refused.
    fn exec_body<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        body: (usize, usize),
        depth: usize,
        host: &mut dyn Effector,
    ) -> bool {
        if depth + 1 > self.limits.max_depth {
            warn!(depth, max = self.limits.max_depth, "block nesting too deep");
            host.print(&format!(
                "ERR: blocks nested deeper than {}",
                self.limits.max_depth
            ));
            return false;
        }
        self.exec_range(lines, body.0, body.1, depth + 1, host);
        true
    }

    fn exec_if<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        open: usize,
        close: usize,
        depth: usize,
        host: &mut dyn Effector,
    ) {
        let taken = if_branches(lines, open, close)
            .into_iter()
            .find(|b| b.cond.map_or(true, |c| eval_condition(c, &self.vars)));
        if let Some(branch) = taken {
            self.exec_body(lines, branch.body, depth, host);
        }
    }

    fn exec_while<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        cond: &str,
        open: usize,
        close: usize,
        depth: usize,
        host: &mut dyn Effector,
    ) {
        let cap = self.limits.max_iterations;
        let mut count = 0u32;
        while eval_condition(cond, &self.vars) {
            if count >= cap {
                warn!(cond, cap, "while loop stopped at iteration cap");
                break;
            }
            count += 1;
            if !self.exec_body(lines, (open + 1, close), depth, host) {
                break;
            }
        }
    }

    fn exec_for<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        header: &ForHeader<'_>,
        open: usize,
        close: usize,
        depth: usize,
        host: &mut dyn Effector,
    ) {
        let start = eval_expr(header.start, &self.vars);
        let stop = eval_expr(header.stop, &self.vars);
        let step = header.step.map_or(1.0, |s| eval_expr(s, &self.vars));
        let cap = self.limits.max_iterations;

        let mut value = start;
        let mut count = 0u32;
        loop {
            let more = if step >= 0.0 { value <= stop } else { value >= stop };
            if !more {
                break;
            }
            if count >= cap {
                warn!(var = header.var, cap, "for loop stopped at iteration cap");
                break;
            }
            count += 1;
            if let Err(e) = self.vars.set(header.var, value) {
                warn!(%e, "for loop variable rejected");
                host.print(&format!("ERR: {e}"));
                break;
            }
            if !self.exec_body(lines, (open + 1, close), depth, host) {
                break;
            }
            value += step;
        }
    }

    // ── Statements ────────────────────────────────────────────────────────────

    /// Execute one plain line: assignment, effector call, print, or bare
    /// expression.
    pub fn exec_statement(&mut self, line: &str, host: &mut dyn Effector) {
        match classify(line) {
            Stmt::Assign { target, expr } => {
                let value = self.eval_value(expr, host);
                match self.vars.set(target, value) {
                    Ok(()) => host.print(&format!("{target} = {}", format_number(value))),
                    Err(e) => {
                        warn!(%e, "assignment dropped");
                        host.print(&format!("ERR: {e}"));
                    }
                }
            }
            Stmt::Call { name, args } => {
                if let Some(result) = self.invoke(name, &args, host) {
                    host.print(&format_number(result));
                }
            }
            Stmt::Print(text) => host.print(text),
            Stmt::Expr(text) => {
                let value = eval_expr(text, &self.vars);
                host.print(&format_number(value));
            }
        }
    }

    /// Evaluate an assignment's right-hand side.  A value-returning effector
    /// call (`analogRead(0)`) is performed; anything else is arithmetic, so
    /// `x = delay(5)` does not wait.
    fn eval_value(&mut self, expr: &str, host: &mut dyn Effector) -> f32 {
        let call = parse_call(expr)
            .filter(|(name, _)| Call::is_effector_name(name))
            .and_then(|(name, inner)| self.bind(name, &split_args(inner)?))
            .filter(|call| call.returns_value());
        match call.and_then(|call| call.invoke(host)) {
            Some(v) => v,
            None => eval_expr(expr, &self.vars),
        }
    }

    /// Evaluate `args` and bind them to effector `name`.
    fn bind(&self, name: &str, args: &[&str]) -> Option<Call> {
        let values: Vec<i32> = args
            .iter()
            .map(|a| eval_expr(a, &self.vars) as i32)
            .collect();
        Call::bind(name, &values)
    }

    fn invoke(&mut self, name: &str, args: &[&str], host: &mut dyn Effector) -> Option<f32> {
        self.bind(name, args)?.invoke(host)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
