//! Statement classification.
//!
//! A plain (non-control) line is one of four forms, tried in this order; the
//! first that matches wins and there is no backtracking:
//!
//! 1. assignment `name = expr`
//! 2. effector call `name(arg, ...)` with the right number of arguments
//! 3. `print(text)`
//! 4. anything else, evaluated as a bare expression

use std::sync::OnceLock;

use regex::Regex;

use super::expr::is_identifier;
use crate::effector::Call;

/// A classified plain line.  All fields borrow from the source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt<'a> {
    Assign { target: &'a str, expr: &'a str },
    /// A numeric effector call; `args` are unevaluated expressions.
    Call { name: &'a str, args: Vec<&'a str> },
    /// `print(...)` with one layer of quotes removed.
    Print(&'a str),
    Expr(&'a str),
}

/// `name(args)` with optional space before the parenthesis.
fn call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)$").expect("call pattern is valid")
    })
}

/// Classify one trimmed, comment-free line.
pub fn classify(line: &str) -> Stmt<'_> {
    if let Some((target, expr)) = split_assignment(line) {
        return Stmt::Assign { target, expr };
    }
    if let Some((name, args)) = parse_call(line) {
        if name == "print" {
            return Stmt::Print(strip_quotes(args.trim()));
        }
        if let Some(args) = split_args(args) {
            // Arity is checked with placeholder values; the real arguments
            // are evaluated by the executor.
            if Call::bind(name, &vec![0; args.len()]).is_some() {
                return Stmt::Call { name, args };
            }
        }
    }
    Stmt::Expr(line)
}

/// Split `name = expr` at the first `=` that is not part of `==`, `!=`,
/// `<=` or `>=`.
pub fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let bytes = line.as_bytes();
    let idx = (0..bytes.len()).find(|&i| {
        bytes[i] == b'='
            && bytes.get(i + 1) != Some(&b'=')
            && !(i > 0 && matches!(bytes[i - 1], b'=' | b'!' | b'<' | b'>'))
    })?;
    let target = line[..idx].trim();
    if !is_identifier(target) {
        return None;
    }
    Some((target, line[idx + 1..].trim()))
}

/// Split `name(inner)` into its name and the raw text between the
/// parentheses.
pub fn parse_call(text: &str) -> Option<(&str, &str)> {
    let caps = call_re().captures(text.trim())?;
    let name = caps.get(1)?.as_str();
    let inner = caps.get(2)?.as_str();
    Some((name, inner))
}

/// Comma-separated argument spans.  `None` if any argument is empty.
pub fn split_args(inner: &str) -> Option<Vec<&str>> {
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    let args: Vec<&str> = inner.split(',').map(str::trim).collect();
    if args.iter().any(|a| a.is_empty()) {
        return None;
    }
    Some(args)
}

/// Remove one layer of matching `"` or `'` quotes.
fn strip_quotes(text: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = text.strip_prefix(q).and_then(|t| t.strip_suffix(q)) {
            return inner;
        }
    }
    text
}

// ── Tests ─────────────────────────────────────────────────────────────────────
