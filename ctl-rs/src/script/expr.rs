//! Arithmetic and condition evaluation over raw text spans.
//!
//! There is no tokenizer or AST: the evaluator works directly on the text of
//! one expression.  For a span it tries, in order:
//!
//! 1. a numeric literal covering the whole span,
//! 2. a defined variable whose name is the whole span,
//! 3. a split at the leftmost binary `+`/`-`, or failing that the leftmost
//!    `*`/`/`, recursing on both halves.
//!
//! Anything else evaluates to `0`.  Parentheses are not supported.  Because
//! the split is leftmost, chains within one tier group to the right:
//! `10 - 4 - 3` is `10 - (4 - 3)`.
//!
//! Conditions split at the *first* relational operator (two-character
//! operators take priority over `<`/`>`) and compare both sides with an
//! epsilon suited to `f32`.

use crate::var::VarStore;

/// Tolerance for `==` / `!=`.
pub const EPSILON: f32 = 1e-4;

// ── Expressions ───────────────────────────────────────────────────────────────

/// Evaluate an arithmetic expression.
///
/// Never fails: division by zero, undefined names and unparsable spans all
/// produce `0.0`.
pub fn eval_expr(src: &str, vars: &VarStore) -> f32 {
    eval_at(src, vars, 0)
}

/// Recursion limit for one expression.  Deeper operator chains evaluate the
/// remainder as `0`.
pub const MAX_EVAL_DEPTH: usize = 256;

fn eval_at(src: &str, vars: &VarStore, depth: usize) -> f32 {
    let text = src.trim();
    if text.is_empty() || depth > MAX_EVAL_DEPTH {
        return 0.0;
    }
    if let Some(n) = parse_number(text) {
        return n;
    }
    if is_identifier(text) {
        if let Some(v) = vars.lookup(text) {
            return v;
        }
    }

    let split = leftmost_operator(text, b"+-").or_else(|| leftmost_operator(text, b"*/"));
    let Some(idx) = split else {
        return 0.0;
    };

    let lhs = eval_at(&text[..idx], vars, depth + 1);
    let rhs = eval_at(&text[idx + 1..], vars, depth + 1);
    match text.as_bytes()[idx] {
        b'+' => lhs + rhs,
        b'-' => lhs - rhs,
        b'*' => lhs * rhs,
        _ if rhs == 0.0 => 0.0,
        _ => lhs / rhs,
    }
}

/// Parse `text` as a number only if the literal covers the whole span.
///
/// Restricted to digits, `.`, exponent markers and signs so that names such
/// as `inf` or `nan` stay identifiers.
pub fn parse_number(text: &str) -> Option<f32> {
    let first = text.bytes().next()?;
    if !matches!(first, b'0'..=b'9' | b'.' | b'+' | b'-') {
        return None;
    }
    if !text
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }
    text.parse::<f32>().ok().filter(|n| n.is_finite())
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(text: &str) -> bool {
    let mut bytes = text.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Index of the first binary operator from `ops`.
///
/// A sign at the very start of the span is only chosen when nothing else
/// splits it; its empty left side then evaluates to zero, which yields
/// negation of the whole rest (`-x * 2`).
fn leftmost_operator(text: &str, ops: &[u8]) -> Option<usize> {
    let bytes = text.as_bytes();
    (1..bytes.len())
        .find(|&i| ops.contains(&bytes[i]) && is_binary_at(bytes, i))
        .or_else(|| ops.contains(&bytes[0]).then_some(0))
}

/// Whether the operator at `i > 0` is a binary operator.
///
/// A sign directly after another operator (`x * -2`) is unary, and a sign
/// inside a numeric exponent (`1e-3`) belongs to the literal.
fn is_binary_at(bytes: &[u8], i: usize) -> bool {
    if !matches!(bytes[i], b'+' | b'-') {
        return true;
    }
    if is_exponent_sign(bytes, i) {
        return false;
    }
    let prev = bytes[..i].iter().rev().find(|b| !b.is_ascii_whitespace());
    match prev {
        None => true,
        Some(b) => !matches!(b, b'+' | b'-' | b'*' | b'/'),
    }
}

fn is_exponent_sign(bytes: &[u8], i: usize) -> bool {
    if i < 2 || !matches!(bytes[i - 1], b'e' | b'E') {
        return false;
    }
    // Walk back over the mantissa; it must be a plain number, not the tail
    // of an identifier like `rate`.
    let start = bytes[..i - 1]
        .iter()
        .rposition(|b| !(b.is_ascii_digit() || *b == b'.'))
        .map_or(0, |p| p + 1);
    let mantissa = &bytes[start..i - 1];
    let before_ok = start == 0 || !(bytes[start - 1].is_ascii_alphanumeric() || bytes[start - 1] == b'_');
    !mantissa.is_empty() && mantissa.iter().any(u8::is_ascii_digit) && before_ok
}

// ── Conditions ────────────────────────────────────────────────────────────────

/// Relational operator recognised by [`eval_condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl RelOp {
    fn symbol(self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
            RelOp::Le => "<=",
            RelOp::Ge => ">=",
            RelOp::Lt => "<",
            RelOp::Gt => ">",
        }
    }

    fn apply(self, a: f32, b: f32) -> bool {
        match self {
            RelOp::Eq => (a - b).abs() < EPSILON,
            RelOp::Ne => (a - b).abs() >= EPSILON,
            RelOp::Le => a <= b,
            RelOp::Ge => a >= b,
            RelOp::Lt => a < b,
            RelOp::Gt => a > b,
        }
    }
}

const TWO_CHAR_OPS: [RelOp; 4] = [RelOp::Eq, RelOp::Ne, RelOp::Le, RelOp::Ge];
const ONE_CHAR_OPS: [RelOp; 2] = [RelOp::Lt, RelOp::Gt];

/// Find the first relational operator in `text`: two-character operators
/// are searched before single-character ones.
pub fn find_relop(text: &str) -> Option<(usize, RelOp)> {
    let earliest = |ops: &[RelOp]| {
        ops.iter()
            .filter_map(|&op| text.find(op.symbol()).map(|pos| (pos, op)))
            .min_by_key(|&(pos, _)| pos)
    };
    earliest(&TWO_CHAR_OPS).or_else(|| earliest(&ONE_CHAR_OPS))
}

/// Evaluate a condition.  Without a relational operator the condition holds
/// iff the expression is non-zero.
pub fn eval_condition(src: &str, vars: &VarStore) -> bool {
    let text = src.trim();
    match find_relop(text) {
        Some((pos, op)) => {
            let lhs = eval_expr(&text[..pos], vars);
            let rhs = eval_expr(&text[pos + op.symbol().len()..], vars);
            op.apply(lhs, rhs)
        }
        None => eval_expr(text, vars) != 0.0,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> f32 {
        eval_expr(src, &VarStore::default())
    }

    fn vars(pairs: &[(&str, f32)]) -> VarStore {
        let mut store = VarStore::default();
        for &(n, v) in pairs {
            store.set(n, v).unwrap();
        }
        store
    }

    #[test]
    fn literals() {
        assert_eq!(eval("42"), 42.0);
        assert_eq!(eval("  3.5 "), 3.5);
        assert_eq!(eval("-7"), -7.0);
        assert_eq!(eval("1e3"), 1000.0);
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("5 + 3 * 2"), 11.0);
        assert_eq!(eval("2 * 3 + 4"), 10.0);
        assert_eq!(eval("10 - 2 * 3"), 4.0);
    }

    #[test]
    fn same_tier_chains_group_to_the_right() {
        assert_eq!(eval("10 - 4 - 3"), 9.0);
        assert_eq!(eval("8 / 2 / 2"), 8.0);
        assert_eq!(eval("2 - 1 + 1"), 0.0);
        assert_eq!(eval("1 + 2 - 3 * 4"), -9.0);
    }

    #[test]
    fn long_chains_stop_at_depth_limit() {
        let src = format!("{}1", "1+".repeat(50_000));
        let got = eval(&src);
        assert!(got.is_finite());
        assert!(got <= (MAX_EVAL_DEPTH + 1) as f32, "{got}");
    }

    #[test]
    fn divide_by_zero_degrades_to_zero() {
        assert_eq!(eval("10 / 0"), 0.0);
        assert_eq!(eval("10 / x"), 0.0);
    }

    #[test]
    fn empty_and_unknown_are_zero() {
        assert_eq!(eval(""), 0.0);
        assert_eq!(eval("   "), 0.0);
        assert_eq!(eval("unknown_var"), 0.0);
        assert_eq!(eval("@#!"), 0.0);
    }

    #[test]
    fn names_like_inf_are_not_numbers() {
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        let v = vars(&[("inf", 2.0)]);
        assert_eq!(eval_expr("inf", &v), 2.0);
    }

    #[test]
    fn variables() {
        let v = vars(&[("x", 10.0), ("y", 4.0)]);
        assert_eq!(eval_expr("x + 5", &v), 15.0);
        assert_eq!(eval_expr("x * y - 1", &v), 39.0);
        assert_eq!(eval_expr("x / y", &v), 2.5);
    }

    #[test]
    fn unary_signs() {
        let v = vars(&[("x", 3.0)]);
        assert_eq!(eval_expr("-x", &v), -3.0);
        assert_eq!(eval_expr("x * -2", &v), -6.0);
        assert_eq!(eval_expr("3 - -2", &v), 5.0);
        assert_eq!(eval_expr("-x + 1", &v), -2.0);
        assert_eq!(eval_expr("-3 + 5", &v), 2.0);
        assert_eq!(eval_expr("-x * 2", &v), -6.0);
    }

    #[test]
    fn exponent_sign_stays_in_literal() {
        assert!((eval("2 * 1e-3") - 0.002).abs() < 1e-7);
        let v = vars(&[("rate", 4.0)]);
        // `rate-1` is a subtraction, not an exponent.
        assert_eq!(eval_expr("rate-1", &v), 3.0);
    }

    #[test]
    fn parentheses_are_not_grouping() {
        assert_eq!(eval("(1 + 2)"), 0.0);
        assert_eq!(eval("2 * (3)"), 0.0);
    }

    #[test]
    fn conditions() {
        let v = VarStore::default();
        assert!(eval_condition("3 < 5", &v));
        assert!(!eval_condition("5 < 3", &v));
        assert!(eval_condition("5 == 5.00005", &v));
        assert!(!eval_condition("5 != 5", &v));
        assert!(eval_condition("5 != 6", &v));
        assert!(eval_condition("4 <= 4", &v));
        assert!(eval_condition("4 >= 3", &v));
        assert!(eval_condition("2 + 2 > 3", &v));
    }

    #[test]
    fn bare_condition_is_nonzero_test() {
        let v = vars(&[("on", 1.0), ("off", 0.0)]);
        assert!(eval_condition("on", &v));
        assert!(!eval_condition("off", &v));
        assert!(!eval_condition("missing", &v));
        assert!(eval_condition("1", &v));
    }

    #[test]
    fn two_char_operators_win_over_one_char() {
        assert_eq!(find_relop("a <= b"), Some((2, RelOp::Le)));
        assert_eq!(find_relop("a < b == c"), Some((6, RelOp::Eq)));
        assert_eq!(find_relop("a < b > c"), Some((2, RelOp::Lt)));
        assert_eq!(find_relop("a + b"), None);
    }
}
