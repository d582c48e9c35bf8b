//! Control-flow headers and block boundary matching.
//!
//! Scripts are flat line sequences; blocks are found on demand by scanning
//! forward from a header while counting nesting depth.  Every well-formed
//! opener (`if … then`, `while … do`, `for … do`) raises the depth and every
//! `end` lowers it; the `end` that brings it back to zero closes the block.
//!
//! A line that looks like a header but does not parse (`if x` without
//! `then`, `for i = 1 do` without a stop value) is not a header at all and
//! is executed as a plain statement.

use std::sync::OnceLock;

use regex::Regex;

use super::stmt::split_args;

/// A recognised control line.  Fields borrow from the line text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header<'a> {
    If { cond: &'a str },
    ElseIf { cond: &'a str },
    Else,
    End,
    While { cond: &'a str },
    For(ForHeader<'a>),
}

impl Header<'_> {
    /// Whether this header opens a block that needs an `end`.
    pub fn opens_block(&self) -> bool {
        matches!(self, Header::If { .. } | Header::While { .. } | Header::For(_))
    }
}

/// `for <var> = <start>, <stop>[, <step>] do`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForHeader<'a> {
    pub var: &'a str,
    pub start: &'a str,
    pub stop: &'a str,
    pub step: Option<&'a str>,
}

struct HeaderPatterns {
    if_: Regex,
    elseif: Regex,
    while_: Regex,
    for_: Regex,
}

fn patterns() -> &'static HeaderPatterns {
    static PATTERNS: OnceLock<HeaderPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |src: &str| Regex::new(src).expect("header pattern is valid");
        HeaderPatterns {
            if_: re(r"^if\s+(.+?)\s+then$"),
            elseif: re(r"^elseif\s+(.+?)\s+then$"),
            while_: re(r"^while\s+(.+?)\s+do$"),
            for_: re(r"^for\s+([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(.+?)\s+do$"),
        }
    })
}

/// Recognise a control line.  Returns `None` for plain statements and for
/// malformed headers.
pub fn parse_header(line: &str) -> Option<Header<'_>> {
    let line = line.trim();
    match line {
        "else" => return Some(Header::Else),
        "end" => return Some(Header::End),
        _ => {}
    }
    let first_word = line.split_whitespace().next()?;
    let p = patterns();
    let cond = |re: &Regex| re.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str());
    match first_word {
        "if" => cond(&p.if_).map(|cond| Header::If { cond }),
        "elseif" => cond(&p.elseif).map(|cond| Header::ElseIf { cond }),
        "while" => cond(&p.while_).map(|cond| Header::While { cond }),
        "for" => {
            let caps = p.for_.captures(line)?;
            let var = caps.get(1)?.as_str();
            let range = split_args(caps.get(2)?.as_str())?;
            let (start, stop, step) = match range[..] {
                [start, stop] => (start, stop, None),
                [start, stop, step] => (start, stop, Some(step)),
                _ => return None,
            };
            Some(Header::For(ForHeader { var, start, stop, step }))
        }
        _ => None,
    }
}

/// Index of the `end` matching the opener at `open`, searching no further
/// than `limit` (exclusive).
///
/// Every opener counts towards the depth, whatever its keyword: blocks of
/// different kinds nest inside each other (`while` inside `if`), and all of
/// them close with the same `end`.
pub fn find_end<S: AsRef<str>>(lines: &[S], open: usize, limit: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, line) in lines.iter().enumerate().take(limit).skip(open + 1) {
        match parse_header(line.as_ref()) {
            Some(h) if h.opens_block() => depth += 1,
            Some(Header::End) => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// One arm of an `if` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch<'a> {
    /// `None` for the `else` arm.
    pub cond: Option<&'a str>,
    /// Body lines, half-open `[start, end)`.
    pub body: (usize, usize),
}

/// Split the `if` block `[open, close]` into its arms.
///
/// `elseif` / `else` lines count only at the block's own depth.  Once an
/// `else` is seen, later arms at that depth are ignored and stay inside the
/// `else` body.
pub fn if_branches<'a, S: AsRef<str>>(lines: &'a [S], open: usize, close: usize) -> Vec<Branch<'a>> {
    let mut branches = Vec::new();
    let mut cond = match parse_header(lines[open].as_ref()) {
        Some(Header::If { cond }) => Some(cond),
        _ => return branches,
    };
    let mut body_start = open + 1;
    let mut depth = 0usize;
    let mut seen_else = false;

    for (i, line) in lines.iter().enumerate().take(close).skip(open + 1) {
        let header = parse_header(line.as_ref());
        match header {
            Some(ref h) if h.opens_block() => depth += 1,
            Some(Header::End) => depth = depth.saturating_sub(1),
            Some(Header::ElseIf { cond: next }) if depth == 0 && !seen_else => {
                branches.push(Branch { cond, body: (body_start, i) });
                cond = Some(next);
                body_start = i + 1;
            }
            Some(Header::Else) if depth == 0 && !seen_else => {
                branches.push(Branch { cond, body: (body_start, i) });
                cond = None;
                body_start = i + 1;
                seen_else = true;
            }
            _ => {}
        }
    }
    branches.push(Branch { cond, body: (body_start, close) });
    branches
}

// ── Tests ─────────────────────────────────────────────────────────────────────
