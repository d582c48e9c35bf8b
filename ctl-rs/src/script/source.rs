//! Source line cleaning.
//!
//! A script line is stored and executed only after comments are removed and
//! the remainder is trimmed.  `#` starts a comment unless it sits inside a
//! quoted string.

/// Strip the comment and surrounding whitespace; `None` for lines with
/// nothing left.
pub fn clean_line(raw: &str) -> Option<&str> {
    let mut quote: Option<char> = None;
    let mut end = raw.len();
    for (i, ch) in raw.char_indices() {
        match (quote, ch) {
            (None, '#') => {
                end = i;
                break;
            }
            (None, '"' | '\'') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
    }
    let line = raw[..end].trim();
    if line.is_empty() { None } else { Some(line) }
}

/// Split a multi-line script into cleaned lines.
pub fn clean_script(src: &str) -> Vec<String> {
    src.lines().filter_map(clean_line).map(str::to_owned).collect()
}
