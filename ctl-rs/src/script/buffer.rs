//! Compressed script storage.
//!
//! Lines are kept back-to-back in one fixed-capacity byte buffer as
//! `(length, payload)` records.  There is no terminator; the number of used
//! bytes is tracked alongside the buffer.  A store that would not fit is
//! refused and leaves earlier content untouched.

use thiserror::Error;

use super::codec::{CodecError, LineCodec};

/// Default capacity in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BufferError {
    #[error("script buffer full: need {needed} bytes, {available} free")]
    Full { needed: usize, available: usize },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Fixed-capacity store of compressed lines.
#[derive(Debug)]
pub struct ScriptBuffer {
    bytes: Vec<u8>,
    capacity: usize,
    lines: usize,
    codec: LineCodec,
}

impl Default for ScriptBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl ScriptBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
            lines: 0,
            codec: LineCodec::new(),
        }
    }

    /// Compress `line` and append it as one record.
    pub fn push_line(&mut self, line: &str) -> Result<(), BufferError> {
        let payload = self.codec.compress(line)?;
        let needed = payload.len() + 1;
        let available = self.available();
        if needed > available {
            return Err(BufferError::Full { needed, available });
        }
        // `compress` caps payloads at MAX_PAYLOAD, so the length fits a byte.
        self.bytes.push(payload.len() as u8);
        self.bytes.extend_from_slice(&payload);
        self.lines += 1;
        Ok(())
    }

    /// Raw payload of every record, in order.
    pub fn records(&self) -> Records<'_> {
        Records { bytes: &self.bytes[..], pos: 0 }
    }

    /// Decompress every stored line.
    pub fn lines(&self) -> Vec<String> {
        self.records().map(|r| self.codec.decompress(r)).collect()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.lines = 0;
    }

    /// Bytes in use, length prefixes included.
    pub fn used(&self) -> usize {
        self.bytes.len()
    }

    pub fn available(&self) -> usize {
        self.capacity - self.bytes.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }
}

/// Iterator over record payloads.
pub struct Records<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let len = *self.bytes.get(self.pos)? as usize;
        let start = self.pos + 1;
        let end = (start + len).min(self.bytes.len());
        self.pos = start + len;
        Some(&self.bytes[start..end])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::codec::Keyword;

    #[test]
    fn stores_and_restores_lines() {
        let mut buf = ScriptBuffer::new(64);
        buf.push_line("for i = 1, 3 do").unwrap();
        buf.push_line("s = s + i").unwrap();
        buf.push_line("end").unwrap();
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.lines(), vec!["for i = 1, 3 do", "s = s + i", "end"]);
    }

    #[test]
    fn record_layout_is_length_prefixed() {
        let mut buf = ScriptBuffer::new(16);
        buf.push_line("end").unwrap();
        buf.push_line("x").unwrap();
        let records: Vec<&[u8]> = buf.records().collect();
        assert_eq!(records, vec![&[Keyword::End.token()][..], &b"x"[..]]);
        assert_eq!(buf.used(), 4);
    }

    #[test]
    fn overflow_leaves_prior_content() {
        let mut buf = ScriptBuffer::new(8);
        buf.push_line("x = 1").unwrap();
        let before = buf.used();
        let err = buf.push_line("y = 2").unwrap_err();
        assert_eq!(err, BufferError::Full { needed: 6, available: 2 });
        assert_eq!(buf.used(), before);
        assert_eq!(buf.lines(), vec!["x = 1"]);
    }

    #[test]
    fn exact_fit_is_accepted() {
        let mut buf = ScriptBuffer::new(6);
        buf.push_line("x = 1").unwrap();
        assert_eq!(buf.available(), 0);
    }

    #[test]
    fn codec_errors_propagate() {
        let mut buf = ScriptBuffer::new(32);
        let err = buf.push_line("x = \u{3bb}").unwrap_err();
        assert!(matches!(err, BufferError::Codec(CodecError::UnsupportedChar(_))));
        assert!(buf.is_empty());
    }

    #[test]
    fn clear_empties() {
        let mut buf = ScriptBuffer::new(32);
        buf.push_line("x = 1").unwrap();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.used(), 0);
        assert!(buf.lines().is_empty());
    }
}
