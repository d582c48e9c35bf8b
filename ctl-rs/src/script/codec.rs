//! Line compression codec.
//!
//! Keywords from a fixed vocabulary are replaced by single reserved bytes so
//! that stored scripts fit a small buffer.  The mapping is an explicit
//! bijection between [`Keyword`] variants and token bytes `0x80..`; source
//! text is restricted to tab and printable ASCII, so a token byte can never
//! be mistaken for a literal character.
//!
//! ```rust
//! use ctlscript::script::codec::LineCodec;
//!
//! let codec = LineCodec::new();
//! let packed = codec.compress("while x < 3 do").unwrap();
//! assert_eq!(packed.len(), 9);
//! assert_eq!(codec.decompress(&packed), "while x < 3 do");
//! ```

use aho_corasick::AhoCorasick;
use thiserror::Error;

/// First reserved byte.
pub const TOKEN_BASE: u8 = 0x80;

/// Longest compressed payload a length-prefixed record can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

// ── Keyword ───────────────────────────────────────────────────────────────────

/// Every word the codec knows how to substitute.
///
/// The declaration order fixes the token byte of each keyword; appending is
/// safe, reordering invalidates stored scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Then,
    ElseIf,
    Else,
    End,
    While,
    Do,
    For,
    Print,
    DigitalWrite,
    DigitalRead,
    AnalogWrite,
    AnalogRead,
    PinMode,
    Delay,
    Millis,
    Random,
    Available,
    Read,
    SetColor,
}

impl Keyword {
    pub const ALL: [Keyword; 20] = [
        Keyword::If,
        Keyword::Then,
        Keyword::ElseIf,
        Keyword::Else,
        Keyword::End,
        Keyword::While,
        Keyword::Do,
        Keyword::For,
        Keyword::Print,
        Keyword::DigitalWrite,
        Keyword::DigitalRead,
        Keyword::AnalogWrite,
        Keyword::AnalogRead,
        Keyword::PinMode,
        Keyword::Delay,
        Keyword::Millis,
        Keyword::Random,
        Keyword::Available,
        Keyword::Read,
        Keyword::SetColor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Then => "then",
            Keyword::ElseIf => "elseif",
            Keyword::Else => "else",
            Keyword::End => "end",
            Keyword::While => "while",
            Keyword::Do => "do",
            Keyword::For => "for",
            Keyword::Print => "print",
            Keyword::DigitalWrite => "digitalWrite",
            Keyword::DigitalRead => "digitalRead",
            Keyword::AnalogWrite => "analogWrite",
            Keyword::AnalogRead => "analogRead",
            Keyword::PinMode => "pinMode",
            Keyword::Delay => "delay",
            Keyword::Millis => "millis",
            Keyword::Random => "random",
            Keyword::Available => "available",
            Keyword::Read => "read",
            Keyword::SetColor => "setColor",
        }
    }

    /// The reserved byte standing in for this keyword.
    pub fn token(self) -> u8 {
        TOKEN_BASE + self as u8
    }

    /// Inverse of [`Keyword::token`].
    pub fn from_token(byte: u8) -> Option<Keyword> {
        byte.checked_sub(TOKEN_BASE)
            .and_then(|i| Keyword::ALL.get(i as usize).copied())
    }

    pub fn from_name(name: &str) -> Option<Keyword> {
        Keyword::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

// The token range must fit in a byte and sit entirely above printable ASCII.
const _: () = assert!(TOKEN_BASE > 0x7E);
const _: () = assert!(TOKEN_BASE as usize + Keyword::ALL.len() <= 0x100);

/// Whether `ch` may appear in source text.
pub fn is_supported_char(ch: char) -> bool {
    ch == '\t' || (' '..='~').contains(&ch)
}

// ── CodecError ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("unsupported character {0:?} in script line")]
    UnsupportedChar(char),
    #[error("line compresses to {0} bytes (limit {MAX_PAYLOAD})")]
    LineTooLong(usize),
}

// ── LineCodec ─────────────────────────────────────────────────────────────────

/// Compressor / decompressor for single script lines.
pub struct LineCodec {
    matcher: AhoCorasick,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LineCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineCodec")
            .field("keywords", &Keyword::ALL.len())
            .finish()
    }
}

impl LineCodec {
    pub fn new() -> Self {
        // Pattern ids are indices into `Keyword::ALL`.
        let matcher = AhoCorasick::new(Keyword::ALL.iter().map(|k| k.as_str()));
        Self { matcher }
    }

    /// Compress one line.
    ///
    /// At each position the longest keyword whose following character is not
    /// part of an identifier is replaced by its token; otherwise the literal
    /// character is copied.
    pub fn compress(&self, line: &str) -> Result<Vec<u8>, CodecError> {
        if let Some(bad) = line.chars().find(|&c| !is_supported_char(c)) {
            return Err(CodecError::UnsupportedChar(bad));
        }
        let bytes = line.as_bytes();

        // Longest boundary-respecting keyword starting at each offset.
        let mut best: Vec<Option<(Keyword, usize)>> = vec![None; bytes.len()];
        for m in self.matcher.find_overlapping_iter(line) {
            let at_boundary = bytes.get(m.end()).map_or(true, |&b| !is_word_byte(b));
            if !at_boundary {
                continue;
            }
            let len = m.end() - m.start();
            let slot = &mut best[m.start()];
            if slot.map_or(true, |(_, l)| len > l) {
                *slot = Some((Keyword::ALL[m.pattern()], len));
            }
        }

        let mut out = Vec::with_capacity(bytes.len());
        let mut pos = 0;
        while pos < bytes.len() {
            match best[pos] {
                Some((kw, len)) => {
                    out.push(kw.token());
                    pos += len;
                }
                None => {
                    out.push(bytes[pos]);
                    pos += 1;
                }
            }
        }

        if out.len() > MAX_PAYLOAD {
            return Err(CodecError::LineTooLong(out.len()));
        }
        Ok(out)
    }

    /// Expand a compressed payload back into text.
    pub fn decompress(&self, payload: &[u8]) -> String {
        let mut out = String::with_capacity(payload.len() * 2);
        for &b in payload {
            match Keyword::from_token(b) {
                Some(kw) => out.push_str(kw.as_str()),
                None => out.push(char::from(b)),
            }
        }
        out
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

// ── Tests ─────────────────────────────────────────────────────────────────────
