//! Byte buffer in, validated `char` cursor out.
//!
//! The Reader is the only component that touches raw bytes. It sniffs a BOM
//! (or falls back to UTF-8), decodes the whole buffer up front, normalizes
//! line breaks, and rejects control characters YAML disallows. Everything
//! downstream works against `char`s and `Mark`s only.

use encoding_rs::{UTF_16BE, UTF_16LE};

use crate::error::{Mark, ReaderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl Encoding {
    fn sniff(bytes: &[u8]) -> (Encoding, usize) {
        match bytes {
            [0x00, 0x00, 0xFE, 0xFF, ..] => (Encoding::Utf32Be, 4),
            [0xFF, 0xFE, 0x00, 0x00, ..] => (Encoding::Utf32Le, 4),
            [0xFE, 0xFF, ..] => (Encoding::Utf16Be, 2),
            [0xFF, 0xFE, ..] => (Encoding::Utf16Le, 2),
            [0xEF, 0xBB, 0xBF, ..] => (Encoding::Utf8, 3),
            _ => (Encoding::Utf8, 0),
        }
    }
}

/// A `char`-indexed, line/column-tracking cursor over a fully decoded
/// document. No streaming: spec.md's Non-goals keep the whole crate
/// buffer-in/buffer-out, so decoding the entire input up front is simplest
/// and matches the teacher's own non-streaming `AdvancedReader`.
pub struct Reader {
    chars: Vec<char>,
    pos: usize,
    line: u64,
    column: u64,
    encoding: Encoding,
}

/// Line breaks YAML treats as equivalent are normalized to `\n` while
/// decoding so the Scanner never has to special-case `\r\n`, bare `\r`, NEL
/// (U+0085), LINE SEPARATOR (U+2028) or PARAGRAPH SEPARATOR (U+2029).
fn normalize_breaks(input: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\u{0085}' | '\u{2028}' | '\u{2029}' => out.push('\n'),
            other => out.push(other),
        }
    }
    out
}

fn validate_printable(chars: &[char]) -> Result<(), ReaderError> {
    let mut line = 0u64;
    let mut column = 0u64;
    let mut index = 0u64;
    for &c in chars {
        let allowed = matches!(c, '\t' | '\n')
            || matches!(c as u32, 0x20..=0x7E)
            || c == '\u{FEFF}'
            || matches!(c as u32, 0xA0..=0xD7FF)
            || matches!(c as u32, 0xE000..=0xFFFD)
            || matches!(c as u32, 0x10000..=0x10FFFF);
        if !allowed {
            return Err(ReaderError::Control {
                problem: "control characters are not allowed",
                mark: Mark::new(index, line, column),
            });
        }
        if c == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
        index += 1;
    }
    Ok(())
}

impl Reader {
    pub fn new(bytes: &[u8]) -> Result<Self, ReaderError> {
        let (encoding, bom_len) = Encoding::sniff(bytes);
        let body = &bytes[bom_len..];

        let decoded = match encoding {
            Encoding::Utf8 => std::str::from_utf8(body)
                .map_err(|e| ReaderError::InvalidUtf8 {
                    byte: body[e.valid_up_to()],
                    mark: Mark::new(e.valid_up_to() as u64, 0, 0),
                })?
                .to_string(),
            Encoding::Utf16Le => decode_utf16(body, UTF_16LE)?,
            Encoding::Utf16Be => decode_utf16(body, UTF_16BE)?,
            Encoding::Utf32Le => decode_utf32(body, true)?,
            Encoding::Utf32Be => decode_utf32(body, false)?,
        };

        let chars = normalize_breaks(&decoded);
        validate_printable(&chars)?;

        Ok(Self {
            chars,
            pos: 0,
            line: 0,
            column: 0,
            encoding,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn mark(&self) -> Mark {
        Mark::new(self.pos as u64, self.line, self.column)
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub fn peek(&self) -> char {
        self.peek_at(0)
    }

    pub fn peek_at(&self, k: usize) -> char {
        self.chars.get(self.pos + k).copied().unwrap_or('\0')
    }

    /// The next `n` characters (or fewer, at end of input) without advancing.
    pub fn prefix(&self, n: usize) -> String {
        let end = (self.pos + n).min(self.chars.len());
        self.chars[self.pos..end].iter().collect()
    }

    pub fn forward(&mut self) -> char {
        let c = self.peek();
        if c == '\0' {
            return c;
        }
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        c
    }

    pub fn forward_n(&mut self, n: usize) {
        for _ in 0..n {
            if self.eof() {
                break;
            }
            self.forward();
        }
    }
}

fn decode_utf16(
    body: &[u8],
    encoding: &'static encoding_rs::Encoding,
) -> Result<String, ReaderError> {
    let (cow, _, had_errors) = encoding.decode(body);
    if had_errors {
        return Err(ReaderError::InvalidUtf16 {
            unit: 0,
            mark: Mark::default(),
        });
    }
    Ok(cow.into_owned())
}

fn decode_utf32(body: &[u8], little_endian: bool) -> Result<String, ReaderError> {
    if body.len() % 4 != 0 {
        return Err(ReaderError::InvalidUtf32 {
            unit: 0,
            mark: Mark::new((body.len() - body.len() % 4) as u64, 0, 0),
        });
    }
    let mut out = String::with_capacity(body.len() / 4);
    for (i, chunk) in body.chunks_exact(4).enumerate() {
        let bytes: [u8; 4] = chunk.try_into().unwrap();
        let code = if little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        };
        let c = char::from_u32(code).ok_or(ReaderError::InvalidUtf32 {
            unit: code,
            mark: Mark::new((i * 4) as u64, 0, 0),
        })?;
        out.push(c);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_utf8() {
        let r = Reader::new(b"key: value\n").unwrap();
        assert_eq!(r.encoding(), Encoding::Utf8);
        assert_eq!(r.prefix(3), "key");
    }

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"a: 1");
        let r = Reader::new(&bytes).unwrap();
        assert_eq!(r.peek(), 'a');
    }

    #[test]
    fn normalizes_crlf_to_lf() {
        let r = Reader::new(b"a\r\nb").unwrap();
        assert_eq!(r.prefix(4), "a\nb");
    }

    #[test]
    fn forward_tracks_line_and_column() {
        let mut r = Reader::new(b"ab\ncd").unwrap();
        r.forward_n(3);
        let mark = r.mark();
        assert_eq!(mark.line, 1);
        assert_eq!(mark.column, 0);
    }

    #[test]
    fn rejects_raw_control_characters() {
        let err = Reader::new(b"a\x01b").unwrap_err();
        assert!(matches!(err, ReaderError::Control { .. }));
    }
}
