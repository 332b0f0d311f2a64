/*
 * escape.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! JSON string escaping without the surrounding quotes.
//!
//! Unlike `serde_json`, this does not try to protect readers from browser
//! or JSONP problems. It only guarantees that the appended bytes are valid
//! content for a double-quoted JSON string. Invalid UTF-8 is replaced by
//! `\ufffd`, one offending byte at a time.

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Something the escaper can scan byte-by-byte.
///
/// The only difference between text and raw bytes is how a multi-byte
/// rune is decoded: text is known to be valid, bytes must be checked.
trait RuneSource {
    fn bytes(&self) -> &[u8];

    /// Width of the valid multi-byte rune starting at `at`, or `None` if
    /// the byte there does not start a complete, valid sequence.
    fn rune_width(&self, at: usize) -> Option<usize>;
}

impl RuneSource for str {
    fn bytes(&self) -> &[u8] {
        self.as_bytes()
    }

    fn rune_width(&self, at: usize) -> Option<usize> {
        self[at..].chars().next().map(char::len_utf8)
    }
}

impl RuneSource for [u8] {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn rune_width(&self, at: usize) -> Option<usize> {
        let width = match self[at] {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return None,
        };
        let end = at.checked_add(width)?;
        if end > self.len() {
            return None;
        }
        std::str::from_utf8(&self[at..end]).ok().map(|_| width)
    }
}

/// Escape `s` and append it to `out`.
pub fn append_escaped_str(out: &mut Vec<u8>, s: &str) {
    append_escaped(out, s);
}

/// Escape raw bytes and append them to `out`, replacing invalid UTF-8.
pub fn append_escaped_bytes(out: &mut Vec<u8>, s: &[u8]) {
    append_escaped(out, s);
}

fn append_escaped<S: RuneSource + ?Sized>(out: &mut Vec<u8>, source: &S) {
    let s = source.bytes();

    // `last` is the start of the run not yet copied to `out`.
    let mut last = 0;
    let mut i = 0;
    while i < s.len() {
        let b = s[i];
        if b >= 0x80 {
            if let Some(width) = source.rune_width(i) {
                i += width;
                continue;
            }
            out.extend_from_slice(&s[last..i]);
            out.extend_from_slice(b"\\ufffd");
            i += 1;
            last = i;
            continue;
        }

        if b >= 0x20 && b != b'\\' && b != b'"' {
            i += 1;
            continue;
        }

        out.extend_from_slice(&s[last..i]);
        match b {
            b'\\' | b'"' => out.extend_from_slice(&[b'\\', b]),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            _ => out.extend_from_slice(&[
                b'\\',
                b'u',
                b'0',
                b'0',
                HEX[(b >> 4) as usize],
                HEX[(b & 0xF) as usize],
            ]),
        }
        i += 1;
        last = i;
    }

    out.extend_from_slice(&s[last..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn escape(s: &str) -> String {
        let mut out = Vec::new();
        append_escaped_str(&mut out, s);
        String::from_utf8(out).unwrap()
    }

    fn escape_bytes(s: &[u8]) -> String {
        let mut out = Vec::new();
        append_escaped_bytes(&mut out, s);
        String::from_utf8(out).unwrap()
    }

    // ========================================================================
    // Text
    // ========================================================================

    #[test]
    fn test_plain_ascii_is_copied() {
        assert_eq!(escape("hello world"), "hello world");
    }

    #[test]
    fn test_quotes_and_backslashes() {
        assert_eq!(escape(r#"say "hi" \o/"#), r#"say \"hi\" \\o/"#);
    }

    #[test]
    fn test_named_control_escapes() {
        assert_eq!(escape("a\nb\rc\td"), "a\\nb\\rc\\td");
    }

    #[test]
    fn test_other_control_bytes_use_hex() {
        assert_eq!(escape("\u{0}\u{1f}\u{7}"), "\\u0000\\u001f\\u0007");
    }

    #[test]
    fn test_multibyte_text_is_verbatim() {
        assert_eq!(escape("我是全局跟踪号 🦀"), "我是全局跟踪号 🦀");
    }

    #[test]
    fn test_escaped_text_decodes_back() {
        let inputs = [
            "plain",
            "quote \" and backslash \\",
            "lines\n\r\t",
            "\u{1}\u{2}\u{1b}[0m",
            "mixed 日本 \"x\"\n",
        ];
        for input in inputs {
            let quoted = format!("\"{}\"", escape(input));
            let decoded: String = serde_json::from_str(&quoted).unwrap();
            assert_eq!(decoded, input);
        }
    }

    // ========================================================================
    // Bytes
    // ========================================================================

    #[test]
    fn test_invalid_byte_is_replaced_in_place() {
        assert_eq!(escape_bytes(b"ab\xffcd"), "ab\\ufffdcd");
    }

    #[test]
    fn test_truncated_sequence_is_replaced_per_byte() {
        // Two bytes of a three-byte sequence, then valid text.
        assert_eq!(escape_bytes(b"\xe6\x88ok"), "\\ufffd\\ufffdok");
    }

    #[test]
    fn test_valid_bytes_match_text_escaping() {
        let text = "tab\t日本\"";
        assert_eq!(escape_bytes(text.as_bytes()), escape(text));
    }

    #[test]
    fn test_overlong_encoding_is_invalid() {
        assert_eq!(escape_bytes(b"\xc0\xaf"), "\\ufffd\\ufffd");
    }
}
