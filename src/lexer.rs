//! Scanning primitives shared by the text backends.
//!
//! A [`TextCursor`] owns the decoded input and a byte offset into it. All
//! helpers either consume a token and advance, or leave the cursor where it
//! was. Positions in errors are 1-based line and column numbers derived from
//! the offset when the error is built.

use crate::{Error, Result, Value};

/// A numeric token after classification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumberToken {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl NumberToken {
    /// Classifies numeric text: a `.`, `e` or `E` makes it a float; otherwise
    /// it is an `Int` when it fits `i64` and a `UInt` when it only fits `u64`.
    /// `_` separators are ignored. A leading zero followed by another digit
    /// is rejected.
    pub fn parse(text: &str) -> Option<NumberToken> {
        let cleaned;
        let text = if text.contains('_') {
            cleaned = text.replace('_', "");
            cleaned.as_str()
        } else {
            text
        };
        if text.is_empty() {
            return None;
        }
        let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text).as_bytes();
        if unsigned.len() > 1 && unsigned[0] == b'0' && unsigned[1].is_ascii_digit() {
            return None;
        }
        if text.contains(['.', 'e', 'E']) {
            return text.parse::<f64>().ok().map(NumberToken::Float);
        }
        if let Ok(i) = text.parse::<i64>() {
            return Some(NumberToken::Int(i));
        }
        if !text.starts_with('-') {
            if let Ok(u) = text.parse::<u64>() {
                return Some(NumberToken::UInt(u));
            }
        }
        // Integers beyond 64 bits degrade to floats rather than failing.
        text.parse::<f64>().ok().map(NumberToken::Float)
    }

    pub fn into_value(self) -> Value {
        match self {
            NumberToken::Int(i) => Value::Int(i),
            NumberToken::UInt(u) => Value::UInt(u),
            NumberToken::Float(f) => Value::Float(f),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            NumberToken::Int(i) => i as f64,
            NumberToken::UInt(u) => u as f64,
            NumberToken::Float(f) => f,
        }
    }
}

/// Formats a finite float with the shortest text that parses back to the same
/// bits, always carrying a decimal point (`1.0`, `2.5e-7`).
pub fn format_float(value: f64) -> String {
    let text = format!("{:?}", value);
    if text.contains('.') {
        return text;
    }
    match text.find(['e', 'E']) {
        Some(exp) => format!("{}.0{}", &text[..exp], &text[exp..]),
        None => format!("{}.0", text),
    }
}

/// Appends `s` as a double-quoted string with backslash escapes.
pub fn write_quoted(out: &mut String, s: &str) {
    out.reserve(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Cursor over an owned UTF-8 buffer.
#[derive(Debug, Default)]
pub struct TextCursor {
    src: String,
    pos: usize,
}

impl TextCursor {
    pub fn new(src: impl Into<String>) -> Self {
        TextCursor {
            src: src.into(),
            pos: 0,
        }
    }

    /// Copies `bytes` into a new cursor, rejecting invalid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(TextCursor::new(s)),
            Err(e) => {
                let valid = e.valid_up_to();
                let before = TextCursor::new(String::from_utf8_lossy(&bytes[..valid]).into_owned());
                let (line, col) = before.line_col_at(valid);
                Err(Error::syntax(line, col, "input is not valid UTF-8"))
            }
        }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Moves back to a position previously returned by [`TextCursor::pos`].
    #[inline]
    pub fn reset(&mut self, pos: usize) {
        self.pos = pos.min(self.src.len());
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    #[inline]
    pub fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consumes one character.
    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Skips `n` bytes. Callers only pass lengths of ASCII tokens they matched.
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.src.len());
    }

    pub fn line_col(&self) -> (usize, usize) {
        self.line_col_at(self.pos)
    }

    pub fn line_col_at(&self, pos: usize) -> (usize, usize) {
        let upto = &self.src.as_bytes()[..pos.min(self.src.len())];
        let line = upto.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = upto.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        let col = String::from_utf8_lossy(&upto[line_start..]).chars().count() + 1;
        (line, col)
    }

    /// Column (0-based, in bytes) of the cursor within its line.
    pub fn column(&self) -> usize {
        let upto = &self.src.as_bytes()[..self.pos];
        match upto.iter().rposition(|&b| b == b'\n') {
            Some(i) => self.pos - i - 1,
            None => self.pos,
        }
    }

    /// A syntax error at the cursor, or an end-of-input error past the end.
    pub fn error(&self, msg: &str) -> Error {
        let (line, col) = self.line_col();
        if self.is_eof() {
            Error::unexpected_eof(line, col, msg)
        } else {
            Error::syntax(line, col, msg)
        }
    }

    pub fn error_at(&self, pos: usize, msg: &str) -> Error {
        let (line, col) = self.line_col_at(pos);
        Error::syntax(line, col, msg)
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\r' | b'\n') = self.peek() {
            self.pos += 1;
        }
    }

    /// Skips spaces and tabs but stops at line breaks.
    pub fn skip_inline_whitespace(&mut self) {
        while let Some(b' ' | b'\t') = self.peek() {
            self.pos += 1;
        }
    }

    /// Skips to the next line break without consuming it.
    pub fn skip_to_eol(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    /// Skips whitespace and comments that start with `marker` and run to the
    /// end of the line.
    pub fn skip_whitespace_and_comments(&mut self, marker: u8) {
        loop {
            self.skip_whitespace();
            if self.peek() == Some(marker) {
                self.skip_to_eol();
            } else {
                break;
            }
        }
    }

    #[inline]
    pub fn starts_with(&self, token: &str) -> bool {
        self.rest().starts_with(token)
    }

    /// Consumes `byte` if it is next.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, byte: u8) -> Result<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    /// Consumes `token` if the input continues with it.
    pub fn eat_str(&mut self, token: &str) -> bool {
        if self.starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    pub fn expect_str(&mut self, token: &str) -> Result<()> {
        if self.eat_str(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", token)))
        }
    }

    /// Consumes bytes while `pred` holds and returns them.
    pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// Parses `[A-Za-z_][A-Za-z0-9_]*`, also allowing any byte in `extra` after
    /// the first character.
    pub fn parse_identifier(&mut self, extra: &[u8]) -> Option<String> {
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
            _ => return None,
        }
        let ident = self.take_while(|b| b.is_ascii_alphanumeric() || b == b'_' || extra.contains(&b));
        Some(ident.to_string())
    }

    /// Byte length of the number token at the cursor, or 0 if there is none.
    /// Accepts an optional sign, digits, a fraction and an exponent.
    pub fn number_len(&self, underscores: bool) -> usize {
        let bytes = &self.src.as_bytes()[self.pos..];
        let digit = |b: u8| b.is_ascii_digit() || (underscores && b == b'_');
        let mut end = 0;
        if matches!(bytes.first(), Some(b'-' | b'+')) {
            end = 1;
        }
        let int_start = end;
        while end < bytes.len() && digit(bytes[end]) {
            end += 1;
        }
        if end == int_start || !bytes[int_start].is_ascii_digit() {
            return 0;
        }
        if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
            end += 1;
            while end < bytes.len() && digit(bytes[end]) {
                end += 1;
            }
        }
        if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
            let mut exp = end + 1;
            if matches!(bytes.get(exp), Some(b'-' | b'+')) {
                exp += 1;
            }
            if bytes.get(exp).is_some_and(u8::is_ascii_digit) {
                while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                    exp += 1;
                }
                end = exp;
            }
        }
        end
    }

    /// Classifies the number at the cursor without consuming it.
    pub fn peek_number(&self, underscores: bool) -> Option<NumberToken> {
        let len = self.number_len(underscores);
        if len == 0 {
            return None;
        }
        NumberToken::parse(&self.src[self.pos..self.pos + len])
    }

    pub fn parse_number(&mut self, underscores: bool) -> Result<NumberToken> {
        let len = self.number_len(underscores);
        let token = if len == 0 {
            None
        } else {
            NumberToken::parse(&self.src[self.pos..self.pos + len])
        };
        match token {
            Some(token) => {
                self.pos += len;
                Ok(token)
            }
            None => Err(self.error("expected a number")),
        }
    }

    /// Parses a double-quoted string with backslash escapes, including
    /// `\uXXXX` with surrogate pairs.
    pub fn parse_quoted_string(&mut self) -> Result<String> {
        let start = self.pos;
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            let chunk_start = self.pos;
            while let Some(b) = self.peek() {
                if b == b'"' || b == b'\\' {
                    break;
                }
                self.pos += 1;
            }
            out.push_str(&self.src[chunk_start..self.pos]);
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(_) => {
                    self.pos += 1;
                    self.parse_escape(&mut out)?;
                }
                None => {
                    let (line, col) = self.line_col_at(start);
                    return Err(Error::unexpected_eof(line, col, "closing '\"'"));
                }
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<()> {
        let escape_pos = self.pos - 1;
        let Some(ch) = self.bump() else {
            return Err(self.error("escape sequence"));
        };
        match ch {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            '/' => out.push('/'),
            '\'' => out.push('\''),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            'u' => {
                let first = self.parse_hex4()?;
                let code = if (0xD800..0xDC00).contains(&first) {
                    if !self.eat_str("\\u") {
                        return Err(self.error_at(escape_pos, "unpaired surrogate"));
                    }
                    let second = self.parse_hex4()?;
                    if !(0xDC00..0xE000).contains(&second) {
                        return Err(self.error_at(escape_pos, "invalid low surrogate"));
                    }
                    0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
                } else {
                    first
                };
                match char::from_u32(code) {
                    Some(c) => out.push(c),
                    None => return Err(self.error_at(escape_pos, "invalid unicode escape")),
                }
            }
            _ => return Err(self.error_at(escape_pos, "unknown escape sequence")),
        }
        Ok(())
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let digits = self.rest().get(..4).unwrap_or("");
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(self.error("four hex digits"));
        }
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("four hex digits"))?;
        self.pos += 4;
        Ok(code)
    }

    /// Parses a single-quoted string with no escapes except `''` for a
    /// literal quote.
    pub fn parse_single_quoted_string(&mut self) -> Result<String> {
        let start = self.pos;
        self.expect(b'\'')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\'') => {
                    if self.eat(b'\'') {
                        out.push('\'');
                    } else {
                        return Ok(out);
                    }
                }
                Some(c) => out.push(c),
                None => {
                    let (line, col) = self.line_col_at(start);
                    return Err(Error::unexpected_eof(line, col, "closing \"'\""));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_classification() {
        assert_eq!(NumberToken::parse("42"), Some(NumberToken::Int(42)));
        assert_eq!(NumberToken::parse("-9223372036854775808"), Some(NumberToken::Int(i64::MIN)));
        assert_eq!(
            NumberToken::parse("18446744073709551615"),
            Some(NumberToken::UInt(u64::MAX))
        );
        assert_eq!(NumberToken::parse("1e3"), Some(NumberToken::Float(1000.0)));
        assert_eq!(NumberToken::parse("1_000"), Some(NumberToken::Int(1000)));
        assert_eq!(NumberToken::parse(""), None);
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(NumberToken::parse("0"), Some(NumberToken::Int(0)));
        assert_eq!(NumberToken::parse("-0"), Some(NumberToken::Int(0)));
        assert_eq!(NumberToken::parse("0.25"), Some(NumberToken::Float(0.25)));
        assert_eq!(NumberToken::parse("0e1"), Some(NumberToken::Float(0.0)));
        assert_eq!(NumberToken::parse("01"), None);
        assert_eq!(NumberToken::parse("-007"), None);
        assert_eq!(NumberToken::parse("0_1"), None);
        assert_eq!(NumberToken::parse("00.5"), None);
    }

    #[test]
    fn test_unicode_escapes() {
        let mut cur = TextCursor::new(r#""\ud83d\ude00\u00e9\u0041""#);
        assert_eq!(cur.parse_quoted_string().unwrap(), "\u{1F600}\u{e9}A");

        // A high surrogate must be followed by a low one.
        assert!(TextCursor::new(r#""\ud83d\u0041""#).parse_quoted_string().is_err());
        assert!(TextCursor::new(r#""\ud83d\ud83d""#).parse_quoted_string().is_err());
        assert!(TextCursor::new(r#""\ud83dx""#).parse_quoted_string().is_err());
        assert!(TextCursor::new(r#""\ude00""#).parse_quoted_string().is_err());
        assert!(TextCursor::new(r#""\u12""#).parse_quoted_string().is_err());
    }

    #[test]
    fn test_format_float_forces_point() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(-0.5), "-0.5");
        assert_eq!(format_float(1e100), "1.0e100");
        assert_eq!(format_float(0.1 + 0.2).parse::<f64>().unwrap(), 0.1 + 0.2);
    }

    #[test]
    fn test_number_len_stops_at_suffix() {
        let cur = TextCursor::new("12.5e3,");
        assert_eq!(cur.number_len(false), 6);
        let cur = TextCursor::new("7.x");
        assert_eq!(cur.number_len(false), 1);
        let cur = TextCursor::new("-abc");
        assert_eq!(cur.number_len(false), 0);
        let cur = TextCursor::new("1_000");
        assert_eq!(cur.number_len(true), 5);
        assert_eq!(cur.number_len(false), 1);
    }

    #[test]
    fn test_quoted_string_escapes() {
        let mut cur = TextCursor::new(r#""a\"b\\c\né😀" tail"#);
        assert_eq!(cur.parse_quoted_string().unwrap(), "a\"b\\c\né😀");
        assert_eq!(cur.rest(), " tail");

        let mut cur = TextCursor::new("\"open");
        assert!(matches!(
            cur.parse_quoted_string(),
            Err(Error::UnexpectedEof { .. })
        ));

        let mut cur = TextCursor::new(r#""\ud800x""#);
        assert!(cur.parse_quoted_string().is_err());
    }

    #[test]
    fn test_write_quoted_roundtrip() {
        let original = "tab\there \"q\" \\ \u{1} end";
        let mut out = String::new();
        write_quoted(&mut out, original);
        let mut cur = TextCursor::new(out);
        assert_eq!(cur.parse_quoted_string().unwrap(), original);
    }

    #[test]
    fn test_single_quoted() {
        let mut cur = TextCursor::new("'it''s' x");
        assert_eq!(cur.parse_single_quoted_string().unwrap(), "it's");
    }

    #[test]
    fn test_comments_and_positions() {
        let mut cur = TextCursor::new("  # note\n\n  key");
        cur.skip_whitespace_and_comments(b'#');
        assert_eq!(cur.line_col(), (3, 3));
        assert_eq!(cur.column(), 2);
        assert_eq!(cur.parse_identifier(b"-").as_deref(), Some("key"));
        assert!(cur.is_eof());
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(matches!(
            TextCursor::from_bytes(b"ok\n\xff"),
            Err(Error::Syntax { line: 2, col: 1, .. })
        ));
    }
}
