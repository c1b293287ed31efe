//! A human-readable brace format.
//!
//! ```text
//! {
//! 	name: "demo"
//! 	sizes: [ 1, 2, 3 ]
//! 	grid: matrix(2, 2) [ 1.0, 0.0, 0.0, 1.0 ]
//! 	"odd key": { }
//! }
//! ```
//!
//! Struct entries go on their own tab-indented lines. Keys that are plain
//! identifiers are written bare, others are quoted. Strings are always quoted.
//! On input, `#` starts a comment and entries may be separated by commas or
//! newlines.

use crate::backend::Backend;
use crate::lexer::{format_float, write_quoted, NumberToken, TextCursor};
use crate::{Error, Format, Options, Result, ValueType};
use tracing::trace;

#[derive(Clone, Copy, Debug)]
enum Frame {
    Struct { first: bool },
    List { first: bool },
}

pub struct TextBackend {
    out: String,
    stack: Vec<Frame>,
    cur: TextCursor,
}

fn is_identifier(key: &str) -> bool {
    let mut bytes = key.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphabetic() || b == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn push_float(out: &mut String, value: f64) {
    if value.is_nan() {
        out.push_str("nan");
    } else if value.is_infinite() {
        out.push_str(if value > 0.0 { "inf" } else { "-inf" });
    } else {
        out.push_str(&format_float(value));
    }
}

impl TextBackend {
    pub fn new(_options: &Options) -> Self {
        TextBackend {
            out: String::new(),
            stack: Vec::new(),
            cur: TextCursor::default(),
        }
    }

    fn struct_depth(&self) -> usize {
        self.stack
            .iter()
            .filter(|f| matches!(f, Frame::Struct { .. }))
            .count()
    }

    fn tabs(&mut self, n: usize) {
        self.out.extend(std::iter::repeat('\t').take(n));
    }

    fn begin_value(&mut self) {
        if let Some(Frame::List { first }) = self.stack.last_mut() {
            let sep = if std::mem::replace(first, false) { " " } else { ", " };
            self.out.push_str(sep);
        }
    }

    fn skip_trivia(&mut self) {
        self.cur.skip_whitespace_and_comments(b'#');
    }

    /// Skips trivia and at most one separating comma.
    fn skip_separator(&mut self) {
        self.skip_trivia();
        if self.cur.eat(b',') {
            self.skip_trivia();
        }
    }

    fn starts_with_word(&self, word: &str) -> bool {
        self.cur.starts_with(word)
            && !matches!(self.cur.peek_at(word.len()), Some(b) if b.is_ascii_alphanumeric() || b == b'_')
    }

    fn read_number(&mut self) -> Result<NumberToken> {
        self.skip_separator();
        for (word, value) in [("nan", f64::NAN), ("inf", f64::INFINITY), ("-inf", f64::NEG_INFINITY)] {
            if self.starts_with_word(word) {
                self.cur.advance(word.len());
                return Ok(NumberToken::Float(value));
            }
        }
        self.cur.parse_number(false)
    }

    /// Counts list elements after a consumed `[`. Elements are separated by
    /// commas or line breaks.
    fn count_elements(&self) -> Result<usize> {
        let bytes = self.cur.rest().as_bytes();
        let mut depth = 0usize;
        let mut count = 0;
        let mut expecting = true;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            match b {
                b'"' => {
                    if depth == 0 && expecting {
                        count += 1;
                        expecting = false;
                    }
                    i += 1;
                    while i < bytes.len() && bytes[i] != b'"' {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                b'#' => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                    continue;
                }
                b' ' | b'\t' | b'\r' => {}
                b',' | b'\n' if depth == 0 => expecting = true,
                b']' if depth == 0 => return Ok(count),
                b']' | b'}' | b')' => depth = depth.saturating_sub(1),
                _ => {
                    if depth == 0 && expecting {
                        count += 1;
                        expecting = false;
                    }
                    if matches!(b, b'[' | b'{' | b'(') {
                        depth += 1;
                    }
                }
            }
            i += 1;
        }
        Err(self.cur.error_at(self.cur.pos() + bytes.len(), "closing ']'"))
    }

    fn read_number_list(&mut self, open: u8, close: u8) -> Result<Vec<NumberToken>> {
        self.skip_trivia();
        self.cur.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_separator();
            if self.cur.eat(close) {
                return Ok(items);
            }
            items.push(self.read_number()?);
        }
    }
}

impl Backend for TextBackend {
    fn format(&self) -> Format {
        Format::Text
    }

    fn init_write(&mut self) -> Result<()> {
        self.out.clear();
        self.stack.clear();
        Ok(())
    }

    fn finish_write(&mut self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(Error::custom("text writer finished inside a container"));
        }
        self.out.push('\n');
        Ok(std::mem::take(&mut self.out).into_bytes())
    }

    fn init_read(&mut self, input: &[u8]) -> Result<()> {
        self.cur = TextCursor::from_bytes(input)?;
        Ok(())
    }

    fn finish_read(&mut self) -> Result<()> {
        self.skip_trivia();
        if !self.cur.is_eof() {
            return Err(self.cur.error("end of input after the root value"));
        }
        Ok(())
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        self.begin_value();
        self.out.push_str(&value.to_string());
        Ok(())
    }

    fn write_uint(&mut self, value: u64) -> Result<()> {
        self.begin_value();
        self.out.push_str(&value.to_string());
        Ok(())
    }

    fn write_float(&mut self, value: f64) -> Result<()> {
        self.begin_value();
        push_float(&mut self.out, value);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.begin_value();
        write_quoted(&mut self.out, value);
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.begin_value();
        self.out.push_str(if value { "true" } else { "false" });
        Ok(())
    }

    fn write_list_begin(&mut self, _len: usize) -> Result<()> {
        self.begin_value();
        self.out.push('[');
        self.stack.push(Frame::List { first: true });
        Ok(())
    }

    fn write_list_end(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::List { .. }) => {
                self.out.push_str(" ]");
                Ok(())
            }
            _ => Err(Error::custom("unbalanced list in text writer")),
        }
    }

    fn write_struct_begin(&mut self) -> Result<()> {
        self.begin_value();
        self.out.push('{');
        self.stack.push(Frame::Struct { first: true });
        Ok(())
    }

    fn write_struct_key(&mut self, key: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Struct { first }) => *first = false,
            _ => return Err(Error::custom("text key outside a struct")),
        }
        self.out.push('\n');
        let depth = self.struct_depth();
        self.tabs(depth);
        if is_identifier(key) {
            self.out.push_str(key);
        } else {
            write_quoted(&mut self.out, key);
        }
        self.out.push_str(": ");
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Struct { first: true }) => {
                self.out.push_str(" }");
                Ok(())
            }
            Some(Frame::Struct { first: false }) => {
                self.out.push('\n');
                let depth = self.struct_depth();
                self.tabs(depth);
                self.out.push('}');
                Ok(())
            }
            _ => Err(Error::custom("unbalanced struct in text writer")),
        }
    }

    fn write_matrix(&mut self, dims: &[usize], data: &[f64]) -> Result<()> {
        self.begin_value();
        self.out.push_str("matrix(");
        for (i, dim) in dims.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&dim.to_string());
        }
        self.out.push_str(") [");
        for (i, &cell) in data.iter().enumerate() {
            self.out.push_str(if i > 0 { ", " } else { " " });
            push_float(&mut self.out, cell);
        }
        self.out.push_str(" ]");
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<ValueType>> {
        self.skip_separator();
        let tag = match self.cur.peek() {
            None | Some(b']') | Some(b'}') => return Ok(None),
            Some(b'"') => ValueType::String,
            Some(b'[') => ValueType::List,
            Some(b'{') => ValueType::Struct,
            Some(_) if self.cur.starts_with("matrix(") => ValueType::Matrix,
            Some(_) if self.starts_with_word("true") || self.starts_with_word("false") => ValueType::Bool,
            Some(_) if ["nan", "inf", "-inf"].iter().any(|w| self.starts_with_word(w)) => ValueType::Float,
            Some(_) => match self.cur.peek_number(false) {
                Some(NumberToken::Int(_)) => ValueType::Int,
                Some(NumberToken::UInt(_)) => ValueType::UInt,
                Some(NumberToken::Float(_)) => ValueType::Float,
                None => return Err(self.cur.error("unexpected character")),
            },
        };
        trace!(%tag, "text lookahead");
        Ok(Some(tag))
    }

    fn read_int(&mut self) -> Result<i64> {
        match self.read_number()? {
            NumberToken::Int(i) => Ok(i),
            NumberToken::UInt(u) => i64::try_from(u).map_err(|_| Error::type_mismatch("int", "uint")),
            NumberToken::Float(_) => Err(Error::type_mismatch("int", "float")),
        }
    }

    fn read_uint(&mut self) -> Result<u64> {
        match self.read_number()? {
            NumberToken::UInt(u) => Ok(u),
            NumberToken::Int(i) => u64::try_from(i).map_err(|_| Error::type_mismatch("uint", "int")),
            NumberToken::Float(_) => Err(Error::type_mismatch("uint", "float")),
        }
    }

    fn read_float(&mut self) -> Result<f64> {
        Ok(self.read_number()?.as_f64())
    }

    fn read_string(&mut self) -> Result<String> {
        self.skip_separator();
        self.cur.parse_quoted_string()
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.skip_separator();
        if self.starts_with_word("true") {
            self.cur.advance(4);
            Ok(true)
        } else if self.starts_with_word("false") {
            self.cur.advance(5);
            Ok(false)
        } else {
            Err(self.cur.error("expected 'true' or 'false'"))
        }
    }

    fn read_list_begin(&mut self) -> Result<usize> {
        self.skip_separator();
        self.cur.expect(b'[')?;
        self.count_elements()
    }

    fn read_list_end(&mut self) -> Result<()> {
        self.skip_separator();
        self.cur.expect(b']')
    }

    fn read_struct_begin(&mut self) -> Result<()> {
        self.skip_separator();
        self.cur.expect(b'{')
    }

    fn read_struct_key(&mut self) -> Result<Option<String>> {
        self.skip_separator();
        let key = match self.cur.peek() {
            Some(b'}') => return Ok(None),
            Some(b'"') => self.cur.parse_quoted_string()?,
            _ => match self.cur.parse_identifier(b"") {
                Some(key) => key,
                None => return Err(self.cur.error("expected a struct key")),
            },
        };
        self.cur.skip_inline_whitespace();
        self.cur.expect(b':')?;
        Ok(Some(key))
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.skip_separator();
        self.cur.expect(b'}')
    }

    fn read_matrix(&mut self) -> Result<(Vec<usize>, Vec<f64>)> {
        self.skip_separator();
        self.cur.expect_str("matrix")?;
        let at = self.cur.pos();
        let dims = self
            .read_number_list(b'(', b')')?
            .into_iter()
            .map(|token| match token {
                NumberToken::Int(d) if d >= 0 => Ok(d as usize),
                _ => Err(self.cur.error_at(at, "matrix dimensions must be non-negative integers")),
            })
            .collect::<Result<Vec<_>>>()?;
        let data = self
            .read_number_list(b'[', b']')?
            .into_iter()
            .map(NumberToken::as_f64)
            .collect();
        Ok((dims, data))
    }
}
