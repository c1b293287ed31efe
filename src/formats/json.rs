//! Pretty-printed JSON.
//!
//! Output uses `options.indent` spaces per level and ends with a newline.
//! Empty containers print as `[]` and `{}`. Non-finite floats become `null`,
//! and `null` reads back as integer zero.
//!
//! A matrix is the single-line object
//! `{"__matrix": true, "dims": [2, 2], "data": [1.0, 0.0, 0.0, 1.0]}`, which
//! the reader recognises by its leading `"__matrix"` key.

use crate::backend::Backend;
use crate::lexer::{format_float, write_quoted, NumberToken, TextCursor};
use crate::{Error, Format, Options, Result, ValueType};
use tracing::trace;

const MATRIX_KEY: &str = "\"__matrix\"";

#[derive(Clone, Copy, Debug)]
enum Frame {
    List { first: bool },
    Struct { first: bool },
}

pub struct JsonBackend {
    indent: usize,
    out: String,
    stack: Vec<Frame>,
    cur: TextCursor,
    /// A value inside a container was just read, so a `,` must come before
    /// the next element or member.
    need_comma: bool,
}

impl JsonBackend {
    pub fn new(options: &Options) -> Self {
        JsonBackend {
            indent: options.indent,
            out: String::new(),
            stack: Vec::new(),
            cur: TextCursor::default(),
            need_comma: false,
        }
    }

    fn newline_indent(&mut self, depth: usize) {
        self.out.push('\n');
        self.out.extend(std::iter::repeat(' ').take(depth * self.indent));
    }

    /// Places the separator and indentation before a value.
    fn begin_value(&mut self) {
        let depth = self.stack.len();
        if let Some(Frame::List { first }) = self.stack.last_mut() {
            let was_first = std::mem::replace(first, false);
            if !was_first {
                self.out.push(',');
            }
            self.newline_indent(depth);
        }
    }

    fn push_float(&mut self, value: f64) {
        if value.is_finite() {
            self.out.push_str(&format_float(value));
        } else {
            self.out.push_str("null");
        }
    }

    fn close(&mut self, closer: char) -> Result<()> {
        let first = match self.stack.pop() {
            Some(Frame::List { first }) if closer == ']' => first,
            Some(Frame::Struct { first }) if closer == '}' => first,
            _ => return Err(Error::custom(format!("unbalanced '{}' in JSON writer", closer))),
        };
        if !first {
            let depth = self.stack.len();
            self.newline_indent(depth);
        }
        self.out.push(closer);
        Ok(())
    }

    /// Skips whitespace and the comma owed by the previous value. Stops in
    /// front of a closing bracket so that `peek` can report the end.
    fn skip_separator(&mut self) -> Result<()> {
        self.cur.skip_whitespace();
        if self.need_comma && !matches!(self.cur.peek(), None | Some(b']') | Some(b'}')) {
            self.cur.expect(b',')?;
            self.need_comma = false;
            self.cur.skip_whitespace();
            if matches!(self.cur.peek(), Some(b']') | Some(b'}')) {
                return Err(self.cur.error("a value after ','"));
            }
        }
        Ok(())
    }

    fn value_done<T>(&mut self, value: T) -> T {
        self.need_comma = true;
        value
    }

    fn read_number(&mut self) -> Result<NumberToken> {
        self.skip_separator()?;
        let token = if self.cur.eat_str("null") {
            NumberToken::Int(0)
        } else {
            self.cur.parse_number(false)?
        };
        Ok(self.value_done(token))
    }

    /// Counts the elements of the list whose `[` was just consumed, without
    /// moving the cursor.
    fn count_elements(&self) -> Result<usize> {
        let bytes = self.cur.rest().as_bytes();
        let mut i = 0;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) == Some(&b']') {
            return Ok(0);
        }
        let mut depth = 0usize;
        let mut count = 1;
        let mut in_string = false;
        while i < bytes.len() {
            let b = bytes[i];
            if in_string {
                match b {
                    b'\\' => i += 1,
                    b'"' => in_string = false,
                    _ => {}
                }
            } else {
                match b {
                    b'"' => in_string = true,
                    b'[' | b'{' => depth += 1,
                    b']' | b'}' if depth == 0 => return Ok(count),
                    b']' | b'}' => depth -= 1,
                    b',' if depth == 0 => count += 1,
                    _ => {}
                }
            }
            i += 1;
        }
        Err(self.cur.error_at(self.cur.pos() + bytes.len(), "closing ']'"))
    }

    fn read_number_list(&mut self, allow_null: bool) -> Result<Vec<NumberToken>> {
        self.cur.skip_whitespace();
        self.cur.expect(b'[')?;
        let mut items = Vec::new();
        loop {
            self.cur.skip_whitespace();
            if self.cur.eat(b']') {
                return Ok(items);
            }
            if !items.is_empty() {
                self.cur.expect(b',')?;
                self.cur.skip_whitespace();
            }
            if allow_null && self.cur.eat_str("null") {
                items.push(NumberToken::Float(f64::NAN));
            } else {
                items.push(self.cur.parse_number(false)?);
            }
        }
    }
}

impl Backend for JsonBackend {
    fn format(&self) -> Format {
        Format::Json
    }

    fn init_write(&mut self) -> Result<()> {
        self.out.clear();
        self.stack.clear();
        Ok(())
    }

    fn finish_write(&mut self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(Error::custom("JSON writer finished inside a container"));
        }
        self.out.push('\n');
        Ok(std::mem::take(&mut self.out).into_bytes())
    }

    fn init_read(&mut self, input: &[u8]) -> Result<()> {
        self.cur = TextCursor::from_bytes(input)?;
        self.need_comma = false;
        Ok(())
    }

    fn finish_read(&mut self) -> Result<()> {
        self.cur.skip_whitespace();
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
        self.push_float(value);
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
        self.close(']')
    }

    fn write_struct_begin(&mut self) -> Result<()> {
        self.begin_value();
        self.out.push('{');
        self.stack.push(Frame::Struct { first: true });
        Ok(())
    }

    fn write_struct_key(&mut self, key: &str) -> Result<()> {
        let depth = self.stack.len();
        match self.stack.last_mut() {
            Some(Frame::Struct { first }) => {
                if !std::mem::replace(first, false) {
                    self.out.push(',');
                }
            }
            _ => return Err(Error::custom("JSON struct key outside a struct")),
        }
        self.newline_indent(depth);
        write_quoted(&mut self.out, key);
        self.out.push_str(": ");
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        self.close('}')
    }

    fn write_matrix(&mut self, dims: &[usize], data: &[f64]) -> Result<()> {
        self.begin_value();
        self.out.push('{');
        self.out.push_str(MATRIX_KEY);
        self.out.push_str(": true, \"dims\": [");
        for (i, dim) in dims.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&dim.to_string());
        }
        self.out.push_str("], \"data\": [");
        for (i, &cell) in data.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.push_float(cell);
        }
        self.out.push_str("]}");
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<ValueType>> {
        self.skip_separator()?;
        let tag = match self.cur.peek() {
            None | Some(b']') | Some(b'}') => return Ok(None),
            Some(b'"') => ValueType::String,
            Some(b't') | Some(b'f') => ValueType::Bool,
            Some(b'n') => ValueType::Int,
            Some(b'[') => ValueType::List,
            Some(b'{') => {
                let mark = self.cur.pos();
                self.cur.advance(1);
                self.cur.skip_whitespace();
                let is_matrix = self.cur.starts_with(MATRIX_KEY);
                self.cur.reset(mark);
                trace!(is_matrix, "json object lookahead");
                if is_matrix {
                    ValueType::Matrix
                } else {
                    ValueType::Struct
                }
            }
            Some(b'-') | Some(b'0'..=b'9') => match self.cur.peek_number(false) {
                Some(NumberToken::Int(_)) => ValueType::Int,
                Some(NumberToken::UInt(_)) => ValueType::UInt,
                Some(NumberToken::Float(_)) => ValueType::Float,
                None => return Err(self.cur.error("malformed number")),
            },
            Some(_) => return Err(self.cur.error("unexpected character")),
        };
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
        self.skip_separator()?;
        let text = self.cur.parse_quoted_string()?;
        Ok(self.value_done(text))
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.skip_separator()?;
        let value = if self.cur.eat_str("true") {
            true
        } else if self.cur.eat_str("false") {
            false
        } else {
            return Err(self.cur.error("expected 'true' or 'false'"));
        };
        Ok(self.value_done(value))
    }

    fn read_list_begin(&mut self) -> Result<usize> {
        self.skip_separator()?;
        self.cur.expect(b'[')?;
        self.need_comma = false;
        self.count_elements()
    }

    fn read_list_end(&mut self) -> Result<()> {
        self.cur.skip_whitespace();
        self.cur.expect(b']')?;
        self.value_done(Ok(()))
    }

    fn read_struct_begin(&mut self) -> Result<()> {
        self.skip_separator()?;
        self.cur.expect(b'{')?;
        self.need_comma = false;
        Ok(())
    }

    fn read_struct_key(&mut self) -> Result<Option<String>> {
        self.skip_separator()?;
        if self.cur.peek() == Some(b'}') {
            return Ok(None);
        }
        let key = self.cur.parse_quoted_string()?;
        self.cur.skip_whitespace();
        self.cur.expect(b':')?;
        Ok(Some(key))
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.cur.skip_whitespace();
        self.cur.expect(b'}')?;
        self.value_done(Ok(()))
    }

    fn read_matrix(&mut self) -> Result<(Vec<usize>, Vec<f64>)> {
        self.skip_separator()?;
        self.cur.expect(b'{')?;
        let mut dims = None;
        let mut data = None;
        let mut first = true;
        loop {
            self.cur.skip_whitespace();
            if self.cur.eat(b'}') {
                break;
            }
            if !first {
                self.cur.expect(b',')?;
                self.cur.skip_whitespace();
            }
            first = false;
            let key_pos = self.cur.pos();
            let key = self.cur.parse_quoted_string()?;
            self.cur.skip_whitespace();
            self.cur.expect(b':')?;
            self.cur.skip_whitespace();
            match key.as_str() {
                "__matrix" => {
                    self.cur.expect_str("true")?;
                }
                "dims" => {
                    let mut out = Vec::new();
                    for token in self.read_number_list(false)? {
                        match token {
                            NumberToken::Int(d) if d >= 0 => out.push(d as usize),
                            _ => return Err(self.cur.error_at(key_pos, "matrix dims must be non-negative integers")),
                        }
                    }
                    dims = Some(out);
                }
                "data" => {
                    let cells = self.read_number_list(true)?;
                    data = Some(cells.into_iter().map(NumberToken::as_f64).collect());
                }
                _ => return Err(self.cur.error_at(key_pos, "unexpected key in matrix object")),
            }
        }
        match (dims, data) {
            (Some(dims), Some(data)) => Ok(self.value_done((dims, data))),
            _ => Err(self.cur.error("matrix object needs 'dims' and 'data'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Serializer;
    use crate::{value, Matrix, Value};

    fn json() -> Serializer<JsonBackend> {
        Serializer::new(JsonBackend::new(&Options::default()), Options::default())
    }

    #[test]
    fn test_pretty_layout() {
        let text = json().write_string(&value!({"a": -42, "b": [1, 2], "c": {}, "d": []})).unwrap();
        assert_eq!(
            text,
            "{\n  \"a\": -42,\n  \"b\": [\n    1,\n    2\n  ],\n  \"c\": {},\n  \"d\": []\n}\n"
        );
    }

    #[test]
    fn test_output_is_standard_json() {
        let v = value!({"s": "q\"\\\n\u{1}", "f": 1.5, "n": [true, false]});
        let text = json().write_string(&v).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["s"], "q\"\\\n\u{1}");
        assert_eq!(parsed["f"], 1.5);
    }

    #[test]
    fn test_integer_extremes() {
        let v = Value::List(vec![Value::Int(i64::MIN), Value::Int(i64::MAX), Value::UInt(u64::MAX)]);
        let text = json().write_string(&v).unwrap();
        assert_eq!(json().read_str(&text).unwrap(), v);
    }

    #[test]
    fn test_null_and_non_finite() {
        let v = Value::List(vec![Value::Float(f64::NAN), Value::Float(f64::INFINITY)]);
        let text = json().write_string(&v).unwrap();
        assert_eq!(text, "[\n  null,\n  null\n]\n");
        assert_eq!(json().read_str("null").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_matrix_sentinel() {
        let m = Matrix::from_data(&[2, 3], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let mv = Value::Matrix(m.clone());
        let text = json().write_string(&value!({ "m": mv })).unwrap();
        assert!(text.contains(
            "{\"__matrix\": true, \"dims\": [2, 3], \"data\": [0.0, 1.0, 2.0, 3.0, 4.0, 5.0]}"
        ));
        let back = json().read_str(&text).unwrap();
        assert_eq!(back.struct_get("m"), Some(&Value::Matrix(m)));

        let reordered = "{\"__matrix\": true, \"data\": [1, 2], \"dims\": [2]}";
        assert!(json().read_str(reordered).unwrap().is_matrix());
        // Only a leading sentinel key marks a matrix.
        let plain = "{\"dims\": [2], \"__matrix\": true}";
        assert!(json().read_str(plain).unwrap().is_struct());
    }

    #[test]
    fn test_counting_skips_strings_and_nesting() {
        let text = r#"[ "a,]b", [1, 2], {"k": "}"}, "\"" ]"#;
        let v = json().read_str(text).unwrap();
        assert_eq!(v.list_size(), Some(4));
        assert_eq!(v.list_get(0), Some(&Value::from("a,]b")));
        assert_eq!(v.list_get(3), Some(&Value::from("\"")));
    }

    #[test]
    fn test_unicode_escapes() {
        let v = json().read_str(r#""é😀""#).unwrap();
        assert_eq!(v, Value::from("é😀"));

        let v = json().read_str(r#"{"k\u00e9y": "\ud83d\ude00\u00e9"}"#).unwrap();
        assert_eq!(v.struct_get("kéy"), Some(&Value::from("😀é")));

        assert!(json().read_str(r#""\ud83d\u00e9""#).is_err());
        assert!(json().read_str(r#""\ude00""#).is_err());
    }

    #[test]
    fn test_separators_are_required() {
        assert!(json().read_str(r#"{"a": 1 "b": 2}"#).is_err());
        assert!(json().read_str(r#"{"a": 1,, "b": 2}"#).is_err());
        assert!(json().read_str(r#"{, "a": 1}"#).is_err());
        assert!(json().read_str(r#"{"a": 1,}"#).is_err());
        assert!(json().read_str(r#"{"a": , 1}"#).is_err());
        assert!(json().read_str("[1 2]").is_err());
        assert!(json().read_str("[1, 2,]").is_err());
        assert!(json().read_str("[, 1]").is_err());

        let v = json().read_str("{\"a\":[1,{\"b\":[]},[]] , \"c\" : true}").unwrap();
        assert_eq!(v, value!({"a": [1, {"b": []}, []], "c": true}));
    }

    #[test]
    fn test_leading_zeros_rejected() {
        assert!(json().read_str("01").is_err());
        assert!(json().read_str("[-01]").is_err());
        assert_eq!(json().read_str("[0, -0, 0.5]").unwrap(), value!([0, 0, 0.5]));
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(json().read_str("{\"a\": [1, 2").is_err());
        assert!(json().read_str("[1, 2] x").is_err());
        assert!(json().read_str("{\"a\" 1}").is_err());
        assert!(json().read_str("").is_err());
        assert!(json().read_str("@").is_err());
    }
}
