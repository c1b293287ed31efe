//! TOML documents.
//!
//! The writer renders a root struct as `key = value` lines. Every struct
//! below the root, and every struct inside an array, becomes an inline table
//! `{ k = v, ... }`. A root that is not a struct is written as a bare value.
//! Matrices are the inline table `{ dims = [...], data = [...] }`.
//!
//! The reader accepts a broader grammar than the writer emits:
//! `[table]` and `[[array.of.tables]]` headers, dotted and quoted keys,
//! multi-line arrays with comments, `_` digit separators, hex/octal/binary
//! integers and multi-line strings. Because a header may reopen a table
//! defined much earlier, the whole document is parsed before the engine
//! reads it.
//!
//! ```rust
//! use polyform::{read_str, Format};
//!
//! let doc = "[[people]]\nname = \"Alice\"\n\n[[people]]\nname = \"Bob\"\n";
//! let v = read_str(Format::Toml, doc).unwrap();
//! assert_eq!(v.struct_get("people").and_then(|p| p.list_size()), Some(2));
//! ```

use super::tape::Tape;
use crate::backend::Backend;
use crate::lexer::{format_float, write_quoted, TextCursor};
use crate::{Error, Format, Matrix, Options, Result, StructMap, Value, ValueType};
use std::collections::HashSet;
use tracing::trace;

#[derive(Clone, Copy, Debug)]
enum Frame {
    /// The root table, written as `key = value` lines.
    Table { first: bool },
    Inline { first: bool },
    Array { first: bool },
}

pub struct TomlBackend {
    out: String,
    stack: Vec<Frame>,
    tape: Tape,
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn write_key(out: &mut String, key: &str) {
    if is_bare_key(key) {
        out.push_str(key);
    } else {
        write_quoted(out, key);
    }
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

impl TomlBackend {
    pub fn new(_options: &Options) -> Self {
        TomlBackend {
            out: String::new(),
            stack: Vec::new(),
            tape: Tape::default(),
        }
    }

    fn begin_value(&mut self) {
        if let Some(Frame::Array { first }) = self.stack.last_mut() {
            if !std::mem::replace(first, false) {
                self.out.push_str(", ");
            }
        }
    }
}

impl Backend for TomlBackend {
    fn format(&self) -> Format {
        Format::Toml
    }

    fn init_write(&mut self) -> Result<()> {
        self.out.clear();
        self.stack.clear();
        Ok(())
    }

    fn finish_write(&mut self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(Error::custom("TOML writer finished inside a container"));
        }
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        Ok(std::mem::take(&mut self.out).into_bytes())
    }

    fn init_read(&mut self, input: &[u8]) -> Result<()> {
        let cursor = TextCursor::from_bytes(input)?;
        let root = TomlParser { cur: cursor }.parse()?;
        self.tape = Tape::new(root);
        Ok(())
    }

    fn finish_read(&mut self) -> Result<()> {
        if self.tape.is_done() {
            Ok(())
        } else {
            Err(Error::custom("TOML document was not fully consumed"))
        }
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
        self.stack.push(Frame::Array { first: true });
        Ok(())
    }

    fn write_list_end(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Array { .. }) => {
                self.out.push(']');
                Ok(())
            }
            _ => Err(Error::custom("unbalanced array in TOML writer")),
        }
    }

    fn write_struct_begin(&mut self) -> Result<()> {
        if self.stack.is_empty() {
            self.stack.push(Frame::Table { first: true });
        } else {
            self.begin_value();
            self.out.push('{');
            self.stack.push(Frame::Inline { first: true });
        }
        Ok(())
    }

    fn write_struct_key(&mut self, key: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Table { first }) => {
                if !std::mem::replace(first, false) {
                    self.out.push('\n');
                }
            }
            Some(Frame::Inline { first }) => {
                let sep = if std::mem::replace(first, false) { " " } else { ", " };
                self.out.push_str(sep);
            }
            _ => return Err(Error::custom("TOML key outside a table")),
        }
        write_key(&mut self.out, key);
        self.out.push_str(" = ");
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Table { first }) => {
                if !first {
                    self.out.push('\n');
                }
                Ok(())
            }
            Some(Frame::Inline { first }) => {
                self.out.push_str(if first { "}" } else { " }" });
                Ok(())
            }
            _ => Err(Error::custom("unbalanced table in TOML writer")),
        }
    }

    fn write_matrix(&mut self, dims: &[usize], data: &[f64]) -> Result<()> {
        self.begin_value();
        self.out.push_str("{ dims = [");
        for (i, dim) in dims.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&dim.to_string());
        }
        self.out.push_str("], data = [");
        for (i, &cell) in data.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            push_float(&mut self.out, cell);
        }
        self.out.push_str("] }");
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<ValueType>> {
        Ok(self.tape.peek())
    }

    fn read_int(&mut self) -> Result<i64> {
        self.tape.int()
    }

    fn read_uint(&mut self) -> Result<u64> {
        self.tape.uint()
    }

    fn read_float(&mut self) -> Result<f64> {
        self.tape.float()
    }

    fn read_string(&mut self) -> Result<String> {
        self.tape.string()
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.tape.bool()
    }

    fn read_list_begin(&mut self) -> Result<usize> {
        self.tape.list_begin()
    }

    fn read_list_end(&mut self) -> Result<()> {
        self.tape.list_end()
    }

    fn read_struct_begin(&mut self) -> Result<()> {
        self.tape.struct_begin()
    }

    fn read_struct_key(&mut self) -> Result<Option<String>> {
        Ok(self.tape.key())
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.tape.struct_end()
    }

    fn read_matrix(&mut self) -> Result<(Vec<usize>, Vec<f64>)> {
        self.tape.matrix()
    }
}

struct TomlParser {
    cur: TextCursor,
}

/// One step of a resolved table path. Elements of an array of tables get
/// their own index so that each element is tracked separately.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Step {
    Key(String),
    Index(usize),
}

/// Tables opened by a header or a dotted key, and every path assigned with
/// `key = value`. Neither kind may be opened again by a header, and values
/// may never be extended.
#[derive(Default)]
struct Definitions {
    tables: HashSet<Vec<Step>>,
    values: HashSet<Vec<Step>>,
}

/// Walks `path` from `table`, creating missing tables and stepping into the
/// last element of arrays of tables. Returns the table and its resolved path.
fn descend<'a>(
    mut table: &'a mut StructMap,
    path: &[String],
    defs: &Definitions,
    at: (usize, usize),
) -> Result<(&'a mut StructMap, Vec<Step>)> {
    let mut resolved = Vec::with_capacity(path.len());
    for segment in path {
        resolved.push(Step::Key(segment.clone()));
        if defs.values.contains(&resolved) {
            return Err(Error::syntax(
                at.0,
                at.1,
                &format!("'{}' is an inline value and cannot be extended", segment),
            ));
        }
        if !table.has(segment) {
            table.set(segment.clone(), Value::Struct(StructMap::new()));
        }
        table = match table.get_mut(segment) {
            Some(Value::Struct(map)) => map,
            Some(Value::List(items)) => {
                resolved.push(Step::Index(items.len().saturating_sub(1)));
                match items.last_mut() {
                    Some(Value::Struct(map)) => map,
                    _ => return Err(Error::syntax(at.0, at.1, &format!("'{}' is not a table", segment))),
                }
            }
            _ => return Err(Error::syntax(at.0, at.1, &format!("'{}' is not a table", segment))),
        };
    }
    Ok((table, resolved))
}

/// Recognises `{ dims = [...], data = [...] }` with a consistent shape.
fn as_matrix(map: &StructMap) -> Option<Matrix> {
    if map.len() != 2 {
        return None;
    }
    let dims = map.get("dims")?.as_list()?;
    let data = map.get("data")?.as_list()?;
    let dims = dims
        .iter()
        .map(|d| match d {
            Value::Int(i) if *i > 0 => Some(*i as usize),
            Value::UInt(u) => Some(*u as usize),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    let data = data
        .iter()
        .map(|v| match v {
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => Some(v.get_float()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Matrix::from_data(&dims, data).ok()
}

fn is_word_end(b: Option<u8>) -> bool {
    !matches!(b, Some(c) if c.is_ascii_alphanumeric() || c == b'_' || c == b'-' || c == b'.')
}

impl TomlParser {
    fn parse(mut self) -> Result<Value> {
        self.skip_trivia();
        if self.cur.is_eof() {
            return Ok(Value::Struct(StructMap::new()));
        }
        let start = self.cur.pos();
        if let Ok(value) = self.parse_value() {
            self.skip_trivia();
            if self.cur.is_eof() {
                trace!("toml document is a bare value");
                return Ok(value);
            }
        }
        self.cur.reset(start);
        self.parse_document().map(Value::Struct)
    }

    /// Whitespace, newlines and comments.
    fn skip_trivia(&mut self) {
        self.cur.skip_whitespace_and_comments(b'#');
    }

    fn end_of_line(&mut self) -> Result<()> {
        self.cur.skip_inline_whitespace();
        if self.cur.peek() == Some(b'#') {
            self.cur.skip_to_eol();
        }
        match self.cur.peek() {
            None => Ok(()),
            Some(b'\n') => {
                self.cur.advance(1);
                Ok(())
            }
            Some(b'\r') if self.cur.peek_at(1) == Some(b'\n') => {
                self.cur.advance(2);
                Ok(())
            }
            Some(_) => Err(self.cur.error("expected end of line")),
        }
    }

    fn parse_document(&mut self) -> Result<StructMap> {
        let mut root = StructMap::new();
        let mut defs = Definitions::default();
        let mut current: Vec<String> = Vec::new();
        loop {
            self.skip_trivia();
            if self.cur.is_eof() {
                return Ok(root);
            }
            let at = self.cur.line_col();
            if self.cur.eat_str("[[") {
                let path = self.parse_key_path()?;
                self.cur.skip_inline_whitespace();
                self.cur.expect_str("]]")?;
                self.end_of_line()?;
                let Some((last, parents)) = path.split_last() else {
                    return Err(Error::syntax(at.0, at.1, "empty table header"));
                };
                let (parent, mut resolved) = descend(&mut root, parents, &defs, at)?;
                resolved.push(Step::Key(last.clone()));
                if defs.values.contains(&resolved) {
                    return Err(Error::syntax(
                        at.0,
                        at.1,
                        &format!("'{}' is an inline array and cannot be extended", last),
                    ));
                }
                match parent.get_mut(last) {
                    None => {
                        parent.set(last.clone(), Value::List(vec![Value::Struct(StructMap::new())]));
                    }
                    Some(Value::List(items)) => items.push(Value::Struct(StructMap::new())),
                    Some(_) => {
                        return Err(Error::syntax(at.0, at.1, &format!("'{}' is not an array of tables", last)))
                    }
                }
                current = path;
            } else if self.cur.eat(b'[') {
                let path = self.parse_key_path()?;
                self.cur.skip_inline_whitespace();
                self.cur.expect(b']')?;
                self.end_of_line()?;
                let (_, resolved) = descend(&mut root, &path, &defs, at)?;
                let name = path.join(".");
                if matches!(resolved.last(), Some(Step::Index(_))) {
                    return Err(Error::syntax(
                        at.0,
                        at.1,
                        &format!("'{}' is an array of tables, not a table", name),
                    ));
                }
                if !defs.tables.insert(resolved) {
                    return Err(Error::syntax(at.0, at.1, &format!("table '{}' is defined twice", name)));
                }
                current = path;
            } else {
                let key = self.parse_key_path()?;
                self.cur.skip_inline_whitespace();
                self.cur.expect(b'=')?;
                self.cur.skip_inline_whitespace();
                let value = self.parse_value()?;
                self.end_of_line()?;
                let Some((last, parents)) = key.split_last() else {
                    return Err(Error::syntax(at.0, at.1, "empty key"));
                };
                let (_, base) = descend(&mut root, &current, &defs, at)?;
                let mut full = current.clone();
                full.extend_from_slice(parents);
                let (table, mut resolved) = descend(&mut root, &full, &defs, at)?;
                table.add(last.clone(), value)?;
                // Tables created by the dotted part of the key count as defined.
                for end in base.len() + 1..=resolved.len() {
                    defs.tables.insert(resolved[..end].to_vec());
                }
                resolved.push(Step::Key(last.clone()));
                defs.values.insert(resolved);
            }
        }
    }

    /// `a.b."c d".'e'`
    fn parse_key_path(&mut self) -> Result<Vec<String>> {
        let mut path = Vec::new();
        loop {
            self.cur.skip_inline_whitespace();
            let segment = match self.cur.peek() {
                Some(b'"') => self.cur.parse_quoted_string()?,
                Some(b'\'') => self.parse_literal_string()?,
                _ => {
                    let bare = self
                        .cur
                        .take_while(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
                    if bare.is_empty() {
                        return Err(self.cur.error("expected a key"));
                    }
                    bare.to_string()
                }
            };
            path.push(segment);
            self.cur.skip_inline_whitespace();
            if !self.cur.eat(b'.') {
                return Ok(path);
            }
        }
    }

    fn parse_literal_string(&mut self) -> Result<String> {
        let start = self.cur.pos();
        self.cur.expect(b'\'')?;
        let text = self.cur.take_while(|b| b != b'\'' && b != b'\n').to_string();
        if !self.cur.eat(b'\'') {
            return Err(self.cur.error_at(start, "unterminated literal string"));
        }
        Ok(text)
    }

    fn parse_multiline(&mut self, delim: &str, escapes: bool) -> Result<String> {
        let start = self.cur.pos();
        self.cur.expect_str(delim)?;
        // A newline right after the opening delimiter is trimmed.
        if !self.cur.eat(b'\n') {
            self.cur.eat_str("\r\n");
        }
        let Some(len) = self.cur.rest().find(delim) else {
            return Err(self.cur.error_at(start, "unterminated multi-line string"));
        };
        let raw = self.cur.rest()[..len].to_string();
        self.cur.advance(len + delim.len());
        if !escapes {
            return Ok(raw);
        }
        let (line, col) = self.cur.line_col_at(start);
        unescape_multiline(&raw).ok_or_else(|| Error::syntax(line, col, "invalid escape in multi-line string"))
    }

    fn parse_value(&mut self) -> Result<Value> {
        if self.cur.starts_with("\"\"\"") {
            return self.parse_multiline("\"\"\"", true).map(Value::String);
        }
        if self.cur.starts_with("'''") {
            return self.parse_multiline("'''", false).map(Value::String);
        }
        match self.cur.peek() {
            Some(b'"') => self.cur.parse_quoted_string().map(Value::String),
            Some(b'\'') => self.parse_literal_string().map(Value::String),
            Some(b'[') => self.parse_array(),
            Some(b'{') => self.parse_inline_table(),
            _ => self.parse_scalar(),
        }
    }

    fn parse_scalar(&mut self) -> Result<Value> {
        for (word, value) in [
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
            ("nan", Value::Float(f64::NAN)),
            ("+nan", Value::Float(f64::NAN)),
            ("-nan", Value::Float(f64::NAN)),
            ("inf", Value::Float(f64::INFINITY)),
            ("+inf", Value::Float(f64::INFINITY)),
            ("-inf", Value::Float(f64::NEG_INFINITY)),
        ] {
            if self.cur.starts_with(word) && is_word_end(self.cur.peek_at(word.len())) {
                self.cur.advance(word.len());
                return Ok(value);
            }
        }
        for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
            if self.cur.starts_with(prefix) {
                let start = self.cur.pos();
                self.cur.advance(2);
                let digits = self
                    .cur
                    .take_while(|b| b.is_ascii_hexdigit() || b == b'_')
                    .replace('_', "");
                return match u64::from_str_radix(&digits, radix) {
                    Ok(u) => Ok(i64::try_from(u).map_or(Value::UInt(u), Value::Int)),
                    Err(_) => Err(self.cur.error_at(start, "malformed integer")),
                };
            }
        }
        let start = self.cur.pos();
        let token = self.cur.parse_number(true)?;
        if !is_word_end(self.cur.peek()) {
            return Err(self.cur.error_at(start, "malformed value"));
        }
        Ok(token.into_value())
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.cur.expect(b'[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.cur.eat(b']') {
                return Ok(Value::List(items));
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            if self.cur.eat(b',') {
                continue;
            }
            self.cur.expect(b']')?;
            return Ok(Value::List(items));
        }
    }

    fn parse_inline_table(&mut self) -> Result<Value> {
        let at = self.cur.line_col();
        self.cur.expect(b'{')?;
        let mut map = StructMap::new();
        self.cur.skip_inline_whitespace();
        if !self.cur.eat(b'}') {
            loop {
                let key = self.parse_key_path()?;
                self.cur.skip_inline_whitespace();
                self.cur.expect(b'=')?;
                self.cur.skip_inline_whitespace();
                let value = self.parse_value()?;
                if let Some((last, parents)) = key.split_last() {
                    descend(&mut map, parents, &Definitions::default(), at)?.0.add(last.clone(), value)?;
                }
                self.cur.skip_inline_whitespace();
                if self.cur.eat(b',') {
                    self.cur.skip_inline_whitespace();
                    continue;
                }
                self.cur.expect(b'}')?;
                break;
            }
        }
        match as_matrix(&map) {
            Some(matrix) => {
                trace!(dims = ?matrix.dims(), "toml inline table read as matrix");
                Ok(Value::Matrix(matrix))
            }
            None => Ok(Value::Struct(map)),
        }
    }
}

/// Processes escapes in the body of a `"""` string, including line-ending
/// backslashes that swallow the following whitespace.
fn unescape_multiline(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            e @ ('u' | 'U') => {
                let width = if e == 'u' { 4 } else { 8 };
                let hex: String = chars.by_ref().take(width).collect();
                if hex.len() != width {
                    return None;
                }
                out.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            w if w.is_whitespace() => {
                while chars.peek().is_some_and(|n| n.is_whitespace()) {
                    chars.next();
                }
            }
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Serializer;
    use crate::value;

    fn toml() -> Serializer<TomlBackend> {
        Serializer::new(TomlBackend::new(&Options::default()), Options::default())
    }

    #[test]
    fn test_root_table_and_inline_nesting() {
        let v = value!({
            "title": "demo",
            "owner": {"name": "Tom", "tags": ["a", "b"]},
            "empty": {},
            "weird key": 1
        });
        let text = toml().write_string(&v).unwrap();
        assert_eq!(
            text,
            "title = \"demo\"\nowner = { name = \"Tom\", tags = [\"a\", \"b\"] }\nempty = {}\n\"weird key\" = 1\n"
        );
        assert_eq!(toml().read_str(&text).unwrap(), v);
    }

    #[test]
    fn test_empty_document_is_empty_struct() {
        let text = toml().write_string(&value!({})).unwrap();
        assert_eq!(text, "");
        assert_eq!(toml().read_str(&text).unwrap().struct_size(), Some(0));
        assert_eq!(toml().read_str("# only a comment\n").unwrap(), value!({}));
    }

    #[test]
    fn test_array_of_tables() {
        let doc = "\
# people
[[list_mixed]]
name = \"Alice\"
age = 30

[[list_mixed]]
name = \"Bob\"
age = 25
";
        let v = toml().read_str(doc).unwrap();
        let list = v.struct_get("list_mixed").unwrap();
        assert_eq!(list.list_size(), Some(2));
        assert_eq!(list.list_get(1).and_then(|p| p.struct_get("name")), Some(&Value::from("Bob")));

        let text = toml().write_string(&v).unwrap();
        assert_eq!(toml().read_str(&text).unwrap(), v);
    }

    #[test]
    fn test_table_redefinition_rejected() {
        let twice = "[a]\nx = 1\n[a]\ny = 2\n";
        assert!(matches!(toml().read_str(twice), Err(Error::Syntax { line: 3, .. })));

        let inline = "x = { a = 1 }\n[x]\nb = 2\n";
        assert!(matches!(toml().read_str(inline), Err(Error::Syntax { .. })));
        let inline_subtable = "x = { a = 1 }\n[x.y]\n";
        assert!(toml().read_str(inline_subtable).is_err());
        let dotted_into_inline = "x = { a = 1 }\nx.b = 2\n";
        assert!(toml().read_str(dotted_into_inline).is_err());

        let static_array = "list = [{ a = 1 }]\n[[list]]\na = 2\n";
        assert!(toml().read_str(static_array).is_err());
        let header_over_array = "[[list]]\na = 1\n[list]\n";
        assert!(toml().read_str(header_over_array).is_err());
        let header_over_dotted = "a.b.c = 1\n[a.b]\n";
        assert!(toml().read_str(header_over_dotted).is_err());
    }

    #[test]
    fn test_implicit_tables_may_be_defined_later() {
        let doc = "[a.b]\nx = 1\n[a]\ny = 2\n";
        let v = toml().read_str(doc).unwrap();
        assert_eq!(v, value!({"a": {"b": {"x": 1}, "y": 2}}));

        // Each element of an array of tables is its own table.
        let doc = "[[p]]\n[p.meta]\nn = 1\n[[p]]\n[p.meta]\nn = 2\n";
        let v = toml().read_str(doc).unwrap();
        let p = v.struct_get("p").unwrap();
        assert_eq!(p.list_get(1).and_then(|e| e.struct_get("meta")), Some(&value!({"n": 2})));

        let doc = "a.b = 1\na.c = 2\n";
        assert_eq!(toml().read_str(doc).unwrap(), value!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn test_tables_and_dotted_keys() {
        let doc = "\
a.b = 1
[server]
host = 'localhost'
port = 8_080
[server.tls]
enabled = true
[other]
list = [
  1,   # first
  2,
]
";
        let v = toml().read_str(doc).unwrap();
        assert_eq!(v.struct_get("a").and_then(|a| a.struct_get("b")), Some(&Value::Int(1)));
        let server = v.struct_get("server").unwrap();
        assert_eq!(server.struct_get("port"), Some(&Value::Int(8080)));
        assert_eq!(
            server.struct_get("tls").and_then(|t| t.struct_get("enabled")),
            Some(&Value::Bool(true))
        );
        assert_eq!(
            v.struct_get("other").and_then(|o| o.struct_get("list")).and_then(Value::list_size),
            Some(2)
        );
    }

    #[test]
    fn test_matrix_inline_table() {
        let m = Matrix::from_data(&[1, 2], vec![0.5, -1.0]).unwrap();
        let mv = Value::Matrix(m);
        let v = value!({ "m": mv });
        let text = toml().write_string(&v).unwrap();
        assert_eq!(text, "m = { dims = [1, 2], data = [0.5, -1.0] }\n");
        assert_eq!(toml().read_str(&text).unwrap(), v);

        // Inconsistent shapes stay ordinary tables.
        let v = toml().read_str("m = { dims = [3], data = [1.0] }").unwrap();
        assert!(v.struct_get("m").unwrap().is_struct());
    }

    #[test]
    fn test_bare_root_values() {
        let v = value!([1, "two", {"three": 3}]);
        let text = toml().write_string(&v).unwrap();
        assert_eq!(text, "[1, \"two\", { three = 3 }]\n");
        assert_eq!(toml().read_str(&text).unwrap(), v);
        assert_eq!(toml().read_str("-inf").unwrap(), Value::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn test_strings() {
        let v = toml().read_str("a = \"\"\"\nline\\n two \\\n   three\"\"\"\nb = '''raw\\n'''").unwrap();
        assert_eq!(v.struct_get("a"), Some(&Value::from("line\n two three")));
        assert_eq!(v.struct_get("b"), Some(&Value::from("raw\\n")));
    }

    #[test]
    fn test_errors() {
        assert!(toml().read_str("a = 1\na = 2").is_err());
        assert!(toml().read_str("a = ").is_err());
        assert!(toml().read_str("a = 1 b = 2").is_err());
        assert!(toml().read_str("[a]\nx = 1\n[[a]]").is_err());
        assert!(toml().read_str("a = trueish").is_err());
        assert_eq!(toml().read_str("h = 0xff").unwrap(), value!({"h": 255}));
    }
}
