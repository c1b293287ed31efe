//! Indentation-based YAML.
//!
//! Structs are block mappings. Lists of up to `options.yaml_flow_threshold`
//! elements are written in flow style (`[1, 2, 3]`) unless they sit directly
//! in a block list, longer ones as block sequences. Anything nested inside a
//! flow collection stays in flow style. Empty containers print as `[]` and
//! `{}`.
//!
//! ```yaml
//! name: demo
//! sizes: [1, 2, 3]
//! grid: !matrix
//!   dims: [2, 2]
//!   data: [1.0, 0.0, 0.0, 1.0]
//! users:
//!   - name: Alice
//!     age: 30
//! ```
//!
//! Strings are written plain unless they could be mistaken for another
//! scalar or contain YAML indicators, in which case they are double-quoted.
//! The reader accepts a leading `---`, comments, single-quoted strings and
//! sequences written at the same column as their key. Empty values, `~` and
//! `null` read as integer zero.

use crate::backend::Backend;
use crate::lexer::{format_float, write_quoted, NumberToken, TextCursor};
use crate::{Error, Format, Options, Result, Value, ValueType};
use tracing::trace;

const MATRIX_TAG: &str = "!matrix";

#[derive(Clone, Copy, Debug)]
enum WriteFrame {
    BlockStruct { col: usize, first: bool, inline_first: bool },
    BlockList { col: usize, first: bool, inline_first: bool },
    FlowList { first: bool },
    FlowStruct { first: bool },
}

#[derive(Clone, Copy, Debug)]
enum ReadFrame {
    BlockStruct { col: usize },
    BlockList { col: usize, awaiting_marker: bool },
    FlowList,
    FlowStruct,
}

pub struct YamlBackend {
    indent: usize,
    flow_threshold: usize,
    out: String,
    stack: Vec<WriteFrame>,
    cur: TextCursor,
    frames: Vec<ReadFrame>,
    // The value after `key:` may still be on the key's line.
    same_line: bool,
    // An empty value was found and reads as zero without consuming input.
    implicit_null: bool,
}

/// Whether `s` has to be double-quoted to read back as the same string.
fn needs_quotes(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return true;
    };
    if " -?:,[]{}#&*!|>'\"%@`".contains(first) {
        return true;
    }
    let lower = s.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        "true" | "false" | "null" | "~" | "yes" | "no" | "on" | "off" | "y" | "n"
            | ".inf" | "+.inf" | "-.inf" | ".nan"
    ) {
        return true;
    }
    let bytes = s.as_bytes();
    if bytes[0].is_ascii_digit() || (matches!(bytes[0], b'+' | b'.') && bytes.get(1).is_some_and(u8::is_ascii_digit))
    {
        return true;
    }
    if s.contains(|c: char| ":#\n\r\t\\\"'[]{},&*!|>%@".contains(c) || c.is_control()) {
        return true;
    }
    s.ends_with(char::is_whitespace) || s.starts_with("...")
}

fn push_float(out: &mut String, value: f64) {
    if value.is_nan() {
        out.push_str(".nan");
    } else if value == f64::INFINITY {
        out.push_str(".inf");
    } else if value == f64::NEG_INFINITY {
        out.push_str("-.inf");
    } else {
        out.push_str(&format_float(value));
    }
}

/// Interprets an unquoted scalar.
fn plain_value(text: &str) -> Value {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return Value::Int(0),
        _ => {}
    }
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => return Value::Bool(true),
        "false" | "no" | "off" => return Value::Bool(false),
        ".inf" | "+.inf" => return Value::Float(f64::INFINITY),
        "-.inf" => return Value::Float(f64::NEG_INFINITY),
        ".nan" => return Value::Float(f64::NAN),
        _ => {}
    }
    let cursor = TextCursor::new(text);
    if cursor.number_len(false) == text.len() {
        if let Some(token) = NumberToken::parse(text) {
            return token.into_value();
        }
    }
    Value::String(text.to_string())
}

fn is_plain_end(b: u8, flow: bool) -> bool {
    b == b'\n' || (flow && matches!(b, b',' | b']' | b'}'))
}

impl YamlBackend {
    pub fn new(options: &Options) -> Self {
        YamlBackend {
            indent: options.indent,
            flow_threshold: options.yaml_flow_threshold,
            out: String::new(),
            stack: Vec::new(),
            cur: TextCursor::default(),
            frames: Vec::new(),
            same_line: false,
            implicit_null: false,
        }
    }

    fn in_flow(&self) -> bool {
        self.stack
            .iter()
            .any(|f| matches!(f, WriteFrame::FlowList { .. } | WriteFrame::FlowStruct { .. }))
    }

    /// Starts a new line at `col` unless the output is already at a line start.
    fn line(&mut self, col: usize) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.out.extend(std::iter::repeat(' ').take(col));
    }

    /// Writes the list marker or flow separator owed to the enclosing frame.
    fn begin_value(&mut self) {
        match self.stack.last_mut() {
            Some(WriteFrame::BlockList { col, first, inline_first }) => {
                let (col, inline) = (*col, *first && *inline_first);
                *first = false;
                if !inline {
                    self.line(col);
                }
                self.out.push_str("- ");
            }
            Some(WriteFrame::FlowList { first }) => {
                if !std::mem::replace(first, false) {
                    self.out.push_str(", ");
                }
            }
            _ => {}
        }
    }

    /// The space between `key:` and an inline value.
    fn inline_prefix(&mut self) {
        if let Some(WriteFrame::BlockStruct { .. } | WriteFrame::FlowStruct { .. }) = self.stack.last() {
            self.out.push(' ');
        }
    }

    /// Column and inline flag for a block container opened in the current slot.
    fn child_layout(&self) -> (usize, bool) {
        match self.stack.last() {
            Some(WriteFrame::BlockStruct { col, .. }) => (col + self.indent, false),
            Some(WriteFrame::BlockList { col, .. }) => (col + 2, true),
            _ => (0, false),
        }
    }

    fn write_scalar_text(&mut self, text: &str) {
        self.begin_value();
        self.inline_prefix();
        self.out.push_str(text);
    }

    fn push_key(&mut self, key: &str) {
        if needs_quotes(key) {
            write_quoted(&mut self.out, key);
        } else {
            self.out.push_str(key);
        }
    }

    fn push_number_list(&mut self, items: impl Iterator<Item = String>) {
        self.out.push('[');
        for (i, item) in items.enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&item);
        }
        self.out.push(']');
    }

    // Reader helpers.

    fn skip_trivia(&mut self) {
        self.cur.skip_whitespace_and_comments(b'#');
    }

    fn is_item_marker(&self) -> bool {
        self.cur.peek() == Some(b'-') && matches!(self.cur.peek_at(1), None | Some(b' ' | b'\t' | b'\r' | b'\n'))
    }

    fn at_line_end(&self) -> bool {
        matches!(self.cur.peek(), None | Some(b'\n' | b'\r' | b'#'))
    }

    fn in_flow_read(&self) -> bool {
        matches!(self.frames.last(), Some(ReadFrame::FlowList | ReadFrame::FlowStruct))
    }

    /// Marks the current list item as started so the next lookahead expects
    /// a fresh `-` marker.
    fn value_started(&mut self) {
        if let Some(ReadFrame::BlockList { awaiting_marker, .. }) = self.frames.last_mut() {
            *awaiting_marker = true;
        }
        self.same_line = false;
    }

    fn null_value(&mut self) -> Option<ValueType> {
        self.implicit_null = true;
        Some(ValueType::Int)
    }

    /// Whether the current line holds a `key: value` pair.
    fn line_is_mapping(&self) -> bool {
        let line = self.cur.rest().split('\n').next().unwrap_or("");
        let bytes = line.as_bytes();
        let mut i = 0;
        match bytes.first() {
            Some(&q @ (b'"' | b'\'')) => {
                i = 1;
                while i < bytes.len() {
                    if q == b'"' && bytes[i] == b'\\' {
                        i += 2;
                        continue;
                    }
                    if bytes[i] == q {
                        if q == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
                i += 1;
                while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
                    i += 1;
                }
                return i < bytes.len()
                    && bytes[i] == b':'
                    && matches!(bytes.get(i + 1), None | Some(b' ' | b'\t' | b'\r'));
            }
            Some(b'[' | b'{' | b'!') => return false,
            _ => {}
        }
        while i < bytes.len() {
            match bytes[i] {
                b':' if matches!(bytes.get(i + 1), None | Some(b' ' | b'\t' | b'\r')) => return true,
                b'#' if i > 0 && matches!(bytes[i - 1], b' ' | b'\t') => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    /// Reads an unquoted scalar up to the end of the line or, in flow
    /// context, the next flow indicator. Trailing comments are dropped.
    fn plain_text(&mut self, flow: bool) -> String {
        let rest = self.cur.rest().as_bytes();
        let mut end = 0;
        while end < rest.len() && !is_plain_end(rest[end], flow) {
            if rest[end] == b'#' && end > 0 && matches!(rest[end - 1], b' ' | b'\t') {
                break;
            }
            end += 1;
        }
        let text = self.cur.rest()[..end].trim_end().to_string();
        self.cur.advance(text.len());
        text
    }

    fn scalar_type(&mut self, flow: bool) -> ValueType {
        match self.cur.peek() {
            Some(b'"' | b'\'') => ValueType::String,
            _ => {
                let start = self.cur.pos();
                let text = self.plain_text(flow);
                self.cur.reset(start);
                plain_value(&text).value_type()
            }
        }
    }

    fn classify_inline(&mut self, flow: bool) -> Option<ValueType> {
        if self.cur.starts_with(MATRIX_TAG) {
            Some(ValueType::Matrix)
        } else {
            match self.cur.peek() {
                Some(b'[') => Some(ValueType::List),
                Some(b'{') => Some(ValueType::Struct),
                _ => Some(self.scalar_type(flow)),
            }
        }
    }

    /// Classifies a value that may open a block collection.
    fn classify_block(&mut self) -> Option<ValueType> {
        if self.is_item_marker() {
            Some(ValueType::List)
        } else if !self.cur.starts_with(MATRIX_TAG) && self.line_is_mapping() {
            Some(ValueType::Struct)
        } else {
            self.classify_inline(false)
        }
    }

    /// Looks for a value on the lines below a `key:` or `-` at `parent_col`.
    fn classify_below(&mut self, parent_col: usize, same_col_list: bool) -> Option<ValueType> {
        self.skip_trivia();
        if self.cur.is_eof() {
            return self.null_value();
        }
        let col = self.cur.column();
        if col > parent_col {
            self.classify_block()
        } else if same_col_list && col == parent_col && self.is_item_marker() {
            Some(ValueType::List)
        } else {
            self.null_value()
        }
    }

    fn read_scalar(&mut self) -> Result<Value> {
        if std::mem::take(&mut self.implicit_null) {
            self.value_started();
            return Ok(Value::Int(0));
        }
        let flow = self.in_flow_read();
        self.value_started();
        match self.cur.peek() {
            Some(b'"') => self.cur.parse_quoted_string().map(Value::String),
            Some(b'\'') => self.cur.parse_single_quoted_string().map(Value::String),
            None => Err(self.cur.error("a scalar")),
            Some(_) => Ok(plain_value(&self.plain_text(flow))),
        }
    }

    fn parse_key(&mut self, flow: bool) -> Result<String> {
        let key = match self.cur.peek() {
            Some(b'"') => self.cur.parse_quoted_string()?,
            Some(b'\'') => self.cur.parse_single_quoted_string()?,
            _ => {
                let bytes = self.cur.rest().as_bytes();
                let mut end = 0;
                while end < bytes.len() {
                    let b = bytes[end];
                    if b == b':' && matches!(bytes.get(end + 1), None | Some(b' ' | b'\t' | b'\r' | b'\n')) {
                        break;
                    }
                    if b == b'\n' || (flow && matches!(b, b',' | b'}')) {
                        break;
                    }
                    end += 1;
                }
                let key = self.cur.rest()[..end].trim_end().to_string();
                if key.is_empty() {
                    return Err(self.cur.error("a mapping key"));
                }
                self.cur.advance(key.len());
                key
            }
        };
        self.cur.skip_inline_whitespace();
        self.cur.expect(b':')?;
        self.cur.skip_inline_whitespace();
        Ok(key)
    }

    /// Counts block sequence items at `col`, starting with the one at the
    /// cursor.
    fn count_block_items(&self, col: usize) -> usize {
        let mut lines = self.cur.rest().split('\n');
        lines.next();
        let mut count = 1;
        for line in lines {
            let content = line.trim_start_matches(' ');
            let indent = line.len() - content.len();
            let content = content.trim_end_matches('\r');
            if content.is_empty() || content.starts_with('#') {
                continue;
            }
            if indent < col || content.starts_with("---") || content.starts_with("...") {
                break;
            }
            if indent == col {
                let bytes = content.as_bytes();
                if bytes[0] == b'-' && matches!(bytes.get(1), None | Some(b' ' | b'\t')) {
                    count += 1;
                } else {
                    break;
                }
            }
        }
        count
    }

    /// Counts the elements of a flow sequence after its consumed `[`.
    fn count_flow_items(&self) -> Result<usize> {
        let bytes = self.cur.rest().as_bytes();
        let mut depth = 0usize;
        let mut count = 0;
        let mut seen = false;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                q @ (b'"' | b'\'') => {
                    seen = true;
                    i += 1;
                    while i < bytes.len() {
                        if q == b'"' && bytes[i] == b'\\' {
                            i += 1;
                        } else if bytes[i] == q {
                            if q == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                                i += 1;
                            } else {
                                break;
                            }
                        }
                        i += 1;
                    }
                }
                b'#' if i == 0 || matches!(bytes[i - 1], b' ' | b'\t' | b'\n') => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                    continue;
                }
                b'[' | b'{' => {
                    seen = true;
                    depth += 1;
                }
                b']' if depth == 0 => return Ok(count + usize::from(seen)),
                b']' | b'}' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => {
                    count += 1;
                    seen = false;
                }
                b' ' | b'\t' | b'\r' | b'\n' => {}
                _ => seen = true,
            }
            i += 1;
        }
        Err(self.cur.error_at(self.cur.pos() + bytes.len(), "closing ']'"))
    }

    fn read_flow_numbers(&mut self) -> Result<Vec<Value>> {
        self.cur.expect(b'[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.cur.eat(b']') {
                return Ok(items);
            }
            if !items.is_empty() {
                self.cur.expect(b',')?;
                self.skip_trivia();
            }
            let at = self.cur.pos();
            match plain_value(&self.plain_text(true)) {
                v @ (Value::Int(_) | Value::UInt(_) | Value::Float(_)) => items.push(v),
                _ => return Err(self.cur.error_at(at, "expected a number")),
            }
        }
    }

    fn read_matrix_entry(
        &mut self,
        flow: bool,
        dims: &mut Option<Vec<usize>>,
        data: &mut Option<Vec<f64>>,
    ) -> Result<()> {
        let at = self.cur.pos();
        let key = self.parse_key(flow)?;
        let numbers = self.read_flow_numbers()?;
        match key.as_str() {
            "dims" => {
                let parsed = numbers
                    .iter()
                    .map(|n| match n {
                        Value::Int(d) if *d >= 0 => Ok(*d as usize),
                        Value::UInt(d) => usize::try_from(*d).map_err(|_| Error::invalid_matrix("dimension too large")),
                        _ => Err(self.cur.error_at(at, "matrix dimensions must be non-negative integers")),
                    })
                    .collect::<Result<Vec<_>>>()?;
                *dims = Some(parsed);
            }
            "data" => *data = Some(numbers.iter().map(|n| n.get_float()).collect()),
            other => return Err(self.cur.error_at(at, &format!("unexpected matrix key '{}'", other))),
        }
        Ok(())
    }
}

impl Backend for YamlBackend {
    fn format(&self) -> Format {
        Format::Yaml
    }

    fn init_write(&mut self) -> Result<()> {
        self.out.clear();
        self.stack.clear();
        Ok(())
    }

    fn finish_write(&mut self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(Error::custom("yaml writer finished inside a container"));
        }
        if !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        Ok(std::mem::take(&mut self.out).into_bytes())
    }

    fn init_read(&mut self, input: &[u8]) -> Result<()> {
        self.cur = TextCursor::from_bytes(input)?;
        self.frames.clear();
        self.same_line = false;
        self.implicit_null = false;
        self.skip_trivia();
        if self.cur.starts_with("---") && matches!(self.cur.peek_at(3), None | Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.cur.advance(3);
        }
        Ok(())
    }

    fn finish_read(&mut self) -> Result<()> {
        self.skip_trivia();
        if self.cur.starts_with("...") {
            self.cur.advance(3);
            self.skip_trivia();
        }
        if !self.cur.is_eof() {
            return Err(self.cur.error("end of document"));
        }
        Ok(())
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        self.write_scalar_text(&value.to_string());
        Ok(())
    }

    fn write_uint(&mut self, value: u64) -> Result<()> {
        self.write_scalar_text(&value.to_string());
        Ok(())
    }

    fn write_float(&mut self, value: f64) -> Result<()> {
        let mut text = String::new();
        push_float(&mut text, value);
        self.write_scalar_text(&text);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        let mut text = String::new();
        if needs_quotes(value) {
            write_quoted(&mut text, value);
        } else {
            text.push_str(value);
        }
        self.write_scalar_text(&text);
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_scalar_text(if value { "true" } else { "false" });
        Ok(())
    }

    fn write_list_begin(&mut self, len: usize) -> Result<()> {
        let parent_is_list = matches!(self.stack.last(), Some(WriteFrame::BlockList { .. }));
        let flow = self.in_flow() || len == 0 || (len <= self.flow_threshold && !parent_is_list);
        let (col, inline_first) = self.child_layout();
        self.begin_value();
        if flow {
            self.inline_prefix();
            self.out.push('[');
            self.stack.push(WriteFrame::FlowList { first: true });
        } else {
            self.stack.push(WriteFrame::BlockList {
                col,
                first: true,
                inline_first,
            });
        }
        Ok(())
    }

    fn write_list_end(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(WriteFrame::FlowList { .. }) => {
                self.out.push(']');
                Ok(())
            }
            Some(WriteFrame::BlockList { .. }) => Ok(()),
            _ => Err(Error::custom("unbalanced list in yaml writer")),
        }
    }

    fn write_struct_begin(&mut self) -> Result<()> {
        let flow = self.in_flow();
        let (col, inline_first) = self.child_layout();
        self.begin_value();
        if flow {
            self.inline_prefix();
            self.out.push('{');
            self.stack.push(WriteFrame::FlowStruct { first: true });
        } else {
            // Nothing is written until the first key, so an empty struct can
            // still become `{}`.
            self.stack.push(WriteFrame::BlockStruct {
                col,
                first: true,
                inline_first,
            });
        }
        Ok(())
    }

    fn write_struct_key(&mut self, key: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(WriteFrame::BlockStruct { col, first, inline_first }) => {
                let (col, inline) = (*col, *first && *inline_first);
                *first = false;
                if !inline {
                    self.line(col);
                }
            }
            Some(WriteFrame::FlowStruct { first }) => {
                if !std::mem::replace(first, false) {
                    self.out.push_str(", ");
                }
            }
            _ => return Err(Error::custom("yaml key outside a struct")),
        }
        self.push_key(key);
        self.out.push(':');
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(WriteFrame::FlowStruct { .. }) => {
                self.out.push('}');
                Ok(())
            }
            Some(WriteFrame::BlockStruct { first: true, .. }) => {
                self.inline_prefix();
                self.out.push_str("{}");
                Ok(())
            }
            Some(WriteFrame::BlockStruct { .. }) => Ok(()),
            _ => Err(Error::custom("unbalanced struct in yaml writer")),
        }
    }

    fn write_matrix(&mut self, dims: &[usize], data: &[f64]) -> Result<()> {
        let flow = self.in_flow();
        let (col, _) = self.child_layout();
        self.begin_value();
        self.inline_prefix();
        self.out.push_str(MATRIX_TAG);
        let dims = dims.iter().map(usize::to_string);
        let data = data.iter().map(|&v| {
            let mut s = String::new();
            push_float(&mut s, v);
            s
        });
        if flow {
            self.out.push_str(" {dims: ");
            self.push_number_list(dims);
            self.out.push_str(", data: ");
            self.push_number_list(data);
            self.out.push('}');
        } else {
            self.line(col);
            self.out.push_str("dims: ");
            self.push_number_list(dims);
            self.line(col);
            self.out.push_str("data: ");
            self.push_number_list(data);
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<ValueType>> {
        if self.implicit_null {
            return Ok(Some(ValueType::Int));
        }
        let found = match self.frames.last().copied() {
            None => {
                self.skip_trivia();
                if self.cur.is_eof() {
                    return Ok(None);
                }
                self.classify_block()
            }
            Some(ReadFrame::BlockList { col, awaiting_marker }) => {
                if awaiting_marker {
                    self.skip_trivia();
                    if self.cur.is_eof() || self.cur.column() != col || !self.is_item_marker() {
                        return Ok(None);
                    }
                    self.cur.advance(1);
                    if let Some(ReadFrame::BlockList { awaiting_marker, .. }) = self.frames.last_mut() {
                        *awaiting_marker = false;
                    }
                }
                self.cur.skip_inline_whitespace();
                if self.at_line_end() {
                    self.classify_below(col, false)
                } else {
                    self.classify_block()
                }
            }
            Some(ReadFrame::BlockStruct { col }) => {
                if self.same_line {
                    self.cur.skip_inline_whitespace();
                    if !self.at_line_end() {
                        return Ok(self.classify_inline(false));
                    }
                    self.same_line = false;
                }
                self.classify_below(col, true)
            }
            Some(ReadFrame::FlowList | ReadFrame::FlowStruct) => {
                self.skip_trivia();
                if self.cur.eat(b',') {
                    self.skip_trivia();
                }
                match self.cur.peek() {
                    None | Some(b']' | b'}') => return Ok(None),
                    _ => self.classify_inline(true),
                }
            }
        };
        if let Some(tag) = found {
            trace!(%tag, "yaml lookahead");
        }
        Ok(found)
    }

    fn read_int(&mut self) -> Result<i64> {
        match self.read_scalar()? {
            Value::Int(i) => Ok(i),
            other => Err(Error::type_mismatch("int", other.value_type().name())),
        }
    }

    fn read_uint(&mut self) -> Result<u64> {
        match self.read_scalar()? {
            Value::UInt(u) => Ok(u),
            Value::Int(i) if i >= 0 => Ok(i as u64),
            other => Err(Error::type_mismatch("uint", other.value_type().name())),
        }
    }

    fn read_float(&mut self) -> Result<f64> {
        match self.read_scalar()? {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::UInt(u) => Ok(u as f64),
            other => Err(Error::type_mismatch("float", other.value_type().name())),
        }
    }

    fn read_string(&mut self) -> Result<String> {
        match self.read_scalar()? {
            Value::String(s) => Ok(s),
            other => Err(Error::type_mismatch("string", other.value_type().name())),
        }
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.read_scalar()? {
            Value::Bool(b) => Ok(b),
            other => Err(Error::type_mismatch("bool", other.value_type().name())),
        }
    }

    fn read_list_begin(&mut self) -> Result<usize> {
        self.value_started();
        if self.cur.eat(b'[') {
            let count = self.count_flow_items()?;
            self.frames.push(ReadFrame::FlowList);
            return Ok(count);
        }
        if !self.is_item_marker() {
            return Err(self.cur.error("expected a sequence"));
        }
        let col = self.cur.column();
        let count = self.count_block_items(col);
        self.frames.push(ReadFrame::BlockList {
            col,
            awaiting_marker: true,
        });
        Ok(count)
    }

    fn read_list_end(&mut self) -> Result<()> {
        match self.frames.pop() {
            Some(ReadFrame::FlowList) => {
                self.skip_trivia();
                self.cur.expect(b']')
            }
            Some(ReadFrame::BlockList { .. }) => Ok(()),
            _ => Err(Error::custom("yaml list end without a list")),
        }
    }

    fn read_struct_begin(&mut self) -> Result<()> {
        self.value_started();
        if self.cur.eat(b'{') {
            self.frames.push(ReadFrame::FlowStruct);
        } else {
            let col = self.cur.column();
            self.frames.push(ReadFrame::BlockStruct { col });
        }
        Ok(())
    }

    fn read_struct_key(&mut self) -> Result<Option<String>> {
        match self.frames.last().copied() {
            Some(ReadFrame::FlowStruct) => {
                self.skip_trivia();
                if self.cur.eat(b',') {
                    self.skip_trivia();
                }
                if matches!(self.cur.peek(), None | Some(b'}')) {
                    return Ok(None);
                }
                Ok(Some(self.parse_key(true)?))
            }
            Some(ReadFrame::BlockStruct { col }) => {
                self.skip_trivia();
                if self.cur.is_eof()
                    || self.cur.column() != col
                    || self.is_item_marker()
                    || (col == 0 && (self.cur.starts_with("---") || self.cur.starts_with("...")))
                {
                    return Ok(None);
                }
                let key = self.parse_key(false)?;
                self.same_line = true;
                Ok(Some(key))
            }
            _ => Err(Error::custom("yaml key outside a mapping")),
        }
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.same_line = false;
        match self.frames.pop() {
            Some(ReadFrame::FlowStruct) => {
                self.skip_trivia();
                self.cur.expect(b'}')
            }
            Some(ReadFrame::BlockStruct { .. }) => Ok(()),
            _ => Err(Error::custom("yaml struct end without a struct")),
        }
    }

    fn read_matrix(&mut self) -> Result<(Vec<usize>, Vec<f64>)> {
        self.value_started();
        let at = self.cur.pos();
        self.cur.expect_str(MATRIX_TAG)?;
        self.cur.skip_inline_whitespace();
        let mut dims = None;
        let mut data = None;
        if self.cur.eat(b'{') {
            loop {
                self.skip_trivia();
                if self.cur.eat(b'}') {
                    break;
                }
                if dims.is_some() || data.is_some() {
                    self.cur.expect(b',')?;
                    self.skip_trivia();
                }
                self.read_matrix_entry(true, &mut dims, &mut data)?;
            }
        } else {
            self.skip_trivia();
            let col = self.cur.column();
            for _ in 0..2 {
                self.skip_trivia();
                if self.cur.is_eof() || self.cur.column() != col {
                    break;
                }
                self.read_matrix_entry(false, &mut dims, &mut data)?;
            }
        }
        match (dims, data) {
            (Some(dims), Some(data)) => Ok((dims, data)),
            _ => Err(self.cur.error_at(at, "matrix needs both dims and data")),
        }
    }
}
