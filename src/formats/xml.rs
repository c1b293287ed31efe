//! XML documents with typed elements.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <olib>
//!   <struct>
//!     <key name="id" type="int">7</key>
//!     <key name="tags" type="array">
//!       <item type="string">a</item>
//!     </key>
//!     <key name="m" type="matrix" dims="1,2">0.5 1.0</key>
//!   </struct>
//! </olib>
//! ```
//!
//! The root value is an element named after its type. Struct fields are
//! `<key>` elements carrying `name` and `type`, list items are `<item>`
//! elements carrying `type`. Lists are written as `array` and read back from
//! either `array` or `list`.

use crate::backend::Backend;
use crate::lexer::{format_float, TextCursor};
use crate::{Error, Format, Options, Result, ValueType};
use tracing::trace;

const ROOT: &str = "olib";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Struct,
    List,
}

#[derive(Debug)]
struct OpenElement {
    kind: Kind,
    close: String,
    has_children: bool,
}

#[derive(Debug)]
struct Tag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
    pos: usize,
}

impl Tag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct Container {
    name: String,
    self_closing: bool,
}

pub struct XmlBackend {
    indent: usize,
    declaration: bool,
    out: String,
    open: Vec<OpenElement>,
    pending_key: Option<String>,
    cur: TextCursor,
    pending: Option<Tag>,
    containers: Vec<Container>,
    wrapped: bool,
}

fn type_attr(tag: ValueType) -> &'static str {
    match tag {
        ValueType::List => "array",
        other => other.name(),
    }
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' => out.push(ch),
            c if c.is_control() => out.push_str(&format!("&#x{:X};", c as u32)),
            c => out.push(c),
        }
    }
}

fn float_text(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format_float(value)
    }
}

fn parse_float_text(text: &str) -> Option<f64> {
    match text {
        "NaN" | "nan" | "NAN" => Some(f64::NAN),
        "INF" | "+INF" | "inf" | "+inf" | "Infinity" => Some(f64::INFINITY),
        "-INF" | "-inf" | "-Infinity" => Some(f64::NEG_INFINITY),
        _ => text.parse().ok(),
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.')
}

impl XmlBackend {
    pub fn new(options: &Options) -> Self {
        XmlBackend {
            indent: options.indent,
            declaration: options.xml_declaration,
            out: String::new(),
            open: Vec::new(),
            pending_key: None,
            cur: TextCursor::default(),
            pending: None,
            containers: Vec::new(),
            wrapped: false,
        }
    }

    fn newline_indent(&mut self, depth: usize) {
        self.out.push('\n');
        self.out.extend(std::iter::repeat(' ').take(depth * self.indent));
    }

    /// Writes the opening tag for the next value and returns the name that
    /// closes it.
    fn open_tag(&mut self, tag: ValueType, extra: &str) -> Result<String> {
        let depth = self.open.len() + 1;
        let parent = match self.open.last_mut() {
            Some(element) => {
                element.has_children = true;
                Some(element.kind)
            }
            None => None,
        };
        self.newline_indent(depth);
        let close = match parent {
            Some(Kind::Struct) => {
                let key = self
                    .pending_key
                    .take()
                    .ok_or_else(|| Error::custom("xml struct value without a key"))?;
                self.out.push_str("<key name=\"");
                escape_into(&mut self.out, &key);
                self.out.push_str("\" type=\"");
                "key"
            }
            Some(Kind::List) => {
                self.out.push_str("<item type=\"");
                "item"
            }
            None => {
                self.out.push('<');
                self.out.push_str(type_attr(tag));
                self.out.push_str(extra);
                self.out.push('>');
                return Ok(type_attr(tag).to_string());
            }
        };
        self.out.push_str(type_attr(tag));
        self.out.push('"');
        self.out.push_str(extra);
        self.out.push('>');
        Ok(close.to_string())
    }

    fn write_scalar(&mut self, tag: ValueType, text: &str) -> Result<()> {
        let close = self.open_tag(tag, "")?;
        escape_into(&mut self.out, text);
        self.out.push_str("</");
        self.out.push_str(&close);
        self.out.push('>');
        Ok(())
    }

    fn begin_container(&mut self, kind: Kind, tag: ValueType) -> Result<()> {
        let close = self.open_tag(tag, "")?;
        self.open.push(OpenElement {
            kind,
            close,
            has_children: false,
        });
        Ok(())
    }

    fn end_container(&mut self, kind: Kind) -> Result<()> {
        let element = match self.open.pop() {
            Some(element) if element.kind == kind => element,
            _ => return Err(Error::custom("unbalanced container in xml writer")),
        };
        if element.has_children {
            let depth = self.open.len() + 1;
            self.newline_indent(depth);
        }
        self.out.push_str("</");
        self.out.push_str(&element.close);
        self.out.push('>');
        Ok(())
    }

    fn skip_until(&mut self, end: &str, what: &str) -> Result<()> {
        match self.cur.rest().find(end) {
            Some(i) => {
                self.cur.advance(i + end.len());
                Ok(())
            }
            None => Err(self.cur.error(what)),
        }
    }

    /// Skips whitespace, comments, processing instructions and doctypes.
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.cur.skip_whitespace();
            if self.cur.starts_with("<!--") {
                self.skip_until("-->", "end of comment")?;
            } else if self.cur.starts_with("<?") {
                self.skip_until("?>", "end of processing instruction")?;
            } else if self.cur.starts_with("<!") {
                self.skip_until(">", "end of declaration")?;
            } else {
                return Ok(());
            }
        }
    }

    fn decode(&self, raw: &str, at: usize) -> Result<String> {
        if !raw.contains('&') {
            return Ok(raw.to_string());
        }
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(amp) = rest.find('&') {
            out.push_str(&rest[..amp]);
            let after = &rest[amp + 1..];
            let semi = after
                .find(';')
                .ok_or_else(|| self.cur.error_at(at, "unterminated entity"))?;
            let entity = &after[..semi];
            let ch = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => {
                    let code = match entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => entity.strip_prefix('#').and_then(|dec| dec.parse().ok()),
                    };
                    code.and_then(char::from_u32)
                }
            };
            match ch {
                Some(c) => out.push(c),
                None => return Err(self.cur.error_at(at, &format!("unknown entity '&{};'", entity))),
            }
            rest = &after[semi + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn parse_tag(&mut self) -> Result<Tag> {
        let pos = self.cur.pos();
        self.cur.expect(b'<')?;
        let name = self.cur.take_while(is_name_byte).to_string();
        if name.is_empty() {
            return Err(self.cur.error("expected an element name"));
        }
        let mut attrs = Vec::new();
        let self_closing = loop {
            self.cur.skip_whitespace();
            if self.cur.eat_str("/>") {
                break true;
            }
            if self.cur.eat(b'>') {
                break false;
            }
            let key = self.cur.take_while(is_name_byte).to_string();
            if key.is_empty() {
                return Err(self.cur.error("expected an attribute name"));
            }
            self.cur.skip_whitespace();
            self.cur.expect(b'=')?;
            self.cur.skip_whitespace();
            let quote = match self.cur.peek() {
                Some(q @ (b'"' | b'\'')) => q,
                _ => return Err(self.cur.error("expected a quoted attribute value")),
            };
            self.cur.advance(1);
            let start = self.cur.pos();
            let raw = self.cur.take_while(|b| b != quote).to_string();
            if !self.cur.eat(quote) {
                return Err(self.cur.error("closing quote of attribute value"));
            }
            attrs.push((key, self.decode(&raw, start)?));
        };
        Ok(Tag {
            name,
            attrs,
            self_closing,
            pos,
        })
    }

    fn expect_close(&mut self, name: &str) -> Result<()> {
        let at = self.cur.pos();
        self.cur.expect_str("</")?;
        let found = self.cur.take_while(is_name_byte);
        if found != name {
            let msg = format!("expected '</{}>'", name);
            return Err(self.cur.error_at(at, &msg));
        }
        self.cur.skip_whitespace();
        self.cur.expect(b'>')
    }

    fn tag_type(&self, tag: &Tag) -> Result<ValueType> {
        let name = tag.attr("type").unwrap_or(&tag.name);
        ValueType::from_name(name)
            .ok_or_else(|| self.cur.error_at(tag.pos, &format!("unknown value type '{}'", name)))
    }

    fn take_tag(&mut self) -> Result<Tag> {
        if let Some(tag) = self.pending.take() {
            return Ok(tag);
        }
        self.skip_misc()?;
        if self.cur.starts_with("</") || self.cur.is_eof() {
            return Err(self.cur.error("expected an element"));
        }
        self.parse_tag()
    }

    /// Text content of a scalar element, consuming its closing tag.
    fn element_text(&mut self) -> Result<(String, usize)> {
        let tag = self.take_tag()?;
        if tag.self_closing {
            return Ok((String::new(), tag.pos));
        }
        let mut text = String::new();
        loop {
            let start = self.cur.pos();
            let raw = self.cur.take_while(|b| b != b'<').to_string();
            text.push_str(&self.decode(&raw, start)?);
            let (open, close) = if self.cur.starts_with("<![CDATA[") {
                ("<![CDATA[", "]]>")
            } else if self.cur.starts_with("<!--") {
                ("<!--", "-->")
            } else {
                break;
            };
            let section = self.cur.pos();
            self.cur.advance(open.len());
            let Some(len) = self.cur.rest().find(close) else {
                return Err(self.cur.error_at(section, &format!("closing '{}'", close)));
            };
            if open == "<![CDATA[" {
                // CDATA is taken verbatim, without entity decoding.
                text.push_str(&self.cur.rest()[..len]);
            }
            self.cur.advance(len + close.len());
        }
        self.expect_close(&tag.name)?;
        Ok((text, tag.pos))
    }

    fn count_children(&self) -> Result<usize> {
        let bytes = self.cur.rest().as_bytes();
        let find = |from: usize, end: &[u8]| {
            bytes[from..]
                .windows(end.len())
                .position(|w| w == end)
                .map(|i| from + i + end.len())
        };
        let unterminated = || self.cur.error_at(self.cur.pos() + bytes.len(), "closing tag");
        let mut depth = 0usize;
        let mut count = 0;
        let mut i = 0;
        while let Some(offset) = bytes[i..].iter().position(|&b| b == b'<') {
            i += offset;
            let rest = &bytes[i..];
            if rest.starts_with(b"<!--") {
                i = find(i, b"-->").ok_or_else(unterminated)?;
            } else if rest.starts_with(b"<![CDATA[") {
                i = find(i, b"]]>").ok_or_else(unterminated)?;
            } else if rest.starts_with(b"<?") {
                i = find(i, b"?>").ok_or_else(unterminated)?;
            } else if rest.starts_with(b"</") {
                if depth == 0 {
                    return Ok(count);
                }
                depth -= 1;
                i = find(i, b">").ok_or_else(unterminated)?;
            } else {
                let mut quote = None;
                let mut j = i + 1;
                while j < bytes.len() {
                    match (quote, bytes[j]) {
                        (None, b'>') => break,
                        (None, q @ (b'"' | b'\'')) => quote = Some(q),
                        (Some(q), b) if b == q => quote = None,
                        _ => {}
                    }
                    j += 1;
                }
                if j >= bytes.len() {
                    return Err(unterminated());
                }
                if depth == 0 {
                    count += 1;
                }
                if bytes[j - 1] != b'/' {
                    depth += 1;
                }
                i = j + 1;
            }
        }
        Err(unterminated())
    }

    fn begin_read_container(&mut self) -> Result<bool> {
        let tag = self.take_tag()?;
        let self_closing = tag.self_closing;
        self.containers.push(Container {
            name: tag.name,
            self_closing,
        });
        Ok(self_closing)
    }

    fn end_read_container(&mut self) -> Result<()> {
        match self.containers.pop() {
            Some(Container { self_closing: true, .. }) => Ok(()),
            Some(Container { name, .. }) => {
                self.skip_misc()?;
                self.expect_close(&name)
            }
            None => Err(Error::custom("xml container end without a start")),
        }
    }
}

impl Backend for XmlBackend {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn init_write(&mut self) -> Result<()> {
        self.out.clear();
        self.open.clear();
        self.pending_key = None;
        if self.declaration {
            self.out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        }
        self.out.push('<');
        self.out.push_str(ROOT);
        self.out.push('>');
        Ok(())
    }

    fn finish_write(&mut self) -> Result<Vec<u8>> {
        if !self.open.is_empty() {
            return Err(Error::custom("xml writer finished inside a container"));
        }
        self.out.push_str("\n</");
        self.out.push_str(ROOT);
        self.out.push_str(">\n");
        Ok(std::mem::take(&mut self.out).into_bytes())
    }

    fn init_read(&mut self, input: &[u8]) -> Result<()> {
        self.cur = TextCursor::from_bytes(input)?;
        self.pending = None;
        self.containers.clear();
        self.wrapped = false;
        self.skip_misc()?;
        if self.cur.starts_with("<") && !self.cur.starts_with("</") {
            let tag = self.parse_tag()?;
            if tag.name == ROOT {
                self.wrapped = !tag.self_closing;
            } else {
                self.pending = Some(tag);
            }
        }
        Ok(())
    }

    fn finish_read(&mut self) -> Result<()> {
        if self.pending.is_some() {
            return Err(self.cur.error("unread element"));
        }
        self.skip_misc()?;
        if self.wrapped {
            self.expect_close(ROOT)?;
            self.skip_misc()?;
        }
        if !self.cur.is_eof() {
            return Err(self.cur.error("end of document"));
        }
        Ok(())
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        self.write_scalar(ValueType::Int, &value.to_string())
    }

    fn write_uint(&mut self, value: u64) -> Result<()> {
        self.write_scalar(ValueType::UInt, &value.to_string())
    }

    fn write_float(&mut self, value: f64) -> Result<()> {
        self.write_scalar(ValueType::Float, &float_text(value))
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_scalar(ValueType::String, value)
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_scalar(ValueType::Bool, if value { "true" } else { "false" })
    }

    fn write_list_begin(&mut self, _len: usize) -> Result<()> {
        self.begin_container(Kind::List, ValueType::List)
    }

    fn write_list_end(&mut self) -> Result<()> {
        self.end_container(Kind::List)
    }

    fn write_struct_begin(&mut self) -> Result<()> {
        self.begin_container(Kind::Struct, ValueType::Struct)
    }

    fn write_struct_key(&mut self, key: &str) -> Result<()> {
        self.pending_key = Some(key.to_string());
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        self.end_container(Kind::Struct)
    }

    fn write_matrix(&mut self, dims: &[usize], data: &[f64]) -> Result<()> {
        let dims = dims.iter().map(usize::to_string).collect::<Vec<_>>().join(",");
        let close = self.open_tag(ValueType::Matrix, &format!(" dims=\"{}\"", dims))?;
        let cells = data.iter().map(|&v| float_text(v)).collect::<Vec<_>>().join(" ");
        self.out.push_str(&cells);
        self.out.push_str("</");
        self.out.push_str(&close);
        self.out.push('>');
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<ValueType>> {
        if self.pending.is_none() {
            if matches!(self.containers.last(), Some(c) if c.self_closing) {
                return Ok(None);
            }
            self.skip_misc()?;
            if self.cur.is_eof() || self.cur.starts_with("</") {
                return Ok(None);
            }
            self.pending = Some(self.parse_tag()?);
        }
        match &self.pending {
            Some(tag) => {
                let found = self.tag_type(tag)?;
                trace!(element = %tag.name, %found, "xml lookahead");
                Ok(Some(found))
            }
            None => Ok(None),
        }
    }

    fn read_int(&mut self) -> Result<i64> {
        let (text, at) = self.element_text()?;
        text.trim()
            .parse()
            .map_err(|_| self.cur.error_at(at, &format!("invalid int '{}'", text.trim())))
    }

    fn read_uint(&mut self) -> Result<u64> {
        let (text, at) = self.element_text()?;
        text.trim()
            .parse()
            .map_err(|_| self.cur.error_at(at, &format!("invalid uint '{}'", text.trim())))
    }

    fn read_float(&mut self) -> Result<f64> {
        let (text, at) = self.element_text()?;
        parse_float_text(text.trim())
            .ok_or_else(|| self.cur.error_at(at, &format!("invalid float '{}'", text.trim())))
    }

    fn read_string(&mut self) -> Result<String> {
        Ok(self.element_text()?.0)
    }

    fn read_bool(&mut self) -> Result<bool> {
        let (text, at) = self.element_text()?;
        match text.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(self.cur.error_at(at, &format!("invalid bool '{}'", other))),
        }
    }

    fn read_list_begin(&mut self) -> Result<usize> {
        if self.begin_read_container()? {
            Ok(0)
        } else {
            self.count_children()
        }
    }

    fn read_list_end(&mut self) -> Result<()> {
        self.end_read_container()
    }

    fn read_struct_begin(&mut self) -> Result<()> {
        self.begin_read_container().map(|_| ())
    }

    fn read_struct_key(&mut self) -> Result<Option<String>> {
        if matches!(self.containers.last(), Some(c) if c.self_closing) {
            return Ok(None);
        }
        self.skip_misc()?;
        if self.cur.is_eof() || self.cur.starts_with("</") {
            return Ok(None);
        }
        let tag = self.parse_tag()?;
        let name = match tag.attr("name") {
            Some(name) => name.to_string(),
            None => return Err(self.cur.error_at(tag.pos, "struct field without a name attribute")),
        };
        self.pending = Some(tag);
        Ok(Some(name))
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.end_read_container()
    }

    fn read_matrix(&mut self) -> Result<(Vec<usize>, Vec<f64>)> {
        let tag = self.take_tag()?;
        let at = tag.pos;
        let dims = tag
            .attr("dims")
            .ok_or_else(|| self.cur.error_at(at, "matrix without a dims attribute"))?
            .split(',')
            .map(|d| {
                d.trim()
                    .parse::<usize>()
                    .map_err(|_| self.cur.error_at(at, &format!("invalid matrix dimension '{}'", d.trim())))
            })
            .collect::<Result<Vec<_>>>()?;
        let data = if tag.self_closing {
            Vec::new()
        } else {
            let start = self.cur.pos();
            let raw = self.cur.take_while(|b| b != b'<').to_string();
            let text = self.decode(&raw, start)?;
            self.expect_close(&tag.name)?;
            text.split_whitespace()
                .map(|cell| {
                    parse_float_text(cell)
                        .ok_or_else(|| self.cur.error_at(at, &format!("invalid matrix value '{}'", cell)))
                })
                .collect::<Result<Vec<_>>>()?
        };
        Ok((dims, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Serializer;
    use crate::{value, Matrix, Value};

    fn xml() -> Serializer<XmlBackend> {
        Serializer::new(XmlBackend::new(&Options::default()), Options::default())
    }

    #[test]
    fn test_document_layout() {
        let v = value!({"a": -42, "b": [1], "e": {}});
        let out = xml().write_string(&v).unwrap();
        assert_eq!(
            out,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<olib>\n  <struct>\n    \
             <key name=\"a\" type=\"int\">-42</key>\n    \
             <key name=\"b\" type=\"array\">\n      <item type=\"int\">1</item>\n    </key>\n    \
             <key name=\"e\" type=\"struct\"></key>\n  </struct>\n</olib>\n"
        );
        assert_eq!(xml().read_str(&out).unwrap(), v);
    }

    #[test]
    fn test_without_declaration() {
        let options = Options::default().with_xml_declaration(false);
        let mut ser = Serializer::new(XmlBackend::new(&options), options);
        let out = ser.write_string(&Value::Bool(true)).unwrap();
        assert_eq!(out, "<olib>\n  <bool>true</bool>\n</olib>\n");
    }

    #[test]
    fn test_escaping_and_whitespace() {
        let v = value!({"<k&>": "  a <b> & \"c\" 'd'  "});
        let out = xml().write_string(&v).unwrap();
        assert!(out.contains("name=\"&lt;k&amp;&gt;\""));
        assert!(out.contains("&quot;c&quot;"));
        assert_eq!(xml().read_str(&out).unwrap(), v);
    }

    #[test]
    fn test_matrix_and_floats() {
        let m = Matrix::from_data(&[2, 1], vec![f64::NEG_INFINITY, 1.5]).unwrap();
        let v = value!({"m": m, "f": 2.0});
        let out = xml().write_string(&v).unwrap();
        assert!(out.contains("<key name=\"m\" type=\"matrix\" dims=\"2,1\">-INF 1.5</key>"));
        assert_eq!(xml().read_str(&out).unwrap(), v);
    }

    #[test]
    fn test_lenient_reader() {
        let doc = r#"<?xml version="1.0"?>
<!-- hand written -->
<struct>
  <key name="xs" type="list"><item type="int"> 3 </item><item type="string"/></key>
  <key name="s" type="struct"/>
  <key name="n"><!-- untyped --></key>
  <key name="c" type="string">&#65;&#x42;</key>
</struct>"#;
        let err = xml().read_str(doc).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));

        let doc = doc.replace("<key name=\"n\"><!-- untyped --></key>\n", "");
        let v = xml().read_str(&doc).unwrap();
        assert_eq!(v, value!({"xs": [3, ""], "s": {}, "c": "AB"}));
    }

    #[test]
    fn test_cdata_sections() {
        let doc = r#"<olib><struct>
  <key name="raw" type="string"><![CDATA[<b>&amp; ]]]]><![CDATA[>]]></key>
  <key name="mixed" type="string">a &lt; <![CDATA[b < c]]><!-- note --> d</key>
  <key name="n" type="int"> <![CDATA[42]]> </key>
</struct></olib>"#;
        let v = xml().read_str(doc).unwrap();
        assert_eq!(v, value!({"raw": "<b>&amp; ]]>", "mixed": "a < b < c d", "n": 42}));

        assert!(xml().read_str("<olib><string><![CDATA[open</string></olib>").is_err());
    }

    #[test]
    fn test_missing_name_attribute() {
        let doc = "<olib><struct><key type=\"int\">1</key></struct></olib>";
        assert!(xml().read_str(doc).is_err());
    }

    #[test]
    fn test_mismatched_close_tag() {
        assert!(xml().read_str("<olib><int>1</float></olib>").is_err());
        assert!(xml().read_str("<olib><int>1</int>").is_err());
    }
}
