//! Format-agnostic tree walking.
//!
//! [`write_value`] dispatches on each node's tag and calls the matching
//! [`Backend`] primitive, recursing into containers. [`read_value`] asks the
//! backend for the next tag and builds the tree bottom-up. Neither touches
//! bytes directly.
//!
//! [`Serializer`] bundles one backend with [`Options`] and adds the document
//! lifecycle around a walk.
//!
//! ```rust
//! use polyform::{value, Format, Serializer};
//!
//! let mut json = Serializer::for_format(Format::Json);
//! let text = json.write_string(&value!({"a": [1, 2]})).unwrap();
//! let back = json.read_str(&text).unwrap();
//! assert_eq!(back.struct_get("a").and_then(|v| v.list_size()), Some(2));
//! ```

use crate::backend::Backend;
use crate::dispatch::backend_for;
use crate::{Error, Format, Matrix, Options, Result, StructMap, Value, ValueType};
use std::io::{Read, Write};
use tracing::debug;

/// Writes `value` through `backend` with the default nesting limit.
pub fn write_value(backend: &mut dyn Backend, value: &Value) -> Result<()> {
    write_value_with_limit(backend, value, Options::default().max_depth)
}

/// Writes `value`, failing with [`Error::DepthLimitExceeded`] when containers
/// nest more than `max_depth` levels.
pub fn write_value_with_limit(
    backend: &mut dyn Backend,
    value: &Value,
    max_depth: usize,
) -> Result<()> {
    write_node(backend, value, 0, max_depth)
}

fn write_node(backend: &mut dyn Backend, value: &Value, depth: usize, max: usize) -> Result<()> {
    match value {
        Value::Int(i) => backend.write_int(*i),
        Value::UInt(u) => backend.write_uint(*u),
        Value::Float(f) => backend.write_float(*f),
        Value::Bool(b) => backend.write_bool(*b),
        Value::String(s) => backend.write_string(s),
        Value::List(items) => {
            let depth = enter(depth, max)?;
            backend.write_list_begin(items.len())?;
            for item in items {
                write_node(backend, item, depth, max)?;
            }
            backend.write_list_end()
        }
        Value::Struct(map) => {
            let depth = enter(depth, max)?;
            backend.write_struct_begin()?;
            for (key, item) in map {
                backend.write_struct_key(key)?;
                write_node(backend, item, depth, max)?;
            }
            backend.write_struct_end()
        }
        Value::Matrix(m) => backend.write_matrix(m.dims(), m.data()),
    }
}

#[inline]
fn enter(depth: usize, max: usize) -> Result<usize> {
    if depth >= max {
        return Err(Error::DepthLimitExceeded(max));
    }
    Ok(depth + 1)
}

/// Reads one value from `backend` with the default nesting limit.
pub fn read_value(backend: &mut dyn Backend) -> Result<Value> {
    read_value_with_limit(backend, Options::default().max_depth)
}

pub fn read_value_with_limit(backend: &mut dyn Backend, max_depth: usize) -> Result<Value> {
    read_node(backend, 0, max_depth)
}

fn read_node(backend: &mut dyn Backend, depth: usize, max: usize) -> Result<Value> {
    let Some(tag) = backend.peek()? else {
        return Err(Error::EndOfStream("input"));
    };
    match tag {
        ValueType::Int => backend.read_int().map(Value::Int),
        ValueType::UInt => backend.read_uint().map(Value::UInt),
        ValueType::Float => backend.read_float().map(Value::Float),
        ValueType::Bool => backend.read_bool().map(Value::Bool),
        ValueType::String => backend.read_string().map(Value::String),
        ValueType::List => {
            let depth = enter(depth, max)?;
            let len = backend.read_list_begin()?;
            // The count comes from untrusted input; grow as elements arrive.
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(read_node(backend, depth, max)?);
            }
            backend.read_list_end()?;
            Ok(Value::List(items))
        }
        ValueType::Struct => {
            let depth = enter(depth, max)?;
            backend.read_struct_begin()?;
            let mut map = StructMap::new();
            while let Some(key) = backend.read_struct_key()? {
                let item = read_node(backend, depth, max)?;
                map.set(key, item);
            }
            backend.read_struct_end()?;
            Ok(Value::Struct(map))
        }
        ValueType::Matrix => {
            let (dims, data) = backend.read_matrix()?;
            // Shape is checked against the data actually read before anything
            // is allocated from the declared dims.
            Matrix::from_data(&dims, data).map(Value::Matrix)
        }
    }
}

/// One backend plus the options it was built with.
pub struct Serializer<B: Backend = Box<dyn Backend>> {
    backend: B,
    options: Options,
}

impl Serializer<Box<dyn Backend>> {
    /// A serializer for `format` with default options.
    #[must_use]
    pub fn for_format(format: Format) -> Self {
        Self::with_options(format, Options::default())
    }

    #[must_use]
    pub fn with_options(format: Format, options: Options) -> Self {
        Serializer {
            backend: backend_for(format, &options),
            options,
        }
    }
}

impl<B: Backend> Serializer<B> {
    pub fn new(backend: B, options: Options) -> Self {
        Serializer { backend, options }
    }

    pub fn format(&self) -> Format {
        self.backend.format()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Encodes `value` as a complete document.
    pub fn write(&mut self, value: &Value) -> Result<Vec<u8>> {
        self.backend.init_write()?;
        write_value_with_limit(&mut self.backend, value, self.options.max_depth)?;
        let bytes = self.backend.finish_write()?;
        debug!(format = %self.format(), bytes = bytes.len(), "wrote document");
        Ok(bytes)
    }

    /// Encodes `value` as text. Fails with [`Error::NotTextBased`] for the
    /// binary formats.
    pub fn write_string(&mut self, value: &Value) -> Result<String> {
        self.require_text()?;
        let bytes = self.write(value)?;
        String::from_utf8(bytes).map_err(|e| Error::custom(format!("writer produced invalid UTF-8: {}", e)))
    }

    /// Decodes one complete document.
    pub fn read(&mut self, input: &[u8]) -> Result<Value> {
        self.backend.init_read(input)?;
        let value = read_value_with_limit(&mut self.backend, self.options.max_depth)?;
        self.backend.finish_read()?;
        debug!(format = %self.format(), bytes = input.len(), "read document");
        Ok(value)
    }

    pub fn read_str(&mut self, input: &str) -> Result<Value> {
        self.require_text()?;
        self.read(input.as_bytes())
    }

    pub fn write_to<W: Write>(&mut self, value: &Value, mut writer: W) -> Result<()> {
        let bytes = self.write(value)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(&mut self, mut reader: R) -> Result<Value> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        self.read(&buf)
    }

    fn require_text(&self) -> Result<()> {
        if self.backend.is_text_based() {
            Ok(())
        } else {
            Err(Error::NotTextBased(self.format()))
        }
    }
}
