//! Format dispatch and conversion helpers.
//!
//! Every function here builds a fresh backend, so they are safe to call from
//! several threads at once.

use crate::backend::Backend;
use crate::engine::Serializer;
use crate::formats::{BinaryBackend, BsonBackend, JsonBackend, TextBackend, TomlBackend, XmlBackend, YamlBackend};
use crate::{Format, Options, Result, Value};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// A new, idle backend for `format`.
#[must_use]
pub fn backend_for(format: Format, options: &Options) -> Box<dyn Backend> {
    match format {
        Format::Binary => Box::new(BinaryBackend::new()),
        Format::Bson => Box::new(BsonBackend::new()),
        Format::Json => Box::new(JsonBackend::new(options)),
        Format::Yaml => Box::new(YamlBackend::new(options)),
        Format::Toml => Box::new(TomlBackend::new(options)),
        Format::Xml => Box::new(XmlBackend::new(options)),
        Format::Text => Box::new(TextBackend::new(options)),
    }
}

pub fn write(format: Format, value: &Value) -> Result<Vec<u8>> {
    Serializer::for_format(format).write(value)
}

pub fn write_with_options(format: Format, value: &Value, options: &Options) -> Result<Vec<u8>> {
    Serializer::with_options(format, options.clone()).write(value)
}

pub fn write_string(format: Format, value: &Value) -> Result<String> {
    Serializer::for_format(format).write_string(value)
}

pub fn read(format: Format, input: &[u8]) -> Result<Value> {
    Serializer::for_format(format).read(input)
}

pub fn read_with_options(format: Format, input: &[u8], options: &Options) -> Result<Value> {
    Serializer::with_options(format, options.clone()).read(input)
}

pub fn read_str(format: Format, input: &str) -> Result<Value> {
    Serializer::for_format(format).read_str(input)
}

pub fn write_to<W: Write>(format: Format, value: &Value, writer: W) -> Result<()> {
    Serializer::for_format(format).write_to(value, writer)
}

pub fn read_from<R: Read>(format: Format, reader: R) -> Result<Value> {
    Serializer::for_format(format).read_from(reader)
}

pub fn write_file(format: Format, value: &Value, path: impl AsRef<Path>) -> Result<()> {
    let bytes = write(format, value)?;
    fs::write(path.as_ref(), bytes)?;
    Ok(())
}

pub fn read_file(format: Format, path: impl AsRef<Path>) -> Result<Value> {
    let bytes = fs::read(path.as_ref())?;
    read(format, &bytes)
}

/// Re-encodes a document from `from` into `to`.
pub fn convert(from: Format, input: &[u8], to: Format) -> Result<Vec<u8>> {
    let value = read(from, input)?;
    let out = write(to, &value)?;
    debug!(%from, %to, input = input.len(), output = out.len(), "converted document");
    Ok(out)
}

/// Like [`convert`] for two text formats.
pub fn convert_str(from: Format, input: &str, to: Format) -> Result<String> {
    let value = read_str(from, input)?;
    write_string(to, &value)
}

pub fn convert_file(
    from: Format,
    input: impl AsRef<Path>,
    to: Format,
    output: impl AsRef<Path>,
) -> Result<()> {
    let bytes = fs::read(input.as_ref())?;
    let out = convert(from, &bytes, to)?;
    fs::write(output.as_ref(), out)?;
    Ok(())
}
