//! # polyform
//!
//! A dynamically typed value tree and seven interchangeable wire formats.
//!
//! Every document is read into, and written from, a [`Value`]: a tree of
//! integers, floats, booleans, strings, ordered lists, insertion-ordered
//! structs and dense N-dimensional float matrices. Each format is a
//! [`Backend`] that speaks a small set of write and read primitives. The
//! [`engine`] walks the tree against whichever backend is selected, so
//! converting between formats is a read followed by a write.
//!
//! | Format | Kind | Notes |
//! |--------|------|-------|
//! | [`Format::Binary`] | binary | compact tagged little-endian encoding |
//! | [`Format::Bson`] | binary | same framing with a BSON-style tag table |
//! | [`Format::Json`] | text | pretty-printed, matrices as `{"__matrix": true, ...}` |
//! | [`Format::Yaml`] | text | block mappings, short lists in flow style |
//! | [`Format::Toml`] | text | tables, arrays of tables, inline tables |
//! | [`Format::Xml`] | text | typed `<key>`/`<item>` elements under `<olib>` |
//! | [`Format::Text`] | text | brace-and-bracket notation with `#` comments |
//!
//! ## Quick Start
//!
//! ```rust
//! use polyform::{read_str, value, write_string, Format};
//!
//! let config = value!({
//!     "name": "demo",
//!     "retries": 3,
//!     "hosts": ["a.example", "b.example"]
//! });
//!
//! let yaml = write_string(Format::Yaml, &config).unwrap();
//! assert_eq!(yaml, "name: demo\nretries: 3\nhosts: [a.example, b.example]\n");
//!
//! let back = read_str(Format::Yaml, &yaml).unwrap();
//! assert_eq!(back, config);
//! ```
//!
//! ### Converting between formats
//!
//! ```rust
//! use polyform::{convert_str, Format};
//!
//! let toml = convert_str(Format::Json, r#"{"port": 8080, "tls": true}"#, Format::Toml).unwrap();
//! assert_eq!(toml, "port = 8080\ntls = true\n");
//! ```
//!
//! ### Typed data through Serde
//!
//! ```rust
//! use polyform::{from_str, to_string, Format};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let xml = to_string(Format::Xml, &Point { x: 1, y: -2 }).unwrap();
//! let point: Point = from_str(Format::Xml, &xml).unwrap();
//! assert_eq!(point, Point { x: 1, y: -2 });
//! ```
//!
//! ### Matrices
//!
//! ```rust
//! use polyform::{read, write, Format, Matrix, Value};
//!
//! let mut m = Matrix::new(&[2, 3]).unwrap();
//! m.set_data(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
//! let bytes = write(Format::Binary, &Value::Matrix(m)).unwrap();
//!
//! let back = read(Format::Binary, &bytes).unwrap();
//! assert_eq!(back.as_matrix().and_then(|m| m.get(&[1, 2])), Some(5.0));
//! ```
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Malformed input of any kind produces an [`Error`], never a panic
//! - Nesting depth is bounded by [`Options::max_depth`] on read and write
//! - Length prefixes in binary input are checked against the bytes that remain

pub mod backend;
pub mod de;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod formats;
pub mod lexer;
mod macros;
pub mod map;
pub mod matrix;
pub mod options;
pub mod ser;
pub mod value;

pub use backend::Backend;
pub use de::{from_value, ValueDeserializer};
pub use dispatch::{
    backend_for, convert, convert_file, convert_str, read, read_file, read_from, read_str, read_with_options, write,
    write_file, write_string, write_to, write_with_options,
};
pub use engine::{read_value, write_value, Serializer};
pub use error::{Error, Result};
pub use map::StructMap;
pub use matrix::Matrix;
pub use options::{Format, Options};
pub use ser::{to_value, ValueSerializer};
pub use value::{Value, ValueType};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

/// Serializes any `T: Serialize` into a text format.
///
/// # Examples
///
/// ```rust
/// use polyform::{to_string, Format};
///
/// let out = to_string(Format::Json, &vec![1, 2]).unwrap();
/// assert_eq!(out, "[\n  1,\n  2\n]\n");
/// ```
///
/// # Errors
///
/// Returns [`Error::NotTextBased`] for binary formats, or any error raised
/// while converting `value` into a [`Value`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<T>(format: Format, value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    write_string(format, &to_value(value)?)
}

/// Serializes any `T: Serialize` into the bytes of `format`.
///
/// # Errors
///
/// Returns an error if the value cannot be represented as a [`Value`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec<T>(format: Format, value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    write(format, &to_value(value)?)
}

/// Serializes any `T: Serialize` to a writer.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(format: Format, writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    write_to(format, &to_value(value)?, writer)
}

/// Deserializes an instance of `T` from a text document.
///
/// # Examples
///
/// ```rust
/// use polyform::{from_str, Format};
///
/// let ports: Vec<u16> = from_str(Format::Yaml, "[80, 443]").unwrap();
/// assert_eq!(ports, vec![80, 443]);
/// ```
///
/// # Errors
///
/// Returns an error if the document is malformed or does not match `T`.
/// Syntax errors carry line and column.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str<T>(format: Format, s: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_value(read_str(format, s)?)
}

/// Deserializes an instance of `T` from the bytes of any format.
///
/// # Errors
///
/// Returns an error if the input is malformed or does not match `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T>(format: Format, v: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    from_value(read(format, v)?)
}

/// Deserializes an instance of `T` from an I/O stream.
///
/// # Errors
///
/// Returns an error if reading fails, the input is malformed, or the data
/// does not match `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, T>(format: Format, reader: R) -> Result<T>
where
    R: io::Read,
    T: DeserializeOwned,
{
    from_value(read_from(format, reader)?)
}
