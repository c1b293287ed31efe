//! Error types for value access, serialization and deserialization.
//!
//! Every fallible operation in the crate returns [`Result`]. Nothing panics on
//! malformed input and no partial tree is ever handed back: a read either yields
//! the whole [`Value`](crate::Value) or an [`Error`].
//!
//! ## Error Categories
//!
//! - **Type mismatches**: a typed accessor or setter used on the wrong tag
//! - **Malformed input**: syntax errors (text formats carry line/column) and
//!   framing errors (binary formats carry a byte offset)
//! - **Structural errors**: duplicate struct keys, bad matrix shapes, indices out of range
//! - **I/O errors**: reading or writing files and streams
//!
//! ## Examples
//!
//! ```rust
//! use polyform::{read_str, Error, Format};
//!
//! let result = read_str(Format::Json, "{\"a\": [1, 2");
//! assert!(matches!(result, Err(Error::UnexpectedEof { .. }) | Err(Error::Syntax { .. })));
//! ```

use crate::options::Format;
use std::fmt;
use thiserror::Error;

/// Represents all possible errors produced by this crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// A text token did not match the grammar
    #[error("Syntax error at line {line}, column {col}: {msg}")]
    Syntax { line: usize, col: usize, msg: String },

    /// Text input ended in the middle of a value
    #[error("Unexpected end of input at line {line}, column {col}: expected {expected}")]
    UnexpectedEof {
        line: usize,
        col: usize,
        expected: String,
    },

    /// Binary input ended in the middle of a value
    #[error("Truncated input at byte {offset}: expected {expected}")]
    Truncated { offset: usize, expected: String },

    /// Binary framing error such as an unknown tag byte
    #[error("Invalid format at byte {offset}: {msg}")]
    InvalidFormat { offset: usize, msg: String },

    /// A typed accessor was used on a value with a different tag
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A list or matrix index outside the valid range
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// `add` on a struct that already holds the key
    #[error("Duplicate struct key: {0:?}")]
    DuplicateKey(String),

    /// Matrix dimensions or data that break `data.len() == product(dims)`
    #[error("Invalid matrix: {0}")]
    InvalidMatrix(String),

    /// A string entry point was used with a binary format
    #[error("Format {0} is binary-based and cannot produce or consume text")]
    NotTextBased(Format),

    /// A value was required but the input or the enclosing container ended
    #[error("Expected a value but reached the end of the {0}")]
    EndOfStream(&'static str),

    /// Nesting deeper than the configured limit
    #[error("Nesting depth exceeds the limit of {0}")]
    DepthLimitExceeded(usize),

    /// A format name or extension that maps to no backend
    #[error("Unknown format: {0:?}")]
    UnknownFormat(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a syntax error with line and column information.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use polyform::Error;
    ///
    /// let err = Error::syntax(10, 5, "unexpected token");
    /// assert!(err.to_string().contains("line 10"));
    /// ```
    pub fn syntax(line: usize, col: usize, msg: &str) -> Self {
        Error::Syntax {
            line,
            col,
            msg: msg.to_string(),
        }
    }

    /// Creates an unexpected end-of-input error for text formats.
    pub fn unexpected_eof(line: usize, col: usize, expected: &str) -> Self {
        Error::UnexpectedEof {
            line,
            col,
            expected: expected.to_string(),
        }
    }

    /// Creates a truncation error for binary formats.
    pub fn truncated(offset: usize, expected: &str) -> Self {
        Error::Truncated {
            offset,
            expected: expected.to_string(),
        }
    }

    /// Creates a framing error for binary formats.
    pub fn invalid_format(offset: usize, msg: &str) -> Self {
        Error::InvalidFormat {
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates a type mismatch error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use polyform::Error;
    ///
    /// let err = Error::type_mismatch("int", "string");
    /// assert!(err.to_string().contains("expected int"));
    /// ```
    pub fn type_mismatch(expected: &str, found: &str) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Error::IndexOutOfRange { index, len }
    }

    pub fn duplicate_key(key: &str) -> Self {
        Error::DuplicateKey(key.to_string())
    }

    pub fn invalid_matrix(msg: &str) -> Self {
        Error::InvalidMatrix(msg.to_string())
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for file reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
