//! Format identifiers and writer configuration.
//!
//! - [`Format`]: which wire format a backend speaks
//! - [`Options`]: indentation, YAML flow threshold, XML declaration and the
//!   nesting guard shared by every backend
//!
//! ## Examples
//!
//! ```rust
//! use polyform::{Format, Options};
//!
//! let format: Format = "yml".parse().unwrap();
//! assert_eq!(format, Format::Yaml);
//! assert!(format.is_text_based());
//!
//! let options = Options::new().with_indent(4).with_max_depth(64);
//! assert_eq!(options.indent, 4);
//! ```

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the supported wire formats.
///
/// # Examples
///
/// ```rust
/// use polyform::Format;
///
/// assert_eq!(Format::Json.as_str(), "json");
/// assert_eq!(Format::from_extension("TOML"), Some(Format::Toml));
/// assert!(!Format::Bson.is_text_based());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Binary,
    Bson,
    Json,
    Yaml,
    Toml,
    Xml,
    Text,
}

impl Format {
    /// Every format, in dispatch order.
    pub const ALL: [Format; 7] = [
        Format::Binary,
        Format::Bson,
        Format::Json,
        Format::Yaml,
        Format::Toml,
        Format::Xml,
        Format::Text,
    ];

    /// Returns the lowercase name of this format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Format::Binary => "binary",
            Format::Bson => "bson",
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
            Format::Xml => "xml",
            Format::Text => "text",
        }
    }

    /// Returns `true` for formats whose output is UTF-8 text.
    #[inline]
    #[must_use]
    pub const fn is_text_based(&self) -> bool {
        !matches!(self, Format::Binary | Format::Bson)
    }

    /// The conventional file extension, without the dot.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Format::Binary => "bin",
            Format::Bson => "bson",
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
            Format::Xml => "xml",
            Format::Text => "txt",
        }
    }

    /// Maps a file extension (with or without the leading dot) to a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Format> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "bin" | "olib" => Some(Format::Binary),
            "bson" | "jsonb" => Some(Format::Bson),
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            "xml" => Some(Format::Xml),
            "txt" | "text" => Some(Format::Text),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(Format::Binary),
            "json_binary" | "json-binary" => Ok(Format::Bson),
            "json_text" | "json-text" => Ok(Format::Json),
            other => {
                Format::from_extension(other).ok_or_else(|| Error::UnknownFormat(s.to_string()))
            }
        }
    }
}

/// Writer and reader configuration shared by every backend.
///
/// # Examples
///
/// ```rust
/// use polyform::Options;
///
/// let options = Options::default();
/// assert_eq!(options.indent, 2);
/// assert_eq!(options.yaml_flow_threshold, 8);
/// assert!(options.xml_declaration);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// Spaces per nesting level (JSON, YAML, XML).
    pub indent: usize,
    /// Longest list the YAML writer still renders in flow style.
    pub yaml_flow_threshold: usize,
    /// Whether the XML writer emits an `<?xml ...?>` declaration.
    pub xml_declaration: bool,
    /// Deepest container nesting accepted on read or write.
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            indent: 2,
            yaml_flow_threshold: 8,
            xml_declaration: true,
            max_depth: 512,
        }
    }
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation width. Zero is raised to one.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent.max(1);
        self
    }

    #[must_use]
    pub fn with_yaml_flow_threshold(mut self, threshold: usize) -> Self {
        self.yaml_flow_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.xml_declaration = enabled;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}
