//! Wire format backends.
//!
//! Two binary dialects share one length-prefixed codec. The five text
//! backends are built on [`TextCursor`](crate::lexer::TextCursor).

pub mod binary;
pub mod bson;
pub mod json;
pub(crate) mod tape;
pub mod text;
pub mod toml;
pub mod xml;
pub mod yaml;

pub use binary::{BinaryBackend, BinaryCodec, TagSet};
pub use bson::BsonBackend;
pub use json::JsonBackend;
pub use text::TextBackend;
pub use toml::TomlBackend;
pub use xml::XmlBackend;
pub use yaml::YamlBackend;
