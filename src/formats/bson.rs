//! BSON-like binary dialect.
//!
//! Same framing as [`BinaryBackend`](super::BinaryBackend), but with tags in
//! the `0x10` range so that documents of the two dialects are never mistaken
//! for each other.

use super::binary::{BinaryCodec, TagSet};
use crate::Format;

pub struct BsonTags;

impl TagSet for BsonTags {
    const FORMAT: Format = Format::Bson;
    const INT: u8 = 0x10;
    const UINT: u8 = 0x11;
    const FLOAT: u8 = 0x12;
    const STRING: u8 = 0x13;
    const BOOL: u8 = 0x14;
    const LIST: u8 = 0x15;
    const STRUCT: u8 = 0x16;
    const MATRIX: u8 = 0x17;
}

pub type BsonBackend = BinaryCodec<BsonTags>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::engine::Serializer;
    use crate::formats::BinaryBackend;
    use crate::{value, Error, Options};

    #[test]
    fn test_distinct_tags() {
        let v = value!({"xs": [1, 2.5, "s"]});
        let bson = Serializer::new(BsonBackend::new(), Options::default())
            .write(&v)
            .unwrap();
        assert_eq!(bson[0], 0x16);
        assert_eq!(
            Serializer::new(BsonBackend::new(), Options::default())
                .read(&bson)
                .unwrap(),
            v
        );

        let err = Serializer::new(BinaryBackend::new(), Options::default())
            .read(&bson)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { offset: 0, .. }));
    }

    #[test]
    fn test_identity() {
        let backend = BsonBackend::new();
        assert_eq!(backend.format(), Format::Bson);
        assert!(!backend.is_text_based());
    }
}
