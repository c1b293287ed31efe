//! Length-prefixed little-endian binary framing.
//!
//! Every value starts with one tag byte. Scalars carry a fixed-size payload,
//! strings and lists a `u32` length, and structs are a run of
//! `(u32 key length, key bytes, value)` entries closed by a zero-length key.
//!
//! | Tag     | Payload                                    |
//! |---------|--------------------------------------------|
//! | Int     | `i64` LE                                   |
//! | UInt    | `u64` LE                                   |
//! | Float   | `f64` LE (IEEE-754 bits)                   |
//! | String  | `u32` length, UTF-8 bytes                  |
//! | Bool    | one byte, 0 or 1                           |
//! | List    | `u32` count, encoded elements              |
//! | Struct  | entries, then `u32` 0                      |
//! | Matrix  | `u32` ndims, `u32` per dim, `f64` per cell |
//!
//! The tag values themselves come from a [`TagSet`], which is how the compact
//! and BSON-like formats share this codec.

use crate::backend::Backend;
use crate::{Error, Format, Result, ValueType};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;
use std::marker::PhantomData;
use tracing::trace;

/// Tag byte assignments for one binary dialect.
pub trait TagSet {
    const FORMAT: Format;
    const INT: u8;
    const UINT: u8;
    const FLOAT: u8;
    const STRING: u8;
    const BOOL: u8;
    const LIST: u8;
    const STRUCT: u8;
    const MATRIX: u8;

    fn tag_of(byte: u8) -> Option<ValueType> {
        match byte {
            b if b == Self::INT => Some(ValueType::Int),
            b if b == Self::UINT => Some(ValueType::UInt),
            b if b == Self::FLOAT => Some(ValueType::Float),
            b if b == Self::STRING => Some(ValueType::String),
            b if b == Self::BOOL => Some(ValueType::Bool),
            b if b == Self::LIST => Some(ValueType::List),
            b if b == Self::STRUCT => Some(ValueType::Struct),
            b if b == Self::MATRIX => Some(ValueType::Matrix),
            _ => None,
        }
    }
}

/// Tags `0x01..=0x08` of the compact binary format.
pub struct Compact;

impl TagSet for Compact {
    const FORMAT: Format = Format::Binary;
    const INT: u8 = 0x01;
    const UINT: u8 = 0x02;
    const FLOAT: u8 = 0x03;
    const STRING: u8 = 0x04;
    const BOOL: u8 = 0x05;
    const LIST: u8 = 0x06;
    const STRUCT: u8 = 0x07;
    const MATRIX: u8 = 0x08;
}

pub struct BinaryCodec<T: TagSet> {
    out: Vec<u8>,
    input: Cursor<Vec<u8>>,
    _tags: PhantomData<T>,
}

pub type BinaryBackend = BinaryCodec<Compact>;

impl<T: TagSet> Default for BinaryCodec<T> {
    fn default() -> Self {
        BinaryCodec {
            out: Vec::new(),
            input: Cursor::new(Vec::new()),
            _tags: PhantomData,
        }
    }
}

impl<T: TagSet> BinaryCodec<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn offset(&self) -> usize {
        self.input.position() as usize
    }

    fn remaining(&self) -> usize {
        self.input.get_ref().len().saturating_sub(self.offset())
    }

    /// Fails unless `n` more bytes are available.
    fn need(&self, n: usize, what: &str) -> Result<()> {
        if self.remaining() < n {
            Err(Error::truncated(self.offset(), what))
        } else {
            Ok(())
        }
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len)
            .map_err(|_| Error::custom(format!("length {} does not fit in u32", len)))?;
        self.out.write_u32::<LittleEndian>(len)?;
        Ok(())
    }

    fn read_len(&mut self, what: &str) -> Result<usize> {
        self.need(4, what)?;
        Ok(self.input.read_u32::<LittleEndian>()? as usize)
    }

    fn expect_tag(&mut self, tag: u8, what: &str) -> Result<()> {
        let offset = self.offset();
        self.need(1, what)?;
        let found = self.input.read_u8()?;
        if found != tag {
            return Err(Error::invalid_format(
                offset,
                &format!("expected {} tag 0x{:02x}, found 0x{:02x}", what, tag, found),
            ));
        }
        Ok(())
    }

    fn read_utf8(&mut self, len: usize, what: &str) -> Result<String> {
        let offset = self.offset();
        self.need(len, what)?;
        let mut bytes = vec![0; len];
        std::io::Read::read_exact(&mut self.input, &mut bytes)?;
        String::from_utf8(bytes).map_err(|_| Error::invalid_format(offset, "string is not valid UTF-8"))
    }
}

impl<T: TagSet> Backend for BinaryCodec<T> {
    fn format(&self) -> Format {
        T::FORMAT
    }

    fn is_text_based(&self) -> bool {
        false
    }

    fn init_write(&mut self) -> Result<()> {
        self.out = Vec::with_capacity(64);
        Ok(())
    }

    fn finish_write(&mut self) -> Result<Vec<u8>> {
        Ok(std::mem::take(&mut self.out))
    }

    fn init_read(&mut self, input: &[u8]) -> Result<()> {
        self.input = Cursor::new(input.to_vec());
        Ok(())
    }

    fn finish_read(&mut self) -> Result<()> {
        if self.remaining() > 0 {
            return Err(Error::invalid_format(
                self.offset(),
                &format!("{} trailing bytes after the root value", self.remaining()),
            ));
        }
        Ok(())
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        self.out.push(T::INT);
        self.out.write_i64::<LittleEndian>(value)?;
        Ok(())
    }

    fn write_uint(&mut self, value: u64) -> Result<()> {
        self.out.push(T::UINT);
        self.out.write_u64::<LittleEndian>(value)?;
        Ok(())
    }

    fn write_float(&mut self, value: f64) -> Result<()> {
        self.out.push(T::FLOAT);
        self.out.write_f64::<LittleEndian>(value)?;
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.out.push(T::STRING);
        self.write_len(value.len())?;
        self.out.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.out.push(T::BOOL);
        self.out.push(u8::from(value));
        Ok(())
    }

    fn write_list_begin(&mut self, len: usize) -> Result<()> {
        self.out.push(T::LIST);
        self.write_len(len)
    }

    fn write_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_struct_begin(&mut self) -> Result<()> {
        self.out.push(T::STRUCT);
        Ok(())
    }

    fn write_struct_key(&mut self, key: &str) -> Result<()> {
        // A zero-length key is the terminator.
        if key.is_empty() {
            return Err(Error::custom("binary struct keys cannot be empty"));
        }
        self.write_len(key.len())?;
        self.out.extend_from_slice(key.as_bytes());
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        self.out.write_u32::<LittleEndian>(0)?;
        Ok(())
    }

    fn write_matrix(&mut self, dims: &[usize], data: &[f64]) -> Result<()> {
        self.out.push(T::MATRIX);
        self.write_len(dims.len())?;
        for &dim in dims {
            self.write_len(dim)?;
        }
        self.out.reserve(data.len() * 8);
        for &cell in data {
            self.out.write_f64::<LittleEndian>(cell)?;
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<ValueType>> {
        let offset = self.offset();
        let Some(&byte) = self.input.get_ref().get(offset) else {
            return Ok(None);
        };
        match T::tag_of(byte) {
            Some(tag) => {
                trace!(offset, byte, %tag, "peeked tag");
                Ok(Some(tag))
            }
            None => Err(Error::invalid_format(
                offset,
                &format!("unknown tag byte 0x{:02x}", byte),
            )),
        }
    }

    fn read_int(&mut self) -> Result<i64> {
        self.expect_tag(T::INT, "int")?;
        self.need(8, "int payload")?;
        Ok(self.input.read_i64::<LittleEndian>()?)
    }

    fn read_uint(&mut self) -> Result<u64> {
        self.expect_tag(T::UINT, "uint")?;
        self.need(8, "uint payload")?;
        Ok(self.input.read_u64::<LittleEndian>()?)
    }

    fn read_float(&mut self) -> Result<f64> {
        self.expect_tag(T::FLOAT, "float")?;
        self.need(8, "float payload")?;
        Ok(self.input.read_f64::<LittleEndian>()?)
    }

    fn read_string(&mut self) -> Result<String> {
        self.expect_tag(T::STRING, "string")?;
        let len = self.read_len("string length")?;
        self.read_utf8(len, "string bytes")
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.expect_tag(T::BOOL, "bool")?;
        self.need(1, "bool payload")?;
        Ok(self.input.read_u8()? != 0)
    }

    fn read_list_begin(&mut self) -> Result<usize> {
        self.expect_tag(T::LIST, "list")?;
        let offset = self.offset();
        let count = self.read_len("list count")?;
        // Every element takes at least two bytes.
        if count > self.remaining() / 2 {
            return Err(Error::truncated(offset, &format!("{} list elements", count)));
        }
        Ok(count)
    }

    fn read_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<()> {
        self.expect_tag(T::STRUCT, "struct")
    }

    fn read_struct_key(&mut self) -> Result<Option<String>> {
        let len = self.read_len("struct key length")?;
        if len == 0 {
            // Leave the terminator for read_struct_end.
            self.input.set_position(self.input.position() - 4);
            return Ok(None);
        }
        self.read_utf8(len, "struct key").map(Some)
    }

    fn read_struct_end(&mut self) -> Result<()> {
        let offset = self.offset();
        match self.read_len("struct terminator")? {
            0 => Ok(()),
            _ => Err(Error::invalid_format(offset, "expected struct terminator")),
        }
    }

    fn read_matrix(&mut self) -> Result<(Vec<usize>, Vec<f64>)> {
        self.expect_tag(T::MATRIX, "matrix")?;
        let offset = self.offset();
        let ndims = self.read_len("matrix rank")?;
        if ndims.saturating_mul(4) > self.remaining() {
            return Err(Error::truncated(offset, "matrix dimensions"));
        }
        let mut dims = Vec::with_capacity(ndims);
        for _ in 0..ndims {
            dims.push(self.read_len("matrix dimension")?);
        }
        let total = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| Error::invalid_format(offset, "matrix size overflows"))?;
        if total.saturating_mul(8) > self.remaining() {
            return Err(Error::truncated(self.offset(), "matrix data"));
        }
        let mut data = Vec::with_capacity(total);
        for _ in 0..total {
            data.push(self.input.read_f64::<LittleEndian>()?);
        }
        Ok((dims, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Serializer;
    use crate::{value, Matrix, Options, Value};

    fn binary() -> Serializer<BinaryBackend> {
        Serializer::new(BinaryBackend::new(), Options::default())
    }

    #[test]
    fn test_scalar_layout() {
        let bytes = binary().write(&Value::Int(-2)).unwrap();
        assert_eq!(bytes, [0x01, 0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);

        let bytes = binary().write(&Value::from("hi")).unwrap();
        assert_eq!(bytes, [0x04, 2, 0, 0, 0, b'h', b'i']);

        let bytes = binary().write(&Value::Bool(true)).unwrap();
        assert_eq!(bytes, [0x05, 1]);
    }

    #[test]
    fn test_struct_sentinel() {
        let bytes = binary().write(&value!({"a": true})).unwrap();
        assert_eq!(bytes, [0x07, 1, 0, 0, 0, b'a', 0x05, 1, 0, 0, 0, 0]);
        assert_eq!(binary().read(&bytes).unwrap(), value!({"a": true}));

        let empty = binary().write(&value!({})).unwrap();
        assert_eq!(empty, [0x07, 0, 0, 0, 0]);
        assert_eq!(binary().read(&empty).unwrap(), value!({}));
    }

    #[test]
    fn test_matrix_layout() {
        let m = Matrix::from_data(&[2, 1], vec![1.0, 2.0]).unwrap();
        let bytes = binary().write(&Value::Matrix(m.clone())).unwrap();
        assert_eq!(bytes.len(), 1 + 4 + 8 + 16);
        assert_eq!(binary().read(&bytes).unwrap(), Value::Matrix(m));
    }

    #[test]
    fn test_extremes_are_lossless() {
        let v = Value::List(vec![
            Value::Int(i64::MIN),
            Value::Int(i64::MAX),
            Value::UInt(u64::MAX),
            Value::UInt(1),
            Value::Float(f64::MIN_POSITIVE),
        ]);
        let bytes = binary().write(&v).unwrap();
        assert_eq!(binary().read(&bytes).unwrap(), v);
    }

    #[test]
    fn test_truncated_input() {
        let bytes = binary().write(&value!(["abc", 1])).unwrap();
        for cut in 1..bytes.len() {
            let err = binary().read(&bytes[..cut]).unwrap_err();
            assert!(
                matches!(err, Error::Truncated { .. } | Error::EndOfStream(_)),
                "cut at {}: {:?}",
                cut,
                err
            );
        }
    }

    #[test]
    fn test_rejects_bad_framing() {
        assert!(matches!(
            binary().read(&[0x42]),
            Err(Error::InvalidFormat { offset: 0, .. })
        ));
        assert!(matches!(
            binary().read(&[0x05, 1, 0]),
            Err(Error::InvalidFormat { offset: 2, .. })
        ));
        // A huge count with no payload must not allocate.
        assert!(matches!(
            binary().read(&[0x06, 0xff, 0xff, 0xff, 0xff]),
            Err(Error::Truncated { .. })
        ));
        assert!(binary().write(&value!({"": 1})).is_err());
    }

    #[test]
    fn test_nonzero_bool_byte_is_true() {
        assert_eq!(binary().read(&[0x05, 7]).unwrap(), Value::Bool(true));
    }
}
