//! Serde deserialization out of the value tree.
//!
//! [`ValueDeserializer`] drives any `T: Deserialize` from an owned [`Value`].
//! It is the reverse of [`ValueSerializer`](crate::ser::ValueSerializer): an
//! empty struct stands in for `None` and `()`, and enums are read externally
//! tagged.
//!
//! ```rust
//! use polyform::{from_value, value};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct User { name: String, age: u32, email: Option<String> }
//!
//! let v = value!({"name": "Ada", "age": 36, "email": {}});
//! let user: User = from_value(v).unwrap();
//! assert_eq!(user, User { name: "Ada".into(), age: 36, email: None });
//! ```

use crate::{Error, Matrix, Result, StructMap, Value};
use serde::de::{self, DeserializeOwned, IntoDeserializer};
use serde::forward_to_deserialize_any;

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(map: StructMap) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(ValueDeserializer::new(Value::String(key)))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(ValueDeserializer::new(Value::String(self.variant)))?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            None => Ok(()),
            Some(Value::Struct(map)) if map.is_empty() => Ok(()),
            Some(other) => Err(Error::type_mismatch("unit variant", other.value_type().name())),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("expected newtype variant")),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::List(items)) => visitor.visit_seq(SeqDeserializer::new(items)),
            _ => Err(Error::custom("expected tuple variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Struct(map)) => visitor.visit_map(MapDeserializer::new(map)),
            _ => Err(Error::custom("expected struct variant")),
        }
    }
}

/// Deserializer that reads from an owned [`Value`].
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    pub fn new(value: Value) -> Self {
        ValueDeserializer { value }
    }
}

fn matrix_as_map(matrix: Matrix) -> StructMap {
    let (dims, data) = matrix.into_parts();
    let mut map = StructMap::with_capacity(2);
    map.set(
        "dims",
        Value::List(dims.into_iter().map(|d| Value::UInt(d as u64)).collect()),
    );
    map.set("data", Value::List(data.into_iter().map(Value::Float).collect()));
    map
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Int(i) => visitor.visit_i64(i),
            Value::UInt(u) => visitor.visit_u64(u),
            Value::Float(f) => visitor.visit_f64(f),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::String(s) => visitor.visit_string(s),
            Value::List(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            Value::Struct(map) => visitor.visit_map(MapDeserializer::new(map)),
            Value::Matrix(m) => visitor.visit_map(MapDeserializer::new(matrix_as_map(m))),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match &self.value {
            Value::Struct(map) if map.is_empty() => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Struct(map) if map.is_empty() => visitor.visit_unit(),
            other => Err(Error::type_mismatch("unit", other.value_type().name())),
        }
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::String(s) => visitor.visit_enum(s.into_deserializer()),
            Value::Struct(map) if map.len() == 1 => {
                let Some((variant, value)) = map.into_iter().next() else {
                    return Err(Error::custom("expected enum variant"));
                };
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    value: Some(value),
                })
            }
            other => Err(Error::type_mismatch("enum", other.value_type().name())),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf seq tuple tuple_struct map struct identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = ValueDeserializer;

    fn into_deserializer(self) -> ValueDeserializer {
        ValueDeserializer::new(self)
    }
}

/// Builds a `T` out of a [`Value`] tree.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(ValueDeserializer::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    enum Shape {
        Empty,
        Circle(f64),
        Rect(u32, u32),
        Poly { sides: u8 },
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Meters(f64);

    fn tagged(variant: &str, value: Value) -> Value {
        let mut map = StructMap::new();
        map.set(variant, value);
        Value::Struct(map)
    }

    #[test]
    fn test_numbers_widen_and_narrow() {
        assert_eq!(from_value::<u8>(Value::Int(200)).unwrap(), 200);
        assert!(from_value::<u8>(Value::Int(300)).is_err());
        assert_eq!(from_value::<f64>(Value::Int(3)).unwrap(), 3.0);
        assert_eq!(from_value::<i64>(Value::UInt(7)).unwrap(), 7);
        assert_eq!(from_value::<Meters>(Value::Float(1.5)).unwrap(), Meters(1.5));
    }

    #[test]
    fn test_option_from_empty_struct() {
        let none: Option<i32> = from_value(Value::Struct(StructMap::new())).unwrap();
        assert_eq!(none, None);
        let some: Option<i32> = from_value(Value::Int(4)).unwrap();
        assert_eq!(some, Some(4));
        assert!(from_value::<()>(Value::Int(0)).is_err());
    }

    #[test]
    fn test_enums() {
        assert_eq!(from_value::<Shape>(Value::from("Empty")).unwrap(), Shape::Empty);
        assert_eq!(
            from_value::<Shape>(tagged("Circle", Value::Float(1.0))).unwrap(),
            Shape::Circle(1.0)
        );
        assert_eq!(
            from_value::<Shape>(tagged(
                "Rect",
                Value::List(vec![Value::Int(2), Value::Int(3)])
            ))
            .unwrap(),
            Shape::Rect(2, 3)
        );
        let mut fields = StructMap::new();
        fields.set("sides", Value::Int(6));
        assert_eq!(
            from_value::<Shape>(tagged("Poly", Value::Struct(fields))).unwrap(),
            Shape::Poly { sides: 6 }
        );
        assert!(from_value::<Shape>(Value::Int(1)).is_err());
    }

    #[test]
    fn test_matrix_reads_as_dims_and_data() {
        #[derive(Deserialize)]
        struct Grid {
            dims: Vec<usize>,
            data: Vec<f64>,
        }
        let m = Matrix::from_data(&[2], vec![1.0, 2.0]).unwrap();
        let grid: Grid = from_value(Value::Matrix(m)).unwrap();
        assert_eq!(grid.dims, vec![2]);
        assert_eq!(grid.data, vec![1.0, 2.0]);
    }

    #[test]
    fn test_value_to_value() {
        let original = Value::List(vec![Value::UInt(u64::MAX), Value::Int(-1)]);
        let copy: Value = from_value(original.clone()).unwrap();
        assert_eq!(copy, original);
    }
}
