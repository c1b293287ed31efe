//! The dynamically-typed value tree.
//!
//! [`Value`] is a tagged union over five scalar kinds and three containers.
//! Every container owns its children outright: cloning a value deep-copies the
//! whole subtree and dropping it frees the subtree. There is no sharing and no
//! null.
//!
//! ## Core Types
//!
//! - [`Value`]: one node of the tree
//! - [`ValueType`]: the tag of a node, without its payload
//!
//! ## Creating Values
//!
//! ```rust
//! use polyform::{value, Value, ValueType};
//!
//! let zero = Value::new(ValueType::Int);
//! assert_eq!(zero, Value::Int(0));
//!
//! let tree = value!({
//!     "name": "Alice",
//!     "scores": [1, 2, 3]
//! });
//! assert_eq!(tree.struct_size(), Some(2));
//! ```
//!
//! ## Strict and Coercing Getters
//!
//! The `as_*` family returns `None` unless the tag matches exactly. The
//! `get_*` family performs a best-effort coercion between scalar tags and
//! falls back to zero, except [`Value::get_string`], which never coerces.
//!
//! ```rust
//! use polyform::Value;
//!
//! let flag = Value::Bool(true);
//! assert_eq!(flag.as_int(), None);
//! assert_eq!(flag.get_int(), 1);
//!
//! let text = Value::from("42");
//! assert_eq!(text.get_int(), 42);
//! assert_eq!(Value::Int(42).get_string(), None);
//! ```

use crate::{Error, Matrix, Result, StructMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A node of the value tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    /// Unsigned integers stay `UInt` through `From`, serde and the binary
    /// formats, whatever their magnitude.
    UInt(u64),
    Float(f64),
    Bool(bool),
    String(String),
    List(Vec<Value>),
    Struct(StructMap),
    Matrix(Matrix),
}

/// The tag of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int,
    UInt,
    Float,
    Bool,
    String,
    List,
    Struct,
    Matrix,
}

impl ValueType {
    /// Lowercase tag name, as used by the XML backend's `type` attribute.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::UInt => "uint",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::String => "string",
            ValueType::List => "list",
            ValueType::Struct => "struct",
            ValueType::Matrix => "matrix",
        }
    }

    /// Inverse of [`ValueType::name`]; `"array"` is accepted for lists.
    #[must_use]
    pub fn from_name(name: &str) -> Option<ValueType> {
        match name {
            "int" => Some(ValueType::Int),
            "uint" => Some(ValueType::UInt),
            "float" => Some(ValueType::Float),
            "bool" => Some(ValueType::Bool),
            "string" => Some(ValueType::String),
            "list" | "array" => Some(ValueType::List),
            "struct" => Some(ValueType::Struct),
            "matrix" => Some(ValueType::Matrix),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl Value {
    /// Creates the zero value for a tag: `0`, `""`, `false`, an empty
    /// container, or a single-element zero matrix.
    #[must_use]
    pub fn new(tag: ValueType) -> Self {
        match tag {
            ValueType::Int => Value::Int(0),
            ValueType::UInt => Value::UInt(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Bool => Value::Bool(false),
            ValueType::String => Value::String(String::new()),
            ValueType::List => Value::List(Vec::new()),
            ValueType::Struct => Value::Struct(StructMap::new()),
            ValueType::Matrix => Value::Matrix(Matrix::default()),
        }
    }

    #[inline]
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::UInt(_) => ValueType::UInt,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Struct(_) => ValueType::Struct,
            Value::Matrix(_) => ValueType::Matrix,
        }
    }

    /// Returns `true` for the scalar tags.
    #[inline]
    #[must_use]
    pub const fn is_value(&self) -> bool {
        matches!(
            self,
            Value::Int(_) | Value::UInt(_) | Value::Float(_) | Value::Bool(_) | Value::String(_)
        )
    }

    /// Returns `true` for lists and structs. A matrix is neither a value nor
    /// a container.
    #[inline]
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Struct(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_struct(&self) -> bool {
        matches!(self, Value::Struct(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_matrix(&self) -> bool {
        matches!(self, Value::Matrix(_))
    }

    fn mismatch(&self, expected: ValueType) -> Error {
        Error::type_mismatch(expected.name(), self.value_type().name())
    }

    // Strict getters

    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// If the value is a boolean, returns it. Otherwise returns `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use polyform::Value;
    ///
    /// assert_eq!(Value::Bool(true).as_bool(), Some(true));
    /// assert_eq!(Value::from(42).as_bool(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_struct(&self) -> Option<&StructMap> {
        match self {
            Value::Struct(map) => Some(map),
            _ => None,
        }
    }

    #[inline]
    pub fn as_struct_mut(&mut self) -> Option<&mut StructMap> {
        match self {
            Value::Struct(map) => Some(map),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Value::Matrix(m) => Some(m),
            _ => None,
        }
    }

    #[inline]
    pub fn as_matrix_mut(&mut self) -> Option<&mut Matrix> {
        match self {
            Value::Matrix(m) => Some(m),
            _ => None,
        }
    }

    // Coercing getters

    /// Integer view of a scalar: numeric tags are cast, `Bool` is 0/1, a
    /// `String` is parsed. Anything else, or an unparsable string, is 0.
    #[must_use]
    pub fn get_int(&self) -> i64 {
        match self {
            Value::Int(i) => *i,
            Value::UInt(u) => *u as i64,
            Value::Float(f) => *f as i64,
            Value::Bool(b) => i64::from(*b),
            Value::String(s) => parse_leading_float(s)
                .map(|f| s.trim().parse::<i64>().unwrap_or(f as i64))
                .unwrap_or(0),
            _ => 0,
        }
    }

    #[must_use]
    pub fn get_uint(&self) -> u64 {
        match self {
            Value::Int(i) => *i as u64,
            Value::UInt(u) => *u,
            Value::Float(f) => *f as u64,
            Value::Bool(b) => u64::from(*b),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .ok()
                .or_else(|| parse_leading_float(s).map(|f| f as u64))
                .unwrap_or(0),
            _ => 0,
        }
    }

    #[must_use]
    pub fn get_float(&self) -> f64 {
        match self {
            Value::Int(i) => *i as f64,
            Value::UInt(u) => *u as f64,
            Value::Float(f) => *f,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::String(s) => parse_leading_float(s).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Boolean view of a scalar: non-zero numbers are `true`; strings are
    /// `true` for `"true"` (any case) or a non-zero number.
    #[must_use]
    pub fn get_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::UInt(u) => *u != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || parse_leading_float(s).is_some_and(|f| f != 0.0)
            }
            _ => false,
        }
    }

    /// The string payload. Never coerces other tags.
    #[inline]
    #[must_use]
    pub fn get_string(&self) -> Option<&str> {
        self.as_str()
    }

    // Setters

    pub fn set_int(&mut self, value: i64) -> Result<()> {
        match self {
            Value::Int(i) => {
                *i = value;
                Ok(())
            }
            _ => Err(self.mismatch(ValueType::Int)),
        }
    }

    pub fn set_uint(&mut self, value: u64) -> Result<()> {
        match self {
            Value::UInt(u) => {
                *u = value;
                Ok(())
            }
            _ => Err(self.mismatch(ValueType::UInt)),
        }
    }

    pub fn set_float(&mut self, value: f64) -> Result<()> {
        match self {
            Value::Float(f) => {
                *f = value;
                Ok(())
            }
            _ => Err(self.mismatch(ValueType::Float)),
        }
    }

    pub fn set_bool(&mut self, value: bool) -> Result<()> {
        match self {
            Value::Bool(b) => {
                *b = value;
                Ok(())
            }
            _ => Err(self.mismatch(ValueType::Bool)),
        }
    }

    pub fn set_string(&mut self, value: impl Into<String>) -> Result<()> {
        match self {
            Value::String(s) => {
                *s = value.into();
                Ok(())
            }
            _ => Err(self.mismatch(ValueType::String)),
        }
    }

    // List operations

    fn list_ref(&self) -> Result<&Vec<Value>> {
        self.as_list().ok_or_else(|| self.mismatch(ValueType::List))
    }

    fn list_mut(&mut self) -> Result<&mut Vec<Value>> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(other.mismatch(ValueType::List)),
        }
    }

    /// Number of list elements, or `None` when this is not a list.
    #[must_use]
    pub fn list_size(&self) -> Option<usize> {
        self.as_list().map(Vec::len)
    }

    #[must_use]
    pub fn list_get(&self, index: usize) -> Option<&Value> {
        self.as_list().and_then(|items| items.get(index))
    }

    /// Replaces the element at `index`, returning the old one.
    pub fn list_set(&mut self, index: usize, value: Value) -> Result<Value> {
        let items = self.list_mut()?;
        let len = items.len();
        match items.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(Error::index_out_of_range(index, len)),
        }
    }

    /// Inserts at `index`; `index == size` appends.
    pub fn list_insert(&mut self, index: usize, value: Value) -> Result<()> {
        let items = self.list_mut()?;
        if index > items.len() {
            return Err(Error::index_out_of_range(index, items.len()));
        }
        items.insert(index, value);
        Ok(())
    }

    pub fn list_remove(&mut self, index: usize) -> Result<Value> {
        let items = self.list_mut()?;
        if index >= items.len() {
            return Err(Error::index_out_of_range(index, items.len()));
        }
        Ok(items.remove(index))
    }

    pub fn list_push(&mut self, value: Value) -> Result<()> {
        self.list_mut()?.push(value);
        Ok(())
    }

    /// Removes the last element; fails on an empty list.
    pub fn list_pop(&mut self) -> Result<Value> {
        self.list_mut()?
            .pop()
            .ok_or_else(|| Error::index_out_of_range(0, 0))
    }

    // Struct operations

    fn struct_mut(&mut self) -> Result<&mut StructMap> {
        match self {
            Value::Struct(map) => Ok(map),
            other => Err(other.mismatch(ValueType::Struct)),
        }
    }

    #[must_use]
    pub fn struct_size(&self) -> Option<usize> {
        self.as_struct().map(StructMap::len)
    }

    #[must_use]
    pub fn struct_has(&self, key: &str) -> bool {
        self.as_struct().is_some_and(|map| map.has(key))
    }

    #[must_use]
    pub fn struct_get(&self, key: &str) -> Option<&Value> {
        self.as_struct().and_then(|map| map.get(key))
    }

    #[must_use]
    pub fn struct_key_at(&self, index: usize) -> Option<&str> {
        self.as_struct().and_then(|map| map.key_at(index))
    }

    #[must_use]
    pub fn struct_value_at(&self, index: usize) -> Option<&Value> {
        self.as_struct().and_then(|map| map.value_at(index))
    }

    /// Adds a new key; fails if the key exists or this is not a struct.
    pub fn struct_add(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        self.struct_mut()?.add(key, value)
    }

    /// Adds or replaces a key, returning the previous value.
    pub fn struct_set(&mut self, key: impl Into<String>, value: Value) -> Result<Option<Value>> {
        Ok(self.struct_mut()?.set(key, value))
    }

    pub fn struct_remove(&mut self, key: &str) -> Result<Option<Value>> {
        Ok(self.struct_mut()?.remove(key))
    }

    /// Number of list elements or struct entries; 0 for everything else.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Value::List(items) => items.len(),
            Value::Struct(map) => map.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates list elements; empty for every other tag.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        match self.list_ref() {
            Ok(items) => items.iter(),
            Err(_) => [].iter(),
        }
    }
}

/// Parses the longest numeric prefix of `s` (after leading whitespace),
/// mirroring C's `strtod`.
fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || (end == digits_start + 1 && bytes[digits_start] == b'.') {
        return None;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}u", u),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Struct(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Matrix(m) => write!(f, "matrix{:?}{:?}", m.dims(), m.data()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for element in items {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Value::Struct(map) => {
                use serde::ser::SerializeMap;
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Matrix(m) => {
                use serde::ser::SerializeStruct;
                let mut out = serializer.serialize_struct("Matrix", 2)?;
                out.serialize_field("dims", m.dims())?;
                out.serialize_field("data", m.data())?;
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any scalar, sequence or map")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Value, E> {
                Ok(Value::Int(value))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Value, E> {
                Ok(Value::UInt(value))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E> {
                Ok(Value::Float(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E> {
                Ok(Value::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Value, E> {
                Ok(Value::String(value))
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Struct(StructMap::new()))
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Struct(StructMap::new()))
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
                while let Some(elem) = seq.next_element()? {
                    items.push(elem);
                }
                Ok(Value::List(items))
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut map = StructMap::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    map.set(key, value);
                }
                Ok(Value::Struct(map))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

// TryFrom implementations for extracting payloads
impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(i),
            Value::UInt(u) => i64::try_from(u).map_err(|_| Error::custom(format!("{} overflows i64", u))),
            other => Err(other.mismatch(ValueType::Int)),
        }
    }
}

impl TryFrom<Value> for u64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::UInt(u) => Ok(u),
            Value::Int(i) => u64::try_from(i).map_err(|_| Error::custom(format!("{} is negative", i))),
            other => Err(other.mismatch(ValueType::UInt)),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::UInt(u) => Ok(u as f64),
            other => Err(other.mismatch(ValueType::Float)),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other.mismatch(ValueType::Bool)),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(other.mismatch(ValueType::String)),
        }
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::UInt(u64::from(value))
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64);
from_unsigned!(u8, u16, u32, u64);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<StructMap> for Value {
    fn from(value: StructMap) -> Self {
        Value::Struct(value)
    }
}

impl From<Matrix> for Value {
    fn from(value: Matrix) -> Self {
        Value::Matrix(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_zero_values() {
        assert_eq!(Value::new(ValueType::Int), Value::Int(0));
        assert_eq!(Value::new(ValueType::String), Value::String(String::new()));
        assert_eq!(Value::new(ValueType::List).list_size(), Some(0));
        assert_eq!(Value::new(ValueType::Struct).struct_size(), Some(0));
        let m = Value::new(ValueType::Matrix);
        assert_eq!(m.as_matrix().map(Matrix::total_size), Some(1));
    }

    #[test]
    fn test_classification() {
        assert!(Value::Int(1).is_value());
        assert!(Value::from("s").is_value());
        assert!(!Value::List(vec![]).is_value());
        assert!(Value::List(vec![]).is_container());
        assert!(Value::Struct(StructMap::new()).is_container());
        let m = Value::Matrix(Matrix::new(&[1]).unwrap());
        assert!(!m.is_value());
        assert!(!m.is_container());
    }

    #[test]
    fn test_setters_fail_on_mismatch() {
        let mut v = Value::Int(1);
        assert!(v.set_int(5).is_ok());
        assert_eq!(v, Value::Int(5));
        assert!(matches!(v.set_string("x"), Err(Error::TypeMismatch { .. })));
        assert_eq!(v, Value::Int(5));
    }

    #[test]
    fn test_coercing_getters() {
        assert_eq!(Value::Bool(true).get_int(), 1);
        assert_eq!(Value::Bool(false).get_float(), 0.0);
        assert_eq!(Value::from(" 17 ").get_int(), 17);
        assert_eq!(Value::from("2.5").get_float(), 2.5);
        assert_eq!(Value::from("3.9xyz").get_int(), 3);
        assert_eq!(Value::from("abc").get_int(), 0);
        assert_eq!(Value::from("abc").get_uint(), 0);
        assert_eq!(Value::from("18446744073709551615").get_uint(), u64::MAX);
        assert_eq!(Value::Float(-2.7).get_int(), -2);
        assert!(Value::from("TRUE").get_bool());
        assert!(Value::Int(3).get_bool());
        assert!(!Value::List(vec![]).get_bool());
        assert_eq!(Value::Int(1).get_string(), None);
    }

    #[test]
    fn test_list_operations() {
        let mut list = Value::new(ValueType::List);
        list.list_push(Value::Int(1)).unwrap();
        list.list_push(Value::Int(3)).unwrap();
        list.list_insert(1, Value::Int(2)).unwrap();
        list.list_insert(3, Value::Int(4)).unwrap();
        assert!(list.list_insert(9, Value::Int(0)).is_err());
        assert_eq!(list.list_size(), Some(4));

        assert_eq!(list.list_set(0, Value::Int(10)).unwrap(), Value::Int(1));
        assert!(matches!(
            list.list_set(4, Value::Int(0)),
            Err(Error::IndexOutOfRange { index: 4, len: 4 })
        ));
        assert_eq!(list.list_remove(1).unwrap(), Value::Int(2));
        assert!(list.list_remove(3).is_err());
        assert_eq!(list.list_pop().unwrap(), Value::Int(4));
        assert_eq!(list.list_get(0), Some(&Value::Int(10)));
        assert_eq!(list.list_get(7), None);

        let mut empty = Value::new(ValueType::List);
        assert!(empty.list_pop().is_err());
        assert!(Value::Int(0).list_push(Value::Int(1)).is_err());
    }

    #[test]
    fn test_struct_operations() {
        let mut s = Value::new(ValueType::Struct);
        s.struct_add("a", Value::Int(1)).unwrap();
        s.struct_add("b", Value::Int(2)).unwrap();
        assert!(s.struct_add("a", Value::Int(9)).is_err());
        assert_eq!(s.struct_get("a"), Some(&Value::Int(1)));

        assert_eq!(s.struct_set("a", Value::Int(5)).unwrap(), Some(Value::Int(1)));
        assert_eq!(s.struct_key_at(0), Some("a"));
        assert_eq!(s.struct_value_at(1), Some(&Value::Int(2)));
        assert_eq!(s.struct_remove("a").unwrap(), Some(Value::Int(5)));
        assert_eq!(s.struct_key_at(0), Some("b"));
        assert!(!s.struct_has("a"));
        assert!(Value::Int(0).struct_set("k", Value::Int(0)).is_err());
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = Value::List(vec![Value::Struct(StructMap::new())]);
        let copy = original.clone();
        if let Some(Value::Struct(map)) = original.as_list_mut().and_then(|l| l.get_mut(0)) {
            map.set("k", Value::Int(1));
        }
        assert_eq!(copy.list_get(0).and_then(Value::struct_size), Some(0));
        assert_eq!(original.list_get(0).and_then(Value::struct_size), Some(1));
        assert_eq!(copy.clone().clone(), copy);
    }

    #[test]
    fn test_tryfrom() {
        assert_eq!(i64::try_from(Value::Int(-3)).unwrap(), -3);
        assert_eq!(i64::try_from(Value::UInt(3)).unwrap(), 3);
        assert!(i64::try_from(Value::UInt(u64::MAX)).is_err());
        assert!(u64::try_from(Value::Int(-1)).is_err());
        assert_eq!(f64::try_from(Value::Int(2)).unwrap(), 2.0);
        assert!(bool::try_from(Value::Int(1)).is_err());
        assert_eq!(String::try_from(Value::from("x")).unwrap(), "x");
    }

    #[test]
    fn test_from_primitives() {
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(42u8), Value::UInt(42));
        assert_eq!(Value::from(1.5f32), Value::Float(1.5));
        assert_eq!(Value::from(true), Value::Bool(true));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ValueType::from_name("array"), Some(ValueType::List));
        for tag in [ValueType::Int, ValueType::Matrix, ValueType::Struct] {
            assert_eq!(ValueType::from_name(tag.name()), Some(tag));
        }
        assert_eq!(ValueType::from_name("null"), None);
    }

    #[test]
    fn test_deserialize_keeps_unsigned() {
        let v: Value = serde_json::from_str("[3, -3, 18446744073709551615, 1.5]").unwrap();
        assert_eq!(
            v,
            Value::List(vec![Value::UInt(3), Value::Int(-3), Value::UInt(u64::MAX), Value::Float(1.5)])
        );

        // Serializing and deserializing agree with the From impls.
        assert_eq!(crate::to_value(&7u8).unwrap(), Value::from(7u8));
        let back: Value = crate::from_value(Value::from(7u8)).unwrap();
        assert_eq!(back, Value::UInt(7));
    }

    #[test]
    fn test_display() {
        let v = Value::List(vec![Value::Int(1), Value::from("a"), Value::Float(2.0)]);
        assert_eq!(v.to_string(), "[1, \"a\", 2.0]");
    }
}
