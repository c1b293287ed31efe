//! Ordered, unique-key storage for struct values.
//!
//! [`StructMap`] wraps an [`IndexMap`] so that entries iterate in insertion
//! order and can be addressed both by key and by position. Keys are unique:
//! [`StructMap::add`] refuses a key that is already present, while
//! [`StructMap::set`] replaces the value in place without moving it.
//!
//! ## Examples
//!
//! ```rust
//! use polyform::{StructMap, Value};
//!
//! let mut map = StructMap::new();
//! map.add("name", Value::from("Alice")).unwrap();
//! map.add("age", Value::from(30)).unwrap();
//! assert!(map.add("age", Value::from(31)).is_err());
//!
//! map.set("name", Value::from("Bob"));
//! assert_eq!(map.key_at(0), Some("name"));
//! assert_eq!(map.get("name").and_then(|v| v.as_str()), Some("Bob"));
//! ```

use crate::{Error, Result, Value};
use indexmap::IndexMap;

/// An insertion-ordered map of string keys to values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructMap(IndexMap<String, Value>);

impl StructMap {
    /// Creates an empty `StructMap`.
    #[must_use]
    pub fn new() -> Self {
        StructMap(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        StructMap(IndexMap::with_capacity(capacity))
    }

    /// Appends a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateKey`] and leaves the map unchanged if `key`
    /// already exists.
    pub fn add(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        if self.0.contains_key(&key) {
            return Err(Error::duplicate_key(&key));
        }
        self.0.insert(key, value);
        Ok(())
    }

    /// Replaces the value for `key` at its current position, or appends a new
    /// entry. Returns the previous value, if any.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Key of the entry at `index` in insertion order.
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.0.get_index(index).map(|(k, _)| k.as_str())
    }

    /// Value of the entry at `index` in insertion order.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.0.get_index(index).map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the keys of the map, in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.0.keys()
    }

    /// Returns an iterator over the values of the map, in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.0.values()
    }

    /// Returns an iterator over the key-value pairs of the map, in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl IntoIterator for StructMap {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a StructMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Later duplicates replace earlier values, keeping the first position.
impl FromIterator<(String, Value)> for StructMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        StructMap(IndexMap::from_iter(iter))
    }
}
