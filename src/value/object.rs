use indexmap::{map::IntoIter, IndexMap};
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::Value;

/// An object value: response keys mapped to values, in insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    key_value_list: IndexMap<String, Value>,
}

impl Object {
    /// Creates a new [`Object`] with the given number of preallocated slots
    /// for field/value pairs.
    pub fn with_capacity(size: usize) -> Self {
        Self {
            key_value_list: IndexMap::with_capacity(size),
        }
    }

    /// Adds a new field with a value.
    ///
    /// If a field with the given key existed already, the old value is
    /// replaced and returned.
    pub fn add_field(&mut self, k: impl Into<String>, value: Value) -> Option<Value> {
        self.key_value_list.insert(k.into(), value)
    }

    /// Checks whether this object contains a field with the given key.
    pub fn contains_field(&self, k: &str) -> bool {
        self.key_value_list.contains_key(k)
    }

    /// Returns an iterator over all field/value pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.key_value_list.iter()
    }

    /// Returns the current number of fields.
    pub fn field_count(&self) -> usize {
        self.key_value_list.len()
    }

    /// Returns the value of the given field, if present.
    pub fn get_field_value(&self, key: &str) -> Option<&Value> {
        self.key_value_list.get(key)
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.key_value_list.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut obj = Self::with_capacity(iter.size_hint().0);
        for (k, v) in iter {
            obj.add_field(k, v);
        }
        obj
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Self::Object(o)
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.field_count()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
