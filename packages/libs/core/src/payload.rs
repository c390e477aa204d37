//! Ordered field → value mapping
//!
//! Field order is significant: it decides the order of column lists and of
//! `$n` bind parameters in every generated statement.

use crate::value::Value;

/// Ordered mapping of field names to values, used for writes and filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    fields: Vec<(String, Value)>,
}

/// Filters share the payload shape; null values compile to `is null`.
pub type Filter = Payload;

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field. An existing field keeps its position and gets the new value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build from a JSON object. Non-object input yields `None`.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(map.into_iter().collect()),
            _ => None,
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Payload
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut payload = Payload::new();
        for (k, v) in iter {
            payload.set(k, v);
        }
        payload
    }
}

impl IntoIterator for Payload {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Build a [`Payload`] preserving the written field order.
///
/// ```
/// use tk_core::{payload, Value};
///
/// let p = payload! { "stringCol" => Value::Null, "integerCol" => 1 };
/// assert_eq!(p.keys().collect::<Vec<_>>(), vec!["stringCol", "integerCol"]);
/// ```
#[macro_export]
macro_rules! payload {
    () => { $crate::Payload::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut payload = $crate::Payload::new();
        $( payload.set($name, $value); )+
        payload
    }};
}
