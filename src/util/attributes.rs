use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

/// An ordered attribute bag with ASCII case-insensitive keys.
///
/// Feed producers routinely mis-capitalize attribute names (`xmlURL`, `XMLUrl`,
/// `htmlurl`), so lookups compare keys with [`str::eq_ignore_ascii_case`]. The
/// spelling of the first insertion is preserved for display and export, and
/// insertion order is kept.
///
/// Keys are `Arc<str>` so parsers can hand in interned names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: Vec<(Arc<str>, String)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any existing value whose key matches
    /// case-insensitively. The replaced entry keeps its position and spelling.
    pub fn insert(&mut self, key: impl Into<Arc<str>>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&key))
        {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Like [`get`](Self::get), but treats an empty or whitespace-only value
    /// as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.trim().is_empty())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_ref(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeMap
where
    K: Into<Arc<str>>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AttributeMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Serialize for AttributeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key.as_ref(), value)?;
        }
        map.end()
    }
}
