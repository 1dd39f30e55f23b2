//! Extraction schema and response types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name to extracted value (or null), in schema order.
pub type ExtractorResponse = IndexMap<String, Option<String>>;

/// Ordered mapping of field name to a natural-language description.
///
/// Order only breaks ties between fields of equal priority; the cache key
/// is computed over [`Schema::sorted`] so it never depends on order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(IndexMap<String, String>);

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, description: impl Into<String>) {
        self.0.insert(name.into(), description.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keep only the named fields, preserving this schema's order.
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Schema {
        self.0
            .iter()
            .filter(|(name, _)| names.iter().any(|n| n.as_ref() == name.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Entries sorted by field name.
    pub fn sorted(&self) -> BTreeMap<&str, &str> {
        self.iter().collect()
    }

    /// Project a partial value map onto this schema's exact key set.
    pub fn project<F>(&self, mut value_of: F) -> ExtractorResponse
    where
        F: FnMut(&str) -> Option<String>,
    {
        self.names()
            .map(|name| (name.to_string(), value_of(name)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Schema {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// True when a value counts as extracted (non-null and non-blank).
pub fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
