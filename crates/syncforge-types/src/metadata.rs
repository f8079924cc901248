use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form key-value metadata carried alongside a [`crate::StatusUpdate`].
///
/// Per spec.md §9 ("object spread / free-form metadata"), this is kept as a
/// structured map rather than an open-ended dynamic object: the mapper's
/// typed sections (`mapping_info`, `updated_at`, `job_metadata`) are
/// inserted as ordinary entries alongside whatever opaque values the
/// originating system attached. `BTreeMap` keeps serialized output
/// deterministic, which matters for the idempotent-broadcast property in
/// spec.md §8.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
