//! Open attribute bag attached to applications and provider profiles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which the applicant's classification is always recorded.
pub const CLASSIFICATION_KEY: &str = "service_type";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentBag(BTreeMap<String, Value>);

impl DocumentBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Layer `overlay` on top of `self`: every key survives, `overlay` wins collisions.
    pub fn merged_with(mut self, overlay: &DocumentBag) -> Self {
        for (key, value) in &overlay.0 {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for DocumentBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Documents for a freshly approved profile.
///
/// Precedence, lowest first: what the stored profile already holds, then the application's
/// documents, then the classification tag, which is re-asserted on every approval.
pub fn merge_profile_documents(
    stored: Option<&DocumentBag>,
    application: Option<&DocumentBag>,
    classification: &str,
) -> DocumentBag {
    let mut merged = stored.cloned().unwrap_or_default();
    if let Some(application) = application {
        merged = merged.merged_with(application);
    }
    merged.insert(CLASSIFICATION_KEY, classification);
    merged
}
