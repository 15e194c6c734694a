//! Configuration snapshots
//!
//! A snapshot is an immutable view of the shared configuration at one
//! revision. Readers thread a snapshot through every lookup; writers derive a
//! new snapshot from an old one and hand it back to the store for commit.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::store::{StoreError, StoreResult};

/// Immutable view of the shared configuration at one revision.
///
/// Cloning is cheap: the entries are shared behind an `Arc` and copied only
/// when a derived snapshot is built with [`Snapshot::with`] or
/// [`Snapshot::without`].
///
/// # Example
///
/// ```
/// use cluster_config::Snapshot;
///
/// let snapshot = Snapshot::empty().with("buckets", vec!["default"]).unwrap();
/// let buckets: Vec<String> = snapshot.search_as("buckets").unwrap().unwrap();
/// assert_eq!(buckets, vec!["default".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    revision: u64,
    entries: Arc<BTreeMap<String, serde_json::Value>>,
}

impl Snapshot {
    /// Create an empty snapshot at revision zero.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot from raw entries.
    pub fn from_entries(revision: u64, entries: BTreeMap<String, serde_json::Value>) -> Self {
        Self {
            revision,
            entries: Arc::new(entries),
        }
    }

    /// Revision this snapshot was read at.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Return a copy of this snapshot stamped with another revision.
    pub(crate) fn at_revision(&self, revision: u64) -> Self {
        Self {
            revision,
            entries: Arc::clone(&self.entries),
        }
    }

    /// Look up the raw value stored under `key`.
    pub fn search(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    /// Look up and decode the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent and an error when the stored
    /// value does not decode as `T`.
    pub fn search_as<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| StoreError::Deserialization {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// Look up and decode `key`, falling back to `default` when absent.
    pub fn search_or<T: DeserializeOwned>(&self, key: &str, default: T) -> StoreResult<T> {
        Ok(self.search_as(key)?.unwrap_or(default))
    }

    /// Check whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over the stored keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Derive a snapshot with `key` set to `value`.
    ///
    /// The revision is carried over unchanged; the store assigns a new one on
    /// commit.
    pub fn with<T: Serialize>(&self, key: impl Into<String>, value: T) -> StoreResult<Self> {
        let value =
            serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut entries = (*self.entries).clone();
        entries.insert(key.into(), value);
        Ok(Self {
            revision: self.revision,
            entries: Arc::new(entries),
        })
    }

    /// Derive a snapshot with `key` removed.
    pub fn without(&self, key: &str) -> Self {
        let mut entries = (*self.entries).clone();
        entries.remove(key);
        Self {
            revision: self.revision,
            entries: Arc::new(entries),
        }
    }

    /// Derive a snapshot with every directive in `updates` applied in order.
    pub fn apply(&self, updates: &[ConfigUpdate]) -> Self {
        let mut entries = (*self.entries).clone();
        for update in updates {
            match update {
                ConfigUpdate::Set { key, value } => {
                    entries.insert(key.clone(), value.clone());
                }
                ConfigUpdate::Delete { key } => {
                    entries.remove(key);
                }
            }
        }
        Self {
            revision: self.revision,
            entries: Arc::new(entries),
        }
    }
}

/// A single change directive against the shared configuration.
///
/// Upgrade and migration routines return lists of directives instead of
/// writing, so the caller decides when and how they are committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ConfigUpdate {
    /// Replace the whole value under `key`.
    Set {
        /// Configuration key.
        key: String,
        /// New value.
        value: serde_json::Value,
    },
    /// Remove `key`.
    Delete {
        /// Configuration key.
        key: String,
    },
}

impl ConfigUpdate {
    /// Build a `Set` directive from any serializable value.
    pub fn set<T: Serialize>(key: impl Into<String>, value: T) -> StoreResult<Self> {
        Ok(ConfigUpdate::Set {
            key: key.into(),
            value: serde_json::to_value(value)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
        })
    }

    /// Build a `Delete` directive.
    pub fn delete(key: impl Into<String>) -> Self {
        ConfigUpdate::Delete { key: key.into() }
    }

    /// Key targeted by this directive.
    pub fn key(&self) -> &str {
        match self {
            ConfigUpdate::Set { key, .. } | ConfigUpdate::Delete { key } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_absent_key() {
        let snapshot = Snapshot::empty();
        assert!(snapshot.search("missing").is_none());
        let decoded: Option<Vec<String>> = snapshot.search_as("missing").unwrap();
        assert!(decoded.is_none());
        assert_eq!(snapshot.search_or("missing", 7u32).unwrap(), 7);
    }

    #[test]
    fn test_with_is_copy_on_write() {
        let base = Snapshot::empty().with("a", 1).unwrap();
        let derived = base.with("b", 2).unwrap();

        assert!(!base.contains("b"));
        assert!(derived.contains("a"));
        assert!(derived.contains("b"));
    }

    #[test]
    fn test_search_as_reports_decode_failure() {
        let snapshot = Snapshot::empty().with("n", "not a number").unwrap();
        let err = snapshot.search_as::<u32>("n").unwrap_err();
        match err {
            StoreError::Deserialization { key, .. } => assert_eq!(key, "n"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_apply_updates_in_order() {
        let snapshot = Snapshot::empty().with("gone", true).unwrap();
        let updates = vec![
            ConfigUpdate::set("k", json!([1, 2])).unwrap(),
            ConfigUpdate::delete("gone"),
            ConfigUpdate::set("k", json!([3])).unwrap(),
        ];

        let applied = snapshot.apply(&updates);
        assert_eq!(applied.search("k"), Some(&json!([3])));
        assert!(!applied.contains("gone"));
        assert_eq!(applied.keys().collect::<Vec<_>>(), vec!["k"]);
    }

    #[test]
    fn test_update_serialization() {
        let update = ConfigUpdate::delete("user_roles");
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"op": "delete", "key": "user_roles"})
        );
        assert_eq!(update.key(), "user_roles");
    }
}
