//! Config store implementation
//!
//! This module provides the shared config store abstraction and an
//! in-memory implementation with optimistic, revision-checked commits.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::snapshot::Snapshot;

/// Config store error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A value could not be encoded for storage
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored value could not be decoded
    #[error("Failed to decode config key {key}: {message}")]
    Deserialization {
        /// Configuration key.
        key: String,
        /// Decoder message.
        message: String,
    },

    /// Every commit attempt lost to a concurrent writer
    #[error("Transaction gave up after {attempts} conflicting commits")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// Backend failure
    #[error("Config backend error: {0}")]
    Backend(String),
}

/// Result type for config store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a single commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// The new snapshot is now the latest, at the given revision.
    Committed(u64),
    /// Another writer committed first; the base revision is stale.
    Conflict,
}

/// Shared configuration store.
///
/// Readers take the latest snapshot. Writers derive a new snapshot from a
/// base and commit it against the base revision; the commit is rejected with
/// [`CommitStatus::Conflict`] if anyone else committed in between. Retry on
/// conflict lives in [`crate::txn::run_transaction`], not in implementations.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Get the latest committed snapshot.
    async fn latest(&self) -> Snapshot;

    /// Commit `snapshot` if the latest revision still equals `base_revision`.
    async fn commit(&self, base_revision: u64, snapshot: Snapshot) -> StoreResult<CommitStatus>;

    /// Get store statistics.
    async fn stats(&self) -> StoreStats;
}

/// Config store statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Successful commits
    pub commits: u64,
    /// Commits rejected because the base revision was stale
    pub conflicts: u64,
}

/// In-memory config store implementation.
///
/// Suitable for single-process deployments and testing.
#[derive(Clone)]
pub struct MemoryConfigStore {
    /// Latest committed snapshot
    current: Arc<RwLock<Snapshot>>,
    /// Statistics
    stats: Arc<RwLock<StoreStats>>,
}

impl std::fmt::Debug for MemoryConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConfigStore").finish_non_exhaustive()
    }
}

impl MemoryConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::empty())
    }

    /// Create a store seeded with `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: Arc::new(RwLock::new(snapshot)),
            stats: Arc::new(RwLock::new(StoreStats::default())),
        }
    }
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn latest(&self) -> Snapshot {
        self.current.read().await.clone()
    }

    async fn commit(&self, base_revision: u64, snapshot: Snapshot) -> StoreResult<CommitStatus> {
        let mut current = self.current.write().await;

        if current.revision() != base_revision {
            let mut stats = self.stats.write().await;
            stats.conflicts += 1;
            tracing::warn!(
                base_revision,
                latest_revision = current.revision(),
                "Config commit conflict"
            );
            return Ok(CommitStatus::Conflict);
        }

        let revision = base_revision + 1;
        *current = snapshot.at_revision(revision);

        {
            let mut stats = self.stats.write().await;
            stats.commits += 1;
        }

        tracing::debug!(revision, "Config snapshot committed");
        Ok(CommitStatus::Committed(revision))
    }

    async fn stats(&self) -> StoreStats {
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_advances_revision() {
        let store = MemoryConfigStore::new();
        let base = store.latest().await;
        assert_eq!(base.revision(), 0);

        let next = base.with("key", "value").unwrap();
        let status = store.commit(base.revision(), next).await.unwrap();
        assert_eq!(status, CommitStatus::Committed(1));

        let latest = store.latest().await;
        assert_eq!(latest.revision(), 1);
        assert_eq!(latest.search("key"), Some(&serde_json::json!("value")));
    }

    #[tokio::test]
    async fn test_stale_commit_conflicts() {
        let store = MemoryConfigStore::new();
        let base = store.latest().await;

        let first = base.with("writer", 1).unwrap();
        let second = base.with("writer", 2).unwrap();

        store.commit(base.revision(), first).await.unwrap();
        let status = store.commit(base.revision(), second).await.unwrap();
        assert_eq!(status, CommitStatus::Conflict);

        let latest = store.latest().await;
        assert_eq!(latest.search("writer"), Some(&serde_json::json!(1)));

        let stats = store.stats().await;
        assert_eq!(stats.commits, 1);
        assert_eq!(stats.conflicts, 1);
    }

    #[tokio::test]
    async fn test_readers_keep_their_snapshot() {
        let store = MemoryConfigStore::new();
        let before = store.latest().await;

        let next = before.with("k", true).unwrap();
        store.commit(before.revision(), next).await.unwrap();

        assert!(!before.contains("k"));
        assert!(store.latest().await.contains("k"));
    }
}
