//! # Cluster Config
//!
//! This crate provides the shared configuration store abstraction used by the
//! cluster authorization crates.
//!
//! ## Overview
//!
//! The cluster-config crate handles:
//! - **Snapshots**: Immutable, revisioned views of the configuration
//! - **Update Directives**: `Set`/`Delete` lists emitted by upgrades and migrations
//! - **Store**: Optimistic, revision-checked commits behind an async trait
//! - **Transactions**: Read-compute-commit cycles with conflict retry
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cluster_config::{run_transaction, ConfigStore, MemoryConfigStore, TxnRetry};
//!
//! async fn example() {
//!     let store = MemoryConfigStore::new();
//!
//!     run_transaction(&store, &TxnRetry::default(), |snapshot| {
//!         snapshot.with("buckets", vec!["default"]).map_err(|e| e.to_string())
//!     })
//!     .await
//!     .unwrap();
//!
//!     let latest = store.latest().await;
//!     assert!(latest.contains("buckets"));
//! }
//! ```
//!
//! ## Consistency
//!
//! Readers see a consistent snapshot but are not linearizable against
//! concurrent writers. Writers never lock: a commit against a stale revision
//! is rejected and the transaction function runs again on a fresh snapshot.

pub mod snapshot;
pub mod store;
pub mod txn;

// Re-export main types
pub use snapshot::{ConfigUpdate, Snapshot};
pub use store::{CommitStatus, ConfigStore, MemoryConfigStore, StoreError, StoreResult, StoreStats};
pub use txn::{apply_updates, run_transaction, TxnError, TxnRetry};
