//! Transactions with conflict retry.
//!
//! A transaction reads the latest snapshot, runs a pure function over it to
//! produce the next snapshot, and commits against the revision it read. When
//! a concurrent writer wins the race the whole cycle runs again, with
//! exponential backoff between attempts.
//!
//! # Example
//!
//! ```rust,no_run
//! use cluster_config::{run_transaction, MemoryConfigStore, TxnRetry};
//!
//! async fn example() {
//!     let store = MemoryConfigStore::new();
//!     let committed = run_transaction(&store, &TxnRetry::default(), |snapshot| {
//!         let count: u64 = snapshot.search_or("counter", 0u64).map_err(|e| e.to_string())?;
//!         snapshot.with("counter", count + 1).map_err(|e| e.to_string())
//!     })
//!     .await
//!     .unwrap();
//!     assert_eq!(committed.revision(), 1);
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use crate::snapshot::{ConfigUpdate, Snapshot};
use crate::store::{CommitStatus, ConfigStore, StoreError};

/// Retry policy for conflicting commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxnRetry {
    /// Maximum number of commit attempts
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Base for exponential backoff
    pub exponential_base: f64,
}

impl Default for TxnRetry {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(500),
            exponential_base: 2.0,
        }
    }
}

impl TxnRetry {
    /// Retry immediately, without sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            exponential_base: 1.0,
        }
    }

    /// Make a single attempt.
    pub fn no_retry() -> Self {
        Self::immediate(1)
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::from_secs_f64(
            (delay.as_secs_f64() * self.exponential_base).min(self.max_delay.as_secs_f64()),
        )
    }
}

/// Transaction failure.
#[derive(Debug, Error)]
pub enum TxnError<E> {
    /// The transaction function aborted with its own reason
    #[error("Transaction aborted: {0}")]
    Aborted(E),

    /// The store failed or retries ran out
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Run `f` as an optimistic transaction against `store`.
///
/// `f` receives the latest snapshot and returns either the snapshot to commit
/// or an abort reason. It may run several times, so it must not have side
/// effects. Returns the committed snapshot, stamped with its new revision.
pub async fn run_transaction<S, F, E>(
    store: &S,
    retry: &TxnRetry,
    mut f: F,
) -> Result<Snapshot, TxnError<E>>
where
    S: ConfigStore + ?Sized,
    F: FnMut(&Snapshot) -> Result<Snapshot, E>,
{
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0;
    let mut delay = retry.initial_delay;

    loop {
        attempt += 1;

        let base = store.latest().await;
        let next = f(&base).map_err(TxnError::Aborted)?;

        match store.commit(base.revision(), next.clone()).await? {
            CommitStatus::Committed(revision) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, revision, "Transaction committed after retry");
                }
                return Ok(next.at_revision(revision));
            }
            CommitStatus::Conflict if attempt >= max_attempts => {
                tracing::error!(attempts = attempt, "All transaction attempts conflicted");
                return Err(StoreError::RetriesExhausted { attempts: attempt }.into());
            }
            CommitStatus::Conflict => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Transaction conflicted, retrying"
                );
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                delay = retry.next_delay(delay);
            }
        }
    }
}

/// Commit a list of update directives as one transaction.
///
/// An empty list commits nothing and returns the latest snapshot.
pub async fn apply_updates<S>(
    store: &S,
    retry: &TxnRetry,
    updates: &[ConfigUpdate],
) -> Result<Snapshot, StoreError>
where
    S: ConfigStore + ?Sized,
{
    if updates.is_empty() {
        return Ok(store.latest().await);
    }

    run_transaction(store, retry, |snapshot| {
        Ok::<_, std::convert::Infallible>(snapshot.apply(updates))
    })
    .await
    .map_err(|e| match e {
        TxnError::Store(e) => e,
        TxnError::Aborted(never) => match never {},
    })
}
