//! Cluster state consulted during identity resolution and validation.
//!
//! These are the collaborators owned by other subsystems: the bucket catalog,
//! the credential provisioning state and the legacy external authorization
//! lookup. Every query takes the snapshot the caller is working from.

use cluster_config::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read-only view of cluster state needed for authorization.
pub trait ClusterState: Send + Sync {
    /// Whether administrator credentials have ever been set.
    fn is_provisioned(&self, snapshot: &Snapshot) -> bool;

    /// Names of the buckets that currently exist.
    fn bucket_names(&self, snapshot: &Snapshot) -> Vec<String>;

    /// Buckets configured for unauthenticated access.
    fn no_auth_buckets(&self, snapshot: &Snapshot) -> Vec<String>;
}

/// Answer of the legacy external authorization lookup.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LegacyRole {
    /// Full administrator
    Admin,
    /// Read-only administrator
    ReadOnly,
    /// No access
    #[default]
    None,
}

/// Legacy lookup of an external principal's administrative level.
pub trait LegacyAuthLookup: Send + Sync {
    /// Look up the principal.
    fn lookup(&self, principal: &str) -> LegacyRole;
}

/// Fixed cluster state.
#[derive(Debug, Clone, Default)]
pub struct StaticCluster {
    /// Whether administrator credentials have been set
    pub provisioned: bool,
    /// Existing buckets
    pub buckets: Vec<String>,
    /// Buckets open to unauthenticated access
    pub no_auth_buckets: Vec<String>,
}

impl StaticCluster {
    /// A provisioned cluster with the given buckets.
    pub fn provisioned<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            provisioned: true,
            buckets: buckets.into_iter().map(Into::into).collect(),
            no_auth_buckets: Vec::new(),
        }
    }

    /// A cluster that has never had credentials set.
    pub fn unprovisioned() -> Self {
        Self::default()
    }

    /// Open an existing bucket to unauthenticated access.
    pub fn with_no_auth_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.no_auth_buckets.push(bucket.into());
        self
    }
}

impl ClusterState for StaticCluster {
    fn is_provisioned(&self, _snapshot: &Snapshot) -> bool {
        self.provisioned
    }

    fn bucket_names(&self, _snapshot: &Snapshot) -> Vec<String> {
        self.buckets.clone()
    }

    fn no_auth_buckets(&self, _snapshot: &Snapshot) -> Vec<String> {
        self.no_auth_buckets.clone()
    }
}

/// Fixed legacy lookup table; unknown principals get [`LegacyRole::None`].
#[derive(Debug, Clone, Default)]
pub struct StaticLegacyLookup {
    roles: HashMap<String, LegacyRole>,
}

impl StaticLegacyLookup {
    /// Create an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a principal's level.
    pub fn with(mut self, principal: impl Into<String>, role: LegacyRole) -> Self {
        self.roles.insert(principal.into(), role);
        self
    }
}

impl LegacyAuthLookup for StaticLegacyLookup {
    fn lookup(&self, principal: &str) -> LegacyRole {
        self.roles.get(principal).copied().unwrap_or_default()
    }
}
