//! Identity-level authorization
//!
//! [`Authorizer`] maps an identity to its role assignments, compiles them
//! against the live role definitions and evaluates permissions. Every call
//! takes the snapshot to read from; the authorizer itself holds no config.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cluster_auth::{Authorizer, AuthzSettings, Identity, StaticCluster, StaticLegacyLookup};
//! use cluster_config::Snapshot;
//! use cluster_rbac::Permission;
//!
//! let authorizer = Authorizer::new(
//!     AuthzSettings::default(),
//!     Arc::new(StaticCluster::provisioned(["default"])),
//!     Arc::new(StaticLegacyLookup::new()),
//! )
//! .unwrap();
//!
//! let snapshot = Snapshot::empty();
//! let read = Permission::parse("cluster.bucket[default].data!read").unwrap();
//! assert!(authorizer.is_allowed(&snapshot, &Identity::bucket("default"), &read).unwrap());
//! assert!(!authorizer.is_allowed(&snapshot, &Identity::anonymous(), &read).unwrap());
//! ```

use cluster_config::Snapshot;
use cluster_rbac::roles::{ADMIN, BUCKET_SASL, RO_ADMIN};
use cluster_rbac::{
    assignable_roles, compile_roles, definitions, is_allowed, is_any_allowed, CompiledRole, Permission,
    RoleAssignment, RoleDefinition, RoleProps, Value,
};
use std::sync::Arc;

use crate::cluster::{ClusterState, LegacyAuthLookup, LegacyRole};
use crate::error::AuthResult;
use crate::identity::{AuthMethod, Identity};
use crate::settings::AuthzSettings;
use crate::users::user_roles;

/// Resolves identities to roles and evaluates permissions.
pub struct Authorizer {
    settings: AuthzSettings,
    cluster: Arc<dyn ClusterState>,
    legacy: Arc<dyn LegacyAuthLookup>,
}

impl Authorizer {
    /// Create an authorizer after validating `settings`.
    pub fn new(
        settings: AuthzSettings,
        cluster: Arc<dyn ClusterState>,
        legacy: Arc<dyn LegacyAuthLookup>,
    ) -> AuthResult<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            cluster,
            legacy,
        })
    }

    /// Get the settings in use.
    pub fn settings(&self) -> &AuthzSettings {
        &self.settings
    }

    /// Role assignments held by `identity`.
    pub fn roles_for(&self, snapshot: &Snapshot, identity: &Identity) -> AuthResult<Vec<RoleAssignment>> {
        let roles = match identity.method {
            AuthMethod::Admin => vec![RoleAssignment::simple(ADMIN)],
            AuthMethod::RoAdmin => vec![RoleAssignment::simple(RO_ADMIN)],
            AuthMethod::Bucket => vec![bucket_sasl(&identity.principal)],
            AuthMethod::InvalidToken if identity.is_unnamed() => self.bootstrap_admin(snapshot),
            AuthMethod::InvalidToken => Vec::new(),
            AuthMethod::Anonymous if identity.is_unnamed() => {
                if self.cluster.is_provisioned(snapshot) {
                    self.cluster
                        .no_auth_buckets(snapshot)
                        .iter()
                        .map(|bucket| bucket_sasl(bucket))
                        .collect()
                } else {
                    vec![RoleAssignment::simple(ADMIN)]
                }
            }
            AuthMethod::Anonymous => Vec::new(),
            AuthMethod::External if self.settings.legacy_mode => {
                match self.legacy.lookup(&identity.principal) {
                    LegacyRole::Admin => vec![RoleAssignment::simple(ADMIN)],
                    LegacyRole::ReadOnly => vec![RoleAssignment::simple(RO_ADMIN)],
                    LegacyRole::None => Vec::new(),
                }
            }
            AuthMethod::External => user_roles(snapshot, identity)?,
        };
        Ok(roles)
    }

    // Before any credentials are set there is nobody to authenticate as.
    fn bootstrap_admin(&self, snapshot: &Snapshot) -> Vec<RoleAssignment> {
        if self.cluster.is_provisioned(snapshot) {
            Vec::new()
        } else {
            vec![RoleAssignment::simple(ADMIN)]
        }
    }

    /// Role definitions visible in `snapshot`.
    pub fn definitions(&self, snapshot: &Snapshot) -> AuthResult<Vec<RoleDefinition>> {
        Ok(definitions(self.settings.role_source, snapshot)?)
    }

    /// Compile the roles of `identity`.
    ///
    /// Fails with [`crate::AuthError::DataCorruption`] when a stored
    /// assignment no longer fits the definitions.
    pub fn compiled_roles_for(&self, snapshot: &Snapshot, identity: &Identity) -> AuthResult<Vec<CompiledRole>> {
        let assignments = self.roles_for(snapshot, identity)?;
        Ok(compile_roles(&assignments, &self.definitions(snapshot)?)?)
    }

    /// Check whether `identity` holds `permission`.
    pub fn is_allowed(&self, snapshot: &Snapshot, identity: &Identity, permission: &Permission) -> AuthResult<bool> {
        let allowed = is_allowed(permission, &self.compiled_roles_for(snapshot, identity)?);
        tracing::debug!(identity = %identity, permission = %permission, allowed, "Authorization decision");
        Ok(allowed)
    }

    /// Check whether `identity` holds at least one of `permissions`.
    pub fn is_any_allowed(
        &self,
        snapshot: &Snapshot,
        identity: &Identity,
        permissions: &[Permission],
    ) -> AuthResult<bool> {
        Ok(is_any_allowed(permissions, &self.compiled_roles_for(snapshot, identity)?))
    }

    /// Every role instance that can be assigned to a user right now.
    pub fn assignable_roles(&self, snapshot: &Snapshot) -> AuthResult<Vec<(RoleAssignment, RoleProps)>> {
        Ok(assignable_roles(
            &self.definitions(snapshot)?,
            &self.cluster.bucket_names(snapshot),
        ))
    }
}

fn bucket_sasl(bucket: &str) -> RoleAssignment {
    RoleAssignment::with_param(BUCKET_SASL, Value::named(bucket))
}
