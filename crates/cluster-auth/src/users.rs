//! Persisted user role assignments
//!
//! The `user_roles` config key holds one record per identity. The pure
//! functions here read and derive snapshots; [`UserStore`] wraps them in
//! optimistic transactions against a [`ConfigStore`].

use cluster_config::{run_transaction, ConfigStore, Snapshot, TxnRetry};
use cluster_rbac::{definitions, find_definition, RoleAssignment, RoleDefinition, RoleSource, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cluster::ClusterState;
use crate::error::{AuthError, AuthResult};
use crate::identity::Identity;
use crate::settings::AuthzSettings;

/// Config key holding the user-roles table.
pub const USER_ROLES_KEY: &str = "user_roles";

/// The roles held by one identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRoles {
    /// Who holds the roles
    pub identity: Identity,

    /// Assigned roles
    pub roles: Vec<RoleAssignment>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserRoles {
    /// Create a record without a display name.
    pub fn new(identity: Identity, roles: Vec<RoleAssignment>) -> Self {
        Self {
            identity,
            roles,
            name: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// List every stored record.
pub fn get_users(snapshot: &Snapshot) -> AuthResult<Vec<UserRoles>> {
    Ok(snapshot.search_or(USER_ROLES_KEY, Vec::new())?)
}

/// Find the record for `identity`.
pub fn get_user(snapshot: &Snapshot, identity: &Identity) -> AuthResult<Option<UserRoles>> {
    Ok(get_users(snapshot)?
        .into_iter()
        .find(|user| &user.identity == identity))
}

/// Roles assigned to `identity`; empty when there is no record.
pub fn user_roles(snapshot: &Snapshot, identity: &Identity) -> AuthResult<Vec<RoleAssignment>> {
    Ok(get_user(snapshot, identity)?
        .map(|user| user.roles)
        .unwrap_or_default())
}

/// Check assignments against the role definitions and the existing buckets.
///
/// An assignment is rejected when its role is undefined, when it carries the
/// wrong number of values, or when a value is neither the wildcard nor an
/// existing bucket. Every rejected assignment is reported.
pub fn validate_roles(
    assignments: &[RoleAssignment],
    definitions: &[RoleDefinition],
    bucket_names: &[String],
) -> AuthResult<()> {
    let invalid: Vec<RoleAssignment> = assignments
        .iter()
        .filter(|assignment| !is_valid(assignment, definitions, bucket_names))
        .cloned()
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(invalid))
    }
}

fn is_valid(assignment: &RoleAssignment, definitions: &[RoleDefinition], bucket_names: &[String]) -> bool {
    let Some(definition) = find_definition(&assignment.role, definitions) else {
        return false;
    };
    definition.params.len() == assignment.params.len()
        && assignment.params.iter().all(|value| match value {
            Value::Any => true,
            Value::All => false,
            Value::Named(name) => bucket_names.iter().any(|bucket| bucket == name),
        })
}

/// Insert or replace the record for `user.identity`.
pub fn put_user(snapshot: &Snapshot, user: UserRoles) -> AuthResult<Snapshot> {
    let mut users = get_users(snapshot)?;
    match users.iter_mut().find(|existing| existing.identity == user.identity) {
        Some(existing) => *existing = user,
        None => users.push(user),
    }
    Ok(snapshot.with(USER_ROLES_KEY, users)?)
}

/// Remove the record for `identity`.
///
/// Fails with [`AuthError::NotFound`] when the table or the record is absent.
pub fn remove_user(snapshot: &Snapshot, identity: &Identity) -> AuthResult<Snapshot> {
    if !snapshot.contains(USER_ROLES_KEY) {
        return Err(AuthError::NotFound(identity.clone()));
    }

    let mut users = get_users(snapshot)?;
    let Some(position) = users.iter().position(|user| &user.identity == identity) else {
        return Err(AuthError::NotFound(identity.clone()));
    };
    users.remove(position);

    Ok(snapshot.with(USER_ROLES_KEY, users)?)
}

/// Transactional access to the user-roles table.
pub struct UserStore<S: ConfigStore + ?Sized> {
    store: Arc<S>,
    cluster: Arc<dyn ClusterState>,
    role_source: RoleSource,
    retry: TxnRetry,
}

impl<S: ConfigStore + ?Sized> UserStore<S> {
    /// Create a user store.
    pub fn new(store: Arc<S>, cluster: Arc<dyn ClusterState>, settings: &AuthzSettings) -> Self {
        Self {
            store,
            cluster,
            role_source: settings.role_source,
            retry: settings.txn.clone(),
        }
    }

    /// List every record in the latest snapshot.
    pub async fn get_users(&self) -> AuthResult<Vec<UserRoles>> {
        get_users(&self.store.latest().await)
    }

    /// Validate `roles` and save them as the full role set of `identity`.
    ///
    /// Any previous record for the identity is overwritten. Returns the
    /// committed snapshot.
    pub async fn store_user(
        &self,
        identity: &Identity,
        name: Option<&str>,
        roles: Vec<RoleAssignment>,
    ) -> AuthResult<Snapshot> {
        let committed = run_transaction(self.store.as_ref(), &self.retry, |snapshot| {
            let definitions = definitions(self.role_source, snapshot)?;
            validate_roles(&roles, &definitions, &self.cluster.bucket_names(snapshot))?;

            let user = UserRoles {
                identity: identity.clone(),
                roles: roles.clone(),
                name: name.map(str::to_string),
            };
            put_user(snapshot, user)
        })
        .await
        .map_err(|err| {
            let err = AuthError::from(err);
            if err.is_server_error() {
                tracing::error!(identity = %identity, error = %err, "Failed to store user");
            }
            err
        })?;

        tracing::info!(
            identity = %identity,
            roles = roles.len(),
            revision = committed.revision(),
            "User roles stored"
        );
        Ok(committed)
    }

    /// Remove the record for `identity`.
    pub async fn delete_user(&self, identity: &Identity) -> AuthResult<Snapshot> {
        let committed = run_transaction(self.store.as_ref(), &self.retry, |snapshot| {
            remove_user(snapshot, identity)
        })
        .await?;

        tracing::info!(identity = %identity, revision = committed.revision(), "User deleted");
        Ok(committed)
    }
}
