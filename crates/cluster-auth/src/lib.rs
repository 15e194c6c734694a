//! # Cluster Authorization
//!
//! This crate connects identities to the role model in `cluster-rbac`.
//!
//! ## Overview
//!
//! The cluster-auth crate handles:
//! - **Identities**: Principal plus authentication method
//! - **Resolution**: Mapping an identity to role assignments, including the
//!   bootstrap and legacy-compatibility paths
//! - **Evaluation**: Compiling those roles and checking permissions
//! - **User Store**: Validated, transactional writes to the user-roles table
//! - **Migration**: One-time upgrade of the legacy admin lists
//!
//! ## Architecture
//!
//! ```text
//! read path:   Identity ──Authorizer::roles_for──→ [RoleAssignment]
//!                        ──compile_roles──→ [CompiledRole] ──is_allowed──→ bool
//!
//! write path:  UserStore::store_user ──validate_roles──→ run_transaction(user_roles)
//!              upgrade_users(snapshot) ──→ [ConfigUpdate]
//! ```
//!
//! Reads take an explicit [`cluster_config::Snapshot`]; writes go through a
//! [`cluster_config::ConfigStore`] and retry on conflicting commits.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cluster_auth::{Authorizer, AuthzSettings, Identity, StaticCluster, StaticLegacyLookup, UserStore};
//! use cluster_config::{ConfigStore, MemoryConfigStore};
//! use cluster_rbac::{Permission, RoleAssignment, Value};
//!
//! async fn example() -> Result<(), cluster_auth::AuthError> {
//!     let settings = AuthzSettings::from_env();
//!     let cluster = Arc::new(StaticCluster::provisioned(["default"]));
//!     let store = Arc::new(MemoryConfigStore::new());
//!
//!     let users = UserStore::new(store.clone(), cluster.clone(), &settings);
//!     let alice = Identity::external("alice");
//!     users
//!         .store_user(&alice, Some("Alice"), vec![RoleAssignment::with_param("bucket_admin", Value::named("default"))])
//!         .await?;
//!
//!     let authorizer = Authorizer::new(settings, cluster, Arc::new(StaticLegacyLookup::new()))?;
//!     let write = Permission::parse("cluster.bucket[default].data!write").unwrap();
//!     assert!(authorizer.is_allowed(&store.latest().await, &alice, &write)?);
//!     Ok(())
//! }
//! ```

pub mod cluster;
pub mod error;
pub mod identity;
pub mod migration;
pub mod resolver;
pub mod settings;
pub mod users;

// Re-export main types for convenience
pub use cluster::{ClusterState, LegacyAuthLookup, LegacyRole, StaticCluster, StaticLegacyLookup};
pub use error::{AuthError, AuthResult};
pub use identity::{AuthMethod, Identity};
pub use migration::{upgrade_users, LegacyAuthSettings, PrincipalList, LEGACY_AUTH_SETTINGS_KEY};
pub use resolver::Authorizer;
pub use settings::{AuthzSettings, ConfigError};
pub use users::{
    get_user, get_users, put_user, remove_user, user_roles, validate_roles, UserRoles, UserStore, USER_ROLES_KEY,
};
