//! # Cluster RBAC (Role-Based Access Control)
//!
//! This crate decides whether a requested operation on a cluster object is
//! granted by a set of roles.
//!
//! ## Overview
//!
//! The cluster-rbac crate handles:
//! - **Objects**: Concrete resource paths such as `cluster.bucket[sales].data`
//! - **Object Patterns**: Subtree descriptions with wildcards and placeholders
//! - **Operations**: What is requested (`read`, `write`, `execute`, ...)
//! - **Roles**: Ordered, optionally parametrized lists of permission patterns
//! - **Registry**: The built-in role table or its config-backed copy
//!
//! ## Architecture
//!
//! ```text
//! RoleAssignment ──compile (RoleDefinition)──→ CompiledRole
//!
//! Permission = Object + Operation
//!
//! is_allowed(permission, roles) =
//!     any role: first pattern matching permission.object grants permission.operation
//! ```
//!
//! ## Matching
//!
//! - Identical bare tags match.
//! - Pattern `bucket[*]` matches any `bucket[X]`.
//! - Pattern `bucket[default]` matches `bucket[default]` and `bucket[*]`.
//! - A pattern shorter than the object constrains only a prefix; the root
//!   pattern matches everything.
//! - `all` is a reserved value and never matches.
//!
//! Within a role the first matching pattern decides. Role authors order
//! patterns to encode precedence, so the scan must stay sequential.
//!
//! ## Usage
//!
//! ```rust
//! use cluster_rbac::{builtin_definitions, compile_roles, is_allowed, Permission, RoleAssignment, Value};
//!
//! let assignments = vec![RoleAssignment::with_param("bucket_admin", Value::named("default"))];
//! let roles = compile_roles(&assignments, &builtin_definitions()).unwrap();
//!
//! let write_data = Permission::parse("cluster.bucket[default].data!write").unwrap();
//! assert!(is_allowed(&write_data, &roles));
//!
//! let other_data = Permission::parse("cluster.bucket[test].data!read").unwrap();
//! assert!(!is_allowed(&other_data, &roles));
//! ```

pub mod error;
pub mod objects;
pub mod operations;
pub mod permissions;
pub mod registry;
pub mod roles;

// Re-export main types for convenience
pub use error::{RbacError, RbacResult};
pub use objects::{object_match, Object, ObjectPattern, PatternValue, PatternVertex, Value, Vertex};
pub use operations::{is_operation_allowed, AllowedOps, Operation};
pub use permissions::{allowed_ops, is_allowed, is_any_allowed, CompiledRole, Permission, PermissionPattern};
pub use registry::{define_role, definitions, upgrade_definitions, RoleSource, ROLES_DEFINITIONS_KEY};
pub use roles::{
    assignable_roles, builtin_definitions, compile_role, compile_roles, find_definition, RoleAssignment, RoleDefinition,
    RoleProps,
};
