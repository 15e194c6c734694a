//! Error types for role compilation and the role registry.

use cluster_config::StoreError;
use thiserror::Error;

/// RBAC error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RbacError {
    /// An assignment names a role missing from the live definitions.
    ///
    /// Assignments are validated when they are written, so hitting this at
    /// read time means the stored data is corrupt.
    #[error("Role {0} is not defined")]
    UnknownRole(String),

    /// An assignment carries the wrong number of parameters for its role
    #[error("Role {role} takes {expected} parameter(s), got {actual}")]
    ParamArity {
        /// Role name.
        role: String,
        /// Parameters declared by the definition.
        expected: usize,
        /// Parameters carried by the assignment.
        actual: usize,
    },

    /// Attempt to redefine a built-in role
    #[error("Built-in role {0} cannot be redefined")]
    BuiltInRole(String),

    /// Reading or writing role definitions failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for RBAC operations.
pub type RbacResult<T> = Result<T, RbacError>;

impl RbacError {
    /// Check if this error indicates corrupt stored data rather than bad input.
    pub fn is_data_corruption(&self) -> bool {
        matches!(
            self,
            RbacError::UnknownRole(_) | RbacError::ParamArity { .. } | RbacError::Store(_)
        )
    }
}
