//! Error types for authorization operations
//!
//! Matching and evaluation never fail; errors come from the write path
//! (user store, migration), from decoding stored data, and from stored data
//! that contradicts the role definitions.

use cluster_config::{StoreError, TxnError};
use cluster_rbac::{RbacError, RoleAssignment};
use thiserror::Error;

use crate::identity::Identity;
use crate::settings::ConfigError;

/// Authorization error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A role-store write referenced unknown roles or invalid parameters.
    ///
    /// Carries every offending assignment, not just the first.
    #[error("Invalid role assignments: {}", join_assignments(.0))]
    Validation(Vec<RoleAssignment>),

    /// The user, or the whole user-roles table, does not exist
    #[error("User not found: {0}")]
    NotFound(Identity),

    /// Stored assignments contradict the live role definitions
    #[error("Authorization data is corrupt: {0}")]
    DataCorruption(String),

    /// The config store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid settings
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for authorization operations.
pub type AuthResult<T> = Result<T, AuthError>;

fn join_assignments(assignments: &[RoleAssignment]) -> String {
    assignments
        .iter()
        .map(RoleAssignment::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<RbacError> for AuthError {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::Store(e) => AuthError::Store(e),
            other => AuthError::DataCorruption(other.to_string()),
        }
    }
}

impl From<TxnError<AuthError>> for AuthError {
    fn from(err: TxnError<AuthError>) -> Self {
        match err {
            TxnError::Aborted(e) => e,
            TxnError::Store(e) => AuthError::Store(e),
        }
    }
}

impl AuthError {
    /// Check if this error should be logged at error level.
    ///
    /// Validation and not-found errors are caller mistakes.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AuthError::DataCorruption(_) | AuthError::Store(_) | AuthError::Config(_)
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 400,
            AuthError::NotFound(_) => 404,
            AuthError::DataCorruption(_) | AuthError::Store(_) | AuthError::Config(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_FAILED",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::DataCorruption(_) => "DATA_CORRUPTION",
            AuthError::Store(_) => "STORE_ERROR",
            AuthError::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_rbac::Value;

    #[test]
    fn test_validation_lists_every_assignment() {
        let err = AuthError::Validation(vec![
            RoleAssignment::simple("wizard"),
            RoleAssignment::with_param("bucket_admin", Value::named("missing")),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid role assignments: wizard, bucket_admin[missing]"
        );
        assert_eq!(err.status_code(), 400);
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_rbac_errors_map_to_corruption() {
        let err: AuthError = RbacError::UnknownRole("gone".into()).into();
        assert!(matches!(err, AuthError::DataCorruption(_)));
        assert_eq!(err.error_code(), "DATA_CORRUPTION");
        assert!(err.is_server_error());

        let err: AuthError = RbacError::Store(StoreError::Backend("down".into())).into();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[test]
    fn test_transaction_errors_unwrap() {
        let aborted = AuthError::from(TxnError::Aborted(AuthError::NotFound(Identity::anonymous())));
        assert!(matches!(aborted, AuthError::NotFound(_)));

        let exhausted = AuthError::from(TxnError::<AuthError>::Store(StoreError::RetriesExhausted { attempts: 3 }));
        assert_eq!(exhausted.status_code(), 500);
    }

    #[test]
    fn test_not_found_status() {
        let err = AuthError::NotFound(Identity::external("ghost"));
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.to_string(), "User not found: ghost/external");
    }
}
