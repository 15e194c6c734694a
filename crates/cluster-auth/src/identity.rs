//! Identities making requests
//!
//! An identity is the principal behind a request plus the way it was
//! authenticated. The authentication method decides how the identity is
//! mapped to roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an identity was authenticated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// The built-in administrator credentials
    Admin,

    /// The built-in read-only administrator credentials
    RoAdmin,

    /// Bucket name and bucket password; the principal is the bucket name
    Bucket,

    /// A user verified by an external directory
    External,

    /// No credentials supplied
    Anonymous,

    /// Credentials or token were supplied but did not verify
    InvalidToken,
}

impl AuthMethod {
    /// Get the string representation of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Admin => "admin",
            AuthMethod::RoAdmin => "ro_admin",
            AuthMethod::Bucket => "bucket",
            AuthMethod::External => "external",
            AuthMethod::Anonymous => "anonymous",
            AuthMethod::InvalidToken => "invalid_token",
        }
    }
}

/// The principal making a request and how it authenticated.
///
/// # Example
///
/// ```
/// use cluster_auth::identity::{AuthMethod, Identity};
///
/// let identity = Identity::external("alice");
/// assert_eq!(identity.method, AuthMethod::External);
/// assert_eq!(identity.to_string(), "alice/external");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity {
    /// Principal name; empty for unauthenticated requests.
    pub principal: String,
    /// Authentication method.
    pub method: AuthMethod,
}

impl Identity {
    /// Create a new identity.
    pub fn new(principal: impl Into<String>, method: AuthMethod) -> Self {
        Self {
            principal: principal.into(),
            method,
        }
    }

    /// The built-in administrator.
    pub fn admin(principal: impl Into<String>) -> Self {
        Self::new(principal, AuthMethod::Admin)
    }

    /// The built-in read-only administrator.
    pub fn ro_admin(principal: impl Into<String>) -> Self {
        Self::new(principal, AuthMethod::RoAdmin)
    }

    /// A bucket-credential connection.
    pub fn bucket(bucket: impl Into<String>) -> Self {
        Self::new(bucket, AuthMethod::Bucket)
    }

    /// A user verified by an external directory.
    pub fn external(principal: impl Into<String>) -> Self {
        Self::new(principal, AuthMethod::External)
    }

    /// An unauthenticated request.
    pub fn anonymous() -> Self {
        Self::new("", AuthMethod::Anonymous)
    }

    /// A request whose credentials failed to verify.
    pub fn invalid_token() -> Self {
        Self::new("", AuthMethod::InvalidToken)
    }

    /// Check whether the principal is empty.
    pub fn is_unnamed(&self) -> bool {
        self.principal.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.principal, self.method.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(Identity::bucket("default").method, AuthMethod::Bucket);
        assert_eq!(Identity::bucket("default").principal, "default");
        assert!(Identity::anonymous().is_unnamed());
        assert!(Identity::invalid_token().is_unnamed());
        assert!(!Identity::external("bob").is_unnamed());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_value(Identity::external("bob")).unwrap();
        assert_eq!(json, serde_json::json!({"principal": "bob", "method": "external"}));
        let ro: Identity = serde_json::from_value(serde_json::json!({
            "principal": "viewer",
            "method": "ro_admin"
        }))
        .unwrap();
        assert_eq!(ro, Identity::ro_admin("viewer"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Identity::anonymous().to_string(), "/anonymous");
        assert_eq!(Identity::invalid_token().to_string(), "/invalid_token");
    }
}
