//! # Permissions
//!
//! A permission is a concrete object plus the operation requested on it. A
//! permission pattern pairs an object pattern with the operations it grants.
//! Roles are ordered lists of permission patterns, and the first pattern
//! whose object pattern matches decides the outcome for that role.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::objects::{object_match, Object, ObjectPattern};
use crate::operations::{is_operation_allowed, AllowedOps, Operation};

/// A requested operation on a concrete object.
///
/// # Example
///
/// ```
/// use cluster_rbac::permissions::Permission;
/// use cluster_rbac::objects::Object;
/// use cluster_rbac::operations::Operation;
///
/// let perm = Permission::new(Object::bucket("default").tag("data"), Operation::Read);
/// assert_eq!(perm.to_string(), "cluster.bucket[default].data!read");
/// assert_eq!(Permission::parse("cluster.bucket[default].data!read"), Some(perm));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    /// The object being accessed.
    pub object: Object,
    /// The requested operation.
    pub operation: Operation,
}

impl Permission {
    /// Create a new permission.
    pub fn new(object: Object, operation: Operation) -> Self {
        Self { object, operation }
    }

    /// Parse from text, e.g. `cluster.admin.security!read`.
    ///
    /// # Returns
    ///
    /// `Some(Permission)` if valid, `None` otherwise
    pub fn parse(s: &str) -> Option<Self> {
        let (object, operation) = s.rsplit_once('!')?;
        Some(Self {
            object: Object::parse(object)?,
            operation: Operation::parse(operation)?,
        })
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.object, self.operation)
    }
}

/// An object pattern and the operations it grants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionPattern {
    /// Subtree this pattern covers.
    pub object: ObjectPattern,
    /// Operations granted inside the subtree.
    pub allowed: AllowedOps,
}

impl PermissionPattern {
    /// Create a new permission pattern.
    pub fn new(object: ObjectPattern, allowed: AllowedOps) -> Self {
        Self { object, allowed }
    }
}

impl fmt::Display for PermissionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.object, self.allowed)
    }
}

/// A role with every placeholder bound to a concrete value.
///
/// Compiled roles are built per evaluation and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRole {
    /// Name of the role definition this was compiled from.
    pub role: String,
    /// Permission patterns in precedence order.
    pub patterns: Vec<PermissionPattern>,
}

impl CompiledRole {
    /// Create a compiled role.
    pub fn new(role: impl Into<String>, patterns: Vec<PermissionPattern>) -> Self {
        Self {
            role: role.into(),
            patterns,
        }
    }

    /// Operations this role grants on `object`.
    pub fn allowed_ops(&self, object: &Object) -> &AllowedOps {
        allowed_ops(object, &self.patterns)
    }

    /// Check whether this role alone grants `permission`.
    pub fn allows(&self, permission: &Permission) -> bool {
        is_operation_allowed(permission.operation, self.allowed_ops(&permission.object))
    }
}

static NO_OPS: AllowedOps = AllowedOps::None;

/// Operations granted on `object` by an ordered pattern list.
///
/// Scans in list order and returns the allowed operations of the first
/// pattern that matches, or `None` if no pattern does. Position is the only
/// precedence; there is no specificity ranking.
pub fn allowed_ops<'a>(object: &Object, patterns: &'a [PermissionPattern]) -> &'a AllowedOps {
    patterns
        .iter()
        .find(|pattern| object_match(object, &pattern.object))
        .map(|pattern| &pattern.allowed)
        .unwrap_or(&NO_OPS)
}

/// Check whether any of `roles` grants `permission`.
pub fn is_allowed(permission: &Permission, roles: &[CompiledRole]) -> bool {
    roles.iter().any(|role| role.allows(permission))
}

/// Check whether at least one of `permissions` is granted by `roles`.
///
/// Used when several equivalent checks each suffice.
pub fn is_any_allowed(permissions: &[Permission], roles: &[CompiledRole]) -> bool {
    permissions
        .iter()
        .any(|permission| is_allowed(permission, roles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{PatternValue, Value};

    fn read_write() -> AllowedOps {
        AllowedOps::only([Operation::Read, Operation::Write])
    }

    #[test]
    fn test_permission_text_form() {
        let perm = Permission::parse("cluster.admin.security!read").unwrap();
        assert_eq!(perm.object, Object::root().tag("admin").tag("security"));
        assert_eq!(perm.operation, Operation::Read);
        assert_eq!(perm.to_string(), "cluster.admin.security!read");

        assert_eq!(
            Permission::parse("cluster!create"),
            Some(Permission::new(Object::root(), Operation::Create))
        );
        assert_eq!(Permission::parse("cluster.admin"), None);
        assert_eq!(Permission::parse("cluster.admin!fly"), None);
    }

    #[test]
    fn test_no_match_is_none() {
        let patterns = vec![PermissionPattern::new(
            ObjectPattern::root().tag("admin"),
            AllowedOps::All,
        )];
        assert_eq!(allowed_ops(&Object::root().tag("pools"), &patterns), &AllowedOps::None);
        assert_eq!(allowed_ops(&Object::root(), &[]), &AllowedOps::None);
    }

    #[test]
    fn test_first_match_wins() {
        let object = Object::bucket("default").tag("data");
        let deny_first = vec![
            PermissionPattern::new(
                ObjectPattern::root().param("bucket", PatternValue::Any).tag("data"),
                AllowedOps::None,
            ),
            PermissionPattern::new(ObjectPattern::root(), AllowedOps::All),
        ];
        let grant_first: Vec<_> = deny_first.iter().rev().cloned().collect();

        assert_eq!(allowed_ops(&object, &deny_first), &AllowedOps::None);
        assert_eq!(allowed_ops(&object, &grant_first), &AllowedOps::All);
    }

    #[test]
    fn test_role_union() {
        let object = Object::bucket("a").tag("data");
        let r1 = CompiledRole::new(
            "r1",
            vec![PermissionPattern::new(ObjectPattern::root(), AllowedOps::read())],
        );
        let r2 = CompiledRole::new(
            "r2",
            vec![PermissionPattern::new(
                ObjectPattern::root().param("bucket", PatternValue::Named("a".into())),
                read_write(),
            )],
        );

        for op in Operation::all() {
            let perm = Permission::new(object.clone(), op);
            let either = is_allowed(&perm, std::slice::from_ref(&r1))
                || is_allowed(&perm, std::slice::from_ref(&r2));
            assert_eq!(is_allowed(&perm, &[r1.clone(), r2.clone()]), either);
        }

        assert!(is_allowed(&Permission::new(object.clone(), Operation::Write), &[r1.clone(), r2]));
        assert!(!is_allowed(&Permission::new(object, Operation::Write), &[r1]));
    }

    #[test]
    fn test_no_roles_denies() {
        let perm = Permission::new(Object::root(), Operation::Read);
        assert!(!is_allowed(&perm, &[]));
    }

    #[test]
    fn test_any_allowed_is_or() {
        let role = CompiledRole::new(
            "pools_reader",
            vec![PermissionPattern::new(ObjectPattern::root().tag("pools"), AllowedOps::read())],
        );
        let denied = Permission::new(Object::root().tag("admin"), Operation::Read);
        let granted = Permission::new(Object::root().tag("pools"), Operation::Read);

        assert!(!is_any_allowed(&[denied.clone()], &[role.clone()]));
        assert!(is_any_allowed(&[denied.clone(), granted], &[role.clone()]));
        assert!(!is_any_allowed(&[], &[role]));
    }

    #[test]
    fn test_wildcard_object_request() {
        let role = CompiledRole::new(
            "scoped",
            vec![PermissionPattern::new(
                ObjectPattern::root().param("bucket", PatternValue::Named("a".into())),
                AllowedOps::All,
            )],
        );
        let any_bucket = Object::root().param("bucket", Value::Any);
        assert!(role.allows(&Permission::new(any_bucket, Operation::Read)));
    }
}
