//! # Roles
//!
//! Role definitions, role assignments and role compilation.
//!
//! A role definition is a named, ordered list of permission patterns that may
//! refer to placeholders (`bucket_admin` refers to `bucket_name`). A role
//! assignment names a role and supplies a concrete value per placeholder.
//! Compiling an assignment substitutes those values into the patterns.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RbacError, RbacResult};
use crate::objects::{ObjectPattern, PatternValue, Value};
use crate::operations::{AllowedOps, Operation};
use crate::permissions::{CompiledRole, PermissionPattern};

/// Full administrator.
pub const ADMIN: &str = "admin";
/// Read-only administrator.
pub const RO_ADMIN: &str = "ro_admin";
/// Cluster administrator without security access.
pub const CLUSTER_ADMIN: &str = "cluster_admin";
/// Administrator of one bucket.
pub const BUCKET_ADMIN: &str = "bucket_admin";
/// Role held by bucket-credential connections. Internal, not assignable.
pub const BUCKET_SASL: &str = "bucket_sasl";
/// Views administrator of one bucket.
pub const VIEWS_ADMIN: &str = "views_admin";
/// XDCR administrator.
pub const REPLICATION_ADMIN: &str = "replication_admin";

/// Placeholder used by bucket-scoped roles.
pub const BUCKET_NAME: &str = "bucket_name";

/// Display properties of a user-assignable role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleProps {
    /// Human-readable role name.
    pub name: String,
    /// One-line description.
    pub description: String,
}

impl RoleProps {
    /// Create display properties.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A named, optionally parametrized bundle of permission patterns.
///
/// Pattern order is significant: evaluation stops at the first pattern whose
/// object pattern matches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleDefinition {
    /// Role name.
    pub name: String,
    /// Placeholder names, in the order assignments supply values.
    #[serde(default)]
    pub params: Vec<String>,
    /// Display properties; `None` for internal roles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<RoleProps>,
    /// Permission patterns in precedence order.
    pub permissions: Vec<PermissionPattern>,
}

impl RoleDefinition {
    /// Create a definition without parameters or display properties.
    pub fn new(name: impl Into<String>, permissions: Vec<PermissionPattern>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            props: None,
            permissions,
        }
    }

    /// Declare a placeholder.
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Set display properties.
    pub fn with_props(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.props = Some(RoleProps::new(name, description));
        self
    }

    /// Check whether the role takes parameters.
    pub fn is_parametrized(&self) -> bool {
        !self.params.is_empty()
    }

    /// Check whether users may be assigned this role.
    pub fn is_assignable(&self) -> bool {
        self.props.is_some()
    }
}

/// A role held by an identity: the role name plus one value per placeholder.
///
/// # Example
///
/// ```
/// use cluster_rbac::roles::RoleAssignment;
/// use cluster_rbac::objects::Value;
///
/// let assignment = RoleAssignment::with_param("bucket_admin", Value::named("default"));
/// assert_eq!(assignment.to_string(), "bucket_admin[default]");
/// assert_eq!(RoleAssignment::parse("bucket_admin[default]"), Some(assignment));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoleAssignment {
    /// Role name.
    pub role: String,
    /// Concrete placeholder values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Value>,
}

impl RoleAssignment {
    /// Assign a role without parameters.
    pub fn simple(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            params: Vec::new(),
        }
    }

    /// Assign a one-parameter role.
    pub fn with_param(role: impl Into<String>, value: Value) -> Self {
        Self {
            role: role.into(),
            params: vec![value],
        }
    }

    /// Parse the text form `role` or `role[v1,v2]` (`*` is the wildcard).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.split_once('[') {
            None if !s.is_empty() && !s.contains(']') => Some(Self::simple(s)),
            None => None,
            Some((role, rest)) => {
                let values = rest.strip_suffix(']')?;
                if role.is_empty() || values.is_empty() {
                    return None;
                }
                let params = values.split(',').map(|v| Value::parse(v.trim())).collect();
                Some(Self {
                    role: role.to_string(),
                    params,
                })
            }
        }
    }
}

impl fmt::Display for RoleAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.role)?;
        if !self.params.is_empty() {
            let values: Vec<String> = self.params.iter().map(Value::to_string).collect();
            write!(f, "[{}]", values.join(","))?;
        }
        Ok(())
    }
}

fn rule(object: ObjectPattern, allowed: AllowedOps) -> PermissionPattern {
    PermissionPattern::new(object, allowed)
}

fn root() -> ObjectPattern {
    ObjectPattern::root()
}

fn any_bucket() -> ObjectPattern {
    root().param("bucket", PatternValue::Any)
}

fn this_bucket() -> ObjectPattern {
    root().param("bucket", PatternValue::placeholder(BUCKET_NAME))
}

/// The built-in role table.
pub fn builtin_definitions() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new(ADMIN, vec![rule(root(), AllowedOps::All)])
            .with_props("Admin", "Can manage ALL cluster features including security."),
        RoleDefinition::new(
            RO_ADMIN,
            vec![
                rule(any_bucket().tag("password"), AllowedOps::None),
                rule(any_bucket().tag("data"), AllowedOps::None),
                rule(root().tag("admin").tag("security"), AllowedOps::read()),
                rule(root().tag("admin"), AllowedOps::None),
                rule(root(), AllowedOps::read()),
            ],
        )
        .with_props("Read Only Admin", "Can view ALL cluster features."),
        RoleDefinition::new(
            CLUSTER_ADMIN,
            vec![
                rule(root().tag("admin"), AllowedOps::None),
                rule(root(), AllowedOps::All),
            ],
        )
        .with_props("Cluster Admin", "Can manage all cluster features EXCEPT security."),
        RoleDefinition::new(
            BUCKET_ADMIN,
            vec![
                rule(
                    this_bucket().tag("xdcr"),
                    AllowedOps::only([Operation::Read, Operation::Execute]),
                ),
                rule(this_bucket(), AllowedOps::All),
                rule(any_bucket().tag("data"), AllowedOps::None),
                rule(any_bucket().tag("settings"), AllowedOps::read()),
                rule(root().tag("admin"), AllowedOps::None),
                rule(root(), AllowedOps::read()),
            ],
        )
        .with_param(BUCKET_NAME)
        .with_props(
            "Bucket Admin",
            "Can manage ALL bucket features for specified buckets (incl. start/stop XDCR).",
        ),
        RoleDefinition::new(
            BUCKET_SASL,
            vec![
                rule(this_bucket().tag("data"), AllowedOps::All),
                rule(this_bucket(), AllowedOps::read()),
                rule(root().tag("pools"), AllowedOps::read()),
            ],
        )
        .with_param(BUCKET_NAME),
        RoleDefinition::new(
            VIEWS_ADMIN,
            vec![
                rule(this_bucket().tag("views"), AllowedOps::All),
                rule(this_bucket().tag("data"), AllowedOps::read()),
                rule(any_bucket().tag("settings"), AllowedOps::read()),
                rule(any_bucket(), AllowedOps::None),
                rule(root().tag("xdcr"), AllowedOps::None),
                rule(root().tag("admin"), AllowedOps::None),
                rule(root(), AllowedOps::read()),
            ],
        )
        .with_param(BUCKET_NAME)
        .with_props("Views Admin", "Can manage views for specified buckets."),
        RoleDefinition::new(
            REPLICATION_ADMIN,
            vec![
                rule(any_bucket().tag("xdcr"), AllowedOps::All),
                rule(root().tag("xdcr"), AllowedOps::All),
                rule(root().tag("admin"), AllowedOps::None),
                rule(root(), AllowedOps::read()),
            ],
        )
        .with_props(
            "Replication Admin",
            "Can manage ONLY XDCR features (cluster AND bucket level).",
        ),
    ]
}

/// Find a definition by name.
pub fn find_definition<'a>(name: &str, definitions: &'a [RoleDefinition]) -> Option<&'a RoleDefinition> {
    definitions.iter().find(|definition| definition.name == name)
}

/// Compile one assignment against the definitions table.
///
/// Parameterless roles reuse their patterns unchanged. For parametrized roles
/// every vertex carrying a declared placeholder is rewritten to the assigned
/// value; `any` vertices, concrete vertices and allowed operations are left
/// alone.
pub fn compile_role(assignment: &RoleAssignment, definitions: &[RoleDefinition]) -> RbacResult<CompiledRole> {
    let Some(definition) = find_definition(&assignment.role, definitions) else {
        tracing::error!(role = %assignment.role, "Assignment references undefined role");
        return Err(RbacError::UnknownRole(assignment.role.clone()));
    };

    if definition.params.len() != assignment.params.len() {
        tracing::error!(
            role = %assignment.role,
            expected = definition.params.len(),
            actual = assignment.params.len(),
            "Assignment parameter count does not match role"
        );
        return Err(RbacError::ParamArity {
            role: assignment.role.clone(),
            expected: definition.params.len(),
            actual: assignment.params.len(),
        });
    }

    if !definition.is_parametrized() {
        return Ok(CompiledRole::new(&definition.name, definition.permissions.clone()));
    }

    let patterns = definition
        .permissions
        .iter()
        .map(|permission| {
            let object = definition
                .params
                .iter()
                .zip(&assignment.params)
                .fold(permission.object.clone(), |object, (placeholder, value)| {
                    object.bind(placeholder, value)
                });
            PermissionPattern::new(object, permission.allowed.clone())
        })
        .collect();

    Ok(CompiledRole::new(&definition.name, patterns))
}

/// Compile every assignment, failing on the first one that cannot be compiled.
pub fn compile_roles(
    assignments: &[RoleAssignment],
    definitions: &[RoleDefinition],
) -> RbacResult<Vec<CompiledRole>> {
    assignments
        .iter()
        .map(|assignment| compile_role(assignment, definitions))
        .collect()
}

/// Every role instance a user could be assigned, with its display properties.
///
/// Parameterless roles appear once. Parametrized roles appear once with the
/// wildcard value and once per known bucket for each placeholder. Roles
/// without display properties are internal and omitted.
pub fn assignable_roles(
    definitions: &[RoleDefinition],
    bucket_names: &[String],
) -> Vec<(RoleAssignment, RoleProps)> {
    let mut candidates = vec![Value::Any];
    candidates.extend(bucket_names.iter().map(Value::named));

    let mut roles = Vec::new();
    for definition in definitions {
        let Some(props) = &definition.props else {
            continue;
        };

        let mut combinations: Vec<Vec<Value>> = vec![Vec::new()];
        for _ in &definition.params {
            combinations = combinations
                .into_iter()
                .flat_map(|prefix| {
                    candidates.iter().map(move |value| {
                        let mut params = prefix.clone();
                        params.push(value.clone());
                        params
                    })
                })
                .collect();
        }

        for params in combinations {
            let assignment = RoleAssignment {
                role: definition.name.clone(),
                params,
            };
            roles.push((assignment, props.clone()));
        }
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Object;
    use crate::permissions::{is_allowed, Permission};

    fn compiled(assignments: &[RoleAssignment]) -> Vec<CompiledRole> {
        compile_roles(assignments, &builtin_definitions()).unwrap()
    }

    fn allowed(roles: &[CompiledRole], perm: &str) -> bool {
        is_allowed(&Permission::parse(perm).unwrap(), roles)
    }

    #[test]
    fn test_builtin_table_shape() {
        let definitions = builtin_definitions();
        let names: Vec<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                ADMIN,
                RO_ADMIN,
                CLUSTER_ADMIN,
                BUCKET_ADMIN,
                BUCKET_SASL,
                VIEWS_ADMIN,
                REPLICATION_ADMIN
            ]
        );

        let sasl = find_definition(BUCKET_SASL, &definitions).unwrap();
        assert!(!sasl.is_assignable());
        assert_eq!(sasl.params, vec![BUCKET_NAME.to_string()]);

        let ro_admin = find_definition(RO_ADMIN, &definitions).unwrap();
        assert_eq!(ro_admin.permissions.len(), 5);
        assert!(!ro_admin.is_parametrized());
    }

    #[test]
    fn test_admin_allows_everything() {
        let roles = compiled(&[RoleAssignment::simple(ADMIN)]);
        assert!(allowed(&roles, "cluster.bucket[all]!create"));
        assert!(allowed(&roles, "cluster.admin.security!write"));
        assert!(allowed(&roles, "cluster!delete"));
    }

    #[test]
    fn test_bucket_admin_scenarios() {
        let roles = compiled(&[RoleAssignment::with_param(BUCKET_ADMIN, Value::named("default"))]);

        assert!(!allowed(&roles, "cluster.bucket[test].data!read"));
        assert!(!allowed(&roles, "cluster.bucket[all]!create"));

        assert!(allowed(&roles, "cluster.bucket[default].data!write"));
        assert!(allowed(&roles, "cluster.bucket[default]!create"));
        assert!(allowed(&roles, "cluster.bucket[default].xdcr!execute"));
        assert!(!allowed(&roles, "cluster.bucket[default].xdcr!write"));
        assert!(allowed(&roles, "cluster.bucket[test].settings!read"));
        assert!(!allowed(&roles, "cluster.bucket[test].settings!write"));
        assert!(!allowed(&roles, "cluster.admin.security!read"));
        assert!(allowed(&roles, "cluster.pools!read"));
    }

    #[test]
    fn test_ro_admin() {
        let roles = compiled(&[RoleAssignment::simple(RO_ADMIN)]);
        assert!(allowed(&roles, "cluster.admin.security!read"));
        assert!(!allowed(&roles, "cluster.admin.security!write"));
        assert!(!allowed(&roles, "cluster.admin.diag!read"));
        assert!(!allowed(&roles, "cluster.bucket[default].data!read"));
        assert!(!allowed(&roles, "cluster.bucket[default].password!read"));
        assert!(allowed(&roles, "cluster.bucket[default].settings!read"));
        assert!(!allowed(&roles, "cluster.pools!write"));
    }

    #[test]
    fn test_cluster_admin() {
        let roles = compiled(&[RoleAssignment::simple(CLUSTER_ADMIN)]);
        assert!(!allowed(&roles, "cluster.admin.security!read"));
        assert!(allowed(&roles, "cluster.bucket[default].data!write"));
        assert!(allowed(&roles, "cluster.xdcr!execute"));
    }

    #[test]
    fn test_views_admin() {
        let roles = compiled(&[RoleAssignment::with_param(VIEWS_ADMIN, Value::named("beer"))]);
        assert!(allowed(&roles, "cluster.bucket[beer].views!write"));
        assert!(allowed(&roles, "cluster.bucket[beer].data!read"));
        assert!(!allowed(&roles, "cluster.bucket[beer].data!write"));
        assert!(allowed(&roles, "cluster.bucket[other].settings!read"));
        assert!(!allowed(&roles, "cluster.bucket[other].views!read"));
        assert!(!allowed(&roles, "cluster.xdcr!read"));
        assert!(allowed(&roles, "cluster.pools!read"));
    }

    #[test]
    fn test_replication_admin() {
        let roles = compiled(&[RoleAssignment::simple(REPLICATION_ADMIN)]);
        assert!(allowed(&roles, "cluster.bucket[default].xdcr!execute"));
        assert!(allowed(&roles, "cluster.xdcr!write"));
        assert!(!allowed(&roles, "cluster.admin.security!read"));
        assert!(!allowed(&roles, "cluster.bucket[default].data!write"));
        assert!(allowed(&roles, "cluster.bucket[default].data!read"));
    }

    #[test]
    fn test_bucket_sasl() {
        let roles = compiled(&[RoleAssignment::with_param(BUCKET_SASL, Value::named("default"))]);
        assert!(allowed(&roles, "cluster.bucket[default].data!write"));
        assert!(allowed(&roles, "cluster.bucket[default].settings!read"));
        assert!(!allowed(&roles, "cluster.bucket[default].settings!write"));
        assert!(allowed(&roles, "cluster.pools!read"));
        assert!(!allowed(&roles, "cluster.bucket[other].data!read"));
        assert!(!allowed(&roles, "cluster.admin!read"));
    }

    #[test]
    fn test_substitution_leaves_wildcards() {
        let role = compile_role(
            &RoleAssignment::with_param(BUCKET_ADMIN, Value::named("default")),
            &builtin_definitions(),
        )
        .unwrap();

        let bound = PatternValue::Named("default".into());
        let bucket_values: Vec<&PatternValue> = role
            .patterns
            .iter()
            .filter_map(|p| match p.object.vertices().first() {
                Some(crate::objects::PatternVertex::Param(tag, value)) if tag == "bucket" => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(
            bucket_values,
            vec![&bound, &bound, &PatternValue::Any, &PatternValue::Any]
        );
        assert_eq!(
            role.patterns[0].allowed,
            AllowedOps::only([Operation::Read, Operation::Execute])
        );
    }

    #[test]
    fn test_wildcard_assignment_covers_every_bucket() {
        let roles = compiled(&[RoleAssignment::with_param(BUCKET_ADMIN, Value::Any)]);
        assert!(allowed(&roles, "cluster.bucket[anything].data!write"));
        assert!(allowed(&roles, "cluster.bucket[other].xdcr!execute"));
    }

    #[test]
    fn test_unknown_role_is_fatal() {
        let err = compile_roles(&[RoleAssignment::simple("wizard")], &builtin_definitions()).unwrap_err();
        assert_eq!(err, RbacError::UnknownRole("wizard".into()));
        assert!(err.is_data_corruption());
    }

    #[test]
    fn test_param_arity_checked() {
        let err = compile_role(&RoleAssignment::simple(BUCKET_ADMIN), &builtin_definitions()).unwrap_err();
        assert!(matches!(err, RbacError::ParamArity { expected: 1, actual: 0, .. }));
    }

    #[test]
    fn test_two_param_role_binds_both() {
        let definition = RoleDefinition::new(
            "pair",
            vec![
                rule(
                    root()
                        .param("bucket", PatternValue::placeholder("src"))
                        .param("target", PatternValue::placeholder("dst")),
                    AllowedOps::All,
                ),
            ],
        )
        .with_param("src")
        .with_param("dst");
        let assignment = RoleAssignment {
            role: "pair".into(),
            params: vec![Value::named("a"), Value::named("b")],
        };

        let role = compile_role(&assignment, &[definition]).unwrap();
        let object = Object::bucket("a").param("target", Value::named("b"));
        assert!(role.allows(&Permission::new(object, Operation::Write)));
    }

    #[test]
    fn test_assignable_roles() {
        let buckets = vec!["default".to_string(), "beer".to_string()];
        let roles = assignable_roles(&builtin_definitions(), &buckets);
        let names: Vec<String> = roles.iter().map(|(a, _)| a.to_string()).collect();

        assert_eq!(
            names,
            vec![
                "admin",
                "ro_admin",
                "cluster_admin",
                "bucket_admin[*]",
                "bucket_admin[default]",
                "bucket_admin[beer]",
                "views_admin[*]",
                "views_admin[default]",
                "views_admin[beer]",
                "replication_admin",
            ]
        );
        assert!(roles.iter().all(|(a, _)| a.role != BUCKET_SASL));
        assert_eq!(roles[0].1.name, "Admin");
    }

    #[test]
    fn test_assignment_text_form() {
        assert_eq!(RoleAssignment::parse("admin"), Some(RoleAssignment::simple(ADMIN)));
        assert_eq!(
            RoleAssignment::parse("views_admin[*]"),
            Some(RoleAssignment::with_param(VIEWS_ADMIN, Value::Any))
        );
        assert_eq!(RoleAssignment::parse("bucket_admin[]"), None);
        assert_eq!(RoleAssignment::parse("[x]"), None);
        assert_eq!(RoleAssignment::parse(""), None);
    }

    #[test]
    fn test_definitions_serialize_round_trip() {
        let definitions = builtin_definitions();
        let json = serde_json::to_value(&definitions).unwrap();
        let decoded: Vec<RoleDefinition> = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, definitions);
    }
}
