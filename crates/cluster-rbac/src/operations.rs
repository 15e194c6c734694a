//! # Operations
//!
//! Defines the operations that can be requested on cluster objects, and the
//! allowed-operations value a permission pattern grants.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Operations that can be requested on an object.
///
/// - **Read**: View object state or settings
/// - **Write**: Modify existing object data
/// - **Create**: Create new objects under this one
/// - **Delete**: Remove objects
/// - **Execute**: Trigger actions (start replication, compaction, ...)
/// - **List**: Enumerate child objects
/// - **Manage**: Change object settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Read/view object.
    Read,
    /// Modify object data.
    Write,
    /// Create object.
    Create,
    /// Delete object.
    Delete,
    /// Execute/trigger actions.
    Execute,
    /// Enumerate objects.
    List,
    /// Change object settings.
    Manage,
}

impl Operation {
    /// Get the string representation of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::Execute => "execute",
            Operation::List => "list",
            Operation::Manage => "manage",
        }
    }

    /// Parse operation from string representation (case-insensitive).
    ///
    /// # Example
    ///
    /// ```
    /// use cluster_rbac::operations::Operation;
    ///
    /// assert_eq!(Operation::parse("read"), Some(Operation::Read));
    /// assert_eq!(Operation::parse("EXECUTE"), Some(Operation::Execute));
    /// assert_eq!(Operation::parse("all"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "read" => Some(Operation::Read),
            "write" => Some(Operation::Write),
            "create" => Some(Operation::Create),
            "delete" => Some(Operation::Delete),
            "execute" => Some(Operation::Execute),
            "list" => Some(Operation::List),
            "manage" => Some(Operation::Manage),
            _ => None,
        }
    }

    /// Get all operations.
    pub fn all() -> Vec<Self> {
        vec![
            Operation::Read,
            Operation::Write,
            Operation::Create,
            Operation::Delete,
            Operation::Execute,
            Operation::List,
            Operation::Manage,
        ]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations granted by a permission pattern.
///
/// `All` and `None` are sentinels, not operations: `all` is never a valid
/// object value and never an operation name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AllowedOps {
    /// Every operation.
    All,
    /// No operation.
    None,
    /// Exactly these operations.
    Only(BTreeSet<Operation>),
}

impl AllowedOps {
    /// Grant exactly the given operations.
    ///
    /// # Example
    ///
    /// ```
    /// use cluster_rbac::operations::{AllowedOps, Operation};
    ///
    /// let ops = AllowedOps::only([Operation::Read, Operation::Execute]);
    /// assert!(ops.allows(Operation::Execute));
    /// assert!(!ops.allows(Operation::Write));
    /// ```
    pub fn only(ops: impl IntoIterator<Item = Operation>) -> Self {
        AllowedOps::Only(ops.into_iter().collect())
    }

    /// Grant read only.
    pub fn read() -> Self {
        Self::only([Operation::Read])
    }

    /// Check whether `op` is allowed.
    pub fn allows(&self, op: Operation) -> bool {
        is_operation_allowed(op, self)
    }
}

/// Interpret an allowed-operations value for one requested operation.
pub fn is_operation_allowed(op: Operation, allowed: &AllowedOps) -> bool {
    match allowed {
        AllowedOps::All => true,
        AllowedOps::None => false,
        AllowedOps::Only(ops) => ops.contains(&op),
    }
}

impl fmt::Display for AllowedOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowedOps::All => f.write_str("all"),
            AllowedOps::None => f.write_str("none"),
            AllowedOps::Only(ops) => {
                let names: Vec<&str> = ops.iter().map(Operation::as_str).collect();
                write!(f, "[{}]", names.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_parsing() {
        assert_eq!(Operation::parse("read"), Some(Operation::Read));
        assert_eq!(Operation::parse("Write"), Some(Operation::Write));
        assert_eq!(Operation::parse("create"), Some(Operation::Create));
        assert_eq!(Operation::parse("none"), None);
        assert_eq!(Operation::parse(""), None);
    }

    #[test]
    fn test_operation_round_trip_names() {
        for op in Operation::all() {
            assert_eq!(Operation::parse(op.as_str()), Some(op));
        }
        assert_eq!(Operation::all().len(), 7);
    }

    #[test]
    fn test_all_and_none() {
        for op in Operation::all() {
            assert!(AllowedOps::All.allows(op));
            assert!(!AllowedOps::None.allows(op));
        }
    }

    #[test]
    fn test_explicit_set_membership() {
        let ops = AllowedOps::only([Operation::Read, Operation::Execute]);
        assert!(is_operation_allowed(Operation::Read, &ops));
        assert!(is_operation_allowed(Operation::Execute, &ops));
        assert!(!is_operation_allowed(Operation::Create, &ops));

        let empty = AllowedOps::Only(BTreeSet::new());
        assert!(!empty.allows(Operation::Read));
    }

    #[test]
    fn test_allowed_ops_serialization() {
        assert_eq!(serde_json::to_value(AllowedOps::All).unwrap(), "all");
        assert_eq!(serde_json::to_value(AllowedOps::None).unwrap(), "none");
        assert_eq!(
            serde_json::to_value(AllowedOps::read()).unwrap(),
            serde_json::json!({"only": ["read"]})
        );
    }

    #[test]
    fn test_allowed_ops_display() {
        assert_eq!(AllowedOps::All.to_string(), "all");
        assert_eq!(
            AllowedOps::only([Operation::Execute, Operation::Read]).to_string(),
            "[read,execute]"
        );
    }
}
