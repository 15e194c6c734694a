//! Role definition registry.
//!
//! Role definitions come either from the built-in table or, once the
//! deployment has been upgraded, from the shared config under
//! [`ROLES_DEFINITIONS_KEY`]. The upgrade seeds that key from the built-in
//! table, so built-in roles behave the same on both paths; custom roles can
//! only be added on the config-backed path.

use cluster_config::{ConfigUpdate, Snapshot};
use serde::{Deserialize, Serialize};

use crate::error::{RbacError, RbacResult};
use crate::roles::{builtin_definitions, find_definition, RoleDefinition};

/// Config key holding the role definitions table.
pub const ROLES_DEFINITIONS_KEY: &str = "roles_definitions";

/// Where role definitions are read from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    /// The built-in table compiled into this crate.
    #[default]
    BuiltIn,
    /// The table stored in the shared config.
    Config,
}

impl RoleSource {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleSource::BuiltIn => "builtin",
            RoleSource::Config => "config",
        }
    }

    /// Parse from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "builtin" | "built_in" | "static" => Some(RoleSource::BuiltIn),
            "config" => Some(RoleSource::Config),
            _ => None,
        }
    }
}

/// Get the role definitions visible in `snapshot`.
///
/// With [`RoleSource::Config`] and no stored table yet, the built-in table is
/// returned.
pub fn definitions(source: RoleSource, snapshot: &Snapshot) -> RbacResult<Vec<RoleDefinition>> {
    match source {
        RoleSource::BuiltIn => Ok(builtin_definitions()),
        RoleSource::Config => match snapshot.search_as(ROLES_DEFINITIONS_KEY)? {
            Some(definitions) => Ok(definitions),
            None => {
                tracing::warn!(
                    key = ROLES_DEFINITIONS_KEY,
                    "Role definitions not found in config, using built-in table"
                );
                Ok(builtin_definitions())
            }
        },
    }
}

/// Seed the stored definitions table from the built-in one.
///
/// Emits nothing if the table already exists, so rerunning is harmless.
pub fn upgrade_definitions(snapshot: &Snapshot) -> RbacResult<Vec<ConfigUpdate>> {
    if snapshot.contains(ROLES_DEFINITIONS_KEY) {
        tracing::debug!("Role definitions already present, nothing to upgrade");
        return Ok(Vec::new());
    }

    tracing::info!(key = ROLES_DEFINITIONS_KEY, "Seeding role definitions from built-in table");
    Ok(vec![ConfigUpdate::set(ROLES_DEFINITIONS_KEY, builtin_definitions())?])
}

/// Add or replace a custom role in the stored table.
///
/// Returns the derived snapshot for use inside a transaction. Built-in role
/// names are refused.
pub fn define_role(snapshot: &Snapshot, definition: RoleDefinition) -> RbacResult<Snapshot> {
    if find_definition(&definition.name, &builtin_definitions()).is_some() {
        return Err(RbacError::BuiltInRole(definition.name));
    }

    let mut table = definitions(RoleSource::Config, snapshot)?;
    match table.iter_mut().find(|existing| existing.name == definition.name) {
        Some(existing) => *existing = definition,
        None => table.push(definition),
    }

    Ok(snapshot.with(ROLES_DEFINITIONS_KEY, table)?)
}
