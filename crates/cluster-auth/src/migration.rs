//! Upgrade from the legacy external-directory admin lists.
//!
//! Before roles existed, external-directory users were granted access through
//! two principal lists stored under [`LEGACY_AUTH_SETTINGS_KEY`]: full
//! administrators and read-only administrators. The upgrade turns those lists
//! into `admin` and `ro_admin` assignments and replaces the user-roles table
//! with the result.

use cluster_config::{ConfigUpdate, Snapshot};
use cluster_rbac::roles::{ADMIN, RO_ADMIN};
use cluster_rbac::RoleAssignment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::AuthResult;
use crate::identity::Identity;
use crate::users::{UserRoles, USER_ROLES_KEY};

/// Config key of the legacy external-directory settings.
pub const LEGACY_AUTH_SETTINGS_KEY: &str = "saslauthd_auth_settings";

const WILDCARD: &str = "*";

/// Legacy external-directory settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAuthSettings {
    /// Whether external-directory users were allowed in at all
    #[serde(default)]
    pub enabled: bool,

    /// Full administrators
    #[serde(default)]
    pub admins: PrincipalList,

    /// Read-only administrators
    #[serde(default)]
    pub ro_admins: PrincipalList,
}

/// A legacy principal list.
///
/// The wildcard form (`"*"`) meant the list did not apply. It never meant
/// "every user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrincipalListRepr", into = "PrincipalListRepr")]
pub enum PrincipalList {
    /// The list does not apply
    Wildcard,
    /// Explicit principals, possibly with duplicates
    List(Vec<String>),
}

impl Default for PrincipalList {
    fn default() -> Self {
        PrincipalList::List(Vec::new())
    }
}

impl PrincipalList {
    /// Principals named by the list; none for the wildcard.
    pub fn principals(&self) -> &[String] {
        match self {
            PrincipalList::Wildcard => &[],
            PrincipalList::List(principals) => principals,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PrincipalListRepr {
    Sentinel(String),
    List(Vec<String>),
}

impl TryFrom<PrincipalListRepr> for PrincipalList {
    type Error = String;

    fn try_from(repr: PrincipalListRepr) -> Result<Self, Self::Error> {
        match repr {
            PrincipalListRepr::Sentinel(s) if s == WILDCARD => Ok(PrincipalList::Wildcard),
            PrincipalListRepr::Sentinel(s) => Err(format!("expected \"{WILDCARD}\" or a list, got \"{s}\"")),
            PrincipalListRepr::List(principals) => Ok(PrincipalList::List(principals)),
        }
    }
}

impl From<PrincipalList> for PrincipalListRepr {
    fn from(list: PrincipalList) -> Self {
        match list {
            PrincipalList::Wildcard => PrincipalListRepr::Sentinel(WILDCARD.to_string()),
            PrincipalList::List(principals) => PrincipalListRepr::List(principals),
        }
    }
}

/// Compute the user-roles table that replaces the legacy lists.
///
/// Emits nothing when the legacy settings are absent or disabled. Otherwise
/// emits one directive replacing the whole table: one external-directory
/// record per distinct principal, ordered by principal, each holding the
/// sorted set of roles its lists grant. Rerunning on the same settings
/// produces the same directive.
pub fn upgrade_users(snapshot: &Snapshot) -> AuthResult<Vec<ConfigUpdate>> {
    let Some(settings) = snapshot.search_as::<LegacyAuthSettings>(LEGACY_AUTH_SETTINGS_KEY)? else {
        tracing::debug!("No legacy auth settings, skipping user upgrade");
        return Ok(Vec::new());
    };
    if !settings.enabled {
        tracing::debug!("Legacy auth disabled, skipping user upgrade");
        return Ok(Vec::new());
    }

    let mut granted: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (list, role) in [(&settings.admins, ADMIN), (&settings.ro_admins, RO_ADMIN)] {
        for principal in list.principals() {
            granted.entry(principal.as_str()).or_default().insert(role);
        }
    }

    let users: Vec<UserRoles> = granted
        .into_iter()
        .map(|(principal, roles)| {
            UserRoles::new(
                Identity::external(principal),
                roles.into_iter().map(RoleAssignment::simple).collect(),
            )
        })
        .collect();

    tracing::info!(users = users.len(), "Upgrading legacy admin lists to user roles");
    Ok(vec![ConfigUpdate::set(USER_ROLES_KEY, users)?])
}
