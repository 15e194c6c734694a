//! Authorization settings.
//!
//! Settings are loaded from environment variables with defaults that match a
//! freshly upgraded single-node deployment.

use cluster_config::TxnRetry;
use cluster_rbac::RoleSource;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Settings for the authorizer and the user store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthzSettings {
    /// Compatibility mode for clusters that still run the legacy scheme.
    ///
    /// External-directory users are then resolved through the legacy lookup
    /// instead of the user-roles table.
    pub legacy_mode: bool,

    /// Where role definitions are read from.
    pub role_source: RoleSource,

    /// Retry policy for user-store transactions.
    pub txn: TxnRetry,
}

impl Default for AuthzSettings {
    fn default() -> Self {
        Self {
            legacy_mode: false,
            role_source: RoleSource::BuiltIn,
            txn: TxnRetry::default(),
        }
    }
}

impl AuthzSettings {
    /// Load settings from environment variables.
    ///
    /// Environment variables:
    /// - `AUTHZ_LEGACY_MODE`: Resolve external users through the legacy lookup (default: false)
    /// - `AUTHZ_ROLE_SOURCE`: `builtin` or `config` (default: builtin)
    /// - `AUTHZ_TXN_MAX_ATTEMPTS`: Commit attempts per transaction (default: 10)
    /// - `AUTHZ_TXN_INITIAL_DELAY_MS`: First retry delay in milliseconds (default: 5)
    /// - `AUTHZ_TXN_MAX_DELAY_MS`: Retry delay cap in milliseconds (default: 500)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let millis = |key: &str| lookup(key).and_then(|s| s.parse().ok()).map(Duration::from_millis);

        Self {
            legacy_mode: lookup("AUTHZ_LEGACY_MODE")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(default.legacy_mode),
            role_source: lookup("AUTHZ_ROLE_SOURCE")
                .and_then(|s| RoleSource::parse(&s))
                .unwrap_or(default.role_source),
            txn: TxnRetry {
                max_attempts: lookup("AUTHZ_TXN_MAX_ATTEMPTS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.txn.max_attempts),
                initial_delay: millis("AUTHZ_TXN_INITIAL_DELAY_MS").unwrap_or(default.txn.initial_delay),
                max_delay: millis("AUTHZ_TXN_MAX_DELAY_MS").unwrap_or(default.txn.max_delay),
                ..default.txn
            },
        }
    }

    /// Check that the settings describe a consistent deployment.
    ///
    /// The config-backed role table only exists after the upgrade that also
    /// retires the legacy scheme, so the two cannot be combined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.legacy_mode && self.role_source == RoleSource::Config {
            return Err(ConfigError::InvalidValue {
                key: "AUTHZ_ROLE_SOURCE".to_string(),
                message: "config-backed roles are unavailable in legacy mode".to_string(),
            });
        }
        if self.txn.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AUTHZ_TXN_MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.txn.initial_delay > self.txn.max_delay {
            return Err(ConfigError::InvalidValue {
                key: "AUTHZ_TXN_INITIAL_DELAY_MS".to_string(),
                message: "exceeds AUTHZ_TXN_MAX_DELAY_MS".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = AuthzSettings::default();
        assert!(!settings.legacy_mode);
        assert_eq!(settings.role_source, RoleSource::BuiltIn);
        assert_eq!(settings.txn.max_attempts, 10);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let settings = AuthzSettings::from_lookup(lookup(&[
            ("AUTHZ_ROLE_SOURCE", "config"),
            ("AUTHZ_TXN_MAX_ATTEMPTS", "3"),
            ("AUTHZ_TXN_INITIAL_DELAY_MS", "1"),
            ("AUTHZ_TXN_MAX_DELAY_MS", "20"),
        ]));
        assert_eq!(settings.role_source, RoleSource::Config);
        assert_eq!(settings.txn.max_attempts, 3);
        assert_eq!(settings.txn.initial_delay, Duration::from_millis(1));
        assert_eq!(settings.txn.max_delay, Duration::from_millis(20));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_unparseable_values_use_defaults() {
        let settings = AuthzSettings::from_lookup(lookup(&[
            ("AUTHZ_LEGACY_MODE", "maybe"),
            ("AUTHZ_ROLE_SOURCE", "ldap"),
            ("AUTHZ_TXN_MAX_ATTEMPTS", "lots"),
        ]));
        assert_eq!(settings, AuthzSettings::default());
    }

    #[test]
    fn test_legacy_mode_with_config_roles_rejected() {
        let settings = AuthzSettings::from_lookup(lookup(&[
            ("AUTHZ_LEGACY_MODE", "1"),
            ("AUTHZ_ROLE_SOURCE", "config"),
        ]));
        assert!(settings.legacy_mode);
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "AUTHZ_ROLE_SOURCE"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut settings = AuthzSettings::default();
        settings.txn.max_attempts = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_inverted_delays_rejected() {
        let mut settings = AuthzSettings::default();
        settings.txn.initial_delay = Duration::from_secs(1);
        assert!(settings.validate().is_err());
    }
}
