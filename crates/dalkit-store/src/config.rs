//! Connection configuration
//!
//! A [`DalConfig`] names one or more SQLite connections and picks a default:
//!
//! ```toml
//! default = "main"
//!
//! [connections.main]
//! path = "data/app.db"
//! schema = "main"
//! foreign_keys = true
//! journal_mode = "WAL"
//! busy_timeout_ms = 5000
//! transaction_policy = "per_session"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dalkit_core::errors::{DalError, DalErrorKind};
use dalkit_core::model::DEFAULT_SCHEMA;
use serde::Deserialize;
use thiserror::Error;

use crate::db::IN_MEMORY;
use crate::errors::Result;

/// Environment variable overriding the default connection's path
pub const DATABASE_ENV: &str = "DALKIT_DATABASE";

const DEFAULT_CONNECTION: &str = "main";

/// How a session manages its transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionPolicy {
    /// Begin lazily on the first command; one transaction until commit
    #[default]
    PerSession,
    /// Only `begin()` opens a transaction
    Manual,
}

/// Settings for one named connection
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSettings {
    /// File path, `file:` URI, or `:memory:`
    pub path: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
    #[serde(default)]
    pub journal_mode: Option<String>,
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
    #[serde(default)]
    pub transaction_policy: TransactionPolicy,
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_foreign_keys() -> bool {
    true
}

fn default_connection_name() -> String {
    DEFAULT_CONNECTION.to_string()
}

impl ConnectionSettings {
    /// Settings for `path` with every option at its default
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            schema: default_schema(),
            foreign_keys: default_foreign_keys(),
            journal_mode: None,
            busy_timeout_ms: None,
            transaction_policy: TransactionPolicy::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY)
    }

    pub fn with_policy(mut self, policy: TransactionPolicy) -> Self {
        self.transaction_policy = policy;
        self
    }
}

/// Configuration failures before they cross the public boundary
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no connection named '{name}' is configured")]
    UnknownConnection { name: String },

    #[error("default connection '{name}' is not configured")]
    MissingDefault { name: String },
}

impl From<ConfigError> for DalError {
    fn from(err: ConfigError) -> Self {
        let op = match &err {
            ConfigError::Read { .. } | ConfigError::Parse(_) => "load_config",
            ConfigError::UnknownConnection { .. } | ConfigError::MissingDefault { .. } => {
                "resolve_connection"
            }
        };
        DalError::new(DalErrorKind::Configuration)
            .with_op(op)
            .with_message(err.to_string())
            .with_source(err)
    }
}

/// Named connections plus the name of the default one
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DalConfig {
    #[serde(default = "default_connection_name")]
    pub default: String,
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionSettings>,
}

impl DalConfig {
    /// One in-memory connection named `main`
    pub fn in_memory() -> Self {
        Self::single(ConnectionSettings::in_memory())
    }

    /// One connection, named `main`, used as the default
    pub fn single(settings: ConnectionSettings) -> Self {
        let mut connections = BTreeMap::new();
        connections.insert(default_connection_name(), settings);
        Self {
            default: default_connection_name(),
            connections,
        }
    }

    /// Parse TOML text and check that the default connection exists
    ///
    /// # Errors
    /// `Configuration` on invalid TOML or a missing default connection.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: DalConfig = toml::from_str(text).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file
    ///
    /// # Errors
    /// `Configuration` when the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `DALKIT_DATABASE` to the default connection's path, if set
    pub fn with_env_overrides(self) -> Self {
        let path = std::env::var(DATABASE_ENV).ok();
        self.with_database_override(path)
    }

    /// Replace the default connection's path when `path` is non-empty
    ///
    /// A default connection that is not configured yet is created with
    /// default settings.
    pub fn with_database_override(mut self, path: Option<String>) -> Self {
        if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
            self.connections
                .entry(self.default.clone())
                .and_modify(|settings| settings.path = path.clone())
                .or_insert_with(|| ConnectionSettings::new(path));
        }
        self
    }

    /// Settings of a named connection
    ///
    /// # Errors
    /// `Configuration` if no such connection is configured.
    pub fn connection(&self, name: &str) -> Result<&ConnectionSettings> {
        self.connections.get(name).ok_or_else(|| {
            ConfigError::UnknownConnection {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Settings of the default connection
    ///
    /// # Errors
    /// `Configuration` if the default connection is not configured.
    pub fn default_connection(&self) -> Result<&ConnectionSettings> {
        self.connections.get(&self.default).ok_or_else(|| {
            ConfigError::MissingDefault {
                name: self.default.clone(),
            }
            .into()
        })
    }

    fn validate(&self) -> Result<()> {
        self.default_connection()?;
        for settings in self.connections.values() {
            if let Some(mode) = &settings.journal_mode {
                crate::db::normalize_journal_mode(mode)?;
            }
        }
        Ok(())
    }
}

impl Default for DalConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_connection_gets_defaults() {
        let config = DalConfig::from_toml_str(
            r#"
            [connections.main]
            path = ":memory:"
            "#,
        )
        .unwrap();

        let main = config.default_connection().unwrap();
        assert_eq!(main.schema, "main");
        assert!(main.foreign_keys);
        assert_eq!(main.transaction_policy, TransactionPolicy::PerSession);
        assert_eq!(main.journal_mode, None);
    }

    #[test]
    fn test_override_replaces_default_path_only() {
        let config = DalConfig::from_toml_str(
            r#"
            default = "app"

            [connections.app]
            path = "app.db"
            busy_timeout_ms = 250

            [connections.audit]
            path = "audit.db"
            "#,
        )
        .unwrap()
        .with_database_override(Some("override.db".to_string()));

        let app = config.connection("app").unwrap();
        assert_eq!(app.path, "override.db");
        assert_eq!(app.busy_timeout_ms, Some(250));
        assert_eq!(config.connection("audit").unwrap().path, "audit.db");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let config = DalConfig::in_memory().with_database_override(Some("  ".to_string()));
        assert_eq!(config.default_connection().unwrap().path, ":memory:");
    }
}
