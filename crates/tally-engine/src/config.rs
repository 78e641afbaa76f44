//! # Engine Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TALLY_*`)
//! 2. Config file (`config.toml`)
//! 3. Defaults (this file)
//!
//! ## File Format
//! ```toml
//! [database]
//! path = "/var/lib/tally/tally.db"
//! max_connections = 5
//!
//! [retry]
//! max_retries = 3
//! initial_backoff_ms = 100
//!
//! [policy]
//! unknown_status = "holds_stock"
//!
//! [tenant]
//! id = "00000000-0000-0000-0000-000000000001"
//! device_id = "backoffice-1"
//! ```
//!
//! Configuration is read-only after load, so no locking is involved.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tally_core::{Actor, StatusPolicy, UnknownStatusPolicy, DEFAULT_TENANT_ID};
use tally_db::{DbConfig, RetryPolicy};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable names.
pub const ENV_DB_PATH: &str = "TALLY_DB_PATH";
pub const ENV_MAX_RETRIES: &str = "TALLY_MAX_RETRIES";
pub const ENV_INITIAL_BACKOFF_MS: &str = "TALLY_INITIAL_BACKOFF_MS";
pub const ENV_UNKNOWN_STATUS: &str = "TALLY_UNKNOWN_STATUS";
pub const ENV_TENANT_ID: &str = "TALLY_TENANT_ID";
pub const ENV_DEVICE_ID: &str = "TALLY_DEVICE_ID";

/// Upper bound on retries; anything larger is almost certainly a typo.
const MAX_RETRIES_LIMIT: u32 = 10;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite file path. Default: platform data directory.
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: default_database_path(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        RetrySection {
            max_retries: 3,
            initial_backoff_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// How statuses outside the known table are treated.
    pub unknown_status: UnknownStatusPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantSection {
    pub id: String,
    /// Stamped on ledger rows and generated document numbers.
    pub device_id: String,
}

impl Default for TenantSection {
    fn default() -> Self {
        TenantSection {
            id: DEFAULT_TENANT_ID.to_string(),
            device_id: "backoffice".to_string(),
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database: DatabaseSection,
    pub retry: RetrySection,
    pub policy: PolicySection,
    pub tenant: TenantSection,
}

impl EngineConfig {
    /// Default location of `config.toml`.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.tally.inventory/config.toml`
    /// - **Windows**: `%APPDATA%\tally\inventory\config\config.toml`
    /// - **Linux**: `~/.config/inventory/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads the file at `path`, applies environment overrides, validates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!(path = %path.display(), "Loading engine configuration");

        let raw = std::fs::read_to_string(path)?;
        let mut config: EngineConfig = toml::from_str(&raw)?;
        config.apply_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file means defaults.
    ///
    /// `None` uses [`default_path`](Self::default_path).
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        match path {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No config file found, using defaults");
                let mut config = EngineConfig::default();
                config.apply_env()?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;

        info!(path = %path.display(), "Engine configuration saved");
        Ok(())
    }

    /// Applies `TALLY_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup (environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database.path = PathBuf::from(path);
        }

        if let Some(retries) = lookup(ENV_MAX_RETRIES) {
            self.retry.max_retries = retries
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_MAX_RETRIES, format!("'{}' is not a number", retries)))?;
        }

        if let Some(backoff) = lookup(ENV_INITIAL_BACKOFF_MS) {
            self.retry.initial_backoff_ms = backoff.trim().parse().map_err(|_| {
                ConfigError::invalid(ENV_INITIAL_BACKOFF_MS, format!("'{}' is not a number", backoff))
            })?;
        }

        if let Some(policy) = lookup(ENV_UNKNOWN_STATUS) {
            self.policy.unknown_status = policy
                .parse()
                .map_err(|reason: String| ConfigError::invalid(ENV_UNKNOWN_STATUS, reason))?;
        }

        if let Some(tenant_id) = lookup(ENV_TENANT_ID) {
            self.tenant.id = tenant_id;
        }

        if let Some(device_id) = lookup(ENV_DEVICE_ID) {
            self.tenant.device_id = device_id;
        }

        Ok(())
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("database.path".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid("database.max_connections", "must be at least 1"));
        }
        if self.retry.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::invalid(
                "retry.max_retries",
                format!("must be at most {}", MAX_RETRIES_LIMIT),
            ));
        }
        if self.retry.initial_backoff_ms == 0 {
            return Err(ConfigError::invalid("retry.initial_backoff_ms", "must be positive"));
        }
        if self.tenant.id.trim().is_empty() {
            return Err(ConfigError::MissingRequired("tenant.id".to_string()));
        }
        if self.tenant.device_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired("tenant.device_id".to_string()));
        }

        Ok(())
    }

    // =========================================================================
    // Derived settings
    // =========================================================================

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .max_retries(self.retry.max_retries)
            .initial_backoff(Duration::from_millis(self.retry.initial_backoff_ms))
    }

    pub fn status_policy(&self) -> StatusPolicy {
        StatusPolicy::new(self.policy.unknown_status)
    }

    /// Actor for a user acting on this device and tenant.
    pub fn actor(&self, user_id: impl Into<String>) -> Actor {
        Actor::new(user_id, self.tenant.device_id.clone()).with_tenant(self.tenant.id.clone())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tally", "inventory")
}

fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("./tally.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.policy.unknown_status, UnknownStatusPolicy::HoldsStock);
        assert_eq!(config.tenant.id, DEFAULT_TENANT_ID);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [retry]
            max_retries = 5

            [policy]
            unknown_status = "no_impact"
            "#,
        )
        .unwrap();

        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_backoff_ms, 100);
        assert_eq!(config.policy.unknown_status, UnknownStatusPolicy::NoImpact);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = EngineConfig::default();
        config
            .apply_overrides(lookup(&[
                (ENV_DB_PATH, "/tmp/override.db"),
                (ENV_MAX_RETRIES, "1"),
                (ENV_INITIAL_BACKOFF_MS, "25"),
                (ENV_UNKNOWN_STATUS, "no-impact"),
                (ENV_DEVICE_ID, "till-7"),
            ]))
            .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/override.db"));
        assert_eq!(config.retry_policy().max_retries, 1);
        assert_eq!(config.retry_policy().initial_backoff, Duration::from_millis(25));
        assert_eq!(config.status_policy().unknown_status_policy(), UnknownStatusPolicy::NoImpact);
        assert_eq!(config.actor("u-1").device_id, "till-7");
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_overrides(lookup(&[(ENV_MAX_RETRIES, "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = config
            .apply_overrides(lookup(&[(ENV_UNKNOWN_STATUS, "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("holds_stock"));
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        let mut config = EngineConfig::default();
        config.retry.max_retries = 50;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.tenant.device_id = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired(_))));
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("tally-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let mut config = EngineConfig::default();
        config.database.path = dir.join("tally.db");
        config.retry.max_retries = 2;
        config.save(&path).unwrap();

        let mut loaded: EngineConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        loaded.validate().unwrap();
        loaded.apply_overrides(|_| None).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(dir).ok();
    }
}
