//! Warden server configuration
//!
//! One YAML file (`warden.yaml`) configures the process: storage path,
//! bind address, scheduler cadence, and driver endpoints. Secrets may be
//! supplied through environment variables, which override file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the push gateway API token
const ENV_PUSH_TOKEN: &str = "WARDEN_PUSH_TOKEN";

/// Environment variable overriding the database path
const ENV_DATABASE_PATH: &str = "WARDEN_DATABASE_PATH";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("failed to read config {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse config {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Datastore settings
    pub database: DatabaseConfig,

    /// Scheduler tick settings
    pub scheduler: SchedulerConfig,

    /// Push-notification service settings
    pub push: PushConfig,

    /// Connector service endpoints (camera API, device commands)
    pub connectors: ConnectorServiceConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the ingest API
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8420".to_string(),
        }
    }
}

/// Datastore settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file path
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "warden.db".to_string(),
        }
    }
}

/// Scheduler tick settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between scheduled-automation evaluations
    ///
    /// The schedule tolerance window assumes at most 60; coarser ticks can
    /// silently miss fixed-time schedules.
    pub tick_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { tick_seconds: 60 }
    }
}

/// Push-notification service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Whether notification actions are enabled
    pub enabled: bool,

    /// Gateway application token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Default recipient group key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_recipient_key: Option<String>,

    /// Gateway message endpoint
    pub endpoint: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_token: None,
            default_recipient_key: None,
            endpoint: "https://api.pushover.net/1/messages.json".to_string(),
        }
    }
}

/// Connector service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorServiceConfig {
    /// Base URL of the camera/video connector service
    pub camera_service_url: String,

    /// Base URL of the device command service
    pub device_command_url: String,
}

impl Default for ConnectorServiceConfig {
    fn default() -> Self {
        Self {
            camera_service_url: "http://127.0.0.1:9400".to_string(),
            device_command_url: "http://127.0.0.1:9400".to_string(),
        }
    }
}

impl WardenConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides and validate
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration");

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source,
            })?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides (no file present)
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(ENV_PUSH_TOKEN) {
            self.push.api_token = Some(token);
        }
        if let Ok(path) = std::env::var(ENV_DATABASE_PATH) {
            self.database.path = path;
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.scheduler.tick_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scheduler.tick_seconds",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.push.enabled && self.push.api_token.is_none() {
            return Err(ConfigError::InvalidValue {
                key: "push.api_token",
                reason: "required when push is enabled".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = WardenConfig::default();
        assert_eq!(config.scheduler.tick_seconds, 60);
        assert_eq!(config.database.path, "warden.db");
        assert!(!config.push.enabled);
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  bind: "0.0.0.0:8000"
database:
  path: "/var/lib/warden/warden.db"
push:
  enabled: true
  api_token: "app-token"
  default_recipient_key: "ops"
"#
        )
        .unwrap();

        let config = WardenConfig::load(file.path()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.database.path, "/var/lib/warden/warden.db");
        assert!(config.push.enabled);
        assert_eq!(config.push.api_token.as_deref(), Some("app-token"));
        // Unspecified sections keep defaults
        assert_eq!(config.scheduler.tick_seconds, 60);
    }

    #[test]
    fn test_enabled_push_requires_token() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "push:\n  enabled: true\n").unwrap();

        assert!(matches!(
            WardenConfig::load(file.path()),
            Err(ConfigError::InvalidValue { key: "push.api_token", .. })
        ));
    }

    #[test]
    fn test_zero_tick_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "scheduler:\n  tick_seconds: 0\n").unwrap();

        assert!(matches!(
            WardenConfig::load(file.path()),
            Err(ConfigError::InvalidValue { key: "scheduler.tick_seconds", .. })
        ));
    }
}
