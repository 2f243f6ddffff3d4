//! Application configuration
//!
//! Loaded from a TOML file. Every section and field falls back to a default,
//! so an empty or missing file yields a runnable service.
//!
//! ```toml
//! [database]
//! url = "sqlite://./slot-booking.db?mode=rwc"
//!
//! [reconciler]
//! stale_timeout_secs = 300
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::services::booking_expiry::DEFAULT_EXPIRY_INTERVAL_SECS;
use crate::application::services::stale_session::{
    DEFAULT_STALE_CHECK_INTERVAL_SECS, DEFAULT_STALE_TIMEOUT_SECS,
};
use crate::infrastructure::DatabaseConfig;
use crate::shared::retry::RetryConfig;

/// Environment variable holding an explicit config path
pub const CONFIG_PATH_ENV: &str = "SLOT_BOOKING_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub locking: LockingSection,
    pub reconciler: ReconcilerSection,
    pub server: ServerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            url: defaults.url,
            max_connections: defaults.max_connections,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// EnvFilter directive, e.g. "info" or "ev_slot_booking=debug"
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockingSection {
    /// How long a caller waits for a busy charger before giving up
    pub wait_timeout_ms: u64,
}

impl Default for LockingSection {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerSection {
    pub expiry_interval_secs: u64,
    pub stale_check_interval_secs: u64,
    /// Age after which an unacknowledged session is failed
    pub stale_timeout_secs: u64,
    pub refund_max_attempts: u32,
    pub refund_initial_delay_ms: u64,
}

impl Default for ReconcilerSection {
    fn default() -> Self {
        Self {
            expiry_interval_secs: DEFAULT_EXPIRY_INTERVAL_SECS,
            stale_check_interval_secs: DEFAULT_STALE_CHECK_INTERVAL_SECS,
            stale_timeout_secs: DEFAULT_STALE_TIMEOUT_SECS,
            refund_max_attempts: 3,
            refund_initial_delay_ms: 200,
        }
    }
}

impl ReconcilerSection {
    pub fn refund_retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.refund_max_attempts.max(1),
            initial_delay: Duration::from_millis(self.refund_initial_delay_ms),
            ..RetryConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Grace period for background tasks on shutdown
    pub shutdown_timeout_secs: u64,
    /// Prometheus scrape endpoint, e.g. "0.0.0.0:9464". Unset disables it.
    pub metrics_addr: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 30,
            metrics_addr: None,
        }
    }
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
        }
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.locking.wait_timeout_ms)
    }
}

/// `$SLOT_BOOKING_CONFIG`, else `~/.config/ev-slot-booking/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ev-slot-booking")
        .join("config.toml")
}
