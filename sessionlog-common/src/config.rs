//! Bootstrap configuration loading
//!
//! Configuration sources in priority order:
//! 1. Command-line arguments / environment variables (applied by the service)
//! 2. TOML config file (explicit path, else the per-user default location)
//! 3. Compiled defaults
//!
//! A missing default config file is not an error: the service logs a
//! warning and starts with compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application directory name used under the OS config/data directories
pub const APP_DIR_NAME: &str = "sessionlog";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// SQLite database file; defaults to the OS data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Interface to bind the HTTP server to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted upload body in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Aggregate update tuning
    #[serde(default)]
    pub aggregate: AggregateConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            aggregate: AggregateConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Aggregate update tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Attempts at an optimistic aggregate write before reporting a conflict
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Total time to keep retrying while SQLite reports "database is locked"
    #[serde(default = "default_max_lock_wait_ms")]
    pub database_max_lock_wait_ms: u64,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            database_max_lock_wait_ms: default_max_lock_wait_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error);
    /// `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_lock_wait_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Database path, falling back to the OS data directory
    pub fn database_path_or_default(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be greater than 0".to_string()));
        }
        if self.aggregate.max_attempts == 0 {
            return Err(Error::Config("aggregate.max_attempts must be at least 1".to_string()));
        }
        if self.logging.level.trim().is_empty() {
            return Err(Error::Config("logging.level must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Parse and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed for {}: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed for {}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from an explicit path, the default location, or defaults
///
/// An explicit path that cannot be read is an error. A missing default
/// file only produces a warning.
pub fn load_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit_path {
        let config = load_toml_config(path)?;
        info!("Loaded config from {}", path.display());
        return Ok(config);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            let config = load_toml_config(&path)?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "Config file not found at {}, using compiled defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Per-user config file location (e.g. ~/.config/sessionlog/config.toml)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./sessionlog_data"))
        .join("sessionlog.db")
}
