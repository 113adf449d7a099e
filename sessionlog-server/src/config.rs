//! Service configuration
//!
//! Command-line arguments (with `SESSIONLOG_*` environment fallbacks) win
//! over the TOML file, which wins over compiled defaults.

use clap::Parser;
use sessionlog_common::config::{load_config, TomlConfig};
use sessionlog_common::Result;
use std::path::PathBuf;

/// Command-line arguments for sessionlog-server
#[derive(Parser, Debug, Default)]
#[command(name = "sessionlog-server")]
#[command(about = "Session log ingestion and aggregation service")]
#[command(version)]
pub struct Args {
    /// TOML config file (default: ~/.config/sessionlog/config.toml)
    #[arg(short, long, env = "SESSIONLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long, env = "SESSIONLOG_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SESSIONLOG_PORT")]
    pub port: Option<u16>,

    /// SQLite database file
    #[arg(short, long, env = "SESSIONLOG_DATABASE")]
    pub database: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "SESSIONLOG_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Args {
    /// Overlay command-line values on a loaded config
    pub fn apply(&self, mut config: TomlConfig) -> Result<TomlConfig> {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = &self.database {
            config.database_path = Some(database.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Load the TOML layer and apply command-line overrides
pub fn resolve(args: &Args) -> Result<TomlConfig> {
    let config = load_config(args.config.as_deref())?;
    args.apply(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_args_override_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = 6000\nhost = \"0.0.0.0\"\n[logging]\nlevel = \"warn\"").unwrap();

        let args = Args {
            config: Some(file.path().to_path_buf()),
            port: Some(7000),
            database: Some(PathBuf::from("/tmp/override.db")),
            ..Default::default()
        };
        let config = resolve(&args).unwrap();

        assert_eq!(config.port, 7000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/override.db")));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let args = Args {
            config: Some(PathBuf::from("/nonexistent/sessionlog.toml")),
            ..Default::default()
        };
        assert!(resolve(&args).is_err());
    }

    #[test]
    fn test_blank_log_level_rejected() {
        let args = Args {
            log_level: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(args.apply(TomlConfig::default()).is_err());
    }

    #[test]
    fn test_cli_parsing() {
        let args = Args::try_parse_from(["sessionlog-server", "--port", "5999", "--host", "::1"]).unwrap();
        assert_eq!(args.port, Some(5999));
        assert_eq!(args.host.as_deref(), Some("::1"));
    }
}
