//! Configuration loading and data directory resolution
//!
//! Bootstrap configuration comes from a TOML file; the data directory
//! (database + stored images) is resolved through a priority chain so the
//! services start with zero configuration on a fresh machine.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory for all services
pub const DATA_DIR_ENV: &str = "VANTAGE_DATA_DIR";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. Restart to pick up changes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Data directory holding vantage.db and stored street images
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Google Maps Platform API key (geocoding + street imagery)
    #[serde(default)]
    pub google_maps_api_key: Option<String>,

    /// Gemini API key (aesthetic rating)
    #[serde(default)]
    pub gemini_api_key: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Default configuration file path for the platform
/// (`~/.config/vantage/config.toml` or the OS equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vantage").join("config.toml"))
}

/// Load the TOML configuration file.
///
/// A missing file is not an error: services must start with defaults on a
/// fresh machine. A file that exists but does not parse is an error.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok(TomlConfig::default()),
        },
    };

    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve the data directory following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. `VANTAGE_DATA_DIR` environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.data_dir {
        return path.clone();
    }

    default_data_dir()
}

/// OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vantage"))
        .unwrap_or_else(|| PathBuf::from("./vantage_data"))
}

/// Create the data directory layout if missing
pub fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    std::fs::create_dir_all(images_dir(data_dir))?;
    Ok(())
}

/// Path to the SQLite database inside the data directory
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("vantage.db")
}

/// Directory holding stored street images
pub fn images_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("images")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_yields_defaults() {
        let config = load_toml_config(Some(Path::new("/nonexistent/config.toml"))).unwrap();
        assert!(config.data_dir.is_none());
        assert!(config.port.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parses_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            data_dir = "/srv/vantage"
            port = 5860
            google_maps_api_key = "gm-key"
            gemini_api_key = "gem-key"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let config = load_toml_config(Some(&path)).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/vantage")));
        assert_eq!(config.port, Some(5860));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.google_maps_api_key.as_deref(), Some("gm-key"));
        assert_eq!(config.gemini_api_key.as_deref(), Some("gem-key"));
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number").unwrap();

        assert!(load_toml_config(Some(&path)).is_err());
    }

    #[test]
    fn cli_argument_wins_over_toml() {
        let toml_config = TomlConfig {
            data_dir: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };

        let resolved = resolve_data_dir(Some(Path::new("/from/cli")), &toml_config);
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn toml_wins_over_default() {
        let toml_config = TomlConfig {
            data_dir: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };

        let resolved = resolve_data_dir(None, &toml_config);
        assert_eq!(resolved, PathBuf::from("/from/toml"));
    }
}
