//! Provider API key resolution for vantage-api
//!
//! Keys resolve through Database → ENV → TOML priority so a key entered at
//! runtime (settings table) wins over deployment configuration.

use sqlx::SqlitePool;
use tracing::{info, warn};
use vantage_common::config::TomlConfig;
use vantage_common::{Error, Result};

use crate::db::settings;

/// Environment variable carrying the Google Maps Platform API key
pub const GOOGLE_MAPS_KEY_ENV: &str = "VANTAGE_GOOGLE_MAPS_API_KEY";

/// Environment variable carrying the Gemini API key
pub const GEMINI_KEY_ENV: &str = "VANTAGE_GEMINI_API_KEY";

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the Google Maps Platform API key (geocoding + street imagery)
pub async fn resolve_google_maps_api_key(
    db: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<String> {
    resolve_key(
        db,
        settings::GOOGLE_MAPS_API_KEY,
        GOOGLE_MAPS_KEY_ENV,
        toml_config.google_maps_api_key.as_deref(),
        "Google Maps",
        "https://console.cloud.google.com/google/maps-apis",
    )
    .await
}

/// Resolve the Gemini API key (aesthetic rating)
pub async fn resolve_gemini_api_key(db: &SqlitePool, toml_config: &TomlConfig) -> Result<String> {
    resolve_key(
        db,
        settings::GEMINI_API_KEY,
        GEMINI_KEY_ENV,
        toml_config.gemini_api_key.as_deref(),
        "Gemini",
        "https://aistudio.google.com/",
    )
    .await
}

async fn resolve_key(
    db: &SqlitePool,
    settings_key: &str,
    env_var: &str,
    toml_key: Option<&str>,
    label: &str,
    obtain_url: &str,
) -> Result<String> {
    let db_key = settings::get_setting(db, settings_key)
        .await
        .map_err(|e| Error::Config(format!("Failed to read {} key from database: {}", label, e)))?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k)).map(String::from);

    let mut sources = Vec::new();
    if db_key.is_some() {
        sources.push("database");
    }
    if env_key.is_some() {
        sources.push("environment");
    }
    if toml_key.is_some() {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "{} API key found in multiple sources: {}. Using database (highest priority).",
            label,
            sources.join(", ")
        );
    }

    if let Some(key) = db_key {
        info!("{} API key loaded from database", label);
        return Ok(key);
    }
    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", label);
        return Ok(key);
    }
    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", label);
        return Ok(key);
    }

    Err(Error::Config(format!(
        "{} API key not configured. Please configure using one of:\n\
         1. Settings table: INSERT INTO settings (key, value) VALUES ('{}', 'your-key')\n\
         2. Environment: {}=your-key-here\n\
         3. TOML config: ~/.config/vantage/config.toml ({} = \"your-key\")\n\
         \n\
         Obtain API key at: {}",
        label, settings_key, env_var, settings_key, obtain_url
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("abc123"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[tokio::test]
    async fn test_database_key_wins() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        settings::set_setting(&pool, settings::GOOGLE_MAPS_API_KEY, "from-db")
            .await
            .unwrap();

        let toml_config = TomlConfig {
            google_maps_api_key: Some("from-toml".to_string()),
            ..Default::default()
        };

        let key = resolve_google_maps_api_key(&pool, &toml_config).await.unwrap();
        assert_eq!(key, "from-db");
    }

    #[tokio::test]
    async fn test_toml_fallback_and_missing_key() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();

        let toml_config = TomlConfig {
            gemini_api_key: Some("from-toml".to_string()),
            ..Default::default()
        };
        let key = resolve_gemini_api_key(&pool, &toml_config).await.unwrap();
        assert_eq!(key, "from-toml");

        let empty = TomlConfig::default();
        let err = resolve_gemini_api_key(&pool, &empty).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }
}
