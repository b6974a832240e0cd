//! Settings table accessors
//!
//! Key/value persistence for runtime-configurable values, primarily the
//! provider API keys managed through the configuration resolution chain.

use anyhow::Result;
use sqlx::SqlitePool;

/// Settings key for the Google Maps Platform API key
pub const GOOGLE_MAPS_API_KEY: &str = "google_maps_api_key";

/// Settings key for the Gemini API key
pub const GEMINI_API_KEY: &str = "gemini_api_key";

/// Read a setting, None if absent
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value.map(|(v,)| v))
}

/// Write a setting, replacing any existing value
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get_setting() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        crate::db::init_tables(&pool).await.unwrap();

        assert!(get_setting(&pool, GOOGLE_MAPS_API_KEY).await.unwrap().is_none());

        set_setting(&pool, GOOGLE_MAPS_API_KEY, "key-1").await.unwrap();
        assert_eq!(
            get_setting(&pool, GOOGLE_MAPS_API_KEY).await.unwrap().as_deref(),
            Some("key-1")
        );

        set_setting(&pool, GOOGLE_MAPS_API_KEY, "key-2").await.unwrap();
        assert_eq!(
            get_setting(&pool, GOOGLE_MAPS_API_KEY).await.unwrap().as_deref(),
            Some("key-2")
        );
    }
}
