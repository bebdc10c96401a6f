//! Local key-value settings store.
//!
//! The only thing persisted across runs is the credentials record, kept as
//! opaque JSON under a single key. Trades and account state live in memory.

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::debug;

use crate::config::Credentials;

/// Key the credentials record is stored under.
pub const CREDENTIALS_KEY: &str = "trading_bot_config";

/// A stored setting.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredSetting {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

/// SQLite-backed key-value store.
pub struct ConfigStore {
    pool: SqlitePool,
}

impl ConfigStore {
    /// Open (or create) the store at `database_url`.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .context("Failed to connect to settings database")?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create settings table")?;

        Ok(())
    }

    /// Insert or replace the value under `key`.
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to store setting {}", key))?;

        debug!(key = %key, "Stored setting");
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_setting(key).await?.map(|s| s.value))
    }

    /// Fetch the full row, including when it was last written.
    pub async fn get_setting(&self, key: &str) -> Result<Option<StoredSetting>> {
        sqlx::query_as::<_, StoredSetting>("SELECT key, value, updated_at FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read setting {}", key))
    }

    /// Remove `key`. Returns whether anything was deleted.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete setting {}", key))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        let json = serde_json::to_string(credentials).context("Failed to serialize credentials")?;
        self.put(CREDENTIALS_KEY, &json).await
    }

    /// Load the stored credentials, or defaults when nothing has been saved.
    pub async fn load_credentials(&self) -> Result<Credentials> {
        match self.get(CREDENTIALS_KEY).await? {
            Some(json) => serde_json::from_str(&json).context("Stored credentials are not valid JSON"),
            None => Ok(Credentials::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> ConfigStore {
        ConfigStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = memory_store().await;

        assert_eq!(store.get("missing").await.unwrap(), None);

        store.put("theme", "dark").await.unwrap();
        store.put("theme", "light").await.unwrap();
        assert_eq!(store.get("theme").await.unwrap().as_deref(), Some("light"));

        let row = store.get_setting("theme").await.unwrap().unwrap();
        assert_eq!(row.key, "theme");
        assert!(!row.updated_at.is_empty());

        assert!(store.delete("theme").await.unwrap());
        assert!(!store.delete("theme").await.unwrap());
        assert_eq!(store.get("theme").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_credentials_round_trip() {
        let store = memory_store().await;
        assert_eq!(store.load_credentials().await.unwrap(), Credentials::default());

        let creds = Credentials {
            gemini_api_key: "key-123".to_string(),
            mt5_server: "MetaQuotes-Demo".to_string(),
            mt5_login: "5012345".to_string(),
            mt5_password: "secret".to_string(),
        };
        store.save_credentials(&creds).await.unwrap();

        assert_eq!(store.load_credentials().await.unwrap(), creds);

        let raw = store.get(CREDENTIALS_KEY).await.unwrap().unwrap();
        assert!(raw.contains("\"geminiApiKey\":\"key-123\""));
    }

    #[tokio::test]
    async fn test_corrupt_credentials_error() {
        let store = memory_store().await;
        store.put(CREDENTIALS_KEY, "{not json").await.unwrap();

        assert!(store.load_credentials().await.is_err());
    }
}
