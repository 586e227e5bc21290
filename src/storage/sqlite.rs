//! SQLite journey store.
//!
//! A single `journeys` table keyed by fingerprint with upsert semantics.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use super::JourneyStore;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `url` (e.g. `sqlite://journeys.db` or `sqlite::memory:`),
    /// creating the database file and schema if needed.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid SQLite URL: {url}"))?
            .create_if_missing(true);

        // One connection keeps `sqlite::memory:` a single shared database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database {url}"))?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS journeys (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create journeys table")?;
        Ok(())
    }
}

#[async_trait]
impl JourneyStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT payload FROM journeys WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read journey {key}"))?;
        Ok(row.map(|r| r.get::<String, _>("payload")))
    }

    async fn set(&self, key: &str, payload: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO journeys (key, payload, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(payload)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write journey {key}"))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM journeys WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete journey {key}"))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
