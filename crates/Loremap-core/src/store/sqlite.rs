use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

use super::CacheStore;

/// SQLite-backed cache: one `cache_entries` table of key/value blobs.
#[derive(Clone, Debug)]
pub struct SqliteCache {
    pool: Pool<Sqlite>,
}

impl SqliteCache {
    pub async fn new(db_url: &str) -> Result<Self> {
        // WAL keeps the frequent small mirror writes cheap; NORMAL sync is enough for a cache.
        let connection_options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Every connection to `:memory:` is its own database.
        let in_memory = db_url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(connection_options).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl CacheStore for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM cache_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get::<String, _>("value")?),
            None => None,
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_overwrite() {
        let cache = SqliteCache::new("sqlite::memory:").await.unwrap();
        assert_eq!(cache.get("nodes").await.unwrap(), None);

        cache.set("nodes", "[]").await.unwrap();
        cache.set("nodes", r#"[{"id":"1"}]"#).await.unwrap();
        assert_eq!(
            cache.get("nodes").await.unwrap().as_deref(),
            Some(r#"[{"id":"1"}]"#)
        );

        cache.remove("nodes").await.unwrap();
        assert_eq!(cache.get("nodes").await.unwrap(), None);
    }
}
