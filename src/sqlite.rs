//! SQLite key-value backend.
//!
//! Features:
//! - WAL mode for concurrent readers
//! - One row per key, tagged with the value kind
//! - Unknown kinds or unparsable payloads surface as `BackendError::Corrupted`

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::error::BackendError;
use crate::store::{BackendResult, KeyValueStore};
use crate::value::{Value, ValueKind};

/// SQLite implementation of KeyValueStore.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create a SQLite store at the given path.
    pub async fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        let path = path.as_ref();
        info!("Opening SQLite preference store at {:?}", path);

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| BackendError::Unavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    ///
    /// A single connection that is never recycled keeps the database alive.
    pub async fn in_memory() -> BackendResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Close the pool, waiting for open connections to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> BackendResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY NOT NULL,
                kind TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("SQLite preference schema initialized");
        Ok(())
    }

    fn now_unix() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn decode(key: &str, kind: &str, text: &str) -> BackendResult<Value> {
        let kind = ValueKind::parse(kind).ok_or_else(|| BackendError::Corrupted {
            key: key.to_string(),
            reason: format!("unknown kind tag {kind:?}"),
        })?;
        Value::from_text(kind, text).ok_or_else(|| BackendError::Corrupted {
            key: key.to_string(),
            reason: format!("payload {text:?} is not a valid {kind}"),
        })
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> BackendResult<Option<Value>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT kind, value FROM preferences WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(kind, text)| Self::decode(key, &kind, &text))
            .transpose()
    }

    async fn put(&self, key: &str, value: Value) -> BackendResult<()> {
        sqlx::query(
            r#"
            INSERT INTO preferences (key, kind, value, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                kind = excluded.kind,
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value.kind().as_str())
        .bind(value.to_text())
        .bind(Self::now_unix())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> BackendResult<()> {
        sqlx::query("DELETE FROM preferences WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> BackendResult<()> {
        sqlx::query("DELETE FROM preferences")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn keys(&self) -> BackendResult<BTreeSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT key FROM preferences ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(k,)| k).collect())
    }

    async fn has_key(&self, key: &str) -> BackendResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn size(&self) -> BackendResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM preferences")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
