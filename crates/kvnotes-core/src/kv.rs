//! Key-value store abstraction.
//!
//! All state of the service lives behind [`KvStore`]: an async mapping from
//! string keys to string values with per-key atomicity and no multi-key
//! transactions. [`SqliteKv`] is the production backend; [`MemoryKv`] backs
//! tests and the `--in-memory` server flag.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tokio::sync::RwLock;
use tracing::info;

/// Errors raised by a key-value backend.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),
}

impl From<sqlx::Error> for KvError {
    fn from(e: sqlx::Error) -> Self {
        Self::Query(e.to_string())
    }
}

/// Async string-to-string mapping with per-key atomicity.
///
/// `get` of an absent key is `Ok(None)`; `delete` of an absent key is
/// `Ok(())`. Nothing here coordinates writers touching different keys.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    async fn put(&self, key: &str, value: &str) -> Result<(), KvError>;

    async fn delete(&self, key: &str) -> Result<(), KvError>;
}

/// `SQLite`-backed key-value store: one `kv(key, value)` table.
#[derive(Clone)]
pub struct SqliteKv {
    pool: Pool<Sqlite>,
}

impl SqliteKv {
    /// Open (or create) the store at the given file path.
    ///
    /// Creates the parent directory if it does not exist, enables WAL
    /// journal mode, and sets a 5-second busy timeout.
    pub async fn open(path: &Path) -> Result<Self, KvError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| KvError::Io(e.to_string()))?;
        }

        let options =
            SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
                .map_err(|e| KvError::Connection(e.to_string()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        info!(path = %path.display(), "Store opened");

        Ok(store)
    }

    /// Open an in-memory `SQLite` store (for testing).
    pub async fn open_in_memory() -> Result<Self, KvError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| KvError::Connection(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), KvError> {
        sqlx::query("CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), KvError> {
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-memory key-value store.
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
