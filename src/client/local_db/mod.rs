//! # Local Database Module
//!
//! Durable key-value persistence for the sync core. Values are strings
//! (JSON documents in practice) stored under well-known keys, so state such
//! as the last sync time and the pending appointment list survives process
//! restarts.
//!
//! ## Key Components
//!
//! - `KeyValueStore`: the persistence capability the sync core depends on
//! - `LocalDatabase`: SQLite-backed store (sqlx, WAL mode)
//! - `MemoryStore`: process-lifetime store used when SQLite is unavailable
//! - `open_store`: opens SQLite and degrades to memory on failure
//!
//! ## Usage
//!
//! ```rust,no_run
//! use healthsync::client::local_db::{open_store, keys, load_json};
//!
//! # async fn example() -> Result<(), healthsync::shared::SyncError> {
//! let store = open_store("/tmp/healthsync/local.db".as_ref()).await;
//! let last: Option<String> = load_json(store.as_ref(), keys::LAST_SYNC_TIME).await?;
//! # Ok(())
//! # }
//! ```

use crate::shared::error::SyncError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Result type for local database operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Well-known storage keys
pub mod keys {
    pub const LAST_SYNC_TIME: &str = "lastSyncTime";
    pub const PENDING_APPOINTMENTS: &str = "pendingAppointments";
    pub const APPOINTMENTS: &str = "appointments";
    pub const PRESCRIPTIONS: &str = "prescriptions";
    pub const USER_INFO: &str = "userInfo";
}

/// Durable key-value persistence capability
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

impl std::fmt::Debug for dyn KeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyValueStore")
    }
}

/// Read and decode a JSON value
pub async fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON value
pub async fn save_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}

/// Open the SQLite store, falling back to an in-memory store for this
/// session when the database cannot be opened.
pub async fn open_store(path: &Path) -> Arc<dyn KeyValueStore> {
    match LocalDatabase::open(path).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Failed to open local database, continuing with in-memory storage"
            );
            Arc::new(MemoryStore::new())
        }
    }
}

/// SQLite-backed key-value store
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open or create the database file and apply the schema
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SyncError::persistence(format!("create {}: {}", parent.display(), e)))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;

        tracing::info!(path = %path.display(), "Local database opened");
        Ok(db)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(include_str!("schema.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Close the pool, flushing the WAL
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl KeyValueStore for LocalDatabase {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-memory key-value store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
