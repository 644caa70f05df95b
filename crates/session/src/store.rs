//! Key-value preference port and its in-memory and SQLite adapters.

use std::collections::HashMap;

use parking_lot::Mutex;
use proto::StoreError;
use sqlx::{Row, sqlite::SqlitePool, sqlite::SqlitePoolOptions};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Persisted-preferences port.
///
/// Reads and writes are synchronous and infallible from the caller's point of
/// view so quota accounting stays a total function over stored integers.
pub trait PreferenceStore: Send + Sync {
    /// Returns the raw value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);

    /// Returns the value under `key` parsed as an unsigned integer.
    ///
    /// Missing or malformed values read as `None`.
    fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key)?.trim().parse().ok()
    }

    /// Stores an unsigned integer under `key`.
    fn set_u32(&self, key: &str, value: u32) {
        self.set(key, value.to_string());
    }
}

/// Process-local store, used by tests and `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.values.lock().insert(key.to_string(), value);
    }
}

enum WriteOp {
    Set { key: String, value: String },
    Flush(oneshot::Sender<()>),
}

/// SQLite-backed preference store.
///
/// All rows are loaded into memory on open; writes update the cache
/// immediately and are persisted in order by a background task.
pub struct SqliteStore {
    cache: Mutex<HashMap<String, String>>,
    writes: mpsc::UnboundedSender<WriteOp>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl SqliteStore {
    /// Open (or create) the SQLite database and load all preferences
    pub async fn open(db_url: &str) -> Result<Self, StoreError> {
        // Expand ~ in path
        let url = if db_url.starts_with('~') {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            db_url.replacen('~', &home, 1)
        } else {
            db_url.to_string()
        };

        // Ensure parent directory exists
        if let Some(parent) = std::path::Path::new(&url).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Setup(e.to_string()))?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&format!("sqlite:{url}?mode=rwc"))
            .await
            .map_err(|e| StoreError::Sqlx(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS preferences (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Setup(e.to_string()))?;

        let rows = sqlx::query("SELECT key, value FROM preferences")
            .fetch_all(&pool)
            .await
            .map_err(|e| StoreError::Sqlx(e.to_string()))?;
        let cache: HashMap<String, String> = rows
            .into_iter()
            .map(|row| (row.get::<String, _>("key"), row.get::<String, _>("value")))
            .collect();

        info!(entries = cache.len(), "Preference store opened: {url}");

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_writer(pool, rx));

        Ok(Self {
            cache: Mutex::new(cache),
            writes: tx,
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Waits until every write issued so far has reached the database.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.writes
            .send(WriteOp::Flush(tx))
            .map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Flushes pending writes and stops the background writer.
    pub async fn close(self) -> Result<(), StoreError> {
        self.flush().await?;
        let writer = self.writer.lock().take();
        drop(self.writes);
        if let Some(handle) = writer {
            handle.await.map_err(|e| StoreError::Sqlx(e.to_string()))?;
        }
        Ok(())
    }
}

impl PreferenceStore for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.cache.lock().insert(key.to_string(), value.clone());
        let op = WriteOp::Set {
            key: key.to_string(),
            value,
        };
        if self.writes.send(op).is_err() {
            warn!(key, "Preference writer closed; value kept in memory only");
        }
    }
}

async fn run_writer(pool: SqlitePool, mut rx: mpsc::UnboundedReceiver<WriteOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Set { key, value } => {
                let result = sqlx::query(
                    "INSERT INTO preferences (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                )
                .bind(&key)
                .bind(&value)
                .execute(&pool)
                .await;
                match result {
                    Ok(_) => debug!(key = %key, "Preference persisted"),
                    Err(e) => warn!(key = %key, error = %e, "Failed to persist preference"),
                }
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    pool.close().await;
}
