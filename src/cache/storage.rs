//! Key-value store backends: in-memory, SQLite, and a no-op store.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::traits::KeyValueStore;
use crate::error::StoreError;

/// Storage implementation that doesn't cache anything.
/// Every read misses and every write is discarded.
pub struct NoopStore;

#[async_trait]
impl KeyValueStore for NoopStore {
  async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
    Ok(None) // Always miss
  }

  async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
    Ok(()) // Discard
  }
}

/// Process-local store, gone when the process exits.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.lock().is_empty()
  }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
  async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    Ok(self.entries.lock().get(key).cloned())
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    self
      .entries
      .lock()
      .insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// SQLite-backed persistent store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

/// Schema for the store table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self, StoreError> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the store at `path`, creating parent directories.
  pub fn open_at(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    tracing::debug!(path = %path.display(), "Opened SQLite store");
    Self::with_connection(conn)
  }

  /// A store that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self, StoreError> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self, StoreError> {
    conn.execute_batch(STORE_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| StoreError::Unavailable {
        message: "Could not determine data directory".to_string(),
      })?;

    Ok(data_dir.join("fetchloop").join("store.db"))
  }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
  async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let conn = self.conn.lock();
    let value = conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let conn = self.conn.lock();
    conn.execute(
      "INSERT OR REPLACE INTO kv_store (key, value, written_at) VALUES (?1, ?2, datetime('now'))",
      params![key, value],
    )?;
    Ok(())
  }
}
