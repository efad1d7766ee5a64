//! Cache layer that maps cache entries onto a flat key-value store.

use std::sync::Arc;

use super::traits::{CacheEntry, KeyValueStore};
use crate::error::StoreError;

/// Key under which the store timestamp for `key` lives.
pub fn time_key(key: &str) -> String {
  format!("{}_time", key)
}

/// Cache layer over a shared key-value store.
///
/// Each entry occupies two keys: the key itself holds the JSON-serialized
/// value and `"<key>_time"` holds the store time as decimal milliseconds.
/// Entries are never deleted here; they simply stop being fresh.
#[derive(Clone)]
pub struct CacheLayer {
  store: Arc<dyn KeyValueStore>,
}

impl CacheLayer {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }

  /// Read the entry stored under `key`.
  ///
  /// Returns `None` when either half of the entry is missing or the
  /// timestamp is unreadable. A value that is not valid JSON is an error.
  pub async fn read(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
    let value = self.store.get(key).await?;
    let stored_at = self.store.get(&time_key(key)).await?;

    let (value, stored_at) = match (value, stored_at) {
      (Some(v), Some(t)) if !v.is_empty() && !t.is_empty() => (v, t),
      _ => return Ok(None),
    };

    let stored_at_ms = match stored_at.trim().parse::<i64>() {
      Ok(ms) => ms,
      Err(e) => {
        tracing::warn!(key, stored_at = %stored_at, error = %e, "Unreadable cache timestamp");
        return Ok(None);
      }
    };

    let value = serde_json::from_str(&value)?;
    Ok(Some(CacheEntry {
      value,
      stored_at_ms,
    }))
  }

  /// Look up a cache hit: an entry younger than `expiration_ms` at `now_ms`.
  pub async fn lookup(
    &self,
    key: &str,
    expiration_ms: u64,
    now_ms: i64,
  ) -> Result<Option<serde_json::Value>, StoreError> {
    match self.read(key).await? {
      Some(entry) if entry.is_fresh(now_ms, expiration_ms) => Ok(Some(entry.value)),
      Some(entry) => {
        tracing::debug!(
          key,
          age_ms = entry.age_ms(now_ms),
          expiration_ms,
          "Cache entry expired"
        );
        Ok(None)
      }
      None => Ok(None),
    }
  }

  /// Persist `value` as the entry for `key`, stamped with `now_ms`.
  pub async fn write(
    &self,
    key: &str,
    value: &serde_json::Value,
    now_ms: i64,
  ) -> Result<(), StoreError> {
    let data = serde_json::to_string(value)?;
    self.store.set(key, &data).await?;
    self.store.set(&time_key(key), &now_ms.to_string()).await?;
    Ok(())
  }
}
