//! Core traits and types for the caching system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A flat string key-value store shared by every engine in the process.
///
/// No locking is done on top of it: concurrent writers to the same key race
/// and the last write wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  /// Read the value stored under `key`, if any.
  async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

  /// Store `value` under `key`, overwriting any previous value.
  async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// A cached response together with the time it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  pub value: serde_json::Value,
  /// Unix milliseconds
  pub stored_at_ms: i64,
}

impl CacheEntry {
  /// Saturates, so a garbage timestamp from the store reads as very old.
  pub fn age_ms(&self, now_ms: i64) -> i64 {
    now_ms.saturating_sub(self.stored_at_ms)
  }

  /// Fresh means strictly younger than the expiration.
  pub fn is_fresh(&self, now_ms: i64, expiration_ms: u64) -> bool {
    self.age_ms(now_ms) < i64::try_from(expiration_ms).unwrap_or(i64::MAX)
  }
}

/// Indicates where the current data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
  /// Fresh data from network
  Network,
  /// Data from cache, younger than the expiration
  Cache,
}
