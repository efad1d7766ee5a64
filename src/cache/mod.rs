//! Best-effort response caching on top of a persistent key-value store.
//!
//! This module provides:
//! - The `KeyValueStore` contract the engine persists through
//! - `CacheLayer`, which stores one entry as a value key plus a `_time` key
//! - In-memory, SQLite and no-op store backends
//! - Derived cache keys for requests without an explicit one

mod key;
mod layer;
mod storage;
mod traits;

pub use key::derive_cache_key;
pub use layer::{time_key, CacheLayer};
pub use storage::{MemoryStore, NoopStore, SqliteStore};
pub use traits::{CacheEntry, DataSource, KeyValueStore};
