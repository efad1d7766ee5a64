//! # fetchloop
//!
//! A reusable data-fetching lifecycle engine: fetch a remote JSON resource,
//! optionally serve a time-bounded cached copy instead, optionally re-fetch
//! on a fixed interval, and expose a uniform observable state plus a manual
//! retry.

pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod query;
pub mod render;
pub mod request;
pub mod transport;

pub use cache::{KeyValueStore, MemoryStore, NoopStore, SqliteStore};
pub use error::{ConfigError, FetchError, StoreError};
pub use event::StateEvents;
pub use query::{FetchEngine, LifecycleState, OverlapPolicy, Phase};
pub use request::{Method, RequestConfig};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
