//! Data-fetching lifecycle engine.
//!
//! Inspired by TanStack Query, a `FetchEngine` wraps one remote resource and
//! exposes its loading/success/error state, with optional time-bounded
//! caching and fixed-interval polling.
//!
//! # Example
//!
//! ```ignore
//! let config = RequestConfig::new("https://api.example.com/items")
//!     .with_cache_key("items")
//!     .with_polling_interval(Duration::from_secs(30));
//!
//! let engine = FetchEngine::new(
//!     config,
//!     Arc::new(ReqwestTransport::new()?),
//!     Arc::new(SqliteStore::open()?),
//! )?;
//! let mut events = engine.subscribe();
//! engine.start();
//!
//! while let Some(state) = events.next().await {
//!     match state.phase {
//!         Phase::Loading => render_spinner(),
//!         Phase::Success => render_data(state.data()),
//!         Phase::Error => {
//!             render_error(state.error());
//!             engine.retry();
//!         }
//!     }
//! }
//! ```
//!
//! # Attempts
//!
//! Each trigger (`start`, `retry`, or a polling tick) runs one attempt:
//! go to `Loading`, check the cache if a key is configured, otherwise hit
//! the network, then settle in `Success` or `Error`. Attempts are
//! independent tasks with their own cancellation token. Under the default
//! `OverlapPolicy::Overlap` a slow attempt can finish after a newer one and
//! overwrite its result; `OverlapPolicy::SupersedePrevious` cancels the
//! older attempt instead.

mod engine;
mod state;

pub use engine::{FetchEngine, OverlapPolicy};
pub use state::{LifecycleState, Phase};
