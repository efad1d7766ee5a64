use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::state::LifecycleState;
use crate::cache::{CacheLayer, DataSource, KeyValueStore};
use crate::error::FetchError;
use crate::event::StateEvents;
use crate::request::RequestConfig;
use crate::transport::Transport;

/// What happens to a still-running attempt when a new one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
  /// Attempts run independently; whichever finishes last sets the state,
  /// even if it was sent first.
  #[default]
  Overlap,
  /// A new attempt cancels the previous one. The cancelled attempt emits
  /// no state and writes nothing to the cache.
  SupersedePrevious,
}

fn now_ms() -> i64 {
  chrono::Utc::now().timestamp_millis()
}

/// Data-fetching lifecycle engine.
///
/// FetchEngine owns:
/// - The request config (replaceable via `reconfigure`)
/// - The observable `LifecycleState` and its subscribers
/// - The polling timer and the liveness flag
///
/// Attempts and the polling timer are tokio tasks, so every method that can
/// trigger an attempt must be called from within a tokio runtime.
/// Dropping the engine disposes it.
pub struct FetchEngine {
  shared: Arc<Shared>,
}

struct Shared {
  transport: Arc<dyn Transport>,
  cache: CacheLayer,
  inner: Mutex<Inner>,
}

struct Inner {
  config: Arc<RequestConfig>,
  state: LifecycleState,
  /// Cleared by `dispose`; no notification is delivered once false
  alive: bool,
  /// Set by the first `start`, cleared by `retry`
  started: bool,
  /// Set by the first `start`; polling follows the config from then on
  polling_enabled: bool,
  attempts: u64,
  overlap: OverlapPolicy,
  /// Token of the most recently triggered attempt
  latest: Option<CancellationToken>,
  poller: Option<JoinHandle<()>>,
  subscribers: Vec<mpsc::UnboundedSender<LifecycleState>>,
}

impl Inner {
  fn notify(&mut self) {
    let snapshot = self.state.clone();
    // Receivers that went away are pruned
    self
      .subscribers
      .retain(|tx| tx.send(snapshot.clone()).is_ok());
  }
}

impl FetchEngine {
  /// Create an idle engine. Nothing is fetched until `start` or `retry`.
  pub fn new(
    config: RequestConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn KeyValueStore>,
  ) -> Result<Self, FetchError> {
    config.validate()?;

    let inner = Inner {
      config: Arc::new(config),
      state: LifecycleState::default(),
      alive: true,
      started: false,
      polling_enabled: false,
      attempts: 0,
      overlap: OverlapPolicy::default(),
      latest: None,
      poller: None,
      subscribers: Vec::new(),
    };

    Ok(Self {
      shared: Arc::new(Shared {
        transport,
        cache: CacheLayer::new(store),
        inner: Mutex::new(inner),
      }),
    })
  }

  pub fn with_overlap_policy(self, policy: OverlapPolicy) -> Self {
    self.shared.inner.lock().overlap = policy;
    self
  }

  pub fn config(&self) -> Arc<RequestConfig> {
    Arc::clone(&self.shared.inner.lock().config)
  }

  /// Snapshot of the current state.
  pub fn state(&self) -> LifecycleState {
    self.shared.inner.lock().state.clone()
  }

  /// Subscribe to state notifications.
  ///
  /// Subscribing after disposal yields a stream that is already closed.
  pub fn subscribe(&self) -> StateEvents {
    let (tx, events) = StateEvents::channel();
    let mut inner = self.shared.inner.lock();
    if inner.alive {
      inner.subscribers.push(tx);
    }
    events
  }

  /// Number of attempts triggered so far.
  pub fn attempts(&self) -> u64 {
    self.shared.inner.lock().attempts
  }

  pub fn is_alive(&self) -> bool {
    self.shared.inner.lock().alive
  }

  /// Trigger the first attempt and arm the polling timer.
  ///
  /// Only the first call does anything; use `retry` to force another
  /// attempt. Returns whether an attempt was triggered.
  pub fn start(&self) -> bool {
    let mut inner = self.shared.inner.lock();
    if !inner.alive {
      tracing::debug!("start() on a disposed engine ignored");
      return false;
    }
    if inner.started {
      return false;
    }

    inner.started = true;
    self.shared.trigger(&mut inner);
    if !inner.polling_enabled {
      inner.polling_enabled = true;
      self.shared.arm_poller(&mut inner);
    }
    true
  }

  /// Clear the start guard and trigger an attempt immediately.
  ///
  /// The attempt runs the full algorithm, cache check included.
  pub fn retry(&self) {
    let mut inner = self.shared.inner.lock();
    if !inner.alive {
      tracing::debug!("retry() on a disposed engine ignored");
      return;
    }

    inner.started = false;
    self.shared.trigger(&mut inner);
  }

  /// Stop observing: disarm polling and drop all subscribers.
  ///
  /// Attempts already in flight still run to completion and still write
  /// the cache, but their results are never delivered. Safe to call twice.
  pub fn dispose(&self) {
    let mut inner = self.shared.inner.lock();
    if !inner.alive {
      return;
    }

    inner.alive = false;
    if let Some(poller) = inner.poller.take() {
      poller.abort();
    }
    inner.subscribers.clear();
    tracing::debug!(attempts = inner.attempts, "Engine disposed");
  }

  /// Replace the config wholesale.
  ///
  /// No attempt is triggered. If the engine was started, the polling timer
  /// is re-armed with the new interval (or disarmed if there is none).
  /// Attempts in flight finish with the config they started with.
  pub fn reconfigure(&self, config: RequestConfig) -> Result<(), FetchError> {
    config.validate()?;

    let mut inner = self.shared.inner.lock();
    inner.config = Arc::new(config);

    if inner.alive && inner.polling_enabled {
      self.shared.arm_poller(&mut inner);
    }
    Ok(())
  }
}

impl Drop for FetchEngine {
  fn drop(&mut self) {
    self.dispose();
  }
}

impl Shared {
  /// Begin one attempt: go to `Loading` now, run the rest on a task.
  fn trigger(self: &Arc<Self>, inner: &mut Inner) {
    inner.attempts += 1;
    let attempt = inner.attempts;

    let token = CancellationToken::new();
    if let Some(previous) = inner.latest.replace(token.clone()) {
      if inner.overlap == OverlapPolicy::SupersedePrevious {
        previous.cancel();
      }
    }

    inner.state.begin_loading();
    inner.notify();

    let config = Arc::clone(&inner.config);
    let shared = Arc::clone(self);
    tokio::spawn(async move {
      shared.run_attempt(attempt, config, token).await;
    });
  }

  fn arm_poller(self: &Arc<Self>, inner: &mut Inner) {
    if let Some(previous) = inner.poller.take() {
      previous.abort();
    }

    let Some(period) = inner.config.polling_interval() else {
      return;
    };

    let weak: Weak<Shared> = Arc::downgrade(self);
    inner.poller = Some(tokio::spawn(async move {
      let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

      loop {
        ticker.tick().await;

        let Some(shared) = weak.upgrade() else {
          break;
        };
        let mut inner = shared.inner.lock();
        if !inner.alive {
          break;
        }
        tracing::trace!(period_ms = period.as_millis() as u64, "Polling tick");
        shared.trigger(&mut inner);
      }
    }));
  }

  async fn run_attempt(&self, attempt: u64, config: Arc<RequestConfig>, token: CancellationToken) {
    tracing::debug!(attempt, url = %config.url, method = config.method.as_str(), "Fetch attempt started");

    if let Some(key) = config.cache_key() {
      match self
        .cache
        .lookup(key, config.cache_expiration_ms, now_ms())
        .await
      {
        Ok(Some(value)) => {
          tracing::debug!(attempt, key, "Cache hit");
          self.apply(&token, |state| state.succeed(value, DataSource::Cache));
          return;
        }
        Ok(None) => tracing::debug!(attempt, key, "Cache miss"),
        Err(e) => {
          let error = FetchError::CacheRead(e);
          tracing::warn!(attempt, key, error = %error, "Ignoring cache read failure");
        }
      }
    }

    match self.fetch(&config, &token).await {
      Ok(value) => {
        if token.is_cancelled() {
          tracing::debug!(attempt, "Attempt superseded, result discarded");
          return;
        }

        let delivered = self.apply(&token, |state| {
          state.succeed(value.clone(), DataSource::Network)
        });
        tracing::debug!(attempt, delivered, "Fetch attempt succeeded");

        if let Some(key) = config.cache_key() {
          if let Err(e) = self.cache.write(key, &value, now_ms()).await {
            let error = FetchError::CacheWrite(e);
            tracing::warn!(attempt, key, error = %error, "Ignoring cache write failure");
          }
        }
      }
      Err(e) if e.is_cancelled() || token.is_cancelled() => {
        tracing::debug!(attempt, "Attempt cancelled");
      }
      Err(e) => {
        tracing::debug!(attempt, error = %e, "Fetch attempt failed");
        self.apply(&token, |state| state.fail(e.to_string()));
      }
    }
  }

  async fn fetch(
    &self,
    config: &RequestConfig,
    token: &CancellationToken,
  ) -> Result<serde_json::Value, FetchError> {
    let response = self.transport.send(config, token).await?;
    if !response.is_success() {
      return Err(FetchError::HttpStatus {
        status: response.status,
      });
    }
    response.json()
  }

  /// Mutate the state and notify, unless the engine was disposed or the
  /// attempt was cancelled. Returns whether the update was delivered.
  fn apply(&self, token: &CancellationToken, update: impl FnOnce(&mut LifecycleState)) -> bool {
    let mut inner = self.inner.lock();
    if !inner.alive || token.is_cancelled() {
      return false;
    }
    update(&mut inner.state);
    inner.notify();
    true
  }
}

impl std::fmt::Debug for FetchEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let inner = self.shared.inner.lock();
    f.debug_struct("FetchEngine")
      .field("url", &inner.config.url)
      .field("state", &inner.state)
      .field("alive", &inner.alive)
      .field("started", &inner.started)
      .field("attempts", &inner.attempts)
      .field("overlap", &inner.overlap)
      .finish_non_exhaustive()
  }
}
