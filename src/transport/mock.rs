//! Scripted transport for engine tests.
//!
//! Replies are handed out in order; once the script runs dry the fallback
//! reply (if any) is repeated. Each reply can be delayed so tests can make
//! attempts overlap under paused tokio time.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{Transport, TransportResponse};
use crate::error::FetchError;
use crate::request::RequestConfig;

#[derive(Debug, Clone)]
enum Outcome {
  Respond { status: u16, body: Vec<u8> },
  Fail(String),
}

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct Reply {
  outcome: Outcome,
  delay: Duration,
}

impl Reply {
  pub fn json(status: u16, body: serde_json::Value) -> Self {
    Self::raw(status, body.to_string())
  }

  pub fn raw(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      outcome: Outcome::Respond {
        status,
        body: body.into(),
      },
      delay: Duration::ZERO,
    }
  }

  pub fn network_error(message: impl Into<String>) -> Self {
    Self {
      outcome: Outcome::Fail(message.into()),
      delay: Duration::ZERO,
    }
  }

  pub fn after(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }
}

#[derive(Default)]
pub struct ScriptedTransport {
  replies: Mutex<VecDeque<Reply>>,
  fallback: Mutex<Option<Reply>>,
  calls: AtomicUsize,
  cancelled: AtomicUsize,
  requests: Mutex<Vec<RequestConfig>>,
}

impl ScriptedTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queue a reply for the next unanswered call.
  pub fn push(self, reply: Reply) -> Self {
    self.replies.lock().push_back(reply);
    self
  }

  /// Reply used once the queue is empty.
  pub fn with_fallback(self, reply: Reply) -> Self {
    *self.fallback.lock() = Some(reply);
    self
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  /// Number of sends that ended because their token fired.
  pub fn cancelled(&self) -> usize {
    self.cancelled.load(Ordering::SeqCst)
  }

  pub fn requests(&self) -> Vec<RequestConfig> {
    self.requests.lock().clone()
  }
}

#[async_trait]
impl Transport for ScriptedTransport {
  async fn send(
    &self,
    request: &RequestConfig,
    cancel: &CancellationToken,
  ) -> Result<TransportResponse, FetchError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.requests.lock().push(request.clone());

    let queued = self.replies.lock().pop_front();
    let reply = match queued {
      Some(reply) => reply,
      None => self
        .fallback
        .lock()
        .clone()
        .unwrap_or_else(|| Reply::network_error("no scripted reply")),
    };

    tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
        return Err(FetchError::Cancelled);
      }
      _ = tokio::time::sleep(reply.delay) => {}
    }

    match reply.outcome {
      Outcome::Respond { status, body } => Ok(TransportResponse::new(status, body)),
      Outcome::Fail(message) => Err(FetchError::network(message)),
    }
  }
}
