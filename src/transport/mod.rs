//! Network transport abstraction.
//!
//! The engine only ever talks to a `Transport`, so tests can swap the real
//! reqwest-backed client for a scripted one.

mod client;
#[cfg(test)]
pub mod mock;
mod types;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::request::RequestConfig;

pub use client::ReqwestTransport;
pub use types::TransportResponse;

/// Sends one request and hands back the raw response.
///
/// Implementations must watch `cancel` and return `FetchError::Cancelled`
/// once it fires, so callers can tell cancellation apart from real failures.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(
    &self,
    request: &RequestConfig,
    cancel: &CancellationToken,
  ) -> Result<TransportResponse, FetchError>;
}
