use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::types::TransportResponse;
use super::Transport;
use crate::error::FetchError;
use crate::request::RequestConfig;

/// Production transport using reqwest.
///
/// The engine has no timeout of its own; pass one here if hung requests
/// should eventually fail.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: Client,
}

impl ReqwestTransport {
  pub fn new() -> Result<Self, FetchError> {
    let client = Client::builder().build()?;
    Ok(Self { client })
  }

  /// Create a transport whose requests fail after `timeout`.
  pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client })
  }
}

/// Serialize the request payload. Null, false, 0 and "" mean no body.
fn encode_body(body: Option<&Value>) -> Result<Option<Vec<u8>>, FetchError> {
  let body = match body {
    None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(None),
    Some(Value::String(s)) if s.is_empty() => return Ok(None),
    Some(Value::Number(n)) if n.as_f64() == Some(0.0) => return Ok(None),
    Some(body) => body,
  };
  serde_json::to_vec(body)
    .map(Some)
    .map_err(FetchError::RequestBody)
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn send(
    &self,
    request: &RequestConfig,
    cancel: &CancellationToken,
  ) -> Result<TransportResponse, FetchError> {
    let mut builder = self
      .client
      .request(request.method.into(), request.url.as_str());

    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }

    if let Some(body) = encode_body(request.body.as_ref())? {
      builder = builder.body(body);
    }

    let exchange = async {
      let response = builder.send().await?;
      let status = response.status().as_u16();
      let body = response.bytes().await?;
      Ok::<_, FetchError>(TransportResponse::new(status, body.to_vec()))
    };

    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(FetchError::Cancelled),
      result = exchange => result,
    }
  }
}
