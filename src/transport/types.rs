use crate::error::FetchError;

/// Raw response from a transport
#[derive(Debug, Clone)]
pub struct TransportResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl TransportResponse {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      body: body.into(),
    }
  }

  /// Check if the response status indicates success (2xx)
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Parse the body as JSON
  pub fn json(&self) -> Result<serde_json::Value, FetchError> {
    Ok(serde_json::from_slice(&self.body)?)
  }
}
