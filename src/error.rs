//! Error types for the fetch engine and its collaborators.
//!
//! `FetchError`'s `Display` output is what consumers see as the
//! `error_message` of an errored lifecycle state.

/// Failure of a key-value store backend.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
  #[error("SQLite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Store unavailable: {message}")]
  Unavailable { message: String },
}

/// Invalid request configuration.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Invalid URL '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  #[error("Polling interval must be greater than zero")]
  ZeroPollingInterval,

  #[error("Invalid header '{name}': {message}")]
  InvalidHeader { name: String, message: String },
}

/// Everything that can go wrong during one fetch attempt.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
  /// Transport-level failure (connection refused, DNS, timeout, ...)
  #[error("{message}")]
  Network { message: String },

  #[error("HTTP error! Status: {status}")]
  HttpStatus { status: u16 },

  /// Response body was not valid JSON
  #[error("{0}")]
  Deserialization(#[from] serde_json::Error),

  /// The configured request body could not be serialized
  #[error("Failed to encode request body: {0}")]
  RequestBody(#[source] serde_json::Error),

  #[error("Cache read failed: {0}")]
  CacheRead(#[source] StoreError),

  #[error("Cache write failed: {0}")]
  CacheWrite(#[source] StoreError),

  /// The attempt's own cancellation token fired. Never surfaced to consumers.
  #[error("Request was cancelled")]
  Cancelled,

  #[error("Invalid configuration: {0}")]
  Config(#[from] ConfigError),
}

impl FetchError {
  pub fn network(message: impl Into<String>) -> Self {
    Self::Network {
      message: message.into(),
    }
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, FetchError::Cancelled)
  }
}

impl From<reqwest::Error> for FetchError {
  fn from(error: reqwest::Error) -> Self {
    FetchError::network(error.to_string())
  }
}
