//! Request configuration for a fetch engine.

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Default time a cached response stays fresh.
pub const DEFAULT_CACHE_EXPIRATION_MS: u64 = 60_000;

/// HTTP method for requests
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  #[default]
  GET,
  POST,
  PUT,
  PATCH,
  DELETE,
  HEAD,
  OPTIONS,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::GET => "GET",
      Method::POST => "POST",
      Method::PUT => "PUT",
      Method::PATCH => "PATCH",
      Method::DELETE => "DELETE",
      Method::HEAD => "HEAD",
      Method::OPTIONS => "OPTIONS",
    }
  }
}

impl From<Method> for reqwest::Method {
  fn from(method: Method) -> Self {
    match method {
      Method::GET => reqwest::Method::GET,
      Method::POST => reqwest::Method::POST,
      Method::PUT => reqwest::Method::PUT,
      Method::PATCH => reqwest::Method::PATCH,
      Method::DELETE => reqwest::Method::DELETE,
      Method::HEAD => reqwest::Method::HEAD,
      Method::OPTIONS => reqwest::Method::OPTIONS,
    }
  }
}

impl std::str::FromStr for Method {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_uppercase().as_str() {
      "GET" => Ok(Method::GET),
      "POST" => Ok(Method::POST),
      "PUT" => Ok(Method::PUT),
      "PATCH" => Ok(Method::PATCH),
      "DELETE" => Ok(Method::DELETE),
      "HEAD" => Ok(Method::HEAD),
      "OPTIONS" => Ok(Method::OPTIONS),
      other => Err(format!("unsupported HTTP method: {}", other)),
    }
  }
}

fn duration_ms(duration: Duration) -> u64 {
  u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn default_headers() -> HashMap<String, String> {
  HashMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

fn default_cache_expiration_ms() -> u64 {
  DEFAULT_CACHE_EXPIRATION_MS
}

/// Everything an engine needs to know about the resource it fetches.
///
/// A config is immutable once handed to an engine; reconfiguring replaces
/// it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
  pub url: String,

  #[serde(default)]
  pub method: Method,

  /// JSON-serialized into the request payload when present
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub body: Option<serde_json::Value>,

  #[serde(default = "default_headers")]
  pub headers: HashMap<String, String>,

  /// Caching is disabled entirely when this is absent
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cache_key: Option<String>,

  #[serde(default = "default_cache_expiration_ms")]
  pub cache_expiration_ms: u64,

  /// No periodic re-fetch when absent
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub polling_interval_ms: Option<u64>,
}

impl RequestConfig {
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      method: Method::default(),
      body: None,
      headers: default_headers(),
      cache_key: None,
      cache_expiration_ms: DEFAULT_CACHE_EXPIRATION_MS,
      polling_interval_ms: None,
    }
  }

  pub fn with_method(mut self, method: Method) -> Self {
    self.method = method;
    self
  }

  pub fn with_body(mut self, body: serde_json::Value) -> Self {
    self.body = Some(body);
    self
  }

  /// Add a header on top of the current set (defaults included).
  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.insert(name.into(), value.into());
    self
  }

  /// Replace the header set wholesale, dropping the default Content-Type.
  pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
    self.headers = headers;
    self
  }

  pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
    self.cache_key = Some(key.into());
    self
  }

  /// Whole milliseconds, rounded down.
  pub fn with_cache_expiration(mut self, expiration: Duration) -> Self {
    self.cache_expiration_ms = duration_ms(expiration);
    self
  }

  /// Whole milliseconds, rounded down. Anything under 1ms becomes 0 and
  /// fails `validate`.
  pub fn with_polling_interval(mut self, interval: Duration) -> Self {
    self.polling_interval_ms = Some(duration_ms(interval));
    self
  }

  pub fn polling_interval(&self) -> Option<Duration> {
    self.polling_interval_ms.map(Duration::from_millis)
  }

  /// The key to cache under. An empty key disables caching like a missing one.
  pub fn cache_key(&self) -> Option<&str> {
    self.cache_key.as_deref().filter(|key| !key.is_empty())
  }

  /// Check that the config can be turned into a real request.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let parsed = Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
      url: self.url.clone(),
      message: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
      return Err(ConfigError::InvalidUrl {
        url: self.url.clone(),
        message: format!("unsupported scheme '{}'", parsed.scheme()),
      });
    }

    if self.polling_interval_ms == Some(0) {
      return Err(ConfigError::ZeroPollingInterval);
    }

    for (name, value) in &self.headers {
      HeaderName::try_from(name.as_str()).map_err(|e| ConfigError::InvalidHeader {
        name: name.clone(),
        message: e.to_string(),
      })?;
      HeaderValue::try_from(value.as_str()).map_err(|e| ConfigError::InvalidHeader {
        name: name.clone(),
        message: e.to_string(),
      })?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = RequestConfig::new("https://example.com/data");
    assert_eq!(config.method, Method::GET);
    assert_eq!(
      config.headers.get("Content-Type").map(String::as_str),
      Some("application/json")
    );
    assert_eq!(config.cache_expiration_ms, 60_000);
    assert!(config.cache_key.is_none());
    assert!(config.polling_interval().is_none());
    assert!(config.body.is_none());
  }

  #[test]
  fn test_with_header_keeps_defaults() {
    let config = RequestConfig::new("https://example.com").with_header("Authorization", "Bearer x");
    assert_eq!(config.headers.len(), 2);
  }

  #[test]
  fn test_with_headers_replaces_defaults() {
    let config = RequestConfig::new("https://example.com")
      .with_headers(HashMap::from([("Accept".to_string(), "text/plain".to_string())]));
    assert_eq!(config.headers.len(), 1);
    assert!(!config.headers.contains_key("Content-Type"));
  }

  #[test]
  fn test_yaml_defaults_applied() {
    let config: RequestConfig = serde_yaml::from_str("url: https://example.com/items\n").unwrap();
    assert_eq!(config, RequestConfig::new("https://example.com/items"));
  }

  #[test]
  fn test_yaml_full() {
    let yaml = r#"
url: https://example.com/items
method: POST
body: { "name": "x" }
cache_key: items
cache_expiration_ms: 0
polling_interval_ms: 1000
"#;
    let config: RequestConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.method, Method::POST);
    assert_eq!(config.body, Some(serde_json::json!({"name": "x"})));
    assert_eq!(config.cache_key.as_deref(), Some("items"));
    assert_eq!(config.cache_expiration_ms, 0);
    assert_eq!(config.polling_interval(), Some(Duration::from_secs(1)));
  }

  #[test]
  fn test_validate_rejects_bad_url() {
    let err = RequestConfig::new("not a url").validate().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidUrl { .. }));

    let err = RequestConfig::new("ftp://example.com").validate().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidUrl { .. }));
  }

  #[test]
  fn test_validate_rejects_zero_polling() {
    let mut config = RequestConfig::new("https://example.com");
    config.polling_interval_ms = Some(0);
    assert_eq!(config.validate(), Err(ConfigError::ZeroPollingInterval));
  }

  #[test]
  fn test_validate_rejects_bad_header() {
    let config = RequestConfig::new("https://example.com").with_header("bad header", "x");
    assert!(matches!(
      config.validate(),
      Err(ConfigError::InvalidHeader { .. })
    ));
  }

  #[test]
  fn test_empty_cache_key_disables_caching() {
    assert_eq!(RequestConfig::new("https://example.com").with_cache_key("").cache_key(), None);
    assert_eq!(
      RequestConfig::new("https://example.com").with_cache_key("items").cache_key(),
      Some("items")
    );
  }

  #[test]
  fn test_duration_builders_round_down() {
    let config = RequestConfig::new("https://example.com")
      .with_cache_expiration(Duration::from_micros(1_500))
      .with_polling_interval(Duration::MAX);
    assert_eq!(config.cache_expiration_ms, 1);
    assert_eq!(config.polling_interval_ms, Some(u64::MAX));

    let config = RequestConfig::new("https://example.com")
      .with_polling_interval(Duration::from_micros(500));
    assert_eq!(config.validate(), Err(ConfigError::ZeroPollingInterval));
  }

  #[test]
  fn test_method_from_str() {
    assert_eq!("patch".parse::<Method>(), Ok(Method::PATCH));
    assert!("BREW".parse::<Method>().is_err());
  }
}
