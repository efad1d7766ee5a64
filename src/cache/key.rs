//! Derived cache keys for requests that don't name one explicitly.

use sha2::{Digest, Sha256};

use crate::request::RequestConfig;

/// Prefix shared by every derived key so they never collide with
/// hand-picked ones.
const DERIVED_PREFIX: &str = "fetchloop:";

/// Derive a stable cache key from the parts of a request that decide its
/// response: method, url and body. Headers are deliberately left out.
pub fn derive_cache_key(config: &RequestConfig) -> String {
  let body = config
    .body
    .as_ref()
    .map(|b| b.to_string())
    .unwrap_or_default();
  let input = format!(
    "{}\n{}\n{}",
    config.method.as_str(),
    normalize_url(&config.url),
    body
  );

  // SHA256 hash for stable, fixed-length keys
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  let result = hasher.finalize();
  format!("{}{}", DERIVED_PREFIX, hex::encode(result))
}

/// Normalize a URL for consistent hashing.
fn normalize_url(url: &str) -> String {
  match url::Url::parse(url.trim()) {
    Ok(parsed) => parsed.to_string(),
    Err(_) => url.trim().to_string(),
  }
}
