//! Plain-text presentation of a lifecycle state.
//!
//! Everything here is a pure function of the state; consumers decide where
//! the text goes.

use crate::cache::DataSource;
use crate::query::{LifecycleState, Phase};

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

fn source_label(source: Option<DataSource>) -> &'static str {
  match source {
    Some(DataSource::Cache) => "cache",
    Some(DataSource::Network) => "network",
    None => "unknown",
  }
}

/// Full rendering: spinner text, error with retry hint, or pretty JSON.
pub fn render(state: &LifecycleState) -> String {
  match state.phase {
    Phase::Loading => "Loading...".to_string(),
    Phase::Error => format!(
      "Error: {}\nPress Enter to retry",
      state.error().unwrap_or("unknown error")
    ),
    Phase::Success => {
      let body = state
        .data()
        .and_then(|data| serde_json::to_string_pretty(data).ok())
        .unwrap_or_else(|| "null".to_string());
      format!("{}\n(from {})", body, source_label(state.source))
    }
  }
}

/// One-line summary, `max_len` characters at most.
pub fn status_line(state: &LifecycleState, max_len: usize) -> String {
  let line = match state.phase {
    Phase::Loading => "loading".to_string(),
    Phase::Error => format!("error: {}", state.error().unwrap_or("unknown error")),
    Phase::Success => {
      let data = state
        .data()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "null".to_string());
      format!("ok [{}] {}", source_label(state.source), data)
    }
  };
  truncate(&line, max_len)
}
