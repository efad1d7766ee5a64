use serde::Serialize;

use crate::cache::DataSource;

/// Lifecycle phase of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  /// An attempt is running (or was superseded before it finished)
  Loading,
  /// The last finished attempt produced data
  Success,
  /// The last finished attempt failed
  Error,
}

/// Observable state of an engine.
///
/// `data` from an earlier success is kept through later `Loading` and
/// `Error` phases; only a new success replaces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleState {
  pub phase: Phase,
  pub data: Option<serde_json::Value>,
  pub error_message: Option<String>,
  /// Where `data` came from
  pub source: Option<DataSource>,
}

impl Default for LifecycleState {
  fn default() -> Self {
    Self {
      phase: Phase::Loading,
      data: None,
      error_message: None,
      source: None,
    }
  }
}

impl LifecycleState {
  pub fn is_loading(&self) -> bool {
    self.phase == Phase::Loading
  }

  pub fn is_success(&self) -> bool {
    self.phase == Phase::Success
  }

  pub fn is_error(&self) -> bool {
    self.phase == Phase::Error
  }

  pub fn data(&self) -> Option<&serde_json::Value> {
    self.data.as_ref()
  }

  pub fn error(&self) -> Option<&str> {
    self.error_message.as_deref()
  }

  pub(crate) fn begin_loading(&mut self) {
    self.phase = Phase::Loading;
    self.error_message = None;
  }

  pub(crate) fn succeed(&mut self, data: serde_json::Value, source: DataSource) {
    self.phase = Phase::Success;
    self.data = Some(data);
    self.error_message = None;
    self.source = Some(source);
  }

  pub(crate) fn fail(&mut self, message: String) {
    self.phase = Phase::Error;
    self.error_message = Some(message);
  }
}
