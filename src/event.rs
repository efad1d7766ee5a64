use tokio::sync::mpsc;

use crate::query::LifecycleState;

/// Stream of state notifications from one engine.
///
/// Every notification delivers the full state snapshot at that moment.
/// The stream ends (`next` returns `None`) once the engine is disposed.
pub struct StateEvents {
  rx: mpsc::UnboundedReceiver<LifecycleState>,
}

impl StateEvents {
  pub(crate) fn channel() -> (mpsc::UnboundedSender<LifecycleState>, Self) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Self { rx })
  }

  /// Receive the next notification
  pub async fn next(&mut self) -> Option<LifecycleState> {
    self.rx.recv().await
  }

  /// Receive a notification that is already queued, without waiting
  pub fn try_next(&mut self) -> Option<LifecycleState> {
    self.rx.try_recv().ok()
  }
}
