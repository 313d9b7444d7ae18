//! One-shot async writes (create, update, delete) with observable state.

use std::future::Future;
use tokio::sync::mpsc;

/// The state of a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState {
  /// Nothing has been started, or the last outcome was consumed
  Idle,
  /// The write is in flight
  Pending,
  /// The last write succeeded
  Succeeded,
  /// The last write failed
  Failed(String),
}

/// Async write operation with state management.
///
/// Unlike a query there is no fetcher to rerun: each `start` takes the future
/// to execute. Only one write may be in flight at a time.
pub struct Mutation<T> {
  state: MutationState,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }

  pub fn state(&self) -> &MutationState {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    self.state == MutationState::Pending
  }

  pub fn error(&self) -> Option<&str> {
    match &self.state {
      MutationState::Failed(e) => Some(e),
      _ => None,
    }
  }

  /// Run `future` unless a write is already pending.
  ///
  /// Returns `false` (and drops `future` unpolled) while pending.
  pub fn start<Fut>(&mut self, future: Fut) -> bool
  where
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
    true
  }

  /// Poll for the outcome of a pending write.
  ///
  /// Returns the outcome exactly once, when it arrives. Call this in your
  /// event loop tick handler.
  pub fn poll(&mut self) -> Option<Result<T, String>> {
    let receiver = self.receiver.as_mut()?;

    let outcome = match receiver.try_recv() {
      Ok(outcome) => outcome,
      Err(mpsc::error::TryRecvError::Empty) => return None,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        Err("Mutation was cancelled".to_string())
      }
    };

    self.receiver = None;
    self.state = match &outcome {
      Ok(_) => MutationState::Succeeded,
      Err(e) => MutationState::Failed(e.clone()),
    };
    Some(outcome)
  }
}

impl<T: Send + 'static> Default for Mutation<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> std::fmt::Debug for Mutation<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Mutation")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}
