//! Run events and notifiers.
//!
//! The executor reports each finished run through the [`ExecutionNotifier`]
//! its caller registered, instead of a process-wide bus.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::status::ExecutionStatus;

/// Events emitted by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum JobEvent {
  /// Every call of a run has settled.
  #[serde(rename = "job:terminated")]
  Terminated(ExecutionStatus),
}

impl JobEvent {
  /// Wire name of the event.
  pub fn name(&self) -> &'static str {
    match self {
      Self::Terminated(_) => "job:terminated",
    }
  }
}

/// Receives executor events.
///
/// Implementations decide what to do with them: persist, broadcast, ignore.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: JobEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: JobEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded: one event per run, and the executor must not wait on a slow consumer.
  sender: mpsc::UnboundedSender<JobEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<JobEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: JobEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
