//! Job log sink.
//!
//! Runs record their progress as structured log entries:
//!
//! | event           | level          | data                                  |
//! |-----------------|----------------|---------------------------------------|
//! | `job.start`     | notice         | `userId`, `jobId`, `key`              |
//! | `jobCall.start` | notice         | `runJobId`, `method`, `params`        |
//! | `jobCall.end`   | notice / error | `runJobId`, `runCallId`, `returnedValue` or `error` |
//! | `job.end`       | notice / error | `runJobId`, `error` on failure        |
//!
//! The id returned for `job.start` becomes the run id, and the id returned for
//! each `jobCall.start` becomes that call's id.

use serde_json::Value;
use tracing::{error, info};

/// Structured log sink that assigns event ids.
pub trait JobLog: Send + Sync {
  /// Record an informational entry and return its id.
  fn notice(&self, message: &str, data: Value) -> String;

  /// Record an error entry and return its id.
  fn error(&self, message: &str, data: Value) -> String;
}

/// Writes entries as `tracing` events.
///
/// Ids are time-ordered (v7) uuids.
#[derive(Debug, Clone, Default)]
pub struct TracingJobLog;

impl JobLog for TracingJobLog {
  fn notice(&self, message: &str, data: Value) -> String {
    let event_id = uuid::Uuid::now_v7().to_string();
    info!(event_id = %event_id, data = %data, "{}", message);
    event_id
  }

  fn error(&self, message: &str, data: Value) -> String {
    let event_id = uuid::Uuid::now_v7().to_string();
    error!(event_id = %event_id, data = %data, "{}", message);
    event_id
  }
}
