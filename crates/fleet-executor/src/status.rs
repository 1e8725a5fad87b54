//! Run reports.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fleet_job::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JobError;

/// One dispatched call.
///
/// Once `end` is set exactly one of `returned_value` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
  pub method: String,
  pub params: Record,
  pub start: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub returned_value: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl CallRecord {
  pub(crate) fn started(method: &str, params: Record) -> Self {
    Self {
      method: method.to_string(),
      params,
      start: Utc::now(),
      end: None,
      returned_value: None,
      error: None,
    }
  }

  pub(crate) fn succeed(&mut self, value: Value) {
    self.end = Some(Utc::now());
    self.returned_value = Some(value);
  }

  pub(crate) fn fail(&mut self, error: String) {
    self.end = Some(Utc::now());
    self.error = Some(error);
  }

  pub fn is_settled(&self) -> bool {
    self.end.is_some()
  }

  pub fn is_failed(&self) -> bool {
    self.error.is_some()
  }
}

/// Report of one job run, keyed by the call ids the job log assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatus {
  pub run_job_id: String,
  pub start: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end: Option<DateTime<Utc>>,
  pub calls: BTreeMap<String, CallRecord>,
}

impl ExecutionStatus {
  pub(crate) fn new(run_job_id: &str) -> Self {
    Self {
      run_job_id: run_job_id.to_string(),
      start: Utc::now(),
      end: None,
      calls: BTreeMap::new(),
    }
  }

  /// Calls that ended with an error.
  pub fn failed_calls(&self) -> impl Iterator<Item = (&String, &CallRecord)> {
    self.calls.iter().filter(|(_, call)| call.is_failed())
  }

  /// Number of calls that returned a value.
  pub fn succeeded_count(&self) -> usize {
    self
      .calls
      .values()
      .filter(|call| call.returned_value.is_some())
      .count()
  }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
  /// Every dispatched call settled; the `job:terminated` event was emitted.
  Terminated(ExecutionStatus),

  /// The run stopped before dispatch.
  Failed { run_job_id: String, error: JobError },
}

impl RunOutcome {
  pub fn run_job_id(&self) -> &str {
    match self {
      Self::Terminated(status) => &status.run_job_id,
      Self::Failed { run_job_id, .. } => run_job_id,
    }
  }

  pub fn status(&self) -> Option<&ExecutionStatus> {
    match self {
      Self::Terminated(status) => Some(status),
      Self::Failed { .. } => None,
    }
  }

  pub fn error(&self) -> Option<&JobError> {
    match self {
      Self::Terminated(_) => None,
      Self::Failed { error, .. } => Some(error),
    }
  }
}
