//! Error types for job runs.

use fleet_vector::ResolveError;
use thiserror::Error;

/// Errors that end a run before its calls are dispatched.
///
/// Per-call failures are not run errors; they are kept on each call's
/// [`CallRecord`](crate::CallRecord).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
  /// The job's type is not `"call"`.
  #[error("unknown job type: {job_type}")]
  UnsupportedJobType { job_type: String },

  /// The parameter vector could not be resolved (unknown vector type,
  /// repository failure, malformed node, ...).
  #[error("failed to resolve params vector: {0}")]
  Resolve(#[from] ResolveError),
}
