use fleet_job::VectorError;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while resolving a parameter vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
  /// A node could not be parsed, including unknown vector types.
  #[error(transparent)]
  Vector(#[from] VectorError),

  /// A node whose result is used as a vector did not produce an array.
  #[error("'{vector_type}' vector must resolve to an array, got {found}")]
  NotAVector {
    vector_type: &'static str,
    found: &'static str,
  },

  /// A value used as call parameters is not an object.
  #[error("expected a parameter record, got {found}")]
  NotARecord { found: &'static str },

  /// The object repository could not produce a snapshot.
  #[error("object repository query failed: {message}")]
  Repository { message: String },

  /// A `call` node was found but no API was supplied to resolve it.
  #[error("'call' vectors need an API to resolve against")]
  CallsUnavailable,

  /// A `call` node's API invocation failed.
  #[error("call to '{method}' failed: {message}")]
  Call { method: String, message: String },
}

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
