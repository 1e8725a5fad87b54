use thiserror::Error;

/// Errors raised while parsing a parameter vector node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VectorError {
  /// The node has no string `type` tag.
  #[error("params vector node has no type")]
  MissingType,

  /// The node's tag names no known vector operation.
  #[error("unknown vector type: {vector_type}")]
  UnsupportedVectorType { vector_type: String },

  /// The tag is known but the node's fields don't fit it.
  #[error("invalid '{vector_type}' vector: {message}")]
  InvalidVector {
    vector_type: String,
    message: String,
  },
}

/// A stored job definition failed the legacy schema check.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid job definition: {}", .problems.join("; "))]
pub struct ValidationError {
  /// One entry per violation, prefixed with the offending path.
  pub problems: Vec<String>,
}
