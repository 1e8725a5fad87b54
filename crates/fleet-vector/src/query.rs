//! Structural queries over live fleet objects.

use async_trait::async_trait;
use serde_json::Value;

use fleet_job::Record;

use crate::error::ResolveError;

/// Read-only access to a snapshot of the fleet's live objects.
///
/// Objects are JSON records (VMs, hosts, pools, ...). Each call returns the
/// repository's current snapshot.
#[async_trait]
pub trait ObjectRepository: Send + Sync {
  /// Return every live object.
  async fn query_objects(&self) -> Result<Vec<Value>, ResolveError>;
}

/// A repository over a fixed set of objects.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
  objects: Vec<Value>,
}

impl InMemoryRepository {
  pub fn new(objects: Vec<Value>) -> Self {
    Self { objects }
  }

  pub fn objects(&self) -> &[Value] {
    &self.objects
  }
}

#[async_trait]
impl ObjectRepository for InMemoryRepository {
  async fn query_objects(&self) -> Result<Vec<Value>, ResolveError> {
    Ok(self.objects.clone())
  }
}

/// Check whether `object` matches every attribute named in `pattern`.
///
/// Per attribute, with `v` the pattern value and `o` the object's value:
/// - scalar / scalar: `v == o`
/// - scalar / array: `o` contains `v`
/// - array / scalar: `v` contains `o`
/// - array / array: the arrays share an element
///
/// A missing attribute compares as `null`. Attributes not named in the
/// pattern are ignored, so an empty pattern matches everything.
pub fn matches_pattern(pattern: &Record, object: &Value) -> bool {
  pattern.iter().all(|(key, expected)| {
    let actual = object.get(key.as_str()).unwrap_or(&Value::Null);
    attribute_matches(expected, actual)
  })
}

fn attribute_matches(expected: &Value, actual: &Value) -> bool {
  match (expected, actual) {
    (Value::Array(wanted), Value::Array(present)) => wanted.iter().any(|w| present.contains(w)),
    (Value::Array(wanted), actual) => wanted.contains(actual),
    (expected, Value::Array(present)) => present.contains(expected),
    (expected, actual) => expected == actual,
  }
}

/// Keep the objects matching `pattern`, in snapshot order.
pub fn filter_objects(pattern: &Record, objects: Vec<Value>) -> Vec<Value> {
  objects
    .into_iter()
    .filter(|object| matches_pattern(pattern, object))
    .collect()
}
