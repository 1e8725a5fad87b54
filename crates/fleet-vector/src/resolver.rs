//! Parameter vector evaluation.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use fleet_job::{ParamsVector, Record};
use serde_json::Value;
use tracing::debug;

use crate::cross_product::{cross_product, merge_objects};
use crate::error::{ResolveError, kind};
use crate::query::{ObjectRepository, filter_objects};

/// API access for `call` vectors.
///
/// Implementations decide which identity the calls run under.
#[async_trait]
pub trait CallSource: Send + Sync {
  /// Invoke `method` and return its result.
  async fn call(&self, method: &str, params: Record) -> Result<Value, ResolveError>;
}

/// Evaluates parameter vectors against an object repository.
///
/// Resolution never writes: `fetchObjects` only reads the repository, and
/// trees without `call` nodes give the same records for the same snapshot.
#[derive(Clone)]
pub struct Resolver {
  repository: Arc<dyn ObjectRepository>,
}

impl Resolver {
  /// Create a resolver reading fleet objects from `repository`.
  pub fn new(repository: Arc<dyn ObjectRepository>) -> Self {
    Self { repository }
  }

  /// Evaluate a vector. `call` nodes fail with [`ResolveError::CallsUnavailable`].
  pub async fn resolve(&self, vector: &ParamsVector) -> Result<Value, ResolveError> {
    self.resolution(None).eval(vector).await
  }

  /// Evaluate a vector, resolving `call` nodes through `calls`.
  pub async fn resolve_with_calls(
    &self,
    vector: &ParamsVector,
    calls: &dyn CallSource,
  ) -> Result<Value, ResolveError> {
    self.resolution(Some(calls)).eval(vector).await
  }

  /// Resolve a job's top-level vector into the records to dispatch.
  ///
  /// A missing vector yields a single empty record. Otherwise the vector must
  /// resolve to an array of objects.
  pub async fn resolve_params(
    &self,
    vector: Option<&ParamsVector>,
    calls: Option<&dyn CallSource>,
  ) -> Result<Vec<Record>, ResolveError> {
    let Some(vector) = vector else {
      return Ok(vec![Record::new()]);
    };

    let resolution = self.resolution(calls);
    resolution
      .eval_vector(vector)
      .await?
      .into_iter()
      .map(|item| match item {
        Value::Object(record) => Ok(record),
        other => Err(ResolveError::NotARecord { found: kind(&other) }),
      })
      .collect()
  }

  fn resolution<'a>(&'a self, calls: Option<&'a dyn CallSource>) -> Resolution<'a> {
    Resolution {
      repository: self.repository.as_ref(),
      calls,
    }
  }
}

/// Project `value` through `pattern` (output key -> source key).
///
/// Source keys absent from `value` are left out of the result.
pub fn extract_properties(pattern: &BTreeMap<String, String>, value: &Record) -> Record {
  pattern
    .iter()
    .filter_map(|(output, source)| value.get(source).map(|v| (output.clone(), v.clone())))
    .collect()
}

/// State shared by one top-level resolution.
struct Resolution<'a> {
  repository: &'a dyn ObjectRepository,
  calls: Option<&'a dyn CallSource>,
}

type EvalFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ResolveError>> + Send + 'a>>;

impl<'a> Resolution<'a> {
  /// Evaluate one node; recursion goes through boxed futures.
  fn eval<'b>(&'b self, node: &'b ParamsVector) -> EvalFuture<'b> {
    Box::pin(async move {
      match node {
        ParamsVector::Set { values } => Ok(Value::Array(values.clone())),
        ParamsVector::CrossProduct { items } => {
          let mut vectors = Vec::with_capacity(items.len());
          for item in items {
            vectors.push(self.eval_vector(item).await?);
          }
          Ok(Value::Array(
            cross_product(&vectors, merge_objects).collect(),
          ))
        }
        ParamsVector::FetchObjects { pattern } => {
          let objects = self.repository.query_objects().await?;
          let total = objects.len();
          let matched = filter_objects(pattern, objects);
          let pattern = Value::Object(pattern.clone());
          debug!(
            pattern = %pattern,
            total,
            matched = matched.len(),
            "objects_fetched"
          );
          Ok(Value::Array(matched))
        }
        ParamsVector::Map {
          collection,
          iteratee,
          iteratee_args,
        } => {
          let items = self.eval_vector(collection).await?;
          let mut results = Vec::with_capacity(items.len());
          for item in items {
            let node = ParamsVector::from_value(&iteratee_node(iteratee, iteratee_args, item))?;
            results.push(self.eval(&node).await?);
          }
          Ok(Value::Array(results))
        }
        ParamsVector::ExtractProperties { pattern, value } => {
          Ok(Value::Object(extract_properties(pattern, value)))
        }
        ParamsVector::Call {
          method,
          params,
          property,
        } => self.eval_call(method, params, property.as_deref()).await,
      }
    })
  }

  /// Evaluate a node whose result must be an array.
  async fn eval_vector(&self, node: &ParamsVector) -> Result<Vec<Value>, ResolveError> {
    match self.eval(node).await? {
      Value::Array(values) => Ok(values),
      other => Err(ResolveError::NotAVector {
        vector_type: node.tag(),
        found: kind(&other),
      }),
    }
  }

  async fn eval_call(
    &self,
    method: &str,
    params: &Value,
    property: Option<&str>,
  ) -> Result<Value, ResolveError> {
    let calls = self.calls.ok_or(ResolveError::CallsUnavailable)?;

    let params = match params {
      Value::Null => Record::new(),
      Value::Object(record) => record.clone(),
      other => return Err(ResolveError::NotARecord { found: kind(other) }),
    };

    let mut result = calls.call(method, params).await?;
    if let Some(property) = property {
      result = result.get(property).cloned().unwrap_or(Value::Null);
    }

    debug!(method, "dynamic_call_resolved");

    Ok(match result {
      Value::Array(_) => result,
      other => Value::Array(vec![other]),
    })
  }
}

/// Build `{type: iteratee, ...args, value: item}` for one `map` item.
fn iteratee_node(iteratee: &str, args: &Record, item: Value) -> Value {
  let mut node = Record::new();
  node.insert("type".to_string(), Value::String(iteratee.to_string()));
  node.extend(args.iter().map(|(k, v)| (k.clone(), v.clone())));
  node.insert("value".to_string(), item);
  Value::Object(node)
}
