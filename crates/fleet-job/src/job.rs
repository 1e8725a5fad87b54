use serde::{Deserialize, Serialize};

use crate::error::VectorError;
use crate::vector::ParamsVector;

/// The only job type the executor runs.
pub const CALL_JOB_TYPE: &str = "call";

/// A stored job: one API method, expanded into calls by its parameter vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
  pub id: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  /// User the job's calls are made on behalf of.
  pub user_id: String,

  pub key: String,

  /// API method invoked once per resolved parameter record.
  pub method: String,

  /// Only `"call"` is runnable; anything else is rejected at run time.
  #[serde(rename = "type")]
  pub job_type: String,

  /// Raw parameter vector. Absent means a single call with no parameters.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub params_vector: Option<serde_json::Value>,
}

impl Job {
  pub fn is_call(&self) -> bool {
    self.job_type == CALL_JOB_TYPE
  }

  /// Parse the raw parameter vector into its expression tree.
  pub fn parsed_params_vector(&self) -> Result<Option<ParamsVector>, VectorError> {
    self
      .params_vector
      .as_ref()
      .map(ParamsVector::from_value)
      .transpose()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_deserialize_job_without_vector() {
    let job: Job = serde_json::from_value(json!({
      "id": "job-1",
      "userId": "admin",
      "key": "snapshot",
      "method": "vm.snapshot",
      "type": "call"
    }))
    .unwrap();

    assert!(job.is_call());
    assert_eq!(job.user_id, "admin");
    assert_eq!(job.parsed_params_vector().unwrap(), None);
  }

  #[test]
  fn test_unknown_job_type_still_loads() {
    let job: Job = serde_json::from_value(json!({
      "id": "job-2",
      "userId": "admin",
      "key": "mail",
      "method": "mail.send",
      "type": "notify"
    }))
    .unwrap();

    assert!(!job.is_call());
  }

  #[test]
  fn test_unknown_vector_type_surfaces_on_parse() {
    let job: Job = serde_json::from_value(json!({
      "id": "job-3",
      "userId": "admin",
      "key": "k",
      "method": "vm.start",
      "type": "call",
      "paramsVector": { "type": "zip", "items": [] }
    }))
    .unwrap();

    assert_eq!(
      job.parsed_params_vector(),
      Err(VectorError::UnsupportedVectorType {
        vector_type: "zip".to_string()
      })
    );
  }
}
