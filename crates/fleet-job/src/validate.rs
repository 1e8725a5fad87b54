//! Legacy job schema check.
//!
//! The job API accepts `{id, name?, type, key, method, paramsVector?}` where the
//! stored vector is a single level of `set` and `map` items:
//!
//! ```json
//! {
//!   "type": "crossProduct",
//!   "items": [
//!     { "type": "set", "values": [{ "id": "vm-1" }] },
//!     { "type": "map", "iteratee": "extractProperties", "collection": { "type": "fetchObjects" } }
//!   ]
//! }
//! ```

use serde_json::Value;

use crate::error::ValidationError;

/// Check a job definition against the stored-job schema.
///
/// All violations are collected rather than stopping at the first one.
pub fn validate_job(job: &Value) -> Result<(), ValidationError> {
  let mut problems = Vec::new();

  let Some(fields) = job.as_object() else {
    return Err(ValidationError {
      problems: vec!["job: not an object".to_string()],
    });
  };

  for name in ["id", "type", "key", "method"] {
    match fields.get(name) {
      Some(Value::String(_)) => {}
      Some(_) => problems.push(format!("job.{}: not a string", name)),
      None => problems.push(format!("job.{}: missing", name)),
    }
  }

  if fields.get("name").is_some_and(|name| !name.is_string()) {
    problems.push("job.name: not a string".to_string());
  }

  if let Some(vector) = fields.get("paramsVector") {
    validate_vector(vector, &mut problems);
  }

  if problems.is_empty() {
    Ok(())
  } else {
    Err(ValidationError { problems })
  }
}

fn validate_vector(vector: &Value, problems: &mut Vec<String>) {
  let Some(fields) = vector.as_object() else {
    problems.push("job.paramsVector: not an object".to_string());
    return;
  };

  if !fields.get("type").is_some_and(Value::is_string) {
    problems.push("job.paramsVector.type: not a string".to_string());
  }

  let Some(items) = fields.get("items") else {
    return;
  };
  let Some(items) = items.as_array() else {
    problems.push("job.paramsVector.items: not an array".to_string());
    return;
  };

  for (index, item) in items.iter().enumerate() {
    let path = format!("job.paramsVector.items[{}]", index);
    let Some(item) = item.as_object() else {
      problems.push(format!("{}: not an object", path));
      continue;
    };

    match item.get("type").and_then(Value::as_str) {
      Some("set") => {
        if !item.get("values").is_some_and(Value::is_array) {
          problems.push(format!("{}: values is not an array", path));
        }
      }
      Some("map") => {
        if !item.get("iteratee").is_some_and(Value::is_string) {
          problems.push(format!("{}: iteratee is not a string", path));
        } else if !item.get("collection").is_some_and(Value::is_object) {
          problems.push(format!("{}: collection is not an object", path));
        }
      }
      _ => problems.push(format!("{}: no type defined", path)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_valid_job() {
    let job = json!({
      "id": "job-1",
      "name": "nightly snapshots",
      "type": "call",
      "key": "snapshot",
      "method": "vm.snapshot",
      "paramsVector": {
        "type": "crossProduct",
        "items": [
          { "type": "set", "values": [{ "id": "vm-1" }] },
          { "type": "map", "iteratee": "extractProperties", "collection": { "type": "fetchObjects" } }
        ]
      }
    });

    assert_eq!(validate_job(&job), Ok(()));
  }

  #[test]
  fn test_job_without_vector() {
    let job = json!({ "id": "j", "type": "call", "key": "k", "method": "m" });
    assert_eq!(validate_job(&job), Ok(()));
  }

  #[test]
  fn test_collects_every_problem() {
    let job = json!({
      "id": 7,
      "type": "call",
      "method": "vm.start",
      "paramsVector": {
        "type": "crossProduct",
        "items": [
          { "type": "set", "values": {} },
          { "type": "map", "iteratee": 1, "collection": {} },
          { "type": "map", "iteratee": "set", "collection": [] },
          { "values": [] }
        ]
      }
    });

    let err = validate_job(&job).unwrap_err();
    assert_eq!(
      err.problems,
      vec![
        "job.id: not a string",
        "job.key: missing",
        "job.paramsVector.items[0]: values is not an array",
        "job.paramsVector.items[1]: iteratee is not a string",
        "job.paramsVector.items[2]: collection is not an object",
        "job.paramsVector.items[3]: no type defined",
      ]
    );
  }

  #[test]
  fn test_not_an_object() {
    let err = validate_job(&json!([1, 2])).unwrap_err();
    assert_eq!(err.problems, vec!["job: not an object"]);
  }
}
