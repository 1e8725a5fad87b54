//! Parameter vector expressions.
//!
//! A parameter vector is a small tagged expression tree. Each node is a JSON
//! object whose `type` field selects the operation:
//!
//! ```json
//! {
//!   "type": "crossProduct",
//!   "items": [
//!     { "type": "set", "values": [{ "force": true }] },
//!     {
//!       "type": "map",
//!       "collection": { "type": "fetchObjects", "pattern": { "type": "VM", "tags": "nightly" } },
//!       "iteratee": "extractProperties",
//!       "iterateeArgs": { "pattern": { "id": "uuid" } }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::VectorError;

/// A parameter record: one call's named arguments.
pub type Record = serde_json::Map<String, Value>;

/// A parsed parameter vector node.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamsVector {
  /// Literal values, returned unchanged.
  Set { values: Vec<Value> },

  /// Cartesian product of the children's resolved vectors.
  CrossProduct { items: Vec<ParamsVector> },

  /// Live fleet objects matching a structural pattern.
  FetchObjects { pattern: Record },

  /// Resolve `{type: iteratee, ...iteratee_args, value: item}` for each item
  /// of the resolved collection.
  Map {
    collection: Box<ParamsVector>,
    iteratee: String,
    iteratee_args: Record,
  },

  /// Project and rename fields of `value`: output key -> source key.
  ExtractProperties {
    pattern: BTreeMap<String, String>,
    value: Record,
  },

  /// Invoke an API method during resolution and use its result as a vector.
  Call {
    method: String,
    params: Value,
    property: Option<String>,
  },
}

#[derive(Deserialize)]
struct SetDef {
  values: Vec<Value>,
}

#[derive(Deserialize)]
struct CrossProductDef {
  items: Vec<Value>,
}

#[derive(Deserialize)]
struct FetchObjectsDef {
  #[serde(default)]
  pattern: Record,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapDef {
  collection: Value,
  iteratee: String,
  #[serde(default)]
  iteratee_args: Record,
}

#[derive(Deserialize)]
struct ExtractPropertiesDef {
  pattern: BTreeMap<String, String>,
  value: Record,
}

#[derive(Deserialize)]
struct CallDef {
  method: String,
  #[serde(default, alias = "value")]
  params: Value,
  #[serde(default)]
  property: Option<String>,
}

impl ParamsVector {
  pub const SET: &'static str = "set";
  pub const CROSS_PRODUCT: &'static str = "crossProduct";
  pub const FETCH_OBJECTS: &'static str = "fetchObjects";
  pub const MAP: &'static str = "map";
  pub const EXTRACT_PROPERTIES: &'static str = "extractProperties";
  pub const CALL: &'static str = "call";

  /// Parse a JSON node (and its nested children) into an expression tree.
  ///
  /// `map` iteratees are not parsed here: their nodes only exist once the
  /// collection has been resolved.
  pub fn from_value(value: &Value) -> Result<Self, VectorError> {
    let tag = value
      .get("type")
      .and_then(Value::as_str)
      .ok_or(VectorError::MissingType)?;

    match tag {
      Self::SET => {
        let def: SetDef = parse_def(tag, value)?;
        Ok(Self::Set { values: def.values })
      }
      Self::CROSS_PRODUCT => {
        let def: CrossProductDef = parse_def(tag, value)?;
        let items = def
          .items
          .iter()
          .map(Self::from_value)
          .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::CrossProduct { items })
      }
      Self::FETCH_OBJECTS => {
        let def: FetchObjectsDef = parse_def(tag, value)?;
        Ok(Self::FetchObjects {
          pattern: def.pattern,
        })
      }
      Self::MAP => {
        let def: MapDef = parse_def(tag, value)?;
        Ok(Self::Map {
          collection: Box::new(Self::from_value(&def.collection)?),
          iteratee: def.iteratee,
          iteratee_args: def.iteratee_args,
        })
      }
      Self::EXTRACT_PROPERTIES => {
        let def: ExtractPropertiesDef = parse_def(tag, value)?;
        Ok(Self::ExtractProperties {
          pattern: def.pattern,
          value: def.value,
        })
      }
      Self::CALL => {
        let def: CallDef = parse_def(tag, value)?;
        Ok(Self::Call {
          method: def.method,
          params: def.params,
          property: def.property,
        })
      }
      _ => Err(VectorError::UnsupportedVectorType {
        vector_type: tag.to_string(),
      }),
    }
  }

  /// The node's `type` tag.
  pub fn tag(&self) -> &'static str {
    match self {
      Self::Set { .. } => Self::SET,
      Self::CrossProduct { .. } => Self::CROSS_PRODUCT,
      Self::FetchObjects { .. } => Self::FETCH_OBJECTS,
      Self::Map { .. } => Self::MAP,
      Self::ExtractProperties { .. } => Self::EXTRACT_PROPERTIES,
      Self::Call { .. } => Self::CALL,
    }
  }

  /// Whether resolving this tree may invoke the API.
  pub fn contains_call(&self) -> bool {
    match self {
      Self::Call { .. } => true,
      Self::CrossProduct { items } => items.iter().any(Self::contains_call),
      Self::Map {
        collection,
        iteratee,
        iteratee_args,
      } => {
        iteratee == Self::CALL
          || collection.contains_call()
          || iteratee_args.values().any(names_call)
      }
      Self::Set { .. } | Self::FetchObjects { .. } | Self::ExtractProperties { .. } => false,
    }
  }
}

/// Whether raw JSON holds a `call` node anywhere. Iteratee arguments are only
/// parsed per item at resolution time, so they are scanned unparsed.
fn names_call(value: &Value) -> bool {
  match value {
    Value::Object(fields) => {
      fields.get("type").and_then(Value::as_str) == Some(ParamsVector::CALL)
        || fields.values().any(names_call)
    }
    Value::Array(items) => items.iter().any(names_call),
    _ => false,
  }
}

fn parse_def<T: DeserializeOwned>(tag: &str, value: &Value) -> Result<T, VectorError> {
  T::deserialize(value).map_err(|e| VectorError::InvalidVector {
    vector_type: tag.to_string(),
    message: e.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_nested_tree() {
    let vector = ParamsVector::from_value(&json!({
      "type": "crossProduct",
      "items": [
        { "type": "set", "values": [{ "force": true }] },
        {
          "type": "map",
          "collection": { "type": "fetchObjects", "pattern": { "type": "VM" } },
          "iteratee": "extractProperties",
          "iterateeArgs": { "pattern": { "id": "uuid" } }
        }
      ]
    }))
    .unwrap();

    let ParamsVector::CrossProduct { items } = &vector else {
      panic!("expected crossProduct, got {:?}", vector);
    };
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].tag(), "set");

    let ParamsVector::Map {
      collection,
      iteratee,
      iteratee_args,
    } = &items[1]
    else {
      panic!("expected map, got {:?}", items[1]);
    };
    assert_eq!(collection.tag(), "fetchObjects");
    assert_eq!(iteratee, "extractProperties");
    assert_eq!(iteratee_args["pattern"], json!({ "id": "uuid" }));
    assert!(!vector.contains_call());
  }

  #[test]
  fn test_missing_type() {
    assert_eq!(
      ParamsVector::from_value(&json!({ "values": [] })),
      Err(VectorError::MissingType)
    );
  }

  #[test]
  fn test_unknown_nested_type() {
    let err = ParamsVector::from_value(&json!({
      "type": "crossProduct",
      "items": [{ "type": "set", "values": [] }, { "type": "zip" }]
    }))
    .unwrap_err();

    assert_eq!(
      err,
      VectorError::UnsupportedVectorType {
        vector_type: "zip".to_string()
      }
    );
  }

  #[test]
  fn test_malformed_known_type() {
    let err = ParamsVector::from_value(&json!({ "type": "set", "values": 3 })).unwrap_err();
    assert!(matches!(
      err,
      VectorError::InvalidVector { ref vector_type, .. } if vector_type == "set"
    ));
  }

  #[test]
  fn test_call_accepts_value_as_params() {
    let vector = ParamsVector::from_value(&json!({
      "type": "call",
      "method": "vm.getSnapshots",
      "value": { "id": "vm-1" },
      "property": "snapshots"
    }))
    .unwrap();

    assert_eq!(
      vector,
      ParamsVector::Call {
        method: "vm.getSnapshots".to_string(),
        params: json!({ "id": "vm-1" }),
        property: Some("snapshots".to_string()),
      }
    );
    assert!(vector.contains_call());
  }

  #[test]
  fn test_call_nested_in_iteratee_args_contains_call() {
    let nested_cross_product = ParamsVector::from_value(&json!({
      "type": "map",
      "collection": { "type": "set", "values": [{ "x": 1 }] },
      "iteratee": "crossProduct",
      "iterateeArgs": { "items": [{ "type": "call", "method": "vm.list" }] }
    }))
    .unwrap();
    let nested_map = ParamsVector::from_value(&json!({
      "type": "map",
      "collection": { "type": "set", "values": [{ "x": 1 }] },
      "iteratee": "map",
      "iterateeArgs": {
        "collection": { "type": "call", "method": "vm.list" },
        "iteratee": "extractProperties",
        "iterateeArgs": { "pattern": { "id": "id" } }
      }
    }))
    .unwrap();

    assert!(nested_cross_product.contains_call());
    assert!(nested_map.contains_call());
  }

  #[test]
  fn test_map_with_call_iteratee_contains_call() {
    let vector = ParamsVector::from_value(&json!({
      "type": "map",
      "collection": { "type": "set", "values": [{ "id": "vm-1" }] },
      "iteratee": "call",
      "iterateeArgs": { "method": "vm.getSnapshots" }
    }))
    .unwrap();

    assert!(vector.contains_call());
  }
}
