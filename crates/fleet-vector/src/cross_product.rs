//! Cartesian product over vectors of records.
//!
//! Combinations are enumerated with an index odometer rather than recursion,
//! so the number of input vectors never affects stack depth.
//!
//! ```text
//! cross_product([[{a: 2}, {b: 3}], [{c: 5}, {d: 7}]], merge_objects)
//!   => {a: 2, c: 5}, {b: 3, c: 5}, {a: 2, d: 7}, {b: 3, d: 7}
//! ```

use serde_json::Value;

use fleet_job::Record;

/// Lazy iterator over every combination of one element per vector.
///
/// Created by [`cross_product`]. Each combination is passed to the merge
/// function in input order and the merged value is yielded.
pub struct CrossProduct<'a, T, F> {
  vectors: &'a [Vec<T>],
  indices: Vec<usize>,
  merge: F,
  done: bool,
}

/// Compute the cross product of `vectors`, merging each combination with `merge`.
///
/// Yields nothing when `vectors` is empty or when any vector is empty.
/// Duplicate merged values are kept.
pub fn cross_product<'a, T, F, R>(vectors: &'a [Vec<T>], merge: F) -> CrossProduct<'a, T, F>
where
  F: FnMut(&[&'a T]) -> R,
{
  let done = vectors.is_empty() || vectors.iter().any(Vec::is_empty);

  CrossProduct {
    vectors,
    indices: vec![0; vectors.len()],
    merge,
    done,
  }
}

impl<T, F> CrossProduct<'_, T, F> {
  /// Step to the next combination; the first vector turns fastest.
  fn advance(&mut self) {
    for (position, index) in self.indices.iter_mut().enumerate() {
      *index += 1;
      if *index < self.vectors[position].len() {
        return;
      }
      *index = 0;
    }
    self.done = true;
  }
}

impl<'a, T, F, R> Iterator for CrossProduct<'a, T, F>
where
  F: FnMut(&[&'a T]) -> R,
{
  type Item = R;

  fn next(&mut self) -> Option<R> {
    if self.done {
      return None;
    }

    let vectors = self.vectors;
    let combination: Vec<&'a T> = vectors
      .iter()
      .zip(&self.indices)
      .map(|(vector, &index)| &vector[index])
      .collect();

    let merged = (self.merge)(&combination);
    self.advance();
    Some(merged)
  }
}

/// Merge records left to right into one record.
///
/// Later records win on key collisions. Entries that are not objects
/// contribute nothing.
pub fn merge_objects(records: &[&Value]) -> Value {
  let mut merged = Record::new();
  for record in records {
    if let Value::Object(fields) = record {
      merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
  }
  Value::Object(merged)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn as_vectors(vectors: Value) -> Vec<Vec<Value>> {
    serde_json::from_value(vectors).unwrap()
  }

  /// Multiset view of a result: serialized records, sorted.
  fn multiset(values: impl IntoIterator<Item = Value>) -> Vec<String> {
    let mut values: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
    values.sort();
    values
  }

  #[test]
  fn test_two_sets_of_two() {
    let vectors = as_vectors(json!([[{ "a": 2 }, { "b": 3 }], [{ "c": 5 }, { "d": 7 }]]));

    let product = cross_product(&vectors, merge_objects);

    assert_eq!(
      multiset(product),
      multiset([
        json!({ "a": 2, "c": 5 }),
        json!({ "b": 3, "c": 5 }),
        json!({ "a": 2, "d": 7 }),
        json!({ "b": 3, "d": 7 }),
      ])
    );
  }

  #[test]
  fn test_three_sets_of_two() {
    let vectors = as_vectors(json!([
      [{ "a": 2 }, { "b": 3 }],
      [{ "c": 5 }, { "d": 7 }],
      [{ "e": 11 }, { "f": 13 }]
    ]));

    let product: Vec<Value> = cross_product(&vectors, merge_objects).collect();

    assert_eq!(product.len(), 8);
    assert_eq!(
      multiset(product),
      multiset([
        json!({ "a": 2, "c": 5, "e": 11 }),
        json!({ "b": 3, "c": 5, "e": 11 }),
        json!({ "a": 2, "d": 7, "e": 11 }),
        json!({ "b": 3, "d": 7, "e": 11 }),
        json!({ "a": 2, "c": 5, "f": 13 }),
        json!({ "b": 3, "c": 5, "f": 13 }),
        json!({ "a": 2, "d": 7, "f": 13 }),
        json!({ "b": 3, "d": 7, "f": 13 }),
      ])
    );
  }

  #[test]
  fn test_shadowed_duplicates_are_kept() {
    let vectors = as_vectors(json!([
      [{ "a": 2, "b": 3 }, { "a": 5, "b": 6 }, { "a": 8, "b": 4 }],
      [{ "a": 12, "c": 4 }, { "a": 15, "b": 3 }, { "c": 16 }]
    ]));

    let product = cross_product(&vectors, merge_objects);

    assert_eq!(
      multiset(product),
      multiset([
        json!({ "a": 12, "b": 3, "c": 4 }),
        json!({ "a": 12, "b": 6, "c": 4 }),
        json!({ "a": 12, "b": 4, "c": 4 }),
        json!({ "a": 15, "b": 3 }),
        json!({ "a": 15, "b": 3 }),
        json!({ "a": 15, "b": 3 }),
        json!({ "a": 2, "b": 3, "c": 16 }),
        json!({ "a": 5, "b": 6, "c": 16 }),
        json!({ "a": 8, "b": 4, "c": 16 }),
      ])
    );
  }

  #[test]
  fn test_later_vector_wins() {
    let vectors = as_vectors(json!([[{ "a": 1 }], [{ "a": 2, "b": 3 }]]));

    let product: Vec<Value> = cross_product(&vectors, merge_objects).collect();

    assert_eq!(product, vec![json!({ "a": 2, "b": 3 })]);
  }

  #[test]
  fn test_cardinality_is_product_of_lengths() {
    let vectors: Vec<Vec<u32>> = vec![vec![1, 2, 3], vec![4, 5], vec![6, 7, 8, 9]];

    let count = cross_product(&vectors, |_| ()).count();

    assert_eq!(count, 3 * 2 * 4);
  }

  #[test]
  fn test_empty_vector_yields_nothing() {
    let vectors = as_vectors(json!([[{ "a": 1 }, { "b": 2 }], [], [{ "c": 3 }]]));
    assert_eq!(cross_product(&vectors, merge_objects).count(), 0);
  }

  #[test]
  fn test_no_vectors_yields_nothing() {
    let vectors: Vec<Vec<Value>> = Vec::new();
    assert_eq!(cross_product(&vectors, merge_objects).count(), 0);
  }

  #[test]
  fn test_custom_merge_function() {
    let vectors: Vec<Vec<u32>> = vec![vec![1, 2], vec![10, 20]];

    let mut sums: Vec<u32> = cross_product(&vectors, |combo| combo.iter().copied().sum()).collect();
    sums.sort();

    assert_eq!(sums, vec![11, 12, 21, 22]);
  }

  #[test]
  fn test_merge_objects() {
    let cases = [
      (vec![json!({ "a": 1 }), json!({ "b": 2 })], json!({ "a": 1, "b": 2 })),
      (
        vec![json!({ "a": 1, "b": 2 }), json!({ "c": 3, "d": 4 })],
        json!({ "a": 1, "b": 2, "c": 3, "d": 4 }),
      ),
      (
        vec![json!({ "a": 1 }), json!({ "b": 2, "c": 3 }), json!({ "d": 4, "e": 5, "f": 6 })],
        json!({ "a": 1, "b": 2, "c": 3, "d": 4, "e": 5, "f": 6 }),
      ),
      (vec![json!({ "a": 1, "b": 2 })], json!({ "a": 1, "b": 2 })),
      (vec![json!({ "a": 1 }), json!({})], json!({ "a": 1 })),
      (vec![json!({}), json!({})], json!({})),
      (vec![], json!({})),
      (vec![json!({ "a": 1 }), json!(7)], json!({ "a": 1 })),
    ];

    for (records, expected) in cases {
      let refs: Vec<&Value> = records.iter().collect();
      assert_eq!(merge_objects(&refs), expected, "merging {:?}", records);
    }
  }
}
