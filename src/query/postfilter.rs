//! Local fallback for intents the remote endpoint cannot honor.
//!
//! Deferred calls apply in the fixed verb order where → whereIn → sortBy,
//! regardless of the order the caller chained them; the struct layout itself
//! fixes the order. Each verb produces a new `ResultSet` that becomes the
//! working set for the next one.

use serde_json::Value;
use std::cmp::Ordering;
use tracing::warn;

use super::params::{normalize_operator, Direction};
use crate::resultset::{Record, ResultSet};

#[derive(Debug, Clone)]
pub(crate) struct WhereCall {
  pub field: String,
  /// Operator exactly as the caller supplied it; normalized at apply time.
  pub operator: String,
  pub value: Value,
}

#[derive(Debug, Clone)]
pub(crate) struct WhereInCall {
  pub field: String,
  pub values: Vec<Value>,
  pub strict: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct SortCall {
  pub field: String,
  pub direction: Direction,
}

/// Queued deferred calls, grouped per verb in application order.
#[derive(Debug, Clone, Default)]
pub(crate) struct PostFilters {
  where_calls: Vec<WhereCall>,
  where_in_calls: Vec<WhereInCall>,
  sort_calls: Vec<SortCall>,
}

impl PostFilters {
  pub fn push_where(&mut self, field: &str, operator: &str, value: Value) {
    self.where_calls.push(WhereCall {
      field: field.to_string(),
      operator: operator.to_string(),
      value,
    });
  }

  pub fn push_where_in(&mut self, field: &str, values: Vec<Value>, strict: bool) {
    self.where_in_calls.push(WhereInCall {
      field: field.to_string(),
      values,
      strict,
    });
  }

  pub fn push_sort(&mut self, field: &str, direction: Direction) {
    self.sort_calls.push(SortCall {
      field: field.to_string(),
      direction,
    });
  }

  pub fn is_empty(&self) -> bool {
    self.where_calls.is_empty() && self.where_in_calls.is_empty() && self.sort_calls.is_empty()
  }

  /// Run all queued calls against the fetched set.
  ///
  /// A call whose target field appears on no record at all is skipped
  /// silently: the filter does not apply to this data, it is not an error.
  pub fn apply(&self, set: ResultSet) -> ResultSet {
    let set = self.apply_where(set);
    let set = self.apply_where_in(set);
    self.apply_sort(set)
  }

  fn apply_where(&self, mut set: ResultSet) -> ResultSet {
    for call in &self.where_calls {
      if !set.has_field(&call.field) {
        continue;
      }
      let comparator = normalize_operator(&call.operator);
      set = set
        .into_iter()
        .filter(|record| {
          record
            .get(&call.field)
            .is_some_and(|actual| matches(actual, &comparator, &call.value))
        })
        .collect();
    }
    set
  }

  fn apply_where_in(&self, mut set: ResultSet) -> ResultSet {
    for call in &self.where_in_calls {
      if !set.has_field(&call.field) {
        continue;
      }
      set = set
        .into_iter()
        .filter(|record| {
          record.get(&call.field).is_some_and(|actual| {
            call.values.iter().any(|candidate| {
              if call.strict {
                actual == candidate
              } else {
                loose_eq(actual, candidate)
              }
            })
          })
        })
        .collect();
    }
    set
  }

  fn apply_sort(&self, set: ResultSet) -> ResultSet {
    let mut records: Vec<Record> = set.into_records();
    for call in &self.sort_calls {
      if !records.iter().any(|r| r.contains_key(&call.field)) {
        continue;
      }
      // Stable sort per call: earlier calls survive as tie-breakers.
      records.sort_by(|a, b| {
        let ordering = compare_fields(a.get(&call.field), b.get(&call.field));
        match call.direction {
          Direction::Asc => ordering,
          Direction::Desc => ordering.reverse(),
        }
      });
    }
    ResultSet::new(records)
  }
}

/// Evaluate a comparator token against two values.
///
/// Unknown tokens degrade to strict equality; see DESIGN.md for the decision.
fn matches(actual: &Value, comparator: &str, expected: &Value) -> bool {
  match comparator {
    "EQ" => values_equal(actual, expected),
    "GT" => compare_values(actual, expected) == Some(Ordering::Greater),
    "GTE" => matches!(
      compare_values(actual, expected),
      Some(Ordering::Greater) | Some(Ordering::Equal)
    ),
    "LT" => compare_values(actual, expected) == Some(Ordering::Less),
    "LTE" => matches!(
      compare_values(actual, expected),
      Some(Ordering::Less) | Some(Ordering::Equal)
    ),
    other => {
      warn!(comparator = other, "unknown comparator, degrading to strict equality");
      actual == expected
    }
  }
}

/// Equality with numeric widening: 1 and 1.0 are equal, "1" and 1 are not.
fn values_equal(a: &Value, b: &Value) -> bool {
  match (a.as_f64(), b.as_f64()) {
    (Some(x), Some(y)) => x == y,
    _ => a == b,
  }
}

/// Loose equality for non-strict set membership: scalars also match across
/// the string/number boundary ("1" matches 1).
fn loose_eq(a: &Value, b: &Value) -> bool {
  if values_equal(a, b) {
    return true;
  }
  match (scalar_repr(a), scalar_repr(b)) {
    (Some(x), Some(y)) => x == y,
    _ => false,
  }
}

fn scalar_repr(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

/// Ordering across JSON values of the same kind; mixed kinds do not compare.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
  match (a, b) {
    (Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
    (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
    _ => None,
  }
}

/// Sort comparison tolerating absent fields: records without the field sort
/// first, records whose values do not compare keep their relative order.
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  match (a, b) {
    (None, None) => Ordering::Equal,
    (None, Some(_)) => Ordering::Less,
    (Some(_), None) => Ordering::Greater,
    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn set(records: Value) -> ResultSet {
    let records = match records {
      Value::Array(items) => items
        .into_iter()
        .map(|item| match item {
          Value::Object(map) => map,
          _ => panic!("expected object"),
        })
        .collect(),
      _ => panic!("expected array"),
    };
    ResultSet::new(records)
  }

  fn field_values(set: &ResultSet, field: &str) -> Vec<Value> {
    set.iter().map(|r| r[field].clone()).collect()
  }

  #[test]
  fn test_where_equality() {
    let mut filters = PostFilters::default();
    filters.push_where("status", "=", json!("active"));

    let result = filters.apply(set(json!([
      {"id": 1, "status": "active"},
      {"id": 2, "status": "archived"},
      {"id": 3, "status": "active"}
    ])));
    assert_eq!(field_values(&result, "id"), vec![json!(1), json!(3)]);
  }

  #[test]
  fn test_where_comparators() {
    let mut filters = PostFilters::default();
    filters.push_where("year", ">=", json!(2000));
    filters.push_where("year", "<", json!(2010));

    let result = filters.apply(set(json!([
      {"year": 1997},
      {"year": 2000},
      {"year": 2005},
      {"year": 2010}
    ])));
    assert_eq!(field_values(&result, "year"), vec![json!(2000), json!(2005)]);
  }

  #[test]
  fn test_missing_field_skips_call_silently() {
    let mut filters = PostFilters::default();
    filters.push_where("nonexistent", "=", json!("x"));

    let input = set(json!([{"id": 1}, {"id": 2}]));
    let result = filters.apply(input.clone());
    assert_eq!(result, input);
  }

  #[test]
  fn test_records_lacking_present_field_are_excluded() {
    let mut filters = PostFilters::default();
    filters.push_where("status", "=", json!("active"));

    let result = filters.apply(set(json!([
      {"id": 1, "status": "active"},
      {"id": 2}
    ])));
    assert_eq!(field_values(&result, "id"), vec![json!(1)]);
  }

  #[test]
  fn test_unknown_comparator_degrades_to_equality() {
    let mut filters = PostFilters::default();
    filters.push_where("status", "LIKE", json!("active"));

    let result = filters.apply(set(json!([
      {"id": 1, "status": "active"},
      {"id": 2, "status": "inactive"}
    ])));
    assert_eq!(field_values(&result, "id"), vec![json!(1)]);
  }

  #[test]
  fn test_where_in_strict_and_loose() {
    let data = json!([
      {"id": 1, "code": 7},
      {"id": 2, "code": "7"},
      {"id": 3, "code": 9}
    ]);

    let mut strict = PostFilters::default();
    strict.push_where_in("code", vec![json!(7)], true);
    let result = strict.apply(set(data.clone()));
    assert_eq!(field_values(&result, "id"), vec![json!(1)]);

    let mut loose = PostFilters::default();
    loose.push_where_in("code", vec![json!(7)], false);
    let result = loose.apply(set(data));
    assert_eq!(field_values(&result, "id"), vec![json!(1), json!(2)]);
  }

  #[test]
  fn test_sort_ascending_and_descending() {
    let data = json!([{"year": 2005}, {"year": 1997}, {"year": 2010}]);

    let mut asc = PostFilters::default();
    asc.push_sort("year", Direction::Asc);
    let result = asc.apply(set(data.clone()));
    assert_eq!(
      field_values(&result, "year"),
      vec![json!(1997), json!(2005), json!(2010)]
    );

    let mut desc = PostFilters::default();
    desc.push_sort("year", Direction::Desc);
    let result = desc.apply(set(data));
    assert_eq!(
      field_values(&result, "year"),
      vec![json!(2010), json!(2005), json!(1997)]
    );
  }

  #[test]
  fn test_multi_sort_is_stable() {
    // Later calls take precedence; earlier ones survive as tie-breakers.
    let mut filters = PostFilters::default();
    filters.push_sort("title", Direction::Asc);
    filters.push_sort("year", Direction::Asc);

    let result = filters.apply(set(json!([
      {"title": "b", "year": 2000},
      {"title": "a", "year": 2000},
      {"title": "c", "year": 1990}
    ])));
    let titles = field_values(&result, "title");
    assert_eq!(titles, vec![json!("c"), json!("a"), json!("b")]);
  }

  #[test]
  fn test_fixed_verb_order_where_runs_before_sort() {
    // Queue the sort first; the engine must still filter before sorting.
    let mut filters = PostFilters::default();
    filters.push_sort("year", Direction::Desc);
    filters.push_where("status", "=", json!("active"));

    let result = filters.apply(set(json!([
      {"year": 2010, "status": "archived"},
      {"year": 1997, "status": "active"},
      {"year": 2005, "status": "active"}
    ])));
    assert_eq!(field_values(&result, "year"), vec![json!(2005), json!(1997)]);
  }

  #[test]
  fn test_numeric_widening_in_equality() {
    let mut filters = PostFilters::default();
    filters.push_where("rating", "=", json!(4.0));

    let result = filters.apply(set(json!([{"id": 1, "rating": 4}, {"id": 2, "rating": 5}])));
    assert_eq!(field_values(&result, "id"), vec![json!(1)]);
  }
}
