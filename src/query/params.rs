//! Canonical request-parameter encoding.
//!
//! Natively-supported intents accumulate into `NativeParams` and are
//! flattened to key/value pairs sorted lexicographically by key. Two queries
//! with identical semantic content therefore encode to an identical string
//! regardless of call order, which is what cache-key stability rests on.

use serde_json::Value;
use std::collections::BTreeMap;

/// Sort direction for ordering intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Asc,
  Desc,
}

/// Normalize a caller-supplied operator into its canonical comparator token.
///
/// Unrecognized operators pass through unchanged; validation is deliberately
/// left to whichever side ends up applying the filter.
pub(crate) fn normalize_operator(operator: &str) -> String {
  match operator {
    "=" => "EQ",
    ">" => "GT",
    ">=" => "GTE",
    "<" => "LT",
    "<=" => "LTE",
    other => return other.to_string(),
  }
  .to_string()
}

/// Accumulated native-supported intents, destined for the wire request.
///
/// Filters live under a reserved `_filter` namespace as field → comparator →
/// value; ordering is a single `_order` token (`-field` for descending).
/// BTreeMap backing keeps iteration deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeParams {
  filters: BTreeMap<String, BTreeMap<String, Value>>,
  order: Option<String>,
}

impl NativeParams {
  pub(crate) fn insert_filter(&mut self, field: &str, comparator: &str, value: Value) {
    self
      .filters
      .entry(field.to_string())
      .or_default()
      .insert(comparator.to_string(), value);
  }

  /// Set the single native ordering token, replacing any previous one.
  pub(crate) fn set_order(&mut self, field: &str, direction: Direction) {
    self.order = Some(match direction {
      Direction::Asc => field.to_string(),
      Direction::Desc => format!("-{field}"),
    });
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.filters.is_empty() && self.order.is_none()
  }
}

/// Flatten native params and includes into wire pairs, sorted by key.
///
/// Array values (set-membership filters) expand to indexed keys so the
/// receiving side sees `_filter[f][IN][0]=a&_filter[f][IN][1]=b`. The include
/// list is comma-joined in insertion order.
pub(crate) fn encode_pairs(params: &NativeParams, includes: &[String]) -> Vec<(String, String)> {
  let mut pairs = Vec::new();

  for (field, clauses) in &params.filters {
    for (comparator, value) in clauses {
      match value {
        Value::Array(items) => {
          for (i, item) in items.iter().enumerate() {
            pairs.push((format!("_filter[{field}][{comparator}][{i}]"), scalar(item)));
          }
        }
        other => pairs.push((format!("_filter[{field}][{comparator}]"), scalar(other))),
      }
    }
  }

  if let Some(order) = &params.order {
    pairs.push(("_order".to_string(), order.clone()));
  }

  if !includes.is_empty() {
    pairs.push(("include".to_string(), includes.join(",")));
  }

  pairs.sort_by(|a, b| a.0.cmp(&b.0));
  pairs
}

/// URL-encode pairs into a query string / form body.
pub(crate) fn encode_query_string(pairs: &[(String, String)]) -> String {
  url::form_urlencoded::Serializer::new(String::new())
    .extend_pairs(pairs)
    .finish()
}

fn scalar(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}
