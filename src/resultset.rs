//! Ordered record sequences returned by fetches.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single entity as returned by the remote endpoint.
pub type Record = serde_json::Map<String, Value>;

/// An ordered collection of records, produced by a collection fetch or by
/// wrapping a single-entity fetch.
///
/// Post-filter steps build a new set rather than mutating in place, so a
/// cached raw set can be re-filtered any number of times.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
  records: Vec<Record>,
}

impl ResultSet {
  pub fn new(records: Vec<Record>) -> Self {
    Self { records }
  }

  /// Wrap a single-entity fetch as a one-record set.
  pub fn from_record(record: Record) -> Self {
    Self {
      records: vec![record],
    }
  }

  pub fn records(&self) -> &[Record] {
    &self.records
  }

  pub fn into_records(self) -> Vec<Record> {
    self.records
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Record> {
    self.records.iter()
  }

  /// Whether any record in the set carries the given field.
  pub fn has_field(&self, field: &str) -> bool {
    self.records.iter().any(|r| r.contains_key(field))
  }
}

impl IntoIterator for ResultSet {
  type Item = Record;
  type IntoIter = std::vec::IntoIter<Record>;

  fn into_iter(self) -> Self::IntoIter {
    self.records.into_iter()
  }
}

impl FromIterator<Record> for ResultSet {
  fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
    Self {
      records: iter.into_iter().collect(),
    }
  }
}
