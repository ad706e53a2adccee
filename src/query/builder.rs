//! Fluent query building with per-intent capability dispatch.
//!
//! Each chained call is routed at the moment it is issued: an intent the
//! resource can honor natively lands in the wire params, anything else is
//! queued for local post-filtering. The decision is never re-evaluated.

use serde_json::Value;
use tracing::debug;

use super::params::{normalize_operator, Direction, NativeParams};
use super::postfilter::PostFilters;
use crate::bridge::Bridge;
use crate::error::Result;
use crate::resource::{Resource, Verb};
use crate::resultset::ResultSet;

/// Accumulated state of one logical query.
///
/// Owned exclusively by one `Query` chain and discarded once a terminal call
/// resolves. A given filter intent appears in exactly one of `native` or
/// `post`, never both.
#[derive(Debug, Clone, Default)]
pub(crate) struct QuerySpec {
  pub native: NativeParams,
  pub post: PostFilters,
  pub includes: Vec<String>,
  pub ttl_override: Option<u64>,
  pub cache_key: Option<String>,
}

impl QuerySpec {
  pub(crate) fn add_where(
    &mut self,
    resource: &dyn Resource,
    field: &str,
    operator: &str,
    value: Value,
  ) {
    if resource.supports(Verb::Where) && resource.is_filterable(field) {
      self
        .native
        .insert_filter(field, &normalize_operator(operator), value);
    } else {
      debug!(field, operator, "where not supported natively, queuing post-filter");
      self.post.push_where(field, operator, value);
    }
  }

  pub(crate) fn add_where_in(
    &mut self,
    resource: &dyn Resource,
    field: &str,
    values: Vec<Value>,
    strict: bool,
  ) {
    if resource.supports(Verb::WhereIn) && resource.is_filterable(field) {
      // `strict` only matters for local evaluation; the wire encoding has a
      // single membership semantic.
      self.native.insert_filter(field, "IN", Value::Array(values));
    } else {
      debug!(field, "whereIn not supported natively, queuing post-filter");
      self.post.push_where_in(field, values, strict);
    }
  }

  pub(crate) fn add_order_by(&mut self, resource: &dyn Resource, field: &str, direction: Direction) {
    if resource.supports(Verb::OrderBy) {
      self.native.set_order(field, direction);
    } else {
      debug!(field, "orderBy not supported natively, queuing local sort");
      self.post.push_sort(field, direction);
    }
  }

  pub(crate) fn add_include(&mut self, resource: &dyn Resource, name: &str) {
    if !resource.is_includable(name) {
      debug!(name, "include not declared by resource, dropping");
      return;
    }
    if !self.includes.iter().any(|n| n == name) {
      self.includes.push(name.to_string());
    }
  }

  pub(crate) fn ttl_for(&self, resource: &dyn Resource) -> u64 {
    self.ttl_override.unwrap_or_else(|| resource.remember_for())
  }
}

/// A single in-flight query chain against one resource.
///
/// Created via [`Bridge::query`]; consumed by one of the terminal calls
/// ([`get`](Query::get), [`find`](Query::find), [`post`](Query::post)).
pub struct Query<'a, R: Resource> {
  bridge: &'a Bridge,
  resource: &'a R,
  spec: QuerySpec,
}

impl<'a, R: Resource> Query<'a, R> {
  pub(crate) fn new(bridge: &'a Bridge, resource: &'a R) -> Self {
    Self {
      bridge,
      resource,
      spec: QuerySpec::default(),
    }
  }

  /// Filter on a field with a comparison operator (`=`, `>`, `>=`, `<`, `<=`).
  ///
  /// Unrecognized operators are passed through unchanged to whichever side
  /// ends up applying the filter.
  pub fn where_<V: Into<Value>>(mut self, field: &str, operator: &str, value: V) -> Self {
    self.spec.add_where(self.resource, field, operator, value.into());
    self
  }

  /// Filter on set membership. `strict` controls type-sensitive comparison
  /// when the filter has to run locally.
  pub fn where_in<V: Into<Value>>(mut self, field: &str, values: Vec<V>, strict: bool) -> Self {
    let values = values.into_iter().map(Into::into).collect();
    self.spec.add_where_in(self.resource, field, values, strict);
    self
  }

  /// Order results by a field. Only one native ordering can exist; a later
  /// call replaces it.
  pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
    self.spec.add_order_by(self.resource, field, direction);
    self
  }

  /// Request a sub-resource to be included. Names the resource does not
  /// declare includable are silently dropped; probe with
  /// [`Resource::is_includable`] when that matters.
  pub fn with(mut self, name: &str) -> Self {
    self.spec.add_include(self.resource, name);
    self
  }

  /// Cache the fetch result for `ttl_secs` seconds (0 disables caching),
  /// overriding the resource default.
  pub fn remember(mut self, ttl_secs: u64) -> Self {
    self.spec.ttl_override = Some(ttl_secs);
    self
  }

  /// Like [`remember`](Query::remember), but with an explicit cache key used
  /// verbatim as the key tail. The caller takes responsibility for
  /// uniqueness.
  pub fn remember_keyed(mut self, ttl_secs: u64, key: impl Into<String>) -> Self {
    self.spec.ttl_override = Some(ttl_secs);
    self.spec.cache_key = Some(key.into());
    self
  }

  /// Run the query and return the matching collection.
  pub fn get(self) -> Result<ResultSet> {
    self.bridge.fetch_many(self.resource, &self.spec)
  }

  /// Run the query for a single entity by primary key.
  pub fn find(self, id: impl std::fmt::Display) -> Result<ResultSet> {
    self.bridge.fetch_one(self.resource, &self.spec, &id.to_string())
  }

  /// Send the accumulated params as a form-encoded POST. Never cached.
  pub fn post(self) -> Result<ResultSet> {
    self.bridge.send_post(self.resource, &self.spec)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::params::encode_pairs;
  use crate::resource::{ResourceSpec, VerbSupport};
  use serde_json::json;
  use std::collections::BTreeSet;

  fn resource(filterable: &[&str], verbs: VerbSupport) -> ResourceSpec {
    ResourceSpec {
      name: "albums".to_string(),
      endpoint: "https://api.test/albums".to_string(),
      primary_key: "id".to_string(),
      filterable: filterable.iter().map(|s| s.to_string()).collect(),
      includable: ["genre"].iter().map(|s| s.to_string()).collect(),
      verbs,
      remember_for: 0,
      envelope: None,
    }
  }

  #[test]
  fn test_supported_filter_goes_native_only() {
    let resource = resource(&["status"], VerbSupport::All);
    let mut spec = QuerySpec::default();
    spec.add_where(&resource, "status", "=", json!("active"));

    let pairs = encode_pairs(&spec.native, &spec.includes);
    assert_eq!(
      pairs,
      vec![("_filter[status][EQ]".to_string(), "active".to_string())]
    );
    assert!(spec.post.is_empty());
  }

  #[test]
  fn test_unfilterable_field_defers_verbatim() {
    let resource = resource(&[], VerbSupport::All);
    let mut spec = QuerySpec::default();
    spec.add_where(&resource, "status", "=", json!("active"));

    assert!(spec.native.is_empty());
    assert!(!spec.post.is_empty());
  }

  #[test]
  fn test_unsupported_verb_defers_even_filterable_field() {
    let resource = resource(&["status"], VerbSupport::from_names(["orderBy"]));
    let mut spec = QuerySpec::default();
    spec.add_where(&resource, "status", "=", json!("active"));

    assert!(spec.native.is_empty());
    assert!(!spec.post.is_empty());
  }

  #[test]
  fn test_where_in_native_encoding() {
    let resource = resource(&["status"], VerbSupport::All);
    let mut spec = QuerySpec::default();
    spec.add_where_in(&resource, "status", vec![json!("a"), json!("b")], false);

    let pairs = encode_pairs(&spec.native, &spec.includes);
    assert_eq!(
      pairs,
      vec![
        ("_filter[status][IN][0]".to_string(), "a".to_string()),
        ("_filter[status][IN][1]".to_string(), "b".to_string()),
      ]
    );
  }

  #[test]
  fn test_order_by_unsupported_becomes_local_sort() {
    let resource = resource(&[], VerbSupport::Only(BTreeSet::new()));
    let mut spec = QuerySpec::default();
    spec.add_order_by(&resource, "year", Direction::Desc);

    assert!(spec.native.is_empty());
    assert!(!spec.post.is_empty());
  }

  #[test]
  fn test_include_dedup_and_rejection() {
    let resource = resource(&[], VerbSupport::All);
    let mut spec = QuerySpec::default();
    spec.add_include(&resource, "genre");
    spec.add_include(&resource, "genre");
    spec.add_include(&resource, "unknown");

    assert_eq!(spec.includes, vec!["genre".to_string()]);
  }

  #[test]
  fn test_ttl_override_beats_resource_default() {
    let mut resource = resource(&[], VerbSupport::All);
    resource.remember_for = 120;

    let mut spec = QuerySpec::default();
    assert_eq!(spec.ttl_for(&resource), 120);
    spec.ttl_override = Some(0);
    assert_eq!(spec.ttl_for(&resource), 0);
  }
}
