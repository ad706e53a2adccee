//! Resource definitions and capability resolution.
//!
//! A resource describes one remote endpoint: where it lives, which fields it
//! can filter natively, which sub-resources it can include, and which query
//! verbs it honors. The bridge consults these capabilities at the moment an
//! intent is issued to decide between the native and post-filter paths.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::resultset::Record;

/// Query verbs a remote endpoint may support natively.
///
/// This is a closed set: a configured verb name that matches no variant
/// resolves to "unsupported" and the intent degrades to post-filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verb {
  Where,
  WhereIn,
  OrderBy,
}

impl Verb {
  pub fn as_str(&self) -> &'static str {
    match self {
      Verb::Where => "where",
      Verb::WhereIn => "whereIn",
      Verb::OrderBy => "orderBy",
    }
  }

  pub fn parse(name: &str) -> Option<Verb> {
    match name {
      "where" => Some(Verb::Where),
      "whereIn" => Some(Verb::WhereIn),
      "orderBy" => Some(Verb::OrderBy),
      _ => None,
    }
  }
}

/// Which verbs a resource declares as natively supported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VerbSupport {
  /// No restricted verb set declared: all verbs assumed supported.
  #[default]
  All,
  /// Only the listed verbs are supported.
  Only(BTreeSet<Verb>),
}

impl VerbSupport {
  pub fn supports(&self, verb: Verb) -> bool {
    match self {
      VerbSupport::All => true,
      VerbSupport::Only(set) => set.contains(&verb),
    }
  }

  /// Build from declared verb names. Names with no matching implementation
  /// are dropped, so configuration drift resolves to "unsupported".
  pub fn from_names<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    VerbSupport::Only(names.into_iter().filter_map(|n| Verb::parse(n.as_ref())).collect())
  }
}

fn deserialize_verbs<'de, D>(deserializer: D) -> std::result::Result<VerbSupport, D::Error>
where
  D: Deserializer<'de>,
{
  let names: Vec<String> = Vec::deserialize(deserializer)?;
  Ok(VerbSupport::from_names(names))
}

fn default_primary_key() -> String {
  "id".to_string()
}

/// Declarative resource definition, loadable from a YAML config file.
///
/// Immutable for the process lifetime once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSpec {
  /// Resource type name, used to namespace cache keys.
  pub name: String,
  /// Index endpoint URL; entity views live at `{endpoint}/{id}`.
  pub endpoint: String,
  #[serde(default = "default_primary_key")]
  pub primary_key: String,
  /// Fields the endpoint can filter natively.
  #[serde(default)]
  pub filterable: BTreeSet<String>,
  /// Sub-resource names the endpoint can include.
  #[serde(default)]
  pub includable: BTreeSet<String>,
  /// Verb names the endpoint supports natively. Absent means all.
  #[serde(default, deserialize_with = "deserialize_verbs")]
  pub verbs: VerbSupport,
  /// Default cache TTL in seconds. 0 disables caching.
  #[serde(default)]
  pub remember_for: u64,
  /// Envelope field unwrapped by the default collection parser.
  #[serde(default)]
  pub envelope: Option<String>,
}

impl ResourceSpec {
  pub(crate) fn validate(&self) -> Result<()> {
    if self.name.is_empty() {
      return Err(Error::Configuration("resource name must not be empty".into()));
    }
    if self.endpoint.is_empty() {
      return Err(Error::Configuration(format!(
        "resource `{}` has an empty endpoint",
        self.name
      )));
    }
    if self.primary_key.is_empty() {
      return Err(Error::Configuration(format!(
        "resource `{}` has an empty primary key",
        self.name
      )));
    }
    Ok(())
  }
}

/// A concrete remote resource the bridge can query.
///
/// `ResourceSpec` covers the declarative parts; implement this trait directly
/// when an endpoint needs custom parse hooks to normalize its response shape
/// (e.g. unwrap a non-standard envelope) before the generic engine sees it.
pub trait Resource: Send + Sync {
  /// Resource type name, used to namespace cache keys.
  fn name(&self) -> &str;

  /// Index endpoint URL for collection fetches.
  fn index_url(&self) -> String;

  /// Per-entity view URL.
  fn view_url(&self, id: &str) -> String {
    format!("{}/{}", self.index_url(), id)
  }

  fn primary_key(&self) -> &str;

  /// Exact membership test; no wildcard or prefix matching.
  fn is_filterable(&self, field: &str) -> bool;

  /// Exact membership test; no wildcard or prefix matching.
  fn is_includable(&self, name: &str) -> bool;

  fn supports(&self, verb: Verb) -> bool;

  /// Default cache TTL in seconds. 0 disables caching.
  fn remember_for(&self) -> u64 {
    0
  }

  /// Envelope field the default collection parser unwraps, if any.
  fn collection_envelope(&self) -> Option<&str> {
    None
  }

  /// Parse a collection response body into records.
  fn parse_collection(&self, raw: Value) -> Result<Vec<Record>> {
    let body = match (self.collection_envelope(), raw) {
      (Some(field), Value::Object(mut map)) => map.remove(field).ok_or_else(|| Error::Parse {
        context: format!("collection response for `{}`", self.name()),
        message: format!("envelope field `{field}` missing"),
      })?,
      (_, other) => other,
    };

    match body {
      Value::Array(items) => items
        .into_iter()
        .map(|item| match item {
          Value::Object(record) => Ok(record),
          other => Err(Error::Parse {
            context: format!("collection response for `{}`", self.name()),
            message: format!("expected an object per entity, got {other}"),
          }),
        })
        .collect(),
      other => Err(Error::Parse {
        context: format!("collection response for `{}`", self.name()),
        message: format!("expected an array of entities, got {other}"),
      }),
    }
  }

  /// Parse a single-entity response body into a record.
  fn parse_item(&self, raw: Value) -> Result<Record> {
    match raw {
      Value::Object(record) => Ok(record),
      other => Err(Error::Parse {
        context: format!("entity response for `{}`", self.name()),
        message: format!("expected an object, got {other}"),
      }),
    }
  }
}

impl Resource for ResourceSpec {
  fn name(&self) -> &str {
    &self.name
  }

  fn index_url(&self) -> String {
    self.endpoint.clone()
  }

  fn primary_key(&self) -> &str {
    &self.primary_key
  }

  fn is_filterable(&self, field: &str) -> bool {
    self.filterable.contains(field)
  }

  fn is_includable(&self, name: &str) -> bool {
    self.includable.contains(name)
  }

  fn supports(&self, verb: Verb) -> bool {
    self.verbs.supports(verb)
  }

  fn remember_for(&self) -> u64 {
    self.remember_for
  }

  fn collection_envelope(&self) -> Option<&str> {
    self.envelope.as_deref()
  }
}
