//! Fetch/memoize orchestration.
//!
//! The bridge owns the transport and cache collaborators and coordinates
//! cache lookup, network fetch, response parsing, and cache population for
//! both single-entity and collection queries.
//!
//! Caching is deliberately asymmetric: `find` results are stored finalized
//! (a hit re-applies nothing), while `get` stores the raw parsed collection
//! so repeated queries with different post-filter chains reuse one fetch.
//!
//! Without single-flight enabled, two concurrent callers issuing the same
//! query before either result lands will both hit the network. That is a
//! known limitation of the base design; opt in via
//! [`with_single_flight`](Bridge::with_single_flight) to serialize identical
//! fetches behind a per-key lock.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use crate::cache::{CacheStore, NullCache};
use crate::error::Result;
use crate::query::{derive_key, encode_pairs, encode_query_string, Query, QuerySpec};
use crate::resource::Resource;
use crate::resultset::{Record, ResultSet};
use crate::transport::Transport;

pub struct Bridge {
  transport: Box<dyn Transport>,
  cache: Box<dyn CacheStore>,
  single_flight: bool,
  flights: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Bridge {
  pub fn new(transport: impl Transport + 'static, cache: impl CacheStore + 'static) -> Self {
    Self {
      transport: Box::new(transport),
      cache: Box::new(cache),
      single_flight: false,
      flights: Mutex::new(HashMap::new()),
    }
  }

  /// Bridge without a cache store: every lookup misses, every write discards.
  pub fn without_cache(transport: impl Transport + 'static) -> Self {
    Self::new(transport, NullCache)
  }

  /// Serialize concurrent identical fetches behind a per-key lock so N
  /// simultaneous queries for one derived key cause exactly one fetch.
  pub fn with_single_flight(mut self) -> Self {
    self.single_flight = true;
    self
  }

  /// Start a query chain against a resource.
  pub fn query<'a, R: Resource>(&'a self, resource: &'a R) -> Query<'a, R> {
    Query::new(self, resource)
  }

  /// Fetch a single entity by id.
  ///
  /// A cached hit is already the finalized answer for this query kind and is
  /// returned as-is, without transport or post-filtering.
  pub(crate) fn fetch_one<R: Resource>(
    &self,
    resource: &R,
    spec: &QuerySpec,
    id: &str,
  ) -> Result<ResultSet> {
    let key = self.key_for(resource, spec, &format!("find:{id}"));
    self.with_flight(&key, || {
      if let Some(value) = self.cache_get(&key) {
        if let Ok(set) = serde_json::from_value::<ResultSet>(value) {
          if !set.is_empty() {
            debug!(%key, "entity served from cache");
            return Ok(set);
          }
        }
      }

      let url = resource.view_url(id);
      let pairs = encode_pairs(&spec.native, &spec.includes);
      let raw = self.transport.get(&url, &pairs)?.json()?;
      let record = resource.parse_item(raw)?;
      let set = spec.post.apply(ResultSet::from_record(record));

      if let Ok(value) = serde_json::to_value(&set) {
        self.cache_put(&key, value, spec.ttl_for(resource));
      }

      Ok(set)
    })
  }

  /// Fetch the matching collection.
  ///
  /// The cache holds the raw parsed sequence, so post-filters run on every
  /// call whether the data came from the store or the network.
  pub(crate) fn fetch_many<R: Resource>(&self, resource: &R, spec: &QuerySpec) -> Result<ResultSet> {
    let key = self.key_for(resource, spec, "get");
    self.with_flight(&key, || {
      if let Some(value) = self.cache_get(&key) {
        if let Ok(records) = serde_json::from_value::<Vec<Record>>(value) {
          debug!(%key, "collection served from cache");
          return Ok(spec.post.apply(ResultSet::new(records)));
        }
      }

      let url = resource.index_url();
      // encode_pairs already normalizes parameter order for cache stability.
      let pairs = encode_pairs(&spec.native, &spec.includes);
      let raw = self.transport.get(&url, &pairs)?.json()?;
      let records = resource.parse_collection(raw)?;

      if let Ok(value) = serde_json::to_value(&records) {
        self.cache_put(&key, value, spec.ttl_for(resource));
      }

      Ok(spec.post.apply(ResultSet::new(records)))
    })
  }

  /// Single POST passthrough of the accumulated params. Never cached, and
  /// post-filters are not applied to the response.
  pub(crate) fn send_post<R: Resource>(&self, resource: &R, spec: &QuerySpec) -> Result<ResultSet> {
    if spec.ttl_for(resource) > 0 {
      debug!("POST responses are never cached, ignoring TTL");
    }

    let url = resource.index_url();
    let pairs = encode_pairs(&spec.native, &spec.includes);
    let raw = self.transport.post(&url, &pairs)?.json()?;
    let record = resource.parse_item(raw)?;

    Ok(ResultSet::from_record(record))
  }

  fn key_for<R: Resource>(&self, resource: &R, spec: &QuerySpec, discriminator: &str) -> String {
    let canonical = encode_query_string(&encode_pairs(&spec.native, &spec.includes));
    derive_key(
      resource.name(),
      Some(discriminator),
      spec.cache_key.as_deref(),
      &canonical,
    )
  }

  /// Run `fetch` while holding the per-key flight lock, when enabled.
  ///
  /// A poisoned lock only means another query panicked mid-fetch; the lock
  /// carries no data, so it is safe to keep going.
  fn with_flight<T>(&self, key: &str, fetch: impl FnOnce() -> T) -> T {
    if !self.single_flight {
      return fetch();
    }

    let lock = {
      let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
      Arc::clone(flights.entry(key.to_string()).or_default())
    };
    let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);
    fetch()
  }

  /// Cache reads fail open: an erroring store is a miss, never an abort.
  fn cache_get(&self, key: &str) -> Option<Value> {
    match self.cache.get(key) {
      Ok(value) => value,
      Err(e) => {
        warn!(%key, error = %e, "cache read failed, treating as miss");
        None
      }
    }
  }

  /// Cache writes fail open as well; a TTL of 0 skips the store entirely.
  fn cache_put(&self, key: &str, value: Value, ttl_secs: u64) {
    if ttl_secs == 0 {
      return;
    }
    if let Err(e) = self.cache.put(key, &value, ttl_secs) {
      warn!(%key, error = %e, "cache write failed, continuing without cache");
    }
  }
}
