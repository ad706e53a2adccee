//! Cache store contract, null object, and in-process implementation.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Key/value store with per-entry TTL, shared by all queries on a bridge.
///
/// TTLs are in seconds; a TTL of 0 means "do not persist" and `put` must be
/// a no-op, not an infinite-lifetime write. Implementations provide their own
/// concurrency safety (get/put are assumed atomic). Errors from either call
/// are treated as misses by the bridge, so a broken store degrades queries to
/// the network path instead of failing them.
pub trait CacheStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<Value>>;
  fn put(&self, key: &str, value: &Value, ttl_secs: u64) -> Result<()>;
}

/// "No cache configured" as a store: every get misses, every put discards.
pub struct NullCache;

impl CacheStore for NullCache {
  fn get(&self, _key: &str) -> Result<Option<Value>> {
    Ok(None)
  }

  fn put(&self, _key: &str, _value: &Value, _ttl_secs: u64) -> Result<()> {
    Ok(())
  }
}

struct MemoryEntry {
  value: Value,
  expires_at: DateTime<Utc>,
}

/// In-process store backed by a mutex-guarded map. Entries past their TTL
/// are dropped lazily on lookup.
#[derive(Default)]
pub struct MemoryCache {
  entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>>> {
    self
      .entries
      .lock()
      .map_err(|e| Error::CacheStore(format!("lock poisoned: {e}")))
  }
}

impl CacheStore for MemoryCache {
  fn get(&self, key: &str) -> Result<Option<Value>> {
    let mut entries = self.lock()?;
    match entries.get(key) {
      Some(entry) if entry.expires_at > Utc::now() => Ok(Some(entry.value.clone())),
      Some(_) => {
        entries.remove(key);
        Ok(None)
      }
      None => Ok(None),
    }
  }

  fn put(&self, key: &str, value: &Value, ttl_secs: u64) -> Result<()> {
    if ttl_secs == 0 {
      return Ok(());
    }
    let mut entries = self.lock()?;
    entries.insert(
      key.to_string(),
      MemoryEntry {
        value: value.clone(),
        expires_at: Utc::now() + Duration::seconds(ttl_secs as i64),
      },
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_null_cache_always_misses() {
    let cache = NullCache;
    cache.put("k", &json!(1), 60).unwrap();
    assert_eq!(cache.get("k").unwrap(), None);
  }

  #[test]
  fn test_memory_cache_roundtrip() {
    let cache = MemoryCache::new();
    cache.put("k", &json!({"a": 1}), 60).unwrap();
    assert_eq!(cache.get("k").unwrap(), Some(json!({"a": 1})));
    assert_eq!(cache.get("missing").unwrap(), None);
  }

  #[test]
  fn test_ttl_zero_is_a_noop_put() {
    let cache = MemoryCache::new();
    cache.put("k", &json!(1), 0).unwrap();
    assert_eq!(cache.get("k").unwrap(), None);
  }

  #[test]
  fn test_expired_entry_is_a_miss() {
    let cache = MemoryCache::new();
    cache.put("k", &json!(1), 60).unwrap();
    // Backdate the entry instead of sleeping through a real TTL.
    cache
      .entries
      .lock()
      .unwrap()
      .get_mut("k")
      .unwrap()
      .expires_at = Utc::now() - Duration::seconds(1);

    assert_eq!(cache.get("k").unwrap(), None);
    // The expired entry is dropped, not just hidden.
    assert!(cache.entries.lock().unwrap().is_empty());
  }
}
