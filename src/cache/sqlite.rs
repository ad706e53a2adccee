//! SQLite-backed cache store for persistence across processes.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::store::CacheStore;
use crate::error::{Error, Result};

/// Schema for the cache table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_key TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at);
"#;

/// Persistent cache store keyed by derived query keys.
///
/// Values are stored as serialized JSON with an absolute expiry timestamp;
/// expired rows are treated as misses and deleted on lookup.
pub struct SqliteCache {
  conn: Mutex<Connection>,
}

impl SqliteCache {
  /// Open or create the cache database at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::CacheStore(format!("failed to create cache directory: {e}")))?;
    }

    Self::open_at(&path)
  }

  /// Open or create the cache database at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    let conn = Connection::open(path).map_err(|e| {
      Error::CacheStore(format!("failed to open cache database at {}: {e}", path.display()))
    })?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Open an in-memory database, useful for tests and throwaway processes.
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| Error::CacheStore(format!("failed to open in-memory database: {e}")))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| Error::CacheStore("could not determine data directory".to_string()))?;

    Ok(data_dir.join("restbridge").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| Error::CacheStore(format!("failed to run cache migrations: {e}")))?;
    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::CacheStore(format!("lock poisoned: {e}")))
  }
}

impl CacheStore for SqliteCache {
  fn get(&self, key: &str) -> Result<Option<Value>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare("SELECT data, expires_at FROM cache_entries WHERE cache_key = ?")
      .map_err(|e| Error::CacheStore(format!("failed to prepare lookup: {e}")))?;

    let row: Option<(Vec<u8>, String)> = stmt
      .query_row(params![key], |row| Ok((row.get(0)?, row.get(1)?)))
      .ok();

    let (data, expires_at) = match row {
      Some(row) => row,
      None => return Ok(None),
    };

    if parse_datetime(&expires_at)? <= Utc::now() {
      conn
        .execute("DELETE FROM cache_entries WHERE cache_key = ?", params![key])
        .map_err(|e| Error::CacheStore(format!("failed to drop expired entry: {e}")))?;
      return Ok(None);
    }

    let value = serde_json::from_slice(&data)
      .map_err(|e| Error::CacheStore(format!("failed to deserialize cached value: {e}")))?;
    Ok(Some(value))
  }

  fn put(&self, key: &str, value: &Value, ttl_secs: u64) -> Result<()> {
    if ttl_secs == 0 {
      return Ok(());
    }

    let data = serde_json::to_vec(value)
      .map_err(|e| Error::CacheStore(format!("failed to serialize value: {e}")))?;
    let expires_at = (Utc::now() + Duration::seconds(ttl_secs as i64)).to_rfc3339();

    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR REPLACE INTO cache_entries (cache_key, data, expires_at) VALUES (?, ?, ?)",
        params![key, data, expires_at],
      )
      .map_err(|e| Error::CacheStore(format!("failed to store entry: {e}")))?;

    Ok(())
  }
}

/// Parse an RFC 3339 timestamp stored in the expires_at column.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::CacheStore(format!("failed to parse datetime '{s}': {e}")))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_roundtrip() {
    let cache = SqliteCache::in_memory().unwrap();
    cache.put("k", &json!([{"id": 1}]), 60).unwrap();
    assert_eq!(cache.get("k").unwrap(), Some(json!([{"id": 1}])));
    assert_eq!(cache.get("missing").unwrap(), None);
  }

  #[test]
  fn test_ttl_zero_not_persisted() {
    let cache = SqliteCache::in_memory().unwrap();
    cache.put("k", &json!(1), 0).unwrap();
    assert_eq!(cache.get("k").unwrap(), None);
  }

  #[test]
  fn test_replace_existing_entry() {
    let cache = SqliteCache::in_memory().unwrap();
    cache.put("k", &json!(1), 60).unwrap();
    cache.put("k", &json!(2), 60).unwrap();
    assert_eq!(cache.get("k").unwrap(), Some(json!(2)));
  }

  #[test]
  fn test_expired_row_is_dropped() {
    let cache = SqliteCache::in_memory().unwrap();
    let past = (Utc::now() - Duration::seconds(5)).to_rfc3339();
    cache
      .lock()
      .unwrap()
      .execute(
        "INSERT INTO cache_entries (cache_key, data, expires_at) VALUES (?, ?, ?)",
        params!["k", b"1".to_vec(), past],
      )
      .unwrap();

    assert_eq!(cache.get("k").unwrap(), None);

    let count: i64 = cache
      .lock()
      .unwrap()
      .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
      .unwrap();
    assert_eq!(count, 0);
  }
}
