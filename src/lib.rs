//! restbridge — a query-building and caching bridge for REST endpoints with
//! limited, inconsistent native filtering.
//!
//! Callers build queries with a small set of verbs (comparison filters,
//! set-membership filters, ordering, sub-resource inclusion). Per verb, the
//! bridge decides whether the remote endpoint can honor it natively (encoded
//! into request parameters) or whether it must run locally after the fetch.
//! Results are memoized under cache keys that are stable across
//! semantically-identical queries, so call order never splits the cache.
//!
//! # Example
//!
//! ```ignore
//! use restbridge::{Bridge, BridgeConfig, Direction, HttpTransport, SqliteCache};
//!
//! let config = BridgeConfig::load(None)?;
//! let albums = config.resource("albums").unwrap();
//!
//! let bridge = Bridge::new(HttpTransport::from_env()?, SqliteCache::open()?);
//!
//! let recent = bridge
//!     .query(albums)
//!     .where_("status", "=", "active")
//!     .where_("year", ">=", 2000)
//!     .order_by("year", Direction::Desc)
//!     .with("genre")
//!     .remember(300)
//!     .get()?;
//! ```

mod bridge;
pub mod cache;
mod config;
mod error;
mod query;
mod resource;
mod resultset;
pub mod transport;

pub use bridge::Bridge;
pub use cache::{CacheStore, MemoryCache, NullCache, SqliteCache};
pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use query::{Direction, Query};
pub use resource::{Resource, ResourceSpec, Verb, VerbSupport};
pub use resultset::{Record, ResultSet};
pub use transport::{HttpTransport, Response, Transport};
