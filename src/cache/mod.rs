//! Cache store implementations.
//!
//! The bridge talks to any [`CacheStore`]; [`NullCache`] stands in when
//! caching is disabled, [`MemoryCache`] covers in-process memoization, and
//! [`SqliteCache`] persists across processes.

mod sqlite;
mod store;

pub use sqlite::SqliteCache;
pub use store::{CacheStore, MemoryCache, NullCache};
