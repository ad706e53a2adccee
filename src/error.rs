//! Error taxonomy for the bridge.
//!
//! Cache store failures are a category of their own so the fetch path can
//! treat them as misses (fail open) instead of aborting the query.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  /// Network or HTTP failure from the transport, including non-2xx statuses.
  /// Propagated to the caller unchanged; no retry happens inside the bridge.
  #[error("transport error for {url}: {message}")]
  Transport { url: String, message: String },

  /// Response body was not in the shape the resource's parse hooks expect.
  #[error("failed to parse {context}: {message}")]
  Parse { context: String, message: String },

  /// Invalid resource definition, surfaced at configuration load time only.
  /// Runtime capability drift never raises this; it degrades to post-filtering.
  #[error("invalid resource configuration: {0}")]
  Configuration(String),

  /// Produced by cache store implementations. The fetch orchestrator never
  /// propagates these; a failing read is a miss and a failing write is logged.
  #[error("cache store error: {0}")]
  CacheStore(String),
}
