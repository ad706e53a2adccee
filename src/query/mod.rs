//! Query building, canonical encoding, cache keys, and local post-filtering.

mod builder;
mod key;
mod params;
mod postfilter;

pub use builder::Query;
pub use params::Direction;

pub(crate) use builder::QuerySpec;
pub(crate) use key::derive_key;
pub(crate) use params::{encode_pairs, encode_query_string};
