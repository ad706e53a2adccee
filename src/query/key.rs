//! Deterministic cache-key derivation.
//!
//! Keys are namespaced per resource so a resource's entries can be flushed
//! together. The content digest covers only what reaches the wire (native
//! params + includes): caching the unfiltered network response is strictly
//! more valuable than caching post-filtered variants, since post-filter
//! parameters vary far more than the request itself.

use sha2::{Digest, Sha256};

/// Derive the cache key for one query.
///
/// The base is `resource:{name}`, extended with the discriminator when given
/// (e.g. `find:42` vs `get`). A caller-supplied override key is appended to
/// the base verbatim and bypasses hashing entirely; the caller then owns
/// uniqueness. Otherwise the key tail is the SHA-256 of the canonical
/// encoded parameter string, which is already order-independent.
pub(crate) fn derive_key(
  resource: &str,
  discriminator: Option<&str>,
  override_key: Option<&str>,
  canonical_query: &str,
) -> String {
  let mut base = format!("resource:{resource}");
  if let Some(disc) = discriminator {
    base.push(':');
    base.push_str(disc);
  }

  if let Some(key) = override_key {
    return format!("{base}{key}");
  }

  let mut hasher = Sha256::new();
  hasher.update(canonical_query.as_bytes());
  format!("{base}:{}", hex::encode(hasher.finalize()))
}
