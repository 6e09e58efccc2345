//! Index fingerprints and cache keys.
//!
//! A fingerprint summarises what the live index returned for a query
//! (the sorted set of source ids) together with the collection size. Any
//! insert, delete or re-chunk changes one of the two, so a fingerprint
//! baked into the cache key turns index mutation into a plain cache miss.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Fingerprint of `(collection, sorted unique source ids, chunk count)`.
///
/// Order and duplicates in `source_ids` do not matter.
pub fn index_fingerprint<S: AsRef<str>>(
    collection: &str,
    source_ids: &[S],
    chunk_count: u64,
) -> String {
    let mut ids: Vec<&str> = source_ids.iter().map(AsRef::as_ref).collect();
    ids.sort_unstable();
    ids.dedup();

    let mut hasher = DefaultHasher::new();
    collection.hash(&mut hasher);
    ids.hash(&mut hasher);
    chunk_count.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Cache key of `(query, result count, fingerprint)`.
pub fn cache_key(query: &str, result_count: usize, fingerprint: &str) -> String {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    result_count.hash(&mut hasher);
    fingerprint.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
