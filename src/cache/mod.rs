//! Caching subsystem.
//!
//! - [`ResultCache`]: answer + sources cache keyed on query, result count
//!   and an index fingerprint, so index mutation shows up as a miss.
//!   See [`result`] module docs for expiry, eviction and locking.
//!
//! - [`fingerprint`]: the fingerprint and key hash functions, exposed for
//!   callers that need to log or compare fingerprints.
//!
//! The embedding memoiser lives with the other backend decorators in
//! [`crate::backends::embedding_cache`].

pub mod fingerprint;
pub mod result;

pub use fingerprint::{cache_key, index_fingerprint};
pub use result::{CacheConfig, CacheEntry, CacheHit, CacheStats, EvictionPolicy, ResultCache};
