//! Query-result cache with content-staleness detection.
//!
//! [`ResultCache`] stores answer + sources pairs keyed on
//! `hash(query, result_count, index_fingerprint)`. The fingerprint is
//! computed from a fresh probe of the live index on every call, so any
//! index mutation that changes what the query would see is a miss rather
//! than a stale hit. No push-based invalidation channel is needed.
//!
//! # Expiry and eviction
//!
//! - Expiry is lazy: an entry whose age (measured from `created_at`) has
//!   reached the TTL is removed when a read finds it. There is no sweeper.
//! - Eviction happens on insert into a full cache and removes exactly one
//!   entry, chosen by [`EvictionPolicy`]:
//!   - `InsertionAge` (default) evicts the oldest `created_at`. Hits do
//!     not refresh anything, so a popular entry is evicted once it ages
//!     past younger ones.
//!   - `LeastRecentlyUsed` evicts the entry with the oldest last access,
//!     which hits refresh. `created_at` is never touched, so TTL is still
//!     measured from creation.
//!
//!   Ties are broken by insertion order.
//!
//! # Concurrency
//!
//! The map and counters sit behind one mutex held only for in-memory map
//! work (never across an await). Entries are immutable once written and
//! handed out as `Arc<CacheEntry>`. Two requests that miss on the same key
//! may both compute and store it; the second write simply wins.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info};

use super::fingerprint::{cache_key, index_fingerprint};
use crate::telemetry;
use crate::types::SourceRecord;

/// Which entry a full cache gives up on insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Evict the entry with the oldest `created_at`.
    #[default]
    InsertionAge,
    /// Evict the entry that was least recently written or hit.
    LeastRecentlyUsed,
}

/// Configuration for the result cache.
///
/// ```rust
/// # use muninn::{CacheConfig, EvictionPolicy};
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(900))
///     .collection("handbook")
///     .eviction(EvictionPolicy::LeastRecentlyUsed);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 1,000.
    pub max_entries: usize,
    /// Time-to-live measured from entry creation. Default: 1 hour.
    pub ttl: Duration,
    /// Collection identifier mixed into every fingerprint. Default: "documents".
    pub collection: String,
    /// Eviction policy. Default: [`EvictionPolicy::InsertionAge`].
    pub eviction: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
            collection: "documents".to_string(),
            eviction: EvictionPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the collection identifier.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the eviction policy.
    pub fn eviction(mut self, policy: EvictionPolicy) -> Self {
        self.eviction = policy;
        self
    }
}

/// A cached answer and the sources it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub answer: String,
    pub sources: Vec<SourceRecord>,
    pub created_at: Instant,
    pub index_fingerprint: String,
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub entry: Arc<CacheEntry>,
    /// Age of the entry at lookup time.
    pub age: Duration,
}

impl CacheHit {
    pub fn age_secs(&self) -> f64 {
        self.age.as_secs_f64()
    }
}

/// Counter snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hit rate as a fraction in `[0.0, 1.0]`; 0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Slot {
    entry: Arc<CacheEntry>,
    last_access: Instant,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Slot>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

/// Shared query-result cache. See module docs.
pub struct ResultCache {
    config: CacheConfig,
    inner: Mutex<Inner>,
}

impl ResultCache {
    /// Create an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Fingerprint for the given live-index view, using this cache's collection.
    pub fn fingerprint<S: AsRef<str>>(&self, source_ids: &[S], chunk_count: u64) -> String {
        index_fingerprint(&self.config.collection, source_ids, chunk_count)
    }

    fn key<S: AsRef<str>>(
        &self,
        query: &str,
        result_count: usize,
        source_ids: &[S],
        chunk_count: u64,
    ) -> (String, String) {
        let fingerprint = self.fingerprint(source_ids, chunk_count);
        (cache_key(query, result_count, &fingerprint), fingerprint)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // All mutations complete before any panic point, so a poisoned map is consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a cached answer.
    ///
    /// `source_ids` and `chunk_count` must come from a fresh probe of the
    /// live index. Returns `None` on a miss; an expired entry is removed
    /// as part of the miss.
    pub fn get<S: AsRef<str>>(
        &self,
        query: &str,
        result_count: usize,
        source_ids: &[S],
        chunk_count: u64,
    ) -> Option<CacheHit> {
        let (key, _) = self.key(query, result_count, source_ids, chunk_count);
        let now = Instant::now();
        let mut inner = self.lock();

        let age = match inner.entries.get(&key) {
            None => {
                inner.misses += 1;
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                return None;
            }
            Some(slot) => now.saturating_duration_since(slot.entry.created_at),
        };

        if age >= self.config.ttl {
            inner.entries.remove(&key);
            inner.misses += 1;
            inner.expirations += 1;
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
            metrics::counter!(telemetry::CACHE_EXPIRATIONS_TOTAL).increment(1);
            debug!(key = %key, age_secs = age.as_secs_f64(), "cache entry expired");
            return None;
        }

        inner.hits += 1;
        metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
        let refresh = self.config.eviction == EvictionPolicy::LeastRecentlyUsed;
        let slot = inner.entries.get_mut(&key)?;
        if refresh {
            slot.last_access = now;
        }
        Some(CacheHit {
            entry: Arc::clone(&slot.entry),
            age,
        })
    }

    /// Store an answer, evicting one entry first if the cache is full.
    ///
    /// Overwrites any entry already stored under the same key.
    pub fn put<S: AsRef<str>>(
        &self,
        query: &str,
        result_count: usize,
        source_ids: &[S],
        chunk_count: u64,
        answer: impl Into<String>,
        sources: Vec<SourceRecord>,
    ) {
        if self.config.max_entries == 0 {
            return;
        }
        let (key, fingerprint) = self.key(query, result_count, source_ids, chunk_count);
        let now = Instant::now();
        let mut inner = self.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.config.max_entries {
            self.evict_one(&mut inner);
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let entry = CacheEntry {
            answer: answer.into(),
            sources,
            created_at: now,
            index_fingerprint: fingerprint,
        };
        inner.entries.insert(
            key,
            Slot {
                entry: Arc::new(entry),
                last_access: now,
                seq,
            },
        );
    }

    fn evict_one(&self, inner: &mut Inner) {
        let victim = match self.config.eviction {
            EvictionPolicy::InsertionAge => inner
                .entries
                .iter()
                .min_by_key(|(_, slot)| (slot.entry.created_at, slot.seq)),
            EvictionPolicy::LeastRecentlyUsed => inner
                .entries
                .iter()
                .min_by_key(|(_, slot)| (slot.last_access, slot.seq)),
        }
        .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            inner.entries.remove(&key);
            inner.evictions += 1;
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
            debug!(key = %key, policy = ?self.config.eviction, "evicted cache entry");
        }
    }

    /// Drop every entry.
    ///
    /// For index changes the fingerprint cannot observe (e.g. a bulk
    /// reindex that preserves ids and chunk count).
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        let cleared = inner.entries.len();
        inner.entries.clear();
        info!(cleared, "result cache invalidated");
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the running counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
            size: inner.entries.len(),
            capacity: self.config.max_entries,
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
