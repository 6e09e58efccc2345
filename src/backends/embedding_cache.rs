//! Opt-in response cache for query embeddings.
//!
//! Embedding is deterministic (same text → same vector), so the vector
//! fallback can skip the provider round trip for repeated queries. The
//! cache wraps any [`EmbeddingProvider`] and is itself one, so it slots
//! in front of the provider at build time with no other changes.
//!
//! Entries are keyed on a content hash of the text and held in moka's
//! async LRU + TTL cache. Unlike the result cache, nothing here depends
//! on index contents: an embedding stays valid however the index changes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;

use super::traits::EmbeddingProvider;
use crate::Result;
use crate::telemetry;

/// Configuration for the embedding cache.
///
/// ```rust
/// # use muninn::EmbeddingCacheConfig;
/// # use std::time::Duration;
/// let config = EmbeddingCacheConfig::new()
///     .max_entries(5_000)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct EmbeddingCacheConfig {
    /// Maximum number of cached embeddings. Default: 10,000.
    pub max_entries: u64,
    /// Time-to-live for cached embeddings. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for EmbeddingCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl EmbeddingCacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached embeddings.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached embeddings.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// `[embedding_cache]` section of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingCacheSection {
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_max_entries() -> u64 {
    10_000
}

fn default_ttl_secs() -> u64 {
    3600
}

impl From<EmbeddingCacheSection> for EmbeddingCacheConfig {
    fn from(section: EmbeddingCacheSection) -> Self {
        EmbeddingCacheConfig::new()
            .max_entries(section.max_entries)
            .ttl(Duration::from_secs(section.ttl_secs))
    }
}

/// [`EmbeddingProvider`] decorator that memoises embeddings.
pub struct CachingEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    cache: Cache<u64, Arc<Vec<f32>>>,
}

impl CachingEmbeddingProvider {
    /// Wrap `inner` with a cache built from `config`.
    pub fn new(inner: Arc<dyn EmbeddingProvider>, config: &EmbeddingCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { inner, cache }
    }
}

#[async_trait]
impl EmbeddingProvider for CachingEmbeddingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = embedding_key(self.inner.name(), text);
        if let Some(hit) = self.cache.get(&key).await {
            metrics::counter!(telemetry::EMBEDDING_CACHE_HITS_TOTAL).increment(1);
            return Ok(hit.as_ref().clone());
        }
        metrics::counter!(telemetry::EMBEDDING_CACHE_MISSES_TOTAL).increment(1);
        let embedding = self.inner.embed(text).await?;
        self.cache.insert(key, Arc::new(embedding.clone())).await;
        Ok(embedding)
    }
}

/// Content hash of (provider, text).
///
/// `DefaultHasher` is stable within a process lifetime, which is all an
/// in-memory cache needs.
fn embedding_key(provider: &str, text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    provider.hash(&mut hasher);
    text.hash(&mut hasher);
    hasher.finish()
}
