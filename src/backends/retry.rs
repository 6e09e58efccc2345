//! Retry configuration, delay calculation, and backend decorators.
//!
//! Provides [`RetryConfig`] for controlling retry behaviour and
//! `Retrying*` decorators that wrap backend traits with automatic retry
//! on transient errors. The orchestrator never retries on its own; retry
//! is opted into per deployment by wrapping backends at build time.
//!
//! All decorators delegate to the shared `with_retry()` helper,
//! keeping retry logic in a single place.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use super::traits::{EmbeddingProvider, RerankScore, Reranker, SearchBackend, VectorStore};
use crate::telemetry;
use crate::types::RetrievalResult;
use crate::{MuninnError, Result};

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff with optional jitter:
///
/// ```rust
/// # use muninn::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200))
///     .jitter(true);
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial call).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 200ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 5s.
    pub max_delay: Duration,
    /// Whether to add up to 50% random jitter to delays. Default: true.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial call).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Uses exponential backoff: `initial_delay * 2^attempt`, capped at `max_delay`.
    /// Does NOT include jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Calculate the effective delay, respecting backend `retry_after` hints.
    ///
    /// A `retry_after` hint takes precedence over backoff and is never jittered.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint;
        }
        let base = self.delay_for_attempt(attempt);
        if !self.jitter {
            return base;
        }
        let spread = base.as_millis() as u64 / 2;
        if spread == 0 {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0..=spread);
        base + Duration::from_millis(extra)
    }
}

/// `[retry]` section of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_jitter() -> bool {
    true
}

impl From<RetrySection> for RetryConfig {
    fn from(section: RetrySection) -> Self {
        RetryConfig::new()
            .max_attempts(section.max_attempts)
            .initial_delay(Duration::from_millis(section.initial_delay_ms))
            .max_delay(Duration::from_millis(section.max_delay_ms))
            .jitter(section.jitter)
    }
}

// ============================================================================
// Shared retry helper
// ============================================================================

/// Execute an async operation with retry logic.
///
/// Retries on transient errors (as classified by [`MuninnError::is_transient()`])
/// up to `config.max_attempts`, using exponential backoff and respecting
/// `retry_after` hints from `RateLimited` errors.
///
/// Permanent errors are returned immediately without retry.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    backend: &str,
    operation: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < config.max_attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "backend" => backend.to_owned(),
                        "operation" => operation.to_owned(),
                    )
                    .increment(1);
                    let delay = config.effective_delay(attempt, e.retry_after());
                    warn!(
                        backend,
                        operation,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        MuninnError::Configuration("retry max_attempts must be at least 1".into())
    }))
}

// ============================================================================
// RetryingSearchBackend
// ============================================================================

/// Decorator that wraps a [`SearchBackend`] with retry logic.
///
/// On transient errors, retries with exponential backoff up to
/// `config.max_attempts`. Permanent errors are returned immediately.
pub struct RetryingSearchBackend {
    inner: Arc<dyn SearchBackend>,
    config: RetryConfig,
}

impl RetryingSearchBackend {
    /// Wrap a search backend with retry logic.
    pub fn new(inner: Arc<dyn SearchBackend>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl SearchBackend for RetryingSearchBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<RetrievalResult> {
        with_retry(&self.config, self.inner.name(), "search", || {
            self.inner.search(query, top_k)
        })
        .await
    }
}

// ============================================================================
// RetryingEmbeddingProvider
// ============================================================================

/// Decorator that wraps an [`EmbeddingProvider`] with retry logic.
pub struct RetryingEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    config: RetryConfig,
}

impl RetryingEmbeddingProvider {
    /// Wrap an embedding provider with retry logic.
    pub fn new(inner: Arc<dyn EmbeddingProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl EmbeddingProvider for RetryingEmbeddingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        with_retry(&self.config, self.inner.name(), "embed", || {
            self.inner.embed(text)
        })
        .await
    }
}

// ============================================================================
// RetryingVectorStore
// ============================================================================

/// Decorator that wraps a [`VectorStore`] with retry logic.
pub struct RetryingVectorStore {
    inner: Arc<dyn VectorStore>,
    config: RetryConfig,
}

impl RetryingVectorStore {
    /// Wrap a vector store with retry logic.
    pub fn new(inner: Arc<dyn VectorStore>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl VectorStore for RetryingVectorStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn query(&self, embedding: &[f32], n_results: usize) -> Result<RetrievalResult> {
        with_retry(&self.config, self.inner.name(), "query", || {
            self.inner.query(embedding, n_results)
        })
        .await
    }
}

// ============================================================================
// RetryingReranker
// ============================================================================

/// Decorator that wraps a [`Reranker`] with retry logic.
pub struct RetryingReranker {
    inner: Arc<dyn Reranker>,
    config: RetryConfig,
}

impl RetryingReranker {
    /// Wrap a reranker with retry logic.
    pub fn new(inner: Arc<dyn Reranker>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Reranker for RetryingReranker {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<RerankScore>> {
        with_retry(&self.config, self.inner.name(), "rerank", || {
            self.inner.rerank(query, documents, top_k)
        })
        .await
    }
}
