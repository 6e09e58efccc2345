//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `stage`: pipeline stage (e.g. "hybrid", "multi_hop", "vector", "rerank")
//! - `backend`: backend name as reported by the collaborator
//! - `operation`: collaborator method invoked (e.g. "search", "rerank")

/// Total result cache hits.
pub const CACHE_HITS_TOTAL: &str = "muninn_cache_hits_total";

/// Total result cache misses (absent, expired, or stale fingerprint).
pub const CACHE_MISSES_TOTAL: &str = "muninn_cache_misses_total";

/// Total entries evicted because the result cache was full.
pub const CACHE_EVICTIONS_TOTAL: &str = "muninn_cache_evictions_total";

/// Total entries purged on read because their TTL elapsed.
pub const CACHE_EXPIRATIONS_TOTAL: &str = "muninn_cache_expirations_total";

/// Stage duration in seconds.
///
/// Labels: `stage`.
pub const STAGE_DURATION_SECONDS: &str = "muninn_stage_duration_seconds";

/// Hops performed per expansion call.
pub const EXPANSION_HOPS: &str = "muninn_expansion_hops";

/// Follow-up searches that failed or timed out during expansion.
pub const FOLLOW_UP_FAILURES_TOTAL: &str = "muninn_follow_up_failures_total";

/// Result sets reordered by the reranker.
pub const RERANKED_TOTAL: &str = "muninn_reranked_total";

/// Total retry attempts (not counting the initial call).
///
/// Labels: `backend`, `operation`.
pub const RETRIES_TOTAL: &str = "muninn_retries_total";

/// Embedding cache hits.
pub const EMBEDDING_CACHE_HITS_TOTAL: &str = "muninn_embedding_cache_hits_total";

/// Embedding cache misses.
pub const EMBEDDING_CACHE_MISSES_TOTAL: &str = "muninn_embedding_cache_misses_total";
