//! Collaborator traits for the retrieval core.
//!
//! The core never embeds text, stores vectors, scores relevance or writes
//! answers itself. Each of those capabilities sits behind a narrow trait
//! so deployments can plug in their own services (and tests can plug in
//! mocks):
//!
//! - [`SearchBackend`]: text in, ranked candidates out (hybrid search)
//! - [`EmbeddingProvider`] + [`VectorStore`]: the plain vector fallback
//! - [`Reranker`]: cross-encoder relevance ordering
//! - [`IndexProbe`]: cheap existence check used to fingerprint the index
//! - [`AnswerGenerator`]: the language-model step fed by retrieval
//!
//! Every call is a suspension point; implementations must not block the
//! executor for the duration of a network round trip.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::types::{RetrievalResult, SourceRecord, UnderstoodQuery};

// ============================================================================
// Search
// ============================================================================

/// Text search over the backing index (typically dense + lexical hybrid).
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Backend name for logging/debugging.
    fn name(&self) -> &str;

    /// Return up to `top_k` candidates for `query`, best first.
    async fn search(&self, query: &str, top_k: usize) -> Result<RetrievalResult>;
}

/// Provider for text embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Nearest-neighbour query over stored embeddings.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store name for logging/debugging.
    fn name(&self) -> &str;

    /// Return the `n_results` nearest candidates to `embedding`.
    async fn query(&self, embedding: &[f32], n_results: usize) -> Result<RetrievalResult>;
}

// ============================================================================
// Reranking
// ============================================================================

/// One reranker verdict: a position in the submitted document list and
/// its relevance score (roughly 0–10, higher is better).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankScore {
    pub index: usize,
    pub score: f32,
}

impl RerankScore {
    pub fn new(index: usize, score: f32) -> Self {
        Self { index, score }
    }
}

/// Precision reranker (cross-encoder or similar).
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Reranker name for logging/debugging.
    fn name(&self) -> &str;

    /// Score `docs` against `query`.
    ///
    /// Returns at most `top_k` verdicts in the reranker's preferred order.
    /// `index` refers to the position in `docs`.
    async fn rerank(&self, query: &str, docs: &[String], top_k: usize) -> Result<Vec<RerankScore>>;
}

// ============================================================================
// Cache caller contract
// ============================================================================

/// Live view of the index for one query, used to fingerprint cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Identifiers a fresh lookup returned for the query.
    pub source_ids: Vec<String>,
    /// Total chunks currently in the collection.
    pub chunk_count: u64,
}

/// Cheap existence probe against the live index.
///
/// Called before every cache lookup so the fingerprint reflects current
/// index contents rather than whatever was true when the entry was written.
#[async_trait]
pub trait IndexProbe: Send + Sync {
    /// Probe name for logging/debugging.
    fn name(&self) -> &str;

    async fn probe(&self, query: &str, top_k: usize) -> Result<IndexSnapshot>;
}

// ============================================================================
// Answer generation
// ============================================================================

/// Text produced by the answer-generation step, with the sources it cites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub text: String,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
}

/// Language-model step that turns retrieved context into an answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generator name for logging/debugging.
    fn name(&self) -> &str;

    async fn generate(
        &self,
        query: &UnderstoodQuery,
        context: &RetrievalResult,
    ) -> Result<GeneratedAnswer>;
}
