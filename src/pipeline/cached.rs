//! End-to-end request path with result caching.
//!
//! ```text
//! caller ─► IndexProbe ─► ResultCache::get ──hit──► Answer (from_cache)
//!                              │ miss
//!                              ▼
//!                 RetrievalOrchestrator::retrieve
//!                              ▼
//!                  AnswerGenerator::generate
//!                              ▼
//!                     ResultCache::put ─► Answer
//! ```
//!
//! The probe runs before every lookup, so the cache key always carries a
//! fingerprint of the index as it is now.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use super::orchestrator::RetrievalOrchestrator;
use crate::backends::{AnswerGenerator, IndexProbe, with_timeout};
use crate::cache::ResultCache;
use crate::types::{RetrievalOutcome, SourceRecord, UnderstoodQuery};
use crate::{MuninnError, Result};

/// An answer plus where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRecord>,
    pub from_cache: bool,
    /// Age of the cached entry; `None` for freshly computed answers.
    pub age_secs: Option<f64>,
    /// Retrieval details; `None` for cached answers.
    pub retrieval: Option<RetrievalOutcome>,
}

/// Probe → cache → retrieve → generate → store, for one request at a time
/// and any number of requests concurrently.
///
/// All components are shared handles; construct once at startup and
/// clone the `Arc`s into request handlers.
pub struct CachedPipeline {
    orchestrator: Arc<RetrievalOrchestrator>,
    cache: Arc<ResultCache>,
    probe: Arc<dyn IndexProbe>,
    generator: Arc<dyn AnswerGenerator>,
}

impl CachedPipeline {
    pub fn new(
        orchestrator: Arc<RetrievalOrchestrator>,
        cache: Arc<ResultCache>,
        probe: Arc<dyn IndexProbe>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            orchestrator,
            cache,
            probe,
            generator,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn orchestrator(&self) -> &Arc<RetrievalOrchestrator> {
        &self.orchestrator
    }

    /// Answer `query` from cache when the index is unchanged, otherwise
    /// retrieve, generate and cache.
    #[instrument(skip(self, query), fields(result_count = tracing::field::Empty))]
    pub async fn answer(
        &self,
        query: &UnderstoodQuery,
        result_count: Option<usize>,
    ) -> Result<Answer> {
        if query.original.trim().is_empty() {
            return Err(MuninnError::InvalidInput("query is empty".into()));
        }
        let k = result_count.unwrap_or(self.orchestrator.top_k());
        if k == 0 {
            return Err(MuninnError::InvalidInput("top_k must be positive".into()));
        }
        tracing::Span::current().record("result_count", k);

        let snapshot = with_timeout(
            "index_probe",
            self.orchestrator.backend_timeout(),
            self.probe.probe(&query.original, k),
        )
        .await?;
        let ids = &snapshot.source_ids;
        let chunks = snapshot.chunk_count;

        if let Some(hit) = self.cache.get(&query.original, k, ids, chunks) {
            debug!(
                probe = self.probe.name(),
                age_secs = hit.age_secs(),
                "serving cached answer"
            );
            return Ok(Answer {
                text: hit.entry.answer.clone(),
                sources: hit.entry.sources.clone(),
                from_cache: true,
                age_secs: Some(hit.age_secs()),
                retrieval: None,
            });
        }

        let outcome = self.orchestrator.retrieve(query, Some(k)).await?;
        let generated = self.generator.generate(query, &outcome.result).await?;
        let sources = if generated.sources.is_empty() {
            outcome.result.sources()
        } else {
            generated.sources
        };

        self.cache.put(
            &query.original,
            k,
            ids,
            chunks,
            generated.text.clone(),
            sources.clone(),
        );
        debug!(
            generator = self.generator.name(),
            sources = sources.len(),
            "cached fresh answer"
        );

        Ok(Answer {
            text: generated.text,
            sources,
            from_cache: false,
            age_secs: None,
            retrieval: Some(outcome),
        })
    }
}
