//! RetrievalOrchestrator - search → expand → rerank → truncate

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use super::builder::OrchestratorBuilder;
use super::rerank::apply_rerank;
use crate::backends::{Reranker, SearchBackend, with_timeout};
use crate::expand::ReferenceExpander;
use crate::telemetry;
use crate::types::{RetrievalOutcome, RetrievalResult, RetrievalStage, UnderstoodQuery};
use crate::{MuninnError, Result};

/// Candidates fetched per requested result, so the reranker has material
/// to discriminate among.
pub const OVERFETCH_FACTOR: usize = 2;

/// First-pass stage, fixed when the orchestrator is built.
pub(crate) enum FirstStage {
    MultiHop(ReferenceExpander),
    Hybrid(Arc<dyn SearchBackend>),
    Vector(Arc<dyn SearchBackend>),
}

impl FirstStage {
    fn kind(&self) -> RetrievalStage {
        match self {
            FirstStage::MultiHop(_) => RetrievalStage::MultiHop,
            FirstStage::Hybrid(_) => RetrievalStage::Hybrid,
            FirstStage::Vector(_) => RetrievalStage::Vector,
        }
    }
}

/// Runs the retrieval stages for one request and returns a single ranked,
/// index-aligned result of the requested size.
///
/// Stage selection happens at build time (first applicable wins):
///
/// 1. multi-hop enabled → [`ReferenceExpander`] over the base search
/// 2. hybrid backend configured → hybrid search
/// 3. otherwise → plain vector search
///
/// A missing optional backend is skipped, never treated as a runtime
/// failure. Backend errors propagate unchanged; nothing is retried here.
pub struct RetrievalOrchestrator {
    first: FirstStage,
    reranker: Option<Arc<dyn Reranker>>,
    top_k: usize,
    backend_timeout: Option<Duration>,
}

impl RetrievalOrchestrator {
    /// Create a new builder.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub(crate) fn new(
        first: FirstStage,
        reranker: Option<Arc<dyn Reranker>>,
        top_k: usize,
        backend_timeout: Option<Duration>,
    ) -> Self {
        Self {
            first,
            reranker,
            top_k,
            backend_timeout,
        }
    }

    /// The first-pass stage every request uses.
    pub fn stage(&self) -> RetrievalStage {
        self.first.kind()
    }

    /// Default number of results.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    pub fn backend_timeout(&self) -> Option<Duration> {
        self.backend_timeout
    }

    /// Retrieve up to `top_k` (or the configured default) candidates.
    #[instrument(skip(self, query), fields(stage = %self.stage(), reranker = self.has_reranker()))]
    pub async fn retrieve(
        &self,
        query: &UnderstoodQuery,
        top_k: Option<usize>,
    ) -> Result<RetrievalOutcome> {
        if query.original.trim().is_empty() {
            return Err(MuninnError::InvalidInput("query is empty".into()));
        }
        let k = top_k.unwrap_or(self.top_k);
        if k == 0 {
            return Err(MuninnError::InvalidInput("top_k must be positive".into()));
        }
        let fetch = k.saturating_mul(OVERFETCH_FACTOR);
        let search_text = query.search_text();

        let start = Instant::now();
        let (mut result, hops_performed) = match &self.first {
            FirstStage::MultiHop(expander) => {
                let expanded = expander.retrieve(search_text, fetch).await?;
                (expanded.result, expanded.hops_performed)
            }
            FirstStage::Hybrid(backend) => {
                let search = backend.search(search_text, fetch);
                let found = with_timeout("hybrid_search", self.backend_timeout, search).await?;
                (found, 0)
            }
            FirstStage::Vector(backend) => {
                let search = backend.search(search_text, fetch);
                let found = with_timeout("vector_search", self.backend_timeout, search).await?;
                (found, 0)
            }
        };
        record_stage(self.stage().as_str(), start);
        debug!(
            candidates = result.len(),
            hops_performed,
            fetch,
            "first pass complete"
        );

        let mut reranked = false;
        if let Some(reranker) = &self.reranker
            && !result.is_empty()
        {
            result = self
                .rerank(reranker.as_ref(), &query.original, &result, k)
                .await?;
            reranked = true;
        }

        result.truncate(k);
        Ok(RetrievalOutcome {
            result,
            stage: self.stage(),
            hops_performed,
            reranked,
        })
    }

    async fn rerank(
        &self,
        reranker: &dyn Reranker,
        query: &str,
        candidates: &RetrievalResult,
        k: usize,
    ) -> Result<RetrievalResult> {
        let start = Instant::now();
        let documents = candidates.documents().to_vec();
        let scores = with_timeout(
            "rerank",
            self.backend_timeout,
            reranker.rerank(query, &documents, k),
        )
        .await?;
        let reordered = apply_rerank(candidates, &scores)?;
        record_stage("rerank", start);
        metrics::counter!(telemetry::RERANKED_TOTAL).increment(1);
        debug!(
            reranker = reranker.name(),
            before = candidates.len(),
            after = reordered.len(),
            "reranked candidates"
        );
        Ok(reordered)
    }
}

fn record_stage(stage: &'static str, start: Instant) {
    metrics::histogram!(telemetry::STAGE_DURATION_SECONDS, "stage" => stage)
        .record(start.elapsed().as_secs_f64());
}
