//! Builder for configuring orchestrator instances

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::orchestrator::{FirstStage, RetrievalOrchestrator};
use crate::backends::{
    CachingEmbeddingProvider, EmbeddingCacheConfig, EmbeddingProvider, Reranker, RetryConfig,
    RetryingEmbeddingProvider, RetryingReranker, RetryingSearchBackend, RetryingVectorStore,
    SearchBackend, VectorSearch, VectorStore,
};
use crate::config::Config;
use crate::expand::{ExpansionConfig, ReferenceExpander, ReferenceExtractor};
use crate::{MuninnError, Result};

/// Default number of results per request.
pub const DEFAULT_TOP_K: usize = 5;

/// Builder for [`RetrievalOrchestrator`].
///
/// ```rust,ignore
/// let orchestrator = RetrievalOrchestrator::builder()
///     .hybrid(hybrid_backend)
///     .reranker(cross_encoder)
///     .multi_hop(ExpansionConfig::new().max_hops(2))
///     .top_k(5)
///     .backend_timeout(Duration::from_secs(10))
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    hybrid: Option<Arc<dyn SearchBackend>>,
    vector: Option<(Arc<dyn EmbeddingProvider>, Arc<dyn VectorStore>)>,
    reranker: Option<Arc<dyn Reranker>>,
    multi_hop: Option<ExpansionConfig>,
    extractor: Option<ReferenceExtractor>,
    top_k: usize,
    backend_timeout: Option<Duration>,
    retry: Option<RetryConfig>,
    embedding_cache: Option<EmbeddingCacheConfig>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            hybrid: None,
            vector: None,
            reranker: None,
            multi_hop: None,
            extractor: None,
            top_k: DEFAULT_TOP_K,
            backend_timeout: None,
            retry: None,
            embedding_cache: None,
        }
    }

    /// Configure the hybrid search backend.
    pub fn hybrid(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.hybrid = Some(backend);
        self
    }

    /// Configure the plain vector fallback (used only without a hybrid backend).
    pub fn vector_fallback(
        mut self,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        self.vector = Some((embedder, store));
        self
    }

    /// Configure the precision reranker.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Enable multi-hop reference expansion.
    pub fn multi_hop(mut self, config: ExpansionConfig) -> Self {
        self.multi_hop = Some(config);
        self
    }

    /// Disable multi-hop reference expansion.
    pub fn without_multi_hop(mut self) -> Self {
        self.multi_hop = None;
        self
    }

    /// Replace the expander's built-in rule set.
    ///
    /// The expansion config's `known_terms` are still honoured: a known-terms
    /// rule is appended after the supplied rules.
    pub fn extractor(mut self, extractor: ReferenceExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set the default number of results.
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Set the deadline applied to each backend call.
    ///
    /// Also the default for expansion searches that have no deadline of their own.
    pub fn backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = Some(timeout);
        self
    }

    /// Wrap every backend in a retry decorator.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Memoise query embeddings for the vector fallback.
    pub fn embedding_cache(mut self, config: EmbeddingCacheConfig) -> Self {
        self.embedding_cache = Some(config);
        self
    }

    /// Apply a loaded [`Config`]. Backends are still wired programmatically.
    pub fn config(mut self, config: &Config) -> Self {
        let retrieval = &config.retrieval;
        self.top_k = retrieval.top_k;
        self.multi_hop = retrieval
            .multi_hop
            .then(|| ExpansionConfig::from(config.expansion.clone()));
        self.backend_timeout = retrieval.backend_timeout_ms.map(Duration::from_millis);
        self.retry = config.retry.clone().map(RetryConfig::from);
        self.embedding_cache = config.embedding_cache.clone().map(Into::into);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<RetrievalOrchestrator> {
        if self.top_k == 0 {
            return Err(MuninnError::Configuration(
                "top_k must be at least 1".into(),
            ));
        }

        let retry = self.retry;
        let hybrid = self.hybrid.map(|mut backend| {
            if let Some(config) = &retry {
                backend = Arc::new(RetryingSearchBackend::new(backend, config.clone()));
            }
            backend
        });

        let vector = self.vector.map(|(mut embedder, mut store)| {
            if let Some(config) = &retry {
                embedder = Arc::new(RetryingEmbeddingProvider::new(embedder, config.clone()));
                store = Arc::new(RetryingVectorStore::new(store, config.clone()));
            }
            if let Some(config) = &self.embedding_cache {
                embedder = Arc::new(CachingEmbeddingProvider::new(embedder, config));
            }
            Arc::new(VectorSearch::new(embedder, store)) as Arc<dyn SearchBackend>
        });

        let reranker = self.reranker.map(|mut reranker| {
            if let Some(config) = &retry {
                reranker = Arc::new(RetryingReranker::new(reranker, config.clone()));
            }
            reranker
        });

        let first = match (self.multi_hop, hybrid, vector) {
            (_, None, None) => return Err(MuninnError::NoBackend),
            (Some(mut expansion), hybrid, vector) => {
                expansion.search_timeout = expansion.search_timeout.or(self.backend_timeout);
                expansion.follow_up_timeout = expansion.follow_up_timeout.or(self.backend_timeout);
                let terms = expansion.known_terms.clone();
                let extractor = self
                    .extractor
                    .map(|extractor| extractor.known_terms(terms))
                    .transpose()?;
                let base = hybrid.or(vector).ok_or(MuninnError::NoBackend)?;
                let mut expander = ReferenceExpander::new(base, expansion)?;
                if let Some(extractor) = extractor {
                    expander = expander.with_extractor(extractor);
                }
                FirstStage::MultiHop(expander)
            }
            (None, Some(hybrid), _) => FirstStage::Hybrid(hybrid),
            (None, None, Some(vector)) => FirstStage::Vector(vector),
        };

        let orchestrator =
            RetrievalOrchestrator::new(first, reranker, self.top_k, self.backend_timeout);
        debug!(
            stage = %orchestrator.stage(),
            reranker = orchestrator.has_reranker(),
            top_k = orchestrator.top_k(),
            "built retrieval orchestrator"
        );
        Ok(orchestrator)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
