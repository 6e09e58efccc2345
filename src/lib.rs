//! Muninn - multi-stage retrieval core for retrieval-augmented QA
//!
//! This crate sequences hybrid search, bounded reference expansion
//! ("multi-hop") and precision reranking into one ranked, index-aligned
//! result set, and caches answers under a fingerprint of the live index
//! so a changed index never serves a stale answer.
//!
//! Embedding, vector storage, reranking models and answer generation are
//! collaborators behind the traits in [`backends`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use muninn::{
//!     CacheConfig, CachedPipeline, ExpansionConfig, ResultCache, RetrievalOrchestrator,
//!     UnderstoodQuery,
//! };
//!
//! #[tokio::main]
//! async fn main() -> muninn::Result<()> {
//!     let orchestrator = RetrievalOrchestrator::builder()
//!         .hybrid(Arc::new(MyHybridSearch::connect().await?))
//!         .reranker(Arc::new(MyCrossEncoder::new()))
//!         .multi_hop(ExpansionConfig::new())
//!         .build()?;
//!
//!     let pipeline = CachedPipeline::new(
//!         Arc::new(orchestrator),
//!         Arc::new(ResultCache::new(CacheConfig::new())),
//!         Arc::new(MyIndexProbe::new()),
//!         Arc::new(MyAnswerWriter::new()),
//!     );
//!
//!     let answer = pipeline
//!         .answer(&UnderstoodQuery::new("where is the session timeout set?"), None)
//!         .await?;
//!     println!("{} (cached: {})", answer.text, answer.from_cache);
//!     Ok(())
//! }
//! ```

pub mod backends;
pub mod cache;
pub mod config;
pub mod error;
pub mod expand;
pub mod pipeline;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use error::{MuninnError, Result};

pub use backends::{
    AnswerGenerator, EmbeddingCacheConfig, EmbeddingProvider, GeneratedAnswer, IndexProbe,
    IndexSnapshot, RerankScore, Reranker, RetryConfig, SearchBackend, VectorSearch, VectorStore,
};
pub use cache::{CacheConfig, CacheEntry, CacheHit, CacheStats, EvictionPolicy, ResultCache};
pub use config::Config;
pub use expand::{
    ExpansionConfig, ExpansionResult, ExtractionRule, ReferenceExpander, ReferenceExtractor,
};
pub use pipeline::{Answer, CachedPipeline, OrchestratorBuilder, RetrievalOrchestrator};
pub use types::{
    Candidate, CandidateRef, Metadata, RetrievalOutcome, RetrievalResult, RetrievalStage,
    SourceRecord, UnderstoodQuery,
};
