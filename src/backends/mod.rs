//! Backend traits and decorators.
//!
//! Collaborators implement capability-specific traits (`SearchBackend`,
//! `Reranker`, ...) rather than one "god trait". Decorators
//! (`Retrying*`, [`CachingEmbeddingProvider`]) implement the same trait
//! they wrap, so they stack freely at build time.

pub mod embedding_cache;
pub mod retry;
pub mod timeout;
pub mod traits;
pub mod vector;

pub use embedding_cache::{CachingEmbeddingProvider, EmbeddingCacheConfig, EmbeddingCacheSection};
pub use retry::{
    RetryConfig, RetrySection, RetryingEmbeddingProvider, RetryingReranker, RetryingSearchBackend,
    RetryingVectorStore,
};
pub use timeout::with_timeout;
pub use traits::{
    AnswerGenerator, EmbeddingProvider, GeneratedAnswer, IndexProbe, IndexSnapshot, RerankScore,
    Reranker, SearchBackend, VectorStore,
};
pub use vector::VectorSearch;
