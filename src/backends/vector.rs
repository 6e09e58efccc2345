//! Plain vector-similarity search built from an embedder and a store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::traits::{EmbeddingProvider, SearchBackend, VectorStore};
use crate::Result;
use crate::types::RetrievalResult;

/// [`SearchBackend`] that embeds the query text and asks a [`VectorStore`]
/// for its nearest neighbours.
///
/// Used as the last-resort first stage when no hybrid backend is
/// configured, and as the expander's base search in that case.
pub struct VectorSearch {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl VectorSearch {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl SearchBackend for VectorSearch {
    fn name(&self) -> &str {
        "vector"
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<RetrievalResult> {
        let embedding = self.embedder.embed(query).await?;
        debug!(
            embedder = self.embedder.name(),
            store = self.store.name(),
            dimensions = embedding.len(),
            top_k,
            "vector query"
        );
        self.store.query(&embedding, top_k).await
    }
}
