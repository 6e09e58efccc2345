//! Retrieval outcome and stage reporting

use std::fmt;

use serde::{Deserialize, Serialize};

use super::result::RetrievalResult;

/// First-pass stage chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStage {
    /// Reference expansion over the base search backend.
    MultiHop,
    /// Hybrid dense + lexical search.
    Hybrid,
    /// Plain vector-similarity search.
    Vector,
}

impl RetrievalStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalStage::MultiHop => "multi_hop",
            RetrievalStage::Hybrid => "hybrid",
            RetrievalStage::Vector => "vector",
        }
    }
}

impl fmt::Display for RetrievalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final ranked result plus how it was produced.
///
/// Degraded-but-successful runs (nothing to expand, no reranker) are
/// reported here rather than as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub result: RetrievalResult,
    pub stage: RetrievalStage,
    /// Expansion hops that merged new candidates (always 0 unless `MultiHop`).
    pub hops_performed: usize,
    /// Whether the reranker reordered `result`.
    pub reranked: bool,
}
