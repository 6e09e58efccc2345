//! Applying reranker verdicts to an index-aligned result set.

use std::collections::HashSet;

use crate::Result;
use crate::backends::RerankScore;
use crate::types::RetrievalResult;

/// Scores at or above this map to distance 0.
const SCORE_SCALE: f32 = 10.0;

/// Convert a reranker score (≈0–10, higher is better) into a distance on
/// the rough scale of upstream distances (lower is better).
///
/// `1.0 - score / 10`, clamped at 0 for scores above 10. A NaN or infinite
/// score gets the worst distance, 1.0.
pub fn score_to_distance(score: f32) -> f32 {
    if score.is_finite() {
        (1.0 - score / SCORE_SCALE).max(0.0)
    } else {
        1.0
    }
}

/// Rebuild `result` in reranker order.
///
/// All four sequences are reconstructed by indexing into the pre-rerank
/// arrays; distances are replaced by converted scores. Repeated indices
/// keep their first verdict. Out-of-range indices fail with `InvalidRerank`.
pub fn apply_rerank(result: &RetrievalResult, scores: &[RerankScore]) -> Result<RetrievalResult> {
    let mut seen = HashSet::with_capacity(scores.len());
    let verdicts: Vec<&RerankScore> = scores.iter().filter(|s| seen.insert(s.index)).collect();

    let indices: Vec<usize> = verdicts.iter().map(|s| s.index).collect();
    let mut reordered = result.select(&indices)?;
    reordered.set_distances(
        verdicts
            .iter()
            .map(|s| score_to_distance(s.score))
            .collect(),
    )?;
    Ok(reordered)
}
