//! Index-aligned retrieval result sets

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{MuninnError, Result};

/// Free-form per-candidate metadata as returned by the backing store.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Raw parallel sequences, as exchanged with backends.
///
/// Converting into a [`RetrievalResult`] checks that all four sequences
/// have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultParts {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<Metadata>,
    pub distances: Vec<f32>,
}

/// A single owned candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub distance: f32,
}

impl Candidate {
    /// Create a candidate with empty metadata.
    pub fn new(id: impl Into<String>, document: impl Into<String>, distance: f32) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            metadata: Metadata::new(),
            distance,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A borrowed view of one position in a [`RetrievalResult`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateRef<'a> {
    pub id: &'a str,
    pub document: &'a str,
    pub metadata: &'a Metadata,
    pub distance: f32,
}

impl CandidateRef<'_> {
    /// Relevance on a "higher is better" scale, `1.0 - distance`.
    pub fn relevance(&self) -> f32 {
        1.0 - self.distance
    }

    pub fn to_candidate(&self) -> Candidate {
        Candidate {
            id: self.id.to_owned(),
            document: self.document.to_owned(),
            metadata: self.metadata.clone(),
            distance: self.distance,
        }
    }
}

/// Source record kept alongside a cached answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub distance: f32,
}

/// Four parallel, index-aligned sequences describing ranked candidates.
///
/// Position `i` of `ids`, `documents`, `metadatas` and `distances` always
/// describes the same candidate. The sequences are private: every mutation
/// goes through a method that applies the same change to all four.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResultParts", into = "ResultParts")]
pub struct RetrievalResult {
    ids: Vec<String>,
    documents: Vec<String>,
    metadatas: Vec<Metadata>,
    distances: Vec<f32>,
}

impl RetrievalResult {
    /// Create an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty result set with room for `n` candidates.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            ids: Vec::with_capacity(n),
            documents: Vec::with_capacity(n),
            metadatas: Vec::with_capacity(n),
            distances: Vec::with_capacity(n),
        }
    }

    /// Build from parallel sequences.
    ///
    /// Returns `InvalidInput` if the sequences differ in length.
    pub fn from_parts(
        ids: Vec<String>,
        documents: Vec<String>,
        metadatas: Vec<Metadata>,
        distances: Vec<f32>,
    ) -> Result<Self> {
        let n = ids.len();
        if documents.len() != n || metadatas.len() != n || distances.len() != n {
            return Err(MuninnError::InvalidInput(format!(
                "misaligned result: {} ids, {} documents, {} metadatas, {} distances",
                n,
                documents.len(),
                metadatas.len(),
                distances.len()
            )));
        }
        Ok(Self {
            ids,
            documents,
            metadatas,
            distances,
        })
    }

    /// Split back into the raw parallel sequences.
    pub fn into_parts(self) -> ResultParts {
        ResultParts {
            ids: self.ids,
            documents: self.documents,
            metadatas: self.metadatas,
            distances: self.distances,
        }
    }

    /// Append one candidate to the end of every sequence.
    pub fn push(&mut self, candidate: Candidate) {
        self.ids.push(candidate.id);
        self.documents.push(candidate.document);
        self.metadatas.push(candidate.metadata);
        self.distances.push(candidate.distance);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn metadatas(&self) -> &[Metadata] {
        &self.metadatas
    }

    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Candidate at position `i`, if any.
    pub fn get(&self, i: usize) -> Option<CandidateRef<'_>> {
        if i >= self.len() {
            return None;
        }
        Some(CandidateRef {
            id: &self.ids[i],
            document: &self.documents[i],
            metadata: &self.metadatas[i],
            distance: self.distances[i],
        })
    }

    /// Iterate over candidates in rank order.
    pub fn iter(&self) -> impl Iterator<Item = CandidateRef<'_>> {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Keep at most the first `k` candidates.
    pub fn truncate(&mut self, k: usize) {
        self.ids.truncate(k);
        self.documents.truncate(k);
        self.metadatas.truncate(k);
        self.distances.truncate(k);
    }

    /// Build a new result from the candidates at `indices`, in that order.
    ///
    /// Returns `InvalidRerank` if any index is out of range.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        let mut out = Self::with_capacity(indices.len());
        for &i in indices {
            let candidate = self.get(i).ok_or(MuninnError::InvalidRerank {
                index: i,
                len: self.len(),
            })?;
            out.push(candidate.to_candidate());
        }
        Ok(out)
    }

    /// Replace every distance, keeping positions unchanged.
    ///
    /// `distances` must have exactly [`len()`](Self::len) entries.
    pub fn set_distances(&mut self, distances: Vec<f32>) -> Result<()> {
        if distances.len() != self.len() {
            return Err(MuninnError::InvalidInput(format!(
                "expected {} distances, got {}",
                self.len(),
                distances.len()
            )));
        }
        self.distances = distances;
        Ok(())
    }

    /// Append every candidate of `other` whose id is not in `seen`.
    ///
    /// Newly appended ids are added to `seen`. Candidates keep their
    /// encounter order. Returns the number of candidates appended.
    pub fn extend_unseen(&mut self, other: RetrievalResult, seen: &mut HashSet<String>) -> usize {
        let mut added = 0;
        let ResultParts {
            ids,
            documents,
            metadatas,
            distances,
        } = other.into_parts();
        for (((id, document), metadata), distance) in ids
            .into_iter()
            .zip(documents)
            .zip(metadatas)
            .zip(distances)
        {
            if seen.insert(id.clone()) {
                self.push(Candidate {
                    id,
                    document,
                    metadata,
                    distance,
                });
                added += 1;
            }
        }
        added
    }

    /// Source records (id, metadata, distance) in rank order.
    pub fn sources(&self) -> Vec<SourceRecord> {
        self.iter()
            .map(|c| SourceRecord {
                id: c.id.to_owned(),
                metadata: c.metadata.clone(),
                distance: c.distance,
            })
            .collect()
    }
}

impl TryFrom<ResultParts> for RetrievalResult {
    type Error = MuninnError;

    fn try_from(parts: ResultParts) -> Result<Self> {
        Self::from_parts(parts.ids, parts.documents, parts.metadatas, parts.distances)
    }
}

impl From<RetrievalResult> for ResultParts {
    fn from(result: RetrievalResult) -> Self {
        result.into_parts()
    }
}

impl FromIterator<Candidate> for RetrievalResult {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut out = Self::new();
        for candidate in iter {
            out.push(candidate);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RetrievalResult {
        ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, id)| Candidate::new(*id, format!("doc {id}"), i as f32 * 0.1))
            .collect()
    }

    #[test]
    fn from_parts_rejects_misaligned() {
        let err = RetrievalResult::from_parts(
            vec!["a".into(), "b".into()],
            vec!["doc".into()],
            vec![Metadata::new(), Metadata::new()],
            vec![0.1, 0.2],
        )
        .unwrap_err();
        assert!(matches!(err, MuninnError::InvalidInput(_)));
    }

    #[test]
    fn select_reorders_all_sequences() {
        let result = sample().select(&[2, 0]).unwrap();
        assert_eq!(result.ids(), &["c".to_string(), "a".to_string()]);
        assert_eq!(result.documents()[0], "doc c");
        assert_eq!(result.metadatas().len(), 2);
        assert!((result.distances()[0] - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn select_out_of_range_fails() {
        let err = sample().select(&[0, 7]).unwrap_err();
        assert!(matches!(
            err,
            MuninnError::InvalidRerank { index: 7, len: 3 }
        ));
    }

    #[test]
    fn truncate_keeps_alignment() {
        let mut result = sample();
        result.truncate(2);
        assert_eq!(result.len(), 2);
        assert_eq!(result.documents().len(), 2);
        assert_eq!(result.metadatas().len(), 2);
        assert_eq!(result.distances().len(), 2);

        result.truncate(10);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn extend_unseen_skips_known_ids() {
        let mut result = sample();
        let mut seen: HashSet<String> = result.ids().iter().cloned().collect();
        let other: RetrievalResult = vec![
            Candidate::new("b", "dup", 0.0),
            Candidate::new("d", "doc d", 0.4),
            Candidate::new("d", "doc d again", 0.5),
        ]
        .into_iter()
        .collect();

        let added = result.extend_unseen(other, &mut seen);
        assert_eq!(added, 1);
        assert_eq!(result.ids().last().map(String::as_str), Some("d"));
        assert_eq!(result.documents().last().map(String::as_str), Some("doc d"));
    }

    #[test]
    fn deserialize_rejects_misaligned() {
        let json = r#"{"ids":["a"],"documents":[],"metadatas":[{}],"distances":[0.1]}"#;
        assert!(serde_json::from_str::<RetrievalResult>(json).is_err());
    }
}
