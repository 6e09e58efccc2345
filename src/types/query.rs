//! Query descriptions handed over by the query-understanding step

use serde::{Deserialize, Serialize};

/// A user query after intent/expansion analysis.
///
/// `expanded` holds paraphrases or rewritten forms, most preferred first.
/// Retrieval searches with the first expansion when present, while the
/// reranker always scores against the original text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderstoodQuery {
    pub original: String,
    #[serde(default)]
    pub expanded: Vec<String>,
}

impl UnderstoodQuery {
    /// Create a query with no expansions.
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            expanded: Vec::new(),
        }
    }

    /// Append an expansion.
    pub fn expansion(mut self, text: impl Into<String>) -> Self {
        self.expanded.push(text.into());
        self
    }

    /// The string to send to the search stage.
    pub fn search_text(&self) -> &str {
        self.expanded
            .first()
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.original)
    }
}

impl From<&str> for UnderstoodQuery {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for UnderstoodQuery {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
