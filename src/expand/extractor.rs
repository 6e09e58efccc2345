//! Rule set + filtering that turns retrieved text into follow-up terms.

use std::collections::HashSet;

use super::rules::{ExtractionRule, KnownTermsRule, default_rules};
use crate::Result;

/// Literals and file extensions never worth a follow-up search.
const STOPLIST: &[&str] = &[
    "true", "false", "none", "null", "nil", "undefined", "self", "cls", "this", "py", "pyi",
    "rs", "js", "jsx", "ts", "tsx", "go", "java", "rb", "md", "rst", "txt", "toml", "yaml", "yml",
    "json", "ini", "cfg", "html", "css", "sql", "cpp", "hpp",
];

/// Terms at or below this many characters are dropped.
const MAX_DROPPED_LEN: usize = 2;

/// Applies an ordered list of [`ExtractionRule`]s and filters the result.
///
/// Output is deduplicated, keeps first-seen order (documents in rank
/// order, then rules in registration order), drops one- and two-character
/// terms and anything on the stoplist (compared case-insensitively).
pub struct ReferenceExtractor {
    rules: Vec<Box<dyn ExtractionRule>>,
    stoplist: HashSet<String>,
}

impl Default for ReferenceExtractor {
    fn default() -> Self {
        Self::with_rules(default_rules())
    }
}

impl ReferenceExtractor {
    /// Extractor using the built-in rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor using exactly `rules`.
    pub fn with_rules(rules: Vec<Box<dyn ExtractionRule>>) -> Self {
        Self {
            rules,
            stoplist: STOPLIST.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Built-in rules plus a [`KnownTermsRule`] for `terms` (skipped when empty).
    pub fn with_known_terms<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().known_terms(terms)
    }

    /// Append a [`KnownTermsRule`] for `terms` (skipped when empty).
    pub fn known_terms<I, S>(mut self, terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known = KnownTermsRule::new(terms)?;
        if !known.is_empty() {
            self.rules.push(Box::new(known));
        }
        Ok(self)
    }

    /// Append a rule.
    pub fn rule(mut self, rule: Box<dyn ExtractionRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a word to the stoplist.
    pub fn stop_word(mut self, word: impl AsRef<str>) -> Self {
        self.stoplist.insert(word.as_ref().to_lowercase());
        self
    }

    /// Names of the active rules, in application order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    fn keep(&self, term: &str) -> bool {
        term.chars().count() > MAX_DROPPED_LEN && !self.stoplist.contains(&term.to_lowercase())
    }

    /// Distinct candidate terms found across `texts`.
    pub fn extract<'a, I>(&self, texts: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        for text in texts {
            for rule in &self.rules {
                for term in rule.extract(text) {
                    let term = term.trim();
                    if self.keep(term) && seen.insert(term.to_string()) {
                        terms.push(term.to_string());
                    }
                }
            }
        }
        terms
    }
}
