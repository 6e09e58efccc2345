//! Named lexical rules for pulling reference terms out of document text.
//!
//! Each rule is a small, independently testable [`ExtractionRule`]. Rules
//! return raw matches in text order; filtering (length, stoplist) and
//! deduplication happen once in [`ReferenceExtractor`](super::ReferenceExtractor).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::{MuninnError, Result};

/// A single heuristic for spotting follow-up search terms.
pub trait ExtractionRule: Send + Sync {
    /// Rule name for logging/debugging.
    fn name(&self) -> &str;

    /// Candidate terms found in `text`, in order of appearance.
    fn extract(&self, text: &str) -> Vec<String>;
}

macro_rules! reference_pattern {
    ($name:ident, $regex_str:expr) => {
        static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($regex_str).ok());
    };
}

// ── File paths: src/auth/login.py, config.yaml ─────────────────────────────
reference_pattern!(
    RE_FILE_PATH,
    r"(?:[A-Za-z0-9_.\-]+/)*[A-Za-z0-9_\-]+\.(?:py|pyi|rs|js|jsx|ts|tsx|go|java|kt|rb|php|c|h|cc|cpp|hpp|cs|swift|scala|md|rst|txt|toml|yaml|yml|json|ini|cfg|sh|sql|html|css|proto)\b"
);

// ── Quoted identifiers: `load_config`, "UserStore", 'settings.db_url' ─────
reference_pattern!(RE_BACKTICKED, r"`([A-Za-z_][A-Za-z0-9_.:/\-]*)(?:\(\))?`");
reference_pattern!(RE_DOUBLE_QUOTED, r#""([A-Za-z_][A-Za-z0-9_.:/\-]*)""#);
reference_pattern!(RE_SINGLE_QUOTED, r"'([A-Za-z_][A-Za-z0-9_.:/\-]*)'");

// ── Calls: parse_args( ─────────────────────────────────────────────────────
reference_pattern!(RE_CALL, r"\b([A-Za-z_][A-Za-z0-9_]*)\(");

// ── Decorators: @cached, @app.route ───────────────────────────────────────
reference_pattern!(RE_DECORATOR, r"(?m)(?:^|\s)@([A-Za-z_][A-Za-z0-9_.]*)");

// ── CamelCase compounds: SessionManager ───────────────────────────────────
reference_pattern!(RE_CAMEL_CASE, r"\b([A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+)\b");

// ── UPPER_SNAKE constants: MAX_RETRIES ────────────────────────────────────
reference_pattern!(RE_CONSTANT, r"\b([A-Z][A-Z0-9]*(?:_[A-Z0-9]+)+)\b");

/// Whole-match or first-capture-group occurrences of `re` in `text`.
fn captures(re: &LazyLock<Option<Regex>>, text: &str) -> Vec<String> {
    let Some(re) = re.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .collect()
}

/// File-path-like tokens ending in a known source or document extension.
pub struct FilePathRule;

impl ExtractionRule for FilePathRule {
    fn name(&self) -> &str {
        "file_path"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        captures(&RE_FILE_PATH, text)
    }
}

/// Identifiers wrapped in backticks or quotes.
pub struct QuotedIdentifierRule;

impl ExtractionRule for QuotedIdentifierRule {
    fn name(&self) -> &str {
        "quoted_identifier"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        // Merge by position so the output keeps text order across quote styles.
        let mut found: Vec<(usize, String)> = [&RE_BACKTICKED, &RE_DOUBLE_QUOTED, &RE_SINGLE_QUOTED]
            .into_iter()
            .filter_map(|re| re.as_ref())
            .flat_map(|re| {
                re.captures_iter(text)
                    .filter_map(|caps| caps.get(1))
                    .map(|m| (m.start(), m.as_str().to_string()))
                    .collect::<Vec<_>>()
            })
            .collect();
        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, term)| term).collect()
    }
}

/// Function-call-like tokens, `name(`.
pub struct CallRule;

impl ExtractionRule for CallRule {
    fn name(&self) -> &str {
        "call"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        captures(&RE_CALL, text)
    }
}

/// Decorator-like tokens, `@name`, at the start of a line or after whitespace.
pub struct DecoratorRule;

impl ExtractionRule for DecoratorRule {
    fn name(&self) -> &str {
        "decorator"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        captures(&RE_DECORATOR, text)
    }
}

/// Capitalised compound words such as `RetrievalOrchestrator`.
pub struct CamelCaseRule;

impl ExtractionRule for CamelCaseRule {
    fn name(&self) -> &str {
        "camel_case"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        captures(&RE_CAMEL_CASE, text)
    }
}

/// Upper-snake-case constant names such as `DEFAULT_TIMEOUT`.
pub struct ConstantRule;

impl ExtractionRule for ConstantRule {
    fn name(&self) -> &str {
        "constant"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        captures(&RE_CONSTANT, text)
    }
}

/// Project vocabulary matched case-insensitively on word boundaries.
///
/// Matches are reported in their configured spelling.
pub struct KnownTermsRule {
    pattern: Option<Regex>,
    canonical: HashMap<String, String>,
}

impl KnownTermsRule {
    /// Build the rule from a term list. Blank terms are ignored.
    pub fn new<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut canonical = HashMap::new();
        let mut alternatives = Vec::new();
        for term in terms {
            let term = term.into();
            let trimmed = term.trim();
            if trimmed.is_empty() {
                continue;
            }
            if canonical
                .insert(trimmed.to_lowercase(), trimmed.to_string())
                .is_none()
            {
                alternatives.push(regex::escape(trimmed));
            }
        }
        if alternatives.is_empty() {
            return Ok(Self {
                pattern: None,
                canonical,
            });
        }
        // Longest first so "session store" wins over "session".
        alternatives.sort_by_key(|alt| std::cmp::Reverse(alt.len()));
        let pattern = RegexBuilder::new(&format!(r"\b(?:{})\b", alternatives.join("|")))
            .case_insensitive(true)
            .build()
            .map_err(|e| MuninnError::Configuration(format!("invalid known terms: {e}")))?;
        Ok(Self {
            pattern: Some(pattern),
            canonical,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

impl ExtractionRule for KnownTermsRule {
    fn name(&self) -> &str {
        "known_term"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        pattern
            .find_iter(text)
            .filter_map(|m| self.canonical.get(&m.as_str().to_lowercase()).cloned())
            .collect()
    }
}

/// The built-in rule set, in the order their matches are considered.
pub fn default_rules() -> Vec<Box<dyn ExtractionRule>> {
    vec![
        Box::new(FilePathRule),
        Box::new(QuotedIdentifierRule),
        Box::new(CallRule),
        Box::new(DecoratorRule),
        Box::new(CamelCaseRule),
        Box::new(ConstantRule),
    ]
}
