//! Bounded multi-hop reference expansion.
//!
//! ```text
//!   initial search (fatal on error)
//!        │
//!        ▼
//!   ┌──────────────── hop ≤ max_hops ────────────────┐
//!   │ extract terms from newly merged documents      │
//!   │ take ≤ max_terms_per_hop not searched before   │
//!   │ follow-up search per term, concurrently        │──► error/timeout = no candidates
//!   │ merge unseen ids in term order                 │
//!   │ nothing new? stop                              │
//!   └────────────────────────────────────────────────┘
//! ```
//!
//! Worst-case cost depends on configuration only:
//! `max_hops × max_terms_per_hop` follow-up searches of `follow_up_top_k`
//! results each.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::extractor::ReferenceExtractor;
use crate::backends::{SearchBackend, with_timeout};
use crate::telemetry;
use crate::types::RetrievalResult;
use crate::{MuninnError, Result};

/// Configuration for [`ReferenceExpander`].
///
/// ```rust
/// # use muninn::ExpansionConfig;
/// # use std::time::Duration;
/// let config = ExpansionConfig::new()
///     .max_hops(3)
///     .follow_up_timeout(Duration::from_secs(2));
/// assert_eq!(config.max_follow_up_searches(), 15);
/// ```
#[derive(Debug, Clone)]
pub struct ExpansionConfig {
    /// Upper bound on expansion hops. Default: 2.
    pub max_hops: usize,
    /// Distinct new terms searched per hop. Default: 5.
    pub max_terms_per_hop: usize,
    /// Results requested per follow-up search. Default: 3.
    pub follow_up_top_k: usize,
    /// Only scan documents whose relevance (`1 - distance`) reaches this.
    /// Default: `None` (scan every newly merged document).
    pub min_relevance_for_hop: Option<f32>,
    /// Deadline for the initial search. Default: none.
    pub search_timeout: Option<Duration>,
    /// Deadline for each follow-up search. Default: none.
    pub follow_up_timeout: Option<Duration>,
    /// Project vocabulary for the known-terms rule. Default: empty.
    pub known_terms: Vec<String>,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_hops: 2,
            max_terms_per_hop: 5,
            follow_up_top_k: 3,
            min_relevance_for_hop: None,
            search_timeout: None,
            follow_up_timeout: None,
            known_terms: Vec::new(),
        }
    }
}

impl ExpansionConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_hops(mut self, n: usize) -> Self {
        self.max_hops = n;
        self
    }

    pub fn max_terms_per_hop(mut self, n: usize) -> Self {
        self.max_terms_per_hop = n;
        self
    }

    pub fn follow_up_top_k(mut self, n: usize) -> Self {
        self.follow_up_top_k = n;
        self
    }

    pub fn min_relevance_for_hop(mut self, threshold: f32) -> Self {
        self.min_relevance_for_hop = Some(threshold);
        self
    }

    pub fn search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = Some(timeout);
        self
    }

    pub fn follow_up_timeout(mut self, timeout: Duration) -> Self {
        self.follow_up_timeout = Some(timeout);
        self
    }

    pub fn known_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    /// Most follow-up searches a single call can issue.
    pub fn max_follow_up_searches(&self) -> usize {
        self.max_hops.saturating_mul(self.max_terms_per_hop)
    }
}

/// `[expansion]` section of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionSection {
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    #[serde(default = "default_max_terms_per_hop")]
    pub max_terms_per_hop: usize,
    #[serde(default = "default_follow_up_top_k")]
    pub follow_up_top_k: usize,
    #[serde(default)]
    pub min_relevance_for_hop: Option<f32>,
    #[serde(default)]
    pub follow_up_timeout_ms: Option<u64>,
    #[serde(default)]
    pub known_terms: Vec<String>,
}

impl Default for ExpansionSection {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            max_terms_per_hop: default_max_terms_per_hop(),
            follow_up_top_k: default_follow_up_top_k(),
            min_relevance_for_hop: None,
            follow_up_timeout_ms: None,
            known_terms: Vec::new(),
        }
    }
}

fn default_max_hops() -> usize {
    2
}

fn default_max_terms_per_hop() -> usize {
    5
}

fn default_follow_up_top_k() -> usize {
    3
}

impl From<ExpansionSection> for ExpansionConfig {
    fn from(section: ExpansionSection) -> Self {
        ExpansionConfig {
            max_hops: section.max_hops,
            max_terms_per_hop: section.max_terms_per_hop,
            follow_up_top_k: section.follow_up_top_k,
            min_relevance_for_hop: section.min_relevance_for_hop,
            search_timeout: None,
            follow_up_timeout: section.follow_up_timeout_ms.map(Duration::from_millis),
            known_terms: section.known_terms,
        }
    }
}

/// Accumulated candidates and how many hops contributed to them.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionResult {
    pub result: RetrievalResult,
    /// Hops that merged at least one new candidate. Never exceeds `max_hops`.
    pub hops_performed: usize,
    /// Every term a follow-up search was issued for, in issue order.
    pub terms_followed: Vec<String>,
}

/// Multi-hop retriever over a base [`SearchBackend`]. See module docs.
pub struct ReferenceExpander {
    base: Arc<dyn SearchBackend>,
    extractor: ReferenceExtractor,
    config: ExpansionConfig,
}

impl ReferenceExpander {
    /// Create an expander with the built-in rules plus `config.known_terms`.
    pub fn new(base: Arc<dyn SearchBackend>, config: ExpansionConfig) -> Result<Self> {
        if config.max_hops == 0 {
            return Err(MuninnError::Configuration(
                "expansion max_hops must be at least 1".into(),
            ));
        }
        let extractor = ReferenceExtractor::with_known_terms(config.known_terms.iter().cloned())?;
        Ok(Self {
            base,
            extractor,
            config,
        })
    }

    /// Replace the extractor (custom rule set).
    pub fn with_extractor(mut self, extractor: ReferenceExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &ExpansionConfig {
        &self.config
    }

    pub fn base_name(&self) -> &str {
        self.base.name()
    }

    /// Search for `query`, then follow references found in the results.
    ///
    /// Only a failure of the initial search is returned as an error.
    #[instrument(skip(self, query), fields(base = self.base.name(), hops = self.config.max_hops))]
    pub async fn retrieve(&self, query: &str, result_count: usize) -> Result<ExpansionResult> {
        let mut accumulated = with_timeout(
            "initial_search",
            self.config.search_timeout,
            self.base.search(query, result_count),
        )
        .await?;

        let mut seen: HashSet<String> = accumulated.ids().iter().cloned().collect();
        let mut searched: HashSet<String> = HashSet::new();
        let mut terms_followed = Vec::new();
        let mut frontier: Range<usize> = 0..accumulated.len();
        let mut hops_performed = 0;

        for hop in 1..=self.config.max_hops {
            let terms: Vec<String> = self
                .extractor
                .extract(self.frontier_texts(&accumulated, frontier.clone()))
                .into_iter()
                .filter(|term| !searched.contains(term))
                .take(self.config.max_terms_per_hop)
                .collect();

            if terms.is_empty() {
                debug!(hop, "no references to follow");
                break;
            }
            debug!(hop, terms = ?terms, "following references");

            let followed = join_all(terms.iter().map(|term| self.follow_up(term))).await;
            searched.extend(terms.iter().cloned());
            terms_followed.extend(terms);

            let before = accumulated.len();
            for result in followed {
                accumulated.extend_unseen(result, &mut seen);
            }
            let added = accumulated.len() - before;
            if added == 0 {
                debug!(hop, "hop found nothing new, stopping");
                break;
            }

            hops_performed += 1;
            debug!(
                hop,
                added,
                total = accumulated.len(),
                "hop merged candidates"
            );
            frontier = before..accumulated.len();
        }

        metrics::histogram!(telemetry::EXPANSION_HOPS).record(hops_performed as f64);
        Ok(ExpansionResult {
            result: accumulated,
            hops_performed,
            terms_followed,
        })
    }

    /// Documents in `range` that pass the relevance gate.
    fn frontier_texts<'a>(
        &self,
        result: &'a RetrievalResult,
        range: Range<usize>,
    ) -> impl Iterator<Item = &'a str> {
        let threshold = self.config.min_relevance_for_hop;
        range
            .filter_map(move |i| result.get(i))
            .filter(move |c| threshold.is_none_or(|t| c.relevance() >= t))
            .map(|c| c.document)
    }

    /// One follow-up search; failures and timeouts yield no candidates.
    async fn follow_up(&self, term: &str) -> RetrievalResult {
        let start = Instant::now();
        let outcome = with_timeout(
            "follow_up_search",
            self.config.follow_up_timeout,
            self.base.search(term, self.config.follow_up_top_k),
        )
        .await;
        match outcome {
            Ok(result) => result,
            Err(e) => {
                metrics::counter!(telemetry::FOLLOW_UP_FAILURES_TOTAL).increment(1);
                warn!(
                    term,
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "follow-up search failed, treating as empty"
                );
                RetrievalResult::new()
            }
        }
    }
}
