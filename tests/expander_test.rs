//! Tests for multi-hop reference expansion.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use muninn::types::Candidate;
use muninn::{
    ExpansionConfig, MuninnError, ReferenceExpander, ReferenceExtractor, Result, RetrievalResult,
    SearchBackend,
};

// ============================================================================
// Mock backends
// ============================================================================

/// Returns canned candidates per query text; unknown queries find nothing.
#[derive(Default)]
struct ScriptedSearch {
    responses: HashMap<String, Vec<Candidate>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedSearch {
    fn respond(mut self, query: &str, candidates: Vec<Candidate>) -> Self {
        self.responses.insert(query.to_string(), candidates);
        self
    }

    fn fail(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    fn delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    fn queries(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(q, _)| q.clone())
            .collect()
    }

    fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for ScriptedSearch {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<RetrievalResult> {
        self.calls.lock().unwrap().push((query.to_string(), top_k));
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(query) {
            let reason = format!("no route for {query}");
            return Err(MuninnError::backend("scripted", reason));
        }
        Ok(self
            .responses
            .get(query)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(top_k)
            .collect())
    }
}

/// Every call returns one brand-new document referencing a brand-new term.
#[derive(Default)]
struct EndlessChain {
    calls: AtomicUsize,
}

#[async_trait]
impl SearchBackend for EndlessChain {
    fn name(&self) -> &str {
        "endless"
    }

    async fn search(&self, _query: &str, _top_k: usize) -> Result<RetrievalResult> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let text = format!("continues in `chain_{n}`");
        Ok(doc(&format!("doc-{n}"), &text, 0.2).into_iter().collect())
    }
}

fn doc(id: &str, text: &str, distance: f32) -> Vec<Candidate> {
    vec![Candidate::new(id, text, distance)]
}

fn expander(backend: Arc<dyn SearchBackend>, config: ExpansionConfig) -> ReferenceExpander {
    ReferenceExpander::new(backend, config).unwrap()
}

// ============================================================================
// Termination
// ============================================================================

#[tokio::test]
async fn no_references_means_zero_hops() {
    let query = "how do sessions expire";
    let backend = Arc::new(ScriptedSearch::default().respond(
        query,
        doc("d1", "sessions expire after an hour of inactivity", 0.2),
    ));
    let exp = expander(backend.clone(), ExpansionConfig::new());

    let out = exp.retrieve(query, 6).await.unwrap();

    assert_eq!(out.hops_performed, 0);
    assert_eq!(out.result.ids(), ["d1"]);
    assert!(out.terms_followed.is_empty());
    assert_eq!(backend.calls(), vec![(query.to_string(), 6)]);
}

#[tokio::test]
async fn endless_references_stop_at_max_hops() {
    let backend = Arc::new(EndlessChain::default());
    let exp = expander(backend.clone(), ExpansionConfig::new().max_hops(3));

    let out = exp.retrieve("start", 4).await.unwrap();

    assert_eq!(out.hops_performed, 3);
    assert_eq!(out.result.ids(), ["doc-0", "doc-1", "doc-2", "doc-3"]);
    // Initial search plus one follow-up per hop.
    assert_eq!(backend.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn hop_with_nothing_new_stops_early() {
    let backend = Arc::new(
        ScriptedSearch::default()
            .respond("query", doc("d1", "see `load_config`", 0.1))
            .respond("load_config", doc("d1", "see `load_config`", 0.1)),
    );
    let exp = expander(backend.clone(), ExpansionConfig::new().max_hops(4));

    let out = exp.retrieve("query", 4).await.unwrap();

    assert_eq!(out.hops_performed, 0);
    assert_eq!(out.result.len(), 1);
    assert_eq!(backend.queries(), vec!["query", "load_config"]);
}

#[tokio::test]
async fn terms_are_not_searched_twice() {
    let backend = Arc::new(
        ScriptedSearch::default()
            .respond("query", doc("d1", "see `load_config`", 0.1))
            .respond(
                "load_config",
                doc("d2", "`load_config` calls `parse_file`", 0.2),
            )
            .respond("parse_file", doc("d3", "reads from disk", 0.3)),
    );
    let exp = expander(backend.clone(), ExpansionConfig::new().max_hops(3));

    let out = exp.retrieve("query", 4).await.unwrap();

    assert_eq!(out.hops_performed, 2);
    assert_eq!(out.result.ids(), ["d1", "d2", "d3"]);
    assert_eq!(out.terms_followed, vec!["load_config", "parse_file"]);
    let queries = backend.queries();
    assert_eq!(queries, vec!["query", "load_config", "parse_file"]);
}

// ============================================================================
// Breadth and merge order
// ============================================================================

#[tokio::test]
async fn breadth_is_capped_per_hop() {
    let text = "`term_1` `term_2` `term_3` `term_4` `term_5` `term_6` `term_7`";
    let search = ScriptedSearch::default().respond("query", doc("d1", text, 0.1));
    let backend = Arc::new(search);
    let exp = expander(backend.clone(), ExpansionConfig::new().max_hops(1));

    let out = exp.retrieve("query", 4).await.unwrap();

    assert_eq!(
        out.terms_followed,
        vec!["term_1", "term_2", "term_3", "term_4", "term_5"]
    );
    let calls = backend.calls();
    assert_eq!(calls.len(), 6);
    // Follow-ups use the configured follow-up size, not the request size.
    assert!(calls[1..].iter().all(|(_, k)| *k == 3));
}

#[tokio::test(start_paused = true)]
async fn merge_follows_term_order_not_completion_order() {
    let backend = Arc::new(
        ScriptedSearch::default()
            .respond("query", doc("d0", "`first_ref` then `second_ref`", 0.1))
            .respond("first_ref", doc("a1", "slow answer", 0.4))
            .delay("first_ref", Duration::from_millis(500))
            .respond("second_ref", doc("b1", "fast answer", 0.3)),
    );
    let exp = expander(backend, ExpansionConfig::new().max_hops(1));

    let out = exp.retrieve("query", 4).await.unwrap();

    assert_eq!(out.result.ids(), ["d0", "a1", "b1"]);
}

#[tokio::test]
async fn duplicates_across_follow_ups_are_merged_once() {
    let backend = Arc::new(
        ScriptedSearch::default()
            .respond("query", doc("d0", "`first_ref` and `second_ref`", 0.1))
            .respond(
                "first_ref",
                vec![
                    Candidate::new("shared", "x", 0.2),
                    Candidate::new("d0", "dup", 0.2),
                ],
            )
            .respond("second_ref", doc("shared", "x", 0.5)),
    );
    let exp = expander(backend, ExpansionConfig::new().max_hops(1));

    let out = exp.retrieve("query", 4).await.unwrap();

    assert_eq!(out.result.ids(), ["d0", "shared"]);
    // First encounter wins.
    assert!((out.result.distances()[1] - 0.2).abs() < 1e-6);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn failed_follow_up_contributes_nothing() {
    let backend = Arc::new(
        ScriptedSearch::default()
            .respond("query", doc("d0", "`bad_ref` and `good_ref`", 0.1))
            .fail("bad_ref")
            .respond("good_ref", doc("w1", "found it", 0.3)),
    );
    let exp = expander(backend, ExpansionConfig::new().max_hops(1));

    let out = exp.retrieve("query", 4).await.unwrap();

    assert_eq!(out.result.ids(), ["d0", "w1"]);
    assert_eq!(out.hops_performed, 1);
}

#[tokio::test]
async fn failed_initial_search_is_fatal() {
    let backend = Arc::new(ScriptedSearch::default().fail("query"));
    let exp = expander(backend, ExpansionConfig::new());

    let err = exp.retrieve("query", 4).await.unwrap_err();

    assert!(matches!(err, MuninnError::Backend { .. }));
}

#[tokio::test(start_paused = true)]
async fn slow_follow_up_times_out_alone() {
    let backend = Arc::new(
        ScriptedSearch::default()
            .respond("query", doc("d0", "`slow_ref` and `quick_ref`", 0.1))
            .respond("slow_ref", doc("s1", "too late", 0.2))
            .delay("slow_ref", Duration::from_secs(30))
            .respond("quick_ref", doc("q1", "in time", 0.2)),
    );
    let config = ExpansionConfig::new()
        .max_hops(1)
        .follow_up_timeout(Duration::from_secs(2));
    let exp = expander(backend, config);

    let out = exp.retrieve("query", 4).await.unwrap();

    assert_eq!(out.result.ids(), ["d0", "q1"]);
}

#[tokio::test(start_paused = true)]
async fn slow_initial_search_times_out() {
    let backend = Arc::new(
        ScriptedSearch::default()
            .respond("query", doc("d0", "late", 0.1))
            .delay("query", Duration::from_secs(30)),
    );
    let timeout = Duration::from_secs(1);
    let exp = expander(backend, ExpansionConfig::new().search_timeout(timeout));

    let err = exp.retrieve("query", 4).await.unwrap_err();

    match err {
        MuninnError::Timeout { stage, .. } => assert_eq!(stage, "initial_search"),
        other => panic!("expected a timeout, got {other:?}"),
    }
}

// ============================================================================
// Term selection
// ============================================================================

#[tokio::test]
async fn relevance_gate_skips_weak_documents() {
    let backend = Arc::new(
        ScriptedSearch::default()
            .respond(
                "query",
                vec![
                    Candidate::new("strong", "see `strong_ref`", 0.1),
                    Candidate::new("weak", "see `weak_ref`", 0.9),
                ],
            )
            .respond("strong_ref", doc("s1", "ok", 0.2))
            .respond("weak_ref", doc("w1", "ok", 0.2)),
    );
    let config = ExpansionConfig::new().min_relevance_for_hop(0.5);
    let exp = expander(backend.clone(), config);

    let out = exp.retrieve("query", 4).await.unwrap();

    assert_eq!(out.terms_followed, vec!["strong_ref"]);
    assert!(!backend.queries().contains(&"weak_ref".to_string()));
}

#[tokio::test]
async fn known_terms_are_followed_in_canonical_spelling() {
    let backend = Arc::new(
        ScriptedSearch::default()
            .respond(
                "query",
                doc("d0", "documents land in the Vector Store after ingest", 0.1),
            )
            .respond("vector store", doc("v1", "persistence layer", 0.2)),
    );
    let config = ExpansionConfig::new().known_terms(["vector store"]);
    let exp = expander(backend, config);

    let out = exp.retrieve("query", 4).await.unwrap();

    assert_eq!(out.terms_followed, vec!["vector store"]);
    assert_eq!(out.result.ids(), ["d0", "v1"]);
}

#[tokio::test]
async fn custom_extractor_replaces_default_rules() {
    let search = ScriptedSearch::default().respond("query", doc("d0", "see `load_config`", 0.1));
    let backend = Arc::new(search);
    let exp = expander(backend.clone(), ExpansionConfig::new())
        .with_extractor(ReferenceExtractor::with_rules(Vec::new()));

    let out = exp.retrieve("query", 4).await.unwrap();

    assert_eq!(out.hops_performed, 0);
    assert_eq!(backend.queries(), vec!["query"]);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn zero_hops_is_rejected() {
    let backend = Arc::new(ScriptedSearch::default());
    let result = ReferenceExpander::new(backend, ExpansionConfig::new().max_hops(0));
    assert!(matches!(result, Err(MuninnError::Configuration(_))));
}

#[test]
fn worst_case_cost_is_configuration_only() {
    let config = ExpansionConfig::new().max_hops(2).max_terms_per_hop(5);
    assert_eq!(config.max_follow_up_searches(), 10);
}
