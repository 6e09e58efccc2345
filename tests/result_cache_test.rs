//! Tests for the fingerprinted result cache.

use std::sync::Arc;
use std::time::Duration;

use muninn::cache::{cache_key, index_fingerprint};
use muninn::{CacheConfig, EvictionPolicy, ResultCache, SourceRecord};

fn source(id: &str) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        metadata: Default::default(),
        distance: 0.2,
    }
}

fn cache(max_entries: usize) -> ResultCache {
    ResultCache::new(CacheConfig::new().max_entries(max_entries))
}

// ============================================================================
// Keys and fingerprints
// ============================================================================

#[test]
fn keys_are_deterministic() {
    let fp = index_fingerprint("documents", &["a", "b"], 10);
    assert_eq!(cache_key("q", 5, &fp), cache_key("q", 5, &fp));
    assert_ne!(cache_key("q", 5, &fp), cache_key("q", 6, &fp));
    assert_ne!(cache_key("q", 5, &fp), cache_key("q2", 5, &fp));
}

#[test]
fn fingerprint_ignores_id_order() {
    assert_eq!(
        index_fingerprint("documents", &["b", "a", "c"], 3),
        index_fingerprint("documents", &["a", "b", "c"], 3),
    );
}

#[test]
fn fingerprint_tracks_collection() {
    assert_ne!(
        index_fingerprint("documents", &["a"], 1),
        index_fingerprint("handbook", &["a"], 1),
    );
}

// ============================================================================
// Staleness
// ============================================================================

#[test]
fn same_index_view_hits() {
    let cache = cache(10);
    cache.put("q", 5, &["a", "b"], 100, "answer", vec![source("a")]);

    let hit = cache.get("q", 5, &["b", "a"], 100).unwrap();

    assert_eq!(hit.entry.answer, "answer");
    assert_eq!(hit.entry.sources, vec![source("a")]);
    let fingerprint = cache.fingerprint(&["a", "b"], 100);
    assert_eq!(hit.entry.index_fingerprint, fingerprint);
}

#[test]
fn different_source_ids_miss() {
    let cache = cache(10);
    cache.put("q", 5, &["a", "b"], 100, "answer", vec![]);

    assert!(cache.get("q", 5, &["a", "c"], 100).is_none());
}

#[test]
fn chunk_count_change_misses() {
    let cache = cache(10);
    cache.put("q", 5, &["a", "b"], 100, "answer", vec![]);

    assert!(cache.get("q", 5, &["a", "b"], 101).is_none());
    assert!(cache.get("q", 5, &["a", "b"], 100).is_some());
}

#[test]
fn result_count_is_part_of_the_key() {
    let cache = cache(10);
    cache.put("q", 5, &["a"], 1, "five", vec![]);
    cache.put("q", 3, &["a"], 1, "three", vec![]);

    assert_eq!(cache.get("q", 5, &["a"], 1).unwrap().entry.answer, "five");
    assert_eq!(cache.get("q", 3, &["a"], 1).unwrap().entry.answer, "three");
}

// ============================================================================
// TTL
// ============================================================================

#[tokio::test(start_paused = true)]
async fn expired_entries_are_removed_on_read() {
    let cache = ResultCache::new(CacheConfig::new().ttl(Duration::from_secs(60)));
    cache.put("q", 5, &["a"], 1, "answer", vec![]);

    tokio::time::advance(Duration::from_secs(30)).await;
    let hit = cache.get("q", 5, &["a"], 1).unwrap();
    assert!((hit.age_secs() - 30.0).abs() < 0.5);

    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(cache.len(), 1);
    assert!(cache.get("q", 5, &["a"], 1).is_none());
    assert_eq!(cache.len(), 0);

    let stats = cache.stats();
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test(start_paused = true)]
async fn hits_do_not_extend_ttl() {
    let cache = ResultCache::new(
        CacheConfig::new()
            .ttl(Duration::from_secs(60))
            .eviction(EvictionPolicy::LeastRecentlyUsed),
    );
    cache.put("q", 5, &["a"], 1, "answer", vec![]);

    for _ in 0..5 {
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.get("q", 5, &["a"], 1).is_some());
    }
    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(cache.get("q", 5, &["a"], 1).is_none());
}

// ============================================================================
// Eviction
// ============================================================================

#[tokio::test(start_paused = true)]
async fn full_cache_evicts_oldest_insert() {
    let cache = cache(2);
    cache.put("first", 5, &["a"], 1, "1", vec![]);
    tokio::time::advance(Duration::from_secs(1)).await;
    cache.put("second", 5, &["a"], 1, "2", vec![]);
    tokio::time::advance(Duration::from_secs(1)).await;

    // Reads do not save an entry under insertion-age eviction.
    assert!(cache.get("first", 5, &["a"], 1).is_some());
    cache.put("third", 5, &["a"], 1, "3", vec![]);

    assert_eq!(cache.len(), 2);
    assert!(cache.get("first", 5, &["a"], 1).is_none());
    assert!(cache.get("second", 5, &["a"], 1).is_some());
    assert!(cache.get("third", 5, &["a"], 1).is_some());
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn same_instant_inserts_evict_in_insertion_order() {
    let cache = cache(2);
    cache.put("first", 5, &["a"], 1, "1", vec![]);
    cache.put("second", 5, &["a"], 1, "2", vec![]);
    cache.put("third", 5, &["a"], 1, "3", vec![]);

    assert!(cache.get("first", 5, &["a"], 1).is_none());
    assert!(cache.get("second", 5, &["a"], 1).is_some());
}

#[tokio::test(start_paused = true)]
async fn lru_keeps_recently_read_entries() {
    let cache = ResultCache::new(
        CacheConfig::new()
            .max_entries(2)
            .eviction(EvictionPolicy::LeastRecentlyUsed),
    );
    cache.put("first", 5, &["a"], 1, "1", vec![]);
    tokio::time::advance(Duration::from_secs(1)).await;
    cache.put("second", 5, &["a"], 1, "2", vec![]);
    tokio::time::advance(Duration::from_secs(1)).await;

    assert!(cache.get("first", 5, &["a"], 1).is_some());
    cache.put("third", 5, &["a"], 1, "3", vec![]);

    assert!(cache.get("first", 5, &["a"], 1).is_some());
    assert!(cache.get("second", 5, &["a"], 1).is_none());
}

#[test]
fn overwriting_a_key_does_not_evict() {
    let cache = cache(2);
    cache.put("first", 5, &["a"], 1, "1", vec![]);
    cache.put("second", 5, &["a"], 1, "2", vec![]);
    cache.put("second", 5, &["a"], 1, "2b", vec![]);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.stats().evictions, 0);
    let hit = cache.get("second", 5, &["a"], 1).unwrap();
    assert_eq!(hit.entry.answer, "2b");
}

#[test]
fn zero_capacity_stores_nothing() {
    let cache = cache(0);
    cache.put("q", 5, &["a"], 1, "answer", vec![]);
    assert!(cache.is_empty());
}

#[test]
fn size_never_exceeds_capacity() {
    let cache = cache(3);
    for i in 0..20 {
        cache.put(&format!("q{i}"), 5, &["a"], 1, "answer", vec![]);
        assert!(cache.len() <= 3);
    }
    assert_eq!(cache.stats().evictions, 17);
}

// ============================================================================
// Invalidation and stats
// ============================================================================

#[test]
fn invalidate_clears_everything() {
    let cache = cache(10);
    cache.put("a", 5, &["x"], 1, "1", vec![]);
    cache.put("b", 5, &["x"], 1, "2", vec![]);

    cache.invalidate();

    assert!(cache.is_empty());
    assert!(cache.get("a", 5, &["x"], 1).is_none());
}

#[test]
fn stats_track_hits_and_misses() {
    let cache = cache(10);
    assert_eq!(cache.stats().hit_rate(), 0.0);

    cache.put("q", 5, &["a"], 1, "answer", vec![]);
    cache.get("q", 5, &["a"], 1);
    cache.get("q", 5, &["a"], 1);
    cache.get("other", 5, &["a"], 1);

    let stats = cache.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.size, 1);
    assert_eq!(stats.capacity, 10);
    assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_access_is_safe() {
    let cache = Arc::new(cache(50));
    let mut handles = Vec::new();
    for task in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            for i in 0..100 {
                let query = format!("q{}", (task * 100 + i) % 80);
                if cache.get(&query, 5, &["a"], 1).is_none() {
                    cache.put(&query, 5, &["a"], 1, query.clone(), vec![]);
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(cache.len() <= 50);
    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 800);
}
