//! Tests for [`ResultCache`], the LRU + TTL store of generation results.

use std::time::Duration;

use runesmith::cache::{CacheConfig, Fingerprint, ResultCache};
use runesmith::{GenerationMetadata, GenerationMethod, GenerationRequest, GenerationResult};

fn fp(content: &str) -> Fingerprint {
    Fingerprint::of(&GenerationRequest::new(content, "flowchart").unwrap()).unwrap()
}

fn make_result(content: &str) -> GenerationResult {
    let mut result = GenerationResult::new(content, "svg").with_backend_metadata("template", "x");
    result.metadata = GenerationMetadata {
        generation_method: Some(GenerationMethod::SvgTemplate),
        quality_score: 0.85,
        attempts: 1,
        ..GenerationMetadata::default()
    };
    result
}

fn small_cache(max_entries: usize) -> ResultCache {
    ResultCache::new(&CacheConfig::new().max_entries(max_entries))
}

// =========================================================================
// Round trip
// =========================================================================

#[test]
fn miss_then_hit() {
    let cache = small_cache(10);
    assert!(cache.get(&fp("a")).is_none());

    let result = make_result("<svg/>");
    cache.set(fp("a"), result.clone());
    assert_eq!(cache.get(&fp("a")), Some(result));

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.current_size, 1);
}

#[test]
fn set_replaces_whole_entry() {
    let cache = small_cache(10);
    cache.set(fp("a"), make_result("first"));
    cache.set(fp("a"), make_result("second"));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&fp("a")).unwrap().content, "second");
}

#[test]
fn invalidate_single_and_all() {
    let cache = small_cache(10);
    cache.set(fp("a"), make_result("a"));
    cache.set(fp("b"), make_result("b"));

    assert!(cache.invalidate(&fp("a")));
    assert!(!cache.invalidate(&fp("a")));
    assert!(cache.get(&fp("a")).is_none());
    assert!(cache.get(&fp("b")).is_some());

    assert_eq!(cache.invalidate_all(), 1);
    assert!(cache.is_empty());
}

// =========================================================================
// LRU eviction
// =========================================================================

#[test]
fn inserting_past_capacity_evicts_least_recently_used() {
    let cache = small_cache(3);
    cache.set(fp("a"), make_result("a"));
    cache.set(fp("b"), make_result("b"));
    cache.set(fp("c"), make_result("c"));
    cache.set(fp("d"), make_result("d"));

    assert!(!cache.contains(&fp("a")));
    assert!(cache.contains(&fp("b")));
    assert!(cache.contains(&fp("c")));
    assert!(cache.contains(&fp("d")));
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn get_promotes_entry() {
    let cache = small_cache(3);
    cache.set(fp("a"), make_result("a"));
    cache.set(fp("b"), make_result("b"));
    cache.set(fp("c"), make_result("c"));

    // "a" becomes most recently used; "b" is now the eviction candidate.
    assert!(cache.get(&fp("a")).is_some());
    cache.set(fp("d"), make_result("d"));

    assert!(cache.contains(&fp("a")));
    assert!(!cache.contains(&fp("b")));
}

#[test]
fn contains_does_not_promote() {
    let cache = small_cache(2);
    cache.set(fp("a"), make_result("a"));
    cache.set(fp("b"), make_result("b"));
    assert!(cache.contains(&fp("a")));
    cache.set(fp("c"), make_result("c"));
    assert!(!cache.contains(&fp("a")));
}

#[test]
fn entries_listed_most_recent_first() {
    let cache = small_cache(3);
    cache.set(fp("a"), make_result("a"));
    cache.set(fp("b"), make_result("b"));
    cache.get(&fp("a"));
    let order: Vec<Fingerprint> = cache.entries().into_iter().map(|e| e.fingerprint).collect();
    assert_eq!(order, vec![fp("a"), fp("b")]);
}

// =========================================================================
// TTL expiry (paused clock)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn expired_entry_is_a_miss_without_sweep() {
    let cache = ResultCache::new(&CacheConfig::new().ttl(Duration::from_secs(60)));
    cache.set(fp("a"), make_result("a"));

    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(cache.get(&fp("a")).is_some());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(cache.get(&fp("a")).is_none());

    // Removed eagerly on the failed lookup.
    assert_eq!(cache.len(), 0);
    let stats = cache.stats();
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test(start_paused = true)]
async fn sweep_removes_only_expired_entries() {
    let cache = ResultCache::new(&CacheConfig::new().ttl(Duration::from_secs(60)));
    cache.set(fp("old-1"), make_result("1"));
    cache.set(fp("old-2"), make_result("2"));

    tokio::time::advance(Duration::from_secs(30)).await;
    cache.set(fp("fresh"), make_result("3"));

    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(cache.sweep_expired(), 2);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&fp("fresh")));
    assert_eq!(cache.stats().expirations, 2);
}

#[tokio::test(start_paused = true)]
async fn hit_does_not_extend_ttl() {
    let cache = ResultCache::new(&CacheConfig::new().ttl(Duration::from_secs(10)));
    cache.set(fp("a"), make_result("a"));
    tokio::time::advance(Duration::from_secs(8)).await;
    assert!(cache.get(&fp("a")).is_some());
    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(cache.get(&fp("a")).is_none());
}

#[tokio::test(start_paused = true)]
async fn entry_info_reports_age_and_remaining_ttl() {
    let cache = ResultCache::new(&CacheConfig::new().ttl(Duration::from_secs(100)));
    cache.set(fp("a"), make_result("a"));
    tokio::time::advance(Duration::from_secs(40)).await;

    let info = &cache.entries()[0];
    assert_eq!(info.age, Duration::from_secs(40));
    assert_eq!(info.expires_in, Duration::from_secs(60));
}
