//! Memory cache contract tests

use std::time::Duration;

use pattern_scanner::{CacheError, MemoryScanCache, ScanCache};
use services_common::ChartSegment;

use crate::test_utils::{candle, day};

fn sample_matches() -> Vec<ChartSegment> {
    vec![ChartSegment::from_candles(
        "AAPL",
        vec![
            candle(day(0), 100.0, 115.0, 95.0, 110.0),
            candle(day(1), 110.0, 125.0, 105.0, 120.0),
        ],
    )]
}

#[tokio::test]
async fn stored_matches_come_back_intact() {
    let cache = MemoryScanCache::new();
    let matches = sample_matches();

    cache
        .set_scan("abc", &matches, Duration::from_secs(60))
        .await
        .unwrap();

    let cached = cache.get_scan("abc").await.unwrap();
    assert_eq!(cached, matches);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn missing_hash_is_not_found() {
    let cache = MemoryScanCache::new();

    let err = cache.get_scan("missing").await.unwrap_err();
    assert!(matches!(err, CacheError::NotFound));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn expired_entries_are_evicted_on_lookup() {
    let cache = MemoryScanCache::new();
    cache
        .set_scan("abc", &sample_matches(), Duration::from_millis(20))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = cache.get_scan("abc").await.unwrap_err();
    assert!(matches!(err, CacheError::NotFound));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn lookups_hand_out_defensive_copies() {
    let cache = MemoryScanCache::new();
    let matches = sample_matches();
    cache
        .set_scan("abc", &matches, Duration::from_secs(60))
        .await
        .unwrap();

    let mut first = cache.get_scan("abc").await.unwrap();
    first[0].ticker = "MUTATED".to_string();

    let second = cache.get_scan("abc").await.unwrap();
    assert_eq!(second, matches);
}

#[tokio::test]
async fn overwriting_a_hash_replaces_the_entry() {
    let cache = MemoryScanCache::new();
    cache
        .set_scan("abc", &sample_matches(), Duration::from_secs(60))
        .await
        .unwrap();
    cache
        .set_scan("abc", &[], Duration::from_secs(60))
        .await
        .unwrap();

    let cached = cache.get_scan("abc").await.unwrap();
    assert!(cached.is_empty());
    assert_eq!(cache.len(), 1);
}
