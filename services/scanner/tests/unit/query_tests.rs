//! Query hash determinism and sensitivity tests

use chrono::Duration;
use pattern_scanner::{CandleScanOptions, CandleScanQuery, ChartScanOptions, ScanQuery};
use services_common::ChartSegment;

use crate::test_utils::{candle, day};

fn base_query() -> CandleScanQuery {
    ScanQuery {
        segment: ChartSegment::from_candles(
            "AAPL",
            vec![
                candle(day(0), 100.0, 115.0, 95.0, 110.0),
                candle(day(1), 110.0, 125.0, 105.0, 120.0),
            ],
        ),
        options: CandleScanOptions {
            tail_len: 1,
            body_tolerance: 0.05,
            shadow_tolerance: 0.05,
        },
        search_from: day(2),
        search_to: day(30),
        tickers: vec!["AAPL".to_string(), "MSFT".to_string()],
    }
}

#[test]
fn hash_is_lowercase_hex_sha256() {
    let hash = base_query().hash();

    assert_eq!(hash.len(), 64);
    assert!(hash
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
}

#[test]
fn identical_queries_hash_equal() {
    assert_eq!(base_query().hash(), base_query().hash());
}

#[test]
fn candle_change_changes_the_hash() {
    let mut other = base_query();
    other.segment.candles[0].close += 0.0001;

    assert_ne!(base_query().hash(), other.hash());
}

#[test]
fn option_change_changes_the_hash() {
    let mut other = base_query();
    other.options.body_tolerance = 0.06;

    assert_ne!(base_query().hash(), other.hash());
}

#[test]
fn search_window_change_changes_the_hash() {
    let mut other = base_query();
    other.search_from = other.search_from + Duration::days(1);
    assert_ne!(base_query().hash(), other.hash());

    let mut other = base_query();
    other.search_to = other.search_to + Duration::days(1);
    assert_ne!(base_query().hash(), other.hash());
}

#[test]
fn ticker_set_and_order_change_the_hash() {
    let mut fewer = base_query();
    fewer.tickers.pop();
    assert_ne!(base_query().hash(), fewer.hash());

    let mut reordered = base_query();
    reordered.tickers.reverse();
    assert_ne!(base_query().hash(), reordered.hash());
}

#[test]
fn option_type_contributes_to_the_hash() {
    // The same segment and window under the two scanners' default options
    // must not collide.
    let candle_query = CandleScanQuery {
        options: CandleScanOptions::default(),
        ..base_query()
    };
    let chart_query = ScanQuery {
        segment: candle_query.segment.clone(),
        options: ChartScanOptions::default(),
        search_from: candle_query.search_from,
        search_to: candle_query.search_to,
        tickers: candle_query.tickers.clone(),
    };

    assert_ne!(candle_query.hash(), chart_query.hash());
}
