//! Stats evaluator behavior tests

use std::sync::Arc;

use anyhow::Result;
use pattern_scanner::StatsEvaluator;
use services_common::ChartSegment;

use crate::test_utils::{candle, day, MockFetcher};

/// A one-candle match whose segment ends on `end_day`.
fn match_ending_at(ticker: &str, end_day: i64) -> ChartSegment {
    ChartSegment::from_candles(
        ticker,
        vec![candle(day(end_day), 100.0, 101.0, 99.0, 100.5)],
    )
}

#[tokio::test]
async fn empty_match_list_yields_zero_stats() -> Result<()> {
    let evaluator = StatsEvaluator::new(Arc::new(MockFetcher::new()));

    let stats = evaluator.compute_stats(&[], 3).await?;

    assert_eq!(stats.total_matches, 0);
    assert_eq!(stats.price_change, 0.0);
    assert_eq!(stats.probability, 0.0);
    Ok(())
}

#[tokio::test]
async fn single_match_with_rising_forward_days() -> Result<()> {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.add_data(
        "AAPL",
        vec![
            candle(day(6), 100.0, 104.0, 99.0, 103.0),
            candle(day(7), 103.0, 107.0, 102.0, 106.0),
            candle(day(8), 106.0, 110.0, 105.0, 109.0),
        ],
    );
    let evaluator = StatsEvaluator::new(fetcher);

    let stats = evaluator
        .compute_stats(&[match_ending_at("AAPL", 5)], 3)
        .await?;

    assert_eq!(stats.total_matches, 1);
    assert_eq!(stats.probability, 1.0);
    assert!(stats.price_change > 0.0);
    Ok(())
}

#[tokio::test]
async fn single_match_with_falling_forward_days() -> Result<()> {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.add_data(
        "AAPL",
        vec![
            candle(day(6), 100.0, 101.0, 97.0, 98.0),
            candle(day(7), 98.0, 99.0, 95.0, 96.0),
        ],
    );
    let evaluator = StatsEvaluator::new(fetcher);

    let stats = evaluator
        .compute_stats(&[match_ending_at("AAPL", 5)], 2)
        .await?;

    assert_eq!(stats.total_matches, 1);
    assert_eq!(stats.probability, 1.0);
    assert!(stats.price_change < 0.0);
    Ok(())
}

#[tokio::test]
async fn tied_directions_take_the_negative_branch() -> Result<()> {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.add_data(
        "AAPL",
        vec![
            candle(day(6), 100.0, 103.0, 99.0, 102.0),
            candle(day(7), 102.0, 105.0, 101.0, 104.0),
        ],
    );
    fetcher.add_data(
        "GAZP",
        vec![
            candle(day(6), 100.0, 101.0, 97.0, 98.0),
            candle(day(7), 98.0, 99.0, 95.0, 96.0),
        ],
    );
    let evaluator = StatsEvaluator::new(fetcher);

    let matches = vec![match_ending_at("AAPL", 5), match_ending_at("GAZP", 5)];
    let stats = evaluator.compute_stats(&matches, 2).await?;

    assert_eq!(stats.total_matches, 2);
    assert_eq!(stats.probability, 0.5);
    assert!(stats.price_change < 0.0);
    Ok(())
}

#[tokio::test]
async fn failed_forward_fetch_skips_the_match() -> Result<()> {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.fail_with("GAZP", "backend unavailable");
    fetcher.add_data(
        "AAPL",
        vec![
            candle(day(6), 100.0, 104.0, 99.0, 103.0),
            candle(day(7), 103.0, 107.0, 102.0, 106.0),
        ],
    );
    let evaluator = StatsEvaluator::new(fetcher);

    let matches = vec![match_ending_at("GAZP", 5), match_ending_at("AAPL", 5)];
    let stats = evaluator.compute_stats(&matches, 2).await?;

    assert_eq!(stats.total_matches, 1);
    assert_eq!(stats.probability, 1.0);
    assert!(stats.price_change > 0.0);
    Ok(())
}

#[tokio::test]
async fn no_forward_data_yields_zero_stats() -> Result<()> {
    let fetcher = Arc::new(MockFetcher::new());
    let evaluator = StatsEvaluator::new(fetcher);

    let stats = evaluator
        .compute_stats(&[match_ending_at("AAPL", 5)], 3)
        .await?;

    assert_eq!(stats.total_matches, 0);
    assert_eq!(stats.probability, 0.0);
    Ok(())
}

#[tokio::test]
async fn short_forward_window_is_retried_once_with_an_extra_day() -> Result<()> {
    let fetcher = Arc::new(MockFetcher::new());
    // Two candles inside the plain window, the third one day beyond it; only
    // the extension attempt sees all three.
    fetcher.add_data(
        "AAPL",
        vec![
            candle(day(6), 100.0, 104.0, 99.0, 103.0),
            candle(day(7), 103.0, 107.0, 102.0, 106.0),
            candle(day(9), 106.0, 110.0, 105.0, 109.0),
        ],
    );
    let evaluator = StatsEvaluator::new(fetcher.clone());

    let stats = evaluator
        .compute_stats(&[match_ending_at("AAPL", 5)], 3)
        .await?;

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(stats.total_matches, 1);
    assert_eq!(stats.probability, 1.0);
    assert!(stats.price_change > 0.0);
    Ok(())
}

#[tokio::test]
async fn line_trend_follows_candles_until_the_sign_flips() -> Result<()> {
    let fetcher = Arc::new(MockFetcher::new());
    // Two rising candles, then a falling one that ends the walk.
    fetcher.add_data(
        "AAPL",
        vec![
            candle(day(6), 100.0, 103.0, 99.0, 102.0),
            candle(day(7), 102.0, 105.0, 101.0, 104.0),
            candle(day(8), 104.0, 105.0, 101.0, 103.0),
        ],
    );
    let evaluator = StatsEvaluator::new(fetcher);

    let stats = evaluator
        .compute_stats(&[match_ending_at("AAPL", 5)], 0)
        .await?;

    assert_eq!(stats.total_matches, 1);
    assert_eq!(stats.probability, 1.0);
    // 2 + 2 points of rise against an open of 100.
    assert!((stats.price_change - 0.04).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn line_trend_with_falling_start_reports_negative_change() -> Result<()> {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.add_data(
        "AAPL",
        vec![
            candle(day(6), 100.0, 101.0, 97.0, 98.0),
            candle(day(7), 98.0, 99.0, 96.0, 97.0),
            candle(day(8), 97.0, 100.0, 96.0, 99.0),
        ],
    );
    let evaluator = StatsEvaluator::new(fetcher);

    let stats = evaluator
        .compute_stats(&[match_ending_at("AAPL", 5)], 0)
        .await?;

    assert_eq!(stats.total_matches, 1);
    assert_eq!(stats.probability, 1.0);
    // 2 + 1 points of fall against an open of 100.
    assert!((stats.price_change + 0.03).abs() < 1e-9);
    Ok(())
}
