//! Elastic chart pattern scanner
//!
//! Compares whole close-price curves with Dynamic Time Warping at a
//! canonical resampled length, so candidate windows of different raw lengths
//! compete on shape alone. An LB_Keogh lower bound prunes candidates before
//! the quadratic DTW runs, and overlapping matches are suppressed keeping
//! the best distance.

use std::sync::Arc;
use std::thread;

use anyhow::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use services_common::{Candle, ChartSegment};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::fetcher::CandleFetcher;
use crate::numerics::{dtw, lb_keogh_distance, lb_keogh_envelope, resample, z_normalize};
use crate::query::ChartScanQuery;

/// Comparison parameters for the chart scanner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChartScanOptions {
    /// Minimum candidate window length as a multiple of the reference length
    pub min_scale: f64,
    /// Maximum candidate window length as a multiple of the reference length
    pub max_scale: f64,
    /// Normalized DTW distance ceiling in `(0, 1]`
    pub tolerance: f64,
}

impl Default for ChartScanOptions {
    fn default() -> Self {
        Self {
            min_scale: 0.75,
            max_scale: 1.5,
            tolerance: 0.1,
        }
    }
}

impl ChartScanOptions {
    /// Replace out-of-range fields with their defaults. Scales must be
    /// positive; the tolerance must sit in `(0, 1]`.
    #[must_use]
    pub fn with_defaults(&self) -> Self {
        let defaults = Self::default();
        Self {
            min_scale: if self.min_scale > 0.0 {
                self.min_scale
            } else {
                defaults.min_scale
            },
            max_scale: if self.max_scale > 0.0 {
                self.max_scale
            } else {
                defaults.max_scale
            },
            tolerance: if self.tolerance > 0.0 && self.tolerance <= 1.0 {
                self.tolerance
            } else {
                defaults.tolerance
            },
        }
    }
}

/// A candidate match with its quality metric.
#[derive(Debug, Clone)]
struct Match {
    segment: ChartSegment,
    /// Normalized DTW distance: 0 is identical, 1 the allowed maximum
    distance: f64,
}

/// Multi-length DTW scanner over a candle fetcher.
#[derive(Clone)]
pub struct ChartScanner {
    fetcher: Arc<dyn CandleFetcher>,
}

impl ChartScanner {
    /// Create a scanner over the given fetcher.
    #[must_use]
    pub fn new(fetcher: Arc<dyn CandleFetcher>) -> Self {
        Self { fetcher }
    }

    /// Scan the query's tickers for windows whose close-price curve warps
    /// onto the reference within the tolerance.
    ///
    /// An empty reference or ticker list yields an empty match list without
    /// an error; fetch failures skip the ticker. The result is free of
    /// mutually overlapping segments, best distance first.
    pub async fn scan(&self, query: &ChartScanQuery) -> Result<Vec<ChartSegment>> {
        if query.segment.candles.is_empty() || query.tickers.is_empty() {
            return Ok(Vec::new());
        }

        let opts = query.options.with_defaults();
        let seed_len = query.segment.candles.len();
        let min_len = ((seed_len as f64 * opts.min_scale) as usize).max(1);
        let max_len = (seed_len as f64 * opts.max_scale) as usize;

        // Canonical comparison length: every candidate is resampled to twice
        // the reference length, decoupling shape from raw window length.
        let resampled_len = seed_len * 2;
        let seed_vec: Arc<[f64]> = prices_vec(&query.segment.candles, resampled_len).into();
        let envelope = Arc::new(lb_keogh_envelope(&seed_vec, resampled_len));
        let max_cost = opts.tolerance * resampled_len as f64;

        let cpus = thread::available_parallelism().map_or(1, usize::from);
        let worker_count = cpus.min(query.tickers.len());
        let permits = Arc::new(Semaphore::new(worker_count));
        let all_matches = Arc::new(Mutex::new(Vec::new()));

        let mut workers = Vec::with_capacity(query.tickers.len());
        for ticker in query.tickers.clone() {
            let permits = Arc::clone(&permits);
            let fetcher = Arc::clone(&self.fetcher);
            let seed_vec = Arc::clone(&seed_vec);
            let envelope = Arc::clone(&envelope);
            let all_matches = Arc::clone(&all_matches);
            let (search_from, search_to) = (query.search_from, query.search_to);

            workers.push(tokio::spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };

                let candles = match fetcher.fetch(&ticker, search_from, search_to).await {
                    Ok(candles) => candles,
                    Err(e) => {
                        warn!(ticker = %ticker, error = %e, "fetch failed, skipping ticker");
                        return;
                    }
                };
                if candles.len() < min_len {
                    return;
                }

                let matches = find_matches_for_seed(
                    &seed_vec,
                    &envelope,
                    &ticker,
                    candles,
                    min_len,
                    max_len,
                    max_cost,
                    resampled_len,
                    cpus,
                )
                .await;

                all_matches.lock().extend(matches);
            }));
        }
        for worker in workers {
            let _ = worker.await;
        }

        let collected = std::mem::take(&mut *all_matches.lock());
        let kept = remove_overlaps(collected);

        Ok(kept.into_iter().map(|m| m.segment).collect())
    }
}

/// Search one ticker's series across every allowed window length.
///
/// Candidate vectors for a window length are built up front, then the
/// offsets are split into contiguous chunks across `worker_count` tasks;
/// each task gates with LB_Keogh before paying for DTW.
#[allow(clippy::too_many_arguments)]
async fn find_matches_for_seed(
    seed_vec: &Arc<[f64]>,
    envelope: &Arc<(Vec<f64>, Vec<f64>)>,
    ticker: &str,
    candles: Vec<Candle>,
    min_len: usize,
    max_len: usize,
    max_cost: f64,
    resampled_len: usize,
    worker_count: usize,
) -> Vec<Match> {
    let n = candles.len();
    let candles: Arc<[Candle]> = candles.into();
    let mut matches = Vec::new();

    for window_len in min_len..=max_len.min(n) {
        let offsets = n - window_len + 1;
        let vecs: Arc<Vec<Vec<f64>>> = Arc::new(
            (0..offsets)
                .map(|s| prices_vec(&candles[s..s + window_len], resampled_len))
                .collect(),
        );

        let chunk = offsets.div_ceil(worker_count);
        let mut tasks = Vec::new();
        for chunk_start in (0..offsets).step_by(chunk) {
            let chunk_end = (chunk_start + chunk).min(offsets);
            let seed_vec = Arc::clone(seed_vec);
            let envelope = Arc::clone(envelope);
            let vecs = Arc::clone(&vecs);
            let candles = Arc::clone(&candles);
            let ticker = ticker.to_string();

            tasks.push(tokio::spawn(async move {
                let (lower, upper) = &*envelope;
                let mut found = Vec::new();

                for win_start in chunk_start..chunk_end {
                    let candidate = &vecs[win_start];

                    let lb = lb_keogh_distance(&seed_vec, lower, upper, candidate);
                    if lb > max_cost {
                        continue;
                    }

                    let Some(d) = dtw(&seed_vec, candidate, max_cost) else {
                        continue;
                    };
                    if d > max_cost {
                        continue;
                    }

                    let window = &candles[win_start..win_start + window_len];
                    found.push(Match {
                        segment: ChartSegment::from_candles(ticker.clone(), window.to_vec()),
                        distance: d / resampled_len as f64,
                    });
                }

                found
            }));
        }

        for task in tasks {
            if let Ok(found) = task.await {
                matches.extend(found);
            }
        }
    }

    matches
}

/// Drop overlapping segments, keeping the better DTW distance: sort
/// ascending, then greedily keep anything not overlapping a kept match.
fn remove_overlaps(mut matches: Vec<Match>) -> Vec<Match> {
    if matches.is_empty() {
        return matches;
    }

    matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let mut kept: Vec<Match> = Vec::new();
    for m in matches {
        if kept.iter().any(|k| k.segment.overlaps(&m.segment)) {
            continue;
        }
        kept.push(m);
    }
    kept
}

/// Close prices, z-normalized, resampled to the canonical length.
fn prices_vec(candles: &[Candle], resampled_len: usize) -> Vec<f64> {
    let prices: Vec<f64> = candles.iter().map(|c| c.close).collect();
    resample(&z_normalize(&prices), resampled_len)
}
