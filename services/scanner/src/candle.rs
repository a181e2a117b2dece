//! Candle-by-candle pattern scanner
//!
//! Slides a window the length of the reference across each ticker's series
//! and keeps the windows whose normalized candles match the reference shape
//! within the configured tolerances. Each window is normalized with its own
//! local extremes, so only shape is compared, never absolute price.

use std::sync::Arc;
use std::thread;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use services_common::{normalize_candles, Candle, ChartSegment};
use tokio::sync::{mpsc, Semaphore};
use tracing::warn;

use crate::fetcher::CandleFetcher;
use crate::query::CandleScanQuery;

/// Capacity of the channel carrying matches from workers to the drainer.
const MATCH_CHANNEL_CAPACITY: usize = 1024;

/// Comparison parameters for the candle scanner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CandleScanOptions {
    /// Count of leading candles tested only by aggregate direction sign
    pub tail_len: i32,
    /// Absolute tolerance on normalized open/close
    pub body_tolerance: f64,
    /// Absolute tolerance on normalized wick lengths
    pub shadow_tolerance: f64,
}

impl Default for CandleScanOptions {
    fn default() -> Self {
        Self {
            tail_len: 0,
            body_tolerance: 0.1,
            shadow_tolerance: 0.1,
        }
    }
}

impl CandleScanOptions {
    /// Replace non-positive fields with their defaults.
    #[must_use]
    pub fn with_defaults(&self) -> Self {
        let defaults = Self::default();
        Self {
            tail_len: if self.tail_len > 0 {
                self.tail_len
            } else {
                defaults.tail_len
            },
            body_tolerance: if self.body_tolerance > 0.0 {
                self.body_tolerance
            } else {
                defaults.body_tolerance
            },
            shadow_tolerance: if self.shadow_tolerance > 0.0 {
                self.shadow_tolerance
            } else {
                defaults.shadow_tolerance
            },
        }
    }
}

/// Fixed-length sliding-window scanner over a candle fetcher.
#[derive(Clone)]
pub struct CandleScanner {
    fetcher: Arc<dyn CandleFetcher>,
}

impl CandleScanner {
    /// Create a scanner over the given fetcher.
    #[must_use]
    pub fn new(fetcher: Arc<dyn CandleFetcher>) -> Self {
        Self { fetcher }
    }

    /// Scan the query's tickers for windows matching the reference segment.
    ///
    /// An empty reference or ticker list yields an empty match list without
    /// an error. Per-ticker fetch failures are logged and the ticker is
    /// skipped. Matches overlapping the reference segment are discarded.
    pub async fn scan(&self, query: &CandleScanQuery) -> Result<Vec<ChartSegment>> {
        if query.segment.candles.is_empty() || query.tickers.is_empty() {
            return Ok(Vec::new());
        }

        let opts = query.options.with_defaults();
        let seg_len = query.segment.candles.len();
        let tail_len = (opts.tail_len.max(0) as usize).min(seg_len);

        let norm_segment: Arc<[Candle]> = normalize_candles(&query.segment.candles).into();
        let target_tail_sign = tail_sign(&norm_segment[..tail_len]);

        let worker_count = thread::available_parallelism().map_or(2, usize::from).max(2);
        let permits = Arc::new(Semaphore::new(worker_count));
        let (match_tx, mut match_rx) = mpsc::channel(MATCH_CHANNEL_CAPACITY);

        let reference = Arc::new(query.segment.clone());

        let mut workers = Vec::with_capacity(query.tickers.len());
        for ticker in query.tickers.clone() {
            let permits = Arc::clone(&permits);
            let fetcher = Arc::clone(&self.fetcher);
            let norm_segment = Arc::clone(&norm_segment);
            let reference = Arc::clone(&reference);
            let match_tx = match_tx.clone();
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

                for window in candles.windows(seg_len) {
                    let norm_window = normalize_candles(window);
                    if tail_len > 0 && tail_sign(&norm_window[..tail_len]) != target_tail_sign {
                        continue;
                    }
                    if !similar_core(
                        &norm_window[tail_len..],
                        &norm_segment[tail_len..],
                        opts.body_tolerance,
                        opts.shadow_tolerance,
                    ) {
                        continue;
                    }

                    let candidate = ChartSegment::from_candles(ticker.clone(), window.to_vec());
                    if candidate.overlaps(&reference) {
                        continue;
                    }
                    if match_tx.send(candidate).await.is_err() {
                        return;
                    }
                }
            }));
        }
        drop(match_tx);

        // The drainer runs while workers are still producing; the channel
        // closes once every worker has dropped its sender.
        let mut matches = Vec::new();
        while let Some(m) = match_rx.recv().await {
            matches.push(m);
        }
        for worker in workers {
            let _ = worker.await;
        }

        Ok(matches)
    }
}

/// Aggregate direction sign over a candle run: the sign bit of
/// `first.open - last.close`, so a negative zero counts as negative. An
/// empty run reports the negative branch.
fn tail_sign(candles: &[Candle]) -> bool {
    match (candles.first(), candles.last()) {
        (Some(first), Some(last)) => (first.open - last.close).is_sign_negative(),
        _ => true,
    }
}

/// Element-wise comparison of the core (post-tail) candles: equal direction,
/// body endpoints within `body_tolerance`, wick lengths within
/// `shadow_tolerance`. Empty slices never match.
fn similar_core(
    window: &[Candle],
    target: &[Candle],
    body_tolerance: f64,
    shadow_tolerance: f64,
) -> bool {
    if window.is_empty() || target.is_empty() {
        return false;
    }

    for (w, t) in window.iter().zip(target) {
        let window_sign = (w.open - w.close).is_sign_negative();
        let target_sign = (t.open - t.close).is_sign_negative();
        if window_sign != target_sign {
            return false;
        }

        if (w.open - t.open).abs() > body_tolerance {
            return false;
        }
        if (w.close - t.close).abs() > body_tolerance {
            return false;
        }

        if (w.upper_shadow() - t.upper_shadow()).abs() > shadow_tolerance {
            return false;
        }
        if (w.lower_shadow() - t.lower_shadow()).abs() > shadow_tolerance {
            return false;
        }
    }

    true
}
