//! Forward-window statistics over match sets
//!
//! For every match the evaluator fetches the candles that follow it and
//! accumulates the close-minus-open delta, either over a fixed horizon or,
//! in line-trend mode, for as long as the candles keep the direction of the
//! first one. The prevailing direction wins the aggregate.

use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use services_common::{ChartSegment, ScanStats};
use tracing::warn;

use crate::fetcher::CandleFetcher;

/// Horizon for line-trend mode: candles fetched after each match.
const LINE_TREND_HORIZON_DAYS: i64 = 30;

/// Computes aggregated forward statistics for scan matches.
#[derive(Clone)]
pub struct StatsEvaluator {
    fetcher: Arc<dyn CandleFetcher>,
}

impl StatsEvaluator {
    /// Create an evaluator over the given fetcher.
    #[must_use]
    pub fn new(fetcher: Arc<dyn CandleFetcher>) -> Self {
        Self { fetcher }
    }

    /// Aggregate the forward price behavior of `matches`.
    ///
    /// `days_to_watch > 0` sums the deltas of that many forward candles;
    /// `days_to_watch == 0` selects line-trend mode. Matches whose forward
    /// fetch fails or comes back empty are skipped and do not count toward
    /// `total_matches`.
    pub async fn compute_stats(
        &self,
        matches: &[ChartSegment],
        days_to_watch: i32,
    ) -> Result<ScanStats> {
        if matches.is_empty() {
            return Ok(ScanStats::zero());
        }
        if days_to_watch == 0 {
            return self.compute_line_stats(matches).await;
        }

        let mut acc = DirectionAccumulator::default();

        for m in matches {
            let from = m.to + Duration::days(1);
            let to = m.to + Duration::days(i64::from(days_to_watch));

            let mut candles = match self.fetcher.fetch(&m.ticker, from, to).await {
                Ok(candles) => candles,
                Err(e) => {
                    warn!(ticker = %m.ticker, error = %e, "failed to fetch forward candles");
                    continue;
                }
            };

            // One extension attempt tolerates weekends and holidays; a
            // failed retry leaves nothing, so the match is skipped below.
            if (candles.len() as i64) < i64::from(days_to_watch) {
                let extended = m.to + Duration::days(i64::from(days_to_watch) + 1);
                match self.fetcher.fetch(&m.ticker, from, extended).await {
                    Ok(retried) => candles = retried,
                    Err(e) => {
                        warn!(ticker = %m.ticker, error = %e, "failed to fetch forward candles");
                        candles = Vec::new();
                    }
                }
            }

            if candles.is_empty() {
                continue;
            }

            let limit = (days_to_watch.max(0) as usize).min(candles.len());
            let delta: f64 = candles[..limit].iter().map(|c| c.close - c.open).sum();
            acc.record(delta, candles[0].open);
        }

        Ok(acc.into_stats())
    }

    /// Line-trend mode: follow forward candles while their body keeps the
    /// sign of the first one, summing the deltas walked.
    async fn compute_line_stats(&self, matches: &[ChartSegment]) -> Result<ScanStats> {
        let mut acc = DirectionAccumulator::default();

        for m in matches {
            let from = m.to + Duration::days(1);
            let to = m.to + Duration::days(LINE_TREND_HORIZON_DAYS);

            let candles = match self.fetcher.fetch(&m.ticker, from, to).await {
                Ok(candles) => candles,
                Err(e) => {
                    warn!(ticker = %m.ticker, error = %e, "failed to fetch forward candles");
                    continue;
                }
            };
            if candles.is_empty() {
                continue;
            }

            let first_sign = candles[0].close - candles[0].open >= 0.0;
            let mut delta = 0.0;
            for c in &candles {
                let dif = c.close - c.open;
                if (dif >= 0.0) != first_sign {
                    break;
                }
                delta += dif;
            }

            acc.record(delta, candles[0].open);
        }

        Ok(acc.into_stats())
    }
}

/// Running positive/negative split of forward deltas.
#[derive(Debug, Default)]
struct DirectionAccumulator {
    considered: usize,
    pos_ctr: usize,
    pos_sum_change: f64,
    neg_sum_change: f64,
}

impl DirectionAccumulator {
    fn record(&mut self, delta: f64, base_open: f64) {
        self.considered += 1;
        if delta >= 0.0 {
            self.pos_ctr += 1;
            self.pos_sum_change += delta / base_open;
        } else {
            self.neg_sum_change -= -delta / base_open;
        }
    }

    /// Majority direction wins; ties take the negative branch, whose sum is
    /// non-positive by construction.
    fn into_stats(self) -> ScanStats {
        if self.considered == 0 {
            return ScanStats::zero();
        }

        let neg_ctr = self.considered - self.pos_ctr;
        let (price_change, winners) = if self.pos_ctr > neg_ctr {
            (self.pos_sum_change / self.pos_ctr as f64, self.pos_ctr)
        } else {
            (self.neg_sum_change / neg_ctr as f64, neg_ctr)
        };

        ScanStats {
            total_matches: self.considered,
            price_change,
            probability: winners as f64 / self.considered as f64,
        }
    }
}
