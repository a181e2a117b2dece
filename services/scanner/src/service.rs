//! Scanner service orchestration
//!
//! Every operation follows the same skeleton: hash the query, consult the
//! cache, otherwise run the scanner in a task raced against the request's
//! cancellation signal, then populate the cache in the background. The two
//! stats operations additionally feed the match list to the evaluator.

use std::sync::Arc;
use std::time::Duration;

use services_common::{ChartSegment, ScanStats};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::cache::{CacheError, ScanCache};
use crate::candle::CandleScanner;
use crate::chart::ChartScanner;
use crate::config::ScannerConfig;
use crate::query::{CandleScanQuery, ChartScanQuery};
use crate::stats::StatsEvaluator;

/// Cooperative cancellation signal for one request.
///
/// The orchestrator races the scan task against [`CancelToken::cancelled`].
/// Cancelling abandons the in-flight scan; its partial result is discarded
/// and never cached.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Whether the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token is cancelled. Returns immediately when it
    /// already is.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // Cannot fail: this token keeps the sender alive.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Failures surfaced by the scanner service operations.
#[derive(Debug, Error)]
pub enum ScanServiceError {
    /// The caller cancelled the request before the scan finished
    #[error("{op}: request cancelled")]
    Cancelled {
        /// Operation that was cancelled
        op: &'static str,
    },
    /// The scanner failed or its task died
    #[error("{op}: {source}")]
    Scan {
        /// Operation that failed
        op: &'static str,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },
    /// The stats evaluator failed
    #[error("{op}: {source}")]
    Stats {
        /// Operation that failed
        op: &'static str,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },
}

/// The four scanner operations behind one facade.
pub struct ScannerService {
    candle_scanner: CandleScanner,
    chart_scanner: ChartScanner,
    stats: Option<StatsEvaluator>,
    cache: Arc<dyn ScanCache>,
    ttl: Duration,
}

impl ScannerService {
    /// Assemble the service from its collaborators. Passing `None` for the
    /// evaluator makes the stats operations report zero statistics.
    #[must_use]
    pub fn new(
        candle_scanner: CandleScanner,
        chart_scanner: ChartScanner,
        stats: Option<StatsEvaluator>,
        cache: Arc<dyn ScanCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            candle_scanner,
            chart_scanner,
            stats,
            cache,
            ttl,
        }
    }

    /// Assemble the service taking the cache TTL from the configuration.
    #[must_use]
    pub fn from_config(
        config: &ScannerConfig,
        candle_scanner: CandleScanner,
        chart_scanner: ChartScanner,
        stats: Option<StatsEvaluator>,
        cache: Arc<dyn ScanCache>,
    ) -> Self {
        Self::new(
            candle_scanner,
            chart_scanner,
            stats,
            cache,
            config.cache_ttl(),
        )
    }

    /// Find windows matching the reference candle-by-candle.
    pub async fn find_candle_matches(
        &self,
        query: &CandleScanQuery,
        cancel: &CancelToken,
    ) -> Result<Vec<ChartSegment>, ScanServiceError> {
        const OP: &str = "ScannerService.FindCandleMatches";

        info!(op = OP, "find candle matches request");

        let hash = query.hash();
        if let Some(cached) = self.lookup_cached(&hash).await {
            return Ok(cached);
        }

        let scanner = self.candle_scanner.clone();
        let q = query.clone();
        self.run_scan(
            OP,
            cancel,
            hash,
            tokio::spawn(async move { scanner.scan(&q).await }),
        )
        .await
    }

    /// Find windows whose close-price curve warps onto the reference.
    pub async fn find_chart_matches(
        &self,
        query: &ChartScanQuery,
        cancel: &CancelToken,
    ) -> Result<Vec<ChartSegment>, ScanServiceError> {
        const OP: &str = "ScannerService.FindChartMatches";

        info!(op = OP, "find chart matches request");

        let hash = query.hash();
        if let Some(cached) = self.lookup_cached(&hash).await {
            return Ok(cached);
        }

        let scanner = self.chart_scanner.clone();
        let q = query.clone();
        self.run_scan(
            OP,
            cancel,
            hash,
            tokio::spawn(async move { scanner.scan(&q).await }),
        )
        .await
    }

    /// Candle-scan the query, then aggregate forward statistics over the
    /// matches.
    pub async fn compute_candle_stats(
        &self,
        query: &CandleScanQuery,
        days_to_watch: i32,
        cancel: &CancelToken,
    ) -> Result<ScanStats, ScanServiceError> {
        const OP: &str = "ScannerService.ComputeCandleStats";

        info!(op = OP, "compute candle stats request");

        let hash = query.hash();
        let matches = match self.lookup_cached(&hash).await {
            Some(cached) => cached,
            None => {
                let scanner = self.candle_scanner.clone();
                let q = query.clone();
                self.run_scan(
                    OP,
                    cancel,
                    hash,
                    tokio::spawn(async move { scanner.scan(&q).await }),
                )
                .await?
            }
        };

        self.evaluate(OP, &matches, days_to_watch).await
    }

    /// Chart-scan the query, then aggregate forward statistics over the
    /// matches.
    pub async fn compute_chart_stats(
        &self,
        query: &ChartScanQuery,
        days_to_watch: i32,
        cancel: &CancelToken,
    ) -> Result<ScanStats, ScanServiceError> {
        const OP: &str = "ScannerService.ComputeChartStats";

        info!(op = OP, "compute chart stats request");

        let hash = query.hash();
        let matches = match self.lookup_cached(&hash).await {
            Some(cached) => cached,
            None => {
                let scanner = self.chart_scanner.clone();
                let q = query.clone();
                self.run_scan(
                    OP,
                    cancel,
                    hash,
                    tokio::spawn(async move { scanner.scan(&q).await }),
                )
                .await?
            }
        };

        self.evaluate(OP, &matches, days_to_watch).await
    }

    /// Best-effort cache lookup: a miss logs at info, anything else at
    /// warning; both fall through to a fresh scan.
    async fn lookup_cached(&self, hash: &str) -> Option<Vec<ChartSegment>> {
        match self.cache.get_scan(hash).await {
            Ok(cached) => {
                info!("found cached matches");
                Some(cached)
            }
            Err(CacheError::NotFound) => {
                info!("no cached matches found");
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to get cached matches");
                None
            }
        }
    }

    /// Race the spawned scan against cancellation; on success kick off the
    /// background cache write.
    async fn run_scan(
        &self,
        op: &'static str,
        cancel: &CancelToken,
        hash: String,
        mut task: tokio::task::JoinHandle<anyhow::Result<Vec<ChartSegment>>>,
    ) -> Result<Vec<ChartSegment>, ScanServiceError> {
        tokio::select! {
            () = cancel.cancelled() => {
                error!(op, "request cancelled before scan completed");
                Err(ScanServiceError::Cancelled { op })
            }
            joined = &mut task => {
                let matches = match joined {
                    Ok(Ok(matches)) => matches,
                    Ok(Err(e)) => {
                        error!(op, error = %e, "scan failed");
                        return Err(ScanServiceError::Scan { op, source: e });
                    }
                    Err(e) => {
                        error!(op, error = %e, "scan task failed");
                        return Err(ScanServiceError::Scan {
                            op,
                            source: anyhow::Error::new(e),
                        });
                    }
                };

                self.store_cached(hash, &matches);
                Ok(matches)
            }
        }
    }

    /// Fire-and-forget cache write; failures are warned, never surfaced.
    fn store_cached(&self, hash: String, matches: &[ChartSegment]) {
        let cache = Arc::clone(&self.cache);
        let matches = matches.to_vec();
        let ttl = self.ttl;

        tokio::spawn(async move {
            if let Err(e) = cache.set_scan(&hash, &matches, ttl).await {
                warn!(error = %e, "failed to cache matches");
            }
        });
    }

    /// Run the evaluator over the matches; an absent evaluator reports zero
    /// statistics.
    async fn evaluate(
        &self,
        op: &'static str,
        matches: &[ChartSegment],
        days_to_watch: i32,
    ) -> Result<ScanStats, ScanServiceError> {
        let Some(evaluator) = &self.stats else {
            return Ok(ScanStats::zero());
        };

        match evaluator.compute_stats(matches, days_to_watch).await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                error!(op, error = %e, "failed to compute stats");
                Err(ScanServiceError::Stats { op, source: e })
            }
        }
    }
}
