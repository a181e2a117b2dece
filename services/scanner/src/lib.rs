//! Pattern Scanner Service
//!
//! Searches tickers for sub-sequences of candles resembling a reference
//! segment and derives forward-looking statistics over the matches:
//! - candle matching: shape-for-shape comparison of normalized OHLC bars
//! - chart matching: elastic DTW comparison of close-price curves,
//!   LB_Keogh-pruned and overlap-suppressed
//! - forward statistics: prevailing-direction average move and probability
//!
//! Scan results are memoized under a content hash of the query. Data access
//! and memoization are capability traits ([`CandleFetcher`], [`ScanCache`]);
//! the RPC transport lives in a separate adapter.

#![forbid(unsafe_code)]

pub mod cache;
pub mod candle;
pub mod chart;
pub mod config;
pub mod fetcher;
pub mod numerics;
pub mod query;
pub mod service;
pub mod stats;

pub use cache::{CacheError, MemoryScanCache, ScanCache};
pub use candle::{CandleScanOptions, CandleScanner};
pub use chart::{ChartScanOptions, ChartScanner};
pub use config::{Environment, GrpcConfig, ScannerConfig};
pub use fetcher::{validate_ticker, CandleFetcher};
pub use query::{CandleScanQuery, ChartScanQuery, ScanQuery};
pub use service::{CancelToken, ScanServiceError, ScannerService};
pub use stats::StatsEvaluator;
