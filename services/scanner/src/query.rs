//! Scan queries and their content-addressed hashes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use services_common::ChartSegment;
use sha2::{Digest, Sha256};

use crate::candle::CandleScanOptions;
use crate::chart::ChartScanOptions;

/// A scan request in canonical form: the reference segment, the scan
/// options, the inclusive search window and the tickers to search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanQuery<O> {
    /// Reference segment the scan compares against
    pub segment: ChartSegment,
    /// Scanner-specific comparison options
    pub options: O,
    /// Inclusive lower bound of the search window
    pub search_from: DateTime<Utc>,
    /// Inclusive upper bound of the search window
    pub search_to: DateTime<Utc>,
    /// Instruments to search
    pub tickers: Vec<String>,
}

/// Query for the candle-by-candle scanner.
pub type CandleScanQuery = ScanQuery<CandleScanOptions>;

/// Query for the elastic DTW chart scanner.
pub type ChartScanQuery = ScanQuery<ChartScanOptions>;

impl<O: Serialize> ScanQuery<O> {
    /// Content hash of the query: SHA-256 over the canonical JSON encoding
    /// of the reference candles, the options, the search bounds as Unix
    /// seconds and the ticker list, in that order. Struct fields serialize
    /// in declaration order, so semantically identical queries hash equal
    /// across runs and platforms.
    #[must_use]
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        update_json(&mut hasher, &self.segment.candles);
        update_json(&mut hasher, &self.options);
        update_json(&mut hasher, &self.search_from.timestamp());
        update_json(&mut hasher, &self.search_to.timestamp());
        update_json(&mut hasher, &self.tickers);
        hex::encode(hasher.finalize())
    }
}

fn update_json<T: Serialize>(hasher: &mut Sha256, value: &T) {
    if let Ok(bytes) = serde_json::to_vec(value) {
        hasher.update(&bytes);
    }
}
