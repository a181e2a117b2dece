//! OHLC candle type and min/max normalization

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC bar of a price series.
///
/// Invariant: `low <= min(open, close) <= max(open, close) <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar timestamp
    pub date: DateTime<Utc>,
    /// Opening price
    pub open: f64,
    /// Highest traded price
    pub high: f64,
    /// Lowest traded price
    pub low: f64,
    /// Closing price
    pub close: f64,
}

impl Candle {
    /// Create a new candle.
    #[must_use]
    pub const fn new(date: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
        }
    }

    /// Upper wick length: `high - max(open, close)`.
    #[must_use]
    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Lower wick length: `min(open, close) - low`.
    #[must_use]
    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Rescale all four prices into the `[min, max]` frame, mapping `min` to
    /// 0 and `max` to 1. A degenerate frame (`max == min`) divides by 1
    /// instead, so the output stays finite.
    #[must_use]
    pub fn normalize(mut self, min: f64, max: f64) -> Self {
        let mut range = max - min;
        if range == 0.0 {
            range = 1.0;
        }

        self.open = (self.open - min) / range;
        self.high = (self.high - min) / range;
        self.low = (self.low - min) / range;
        self.close = (self.close - min) / range;

        self
    }
}

/// Normalize a candle series into `[0, 1]` using the series-wide low and
/// high. Timestamps are preserved; an empty series stays empty.
#[must_use]
pub fn normalize_candles(candles: &[Candle]) -> Vec<Candle> {
    if candles.is_empty() {
        return Vec::new();
    }

    let max_high = candles
        .iter()
        .map(|c| c.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let min_low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

    candles
        .iter()
        .map(|c| c.normalize(min_low, max_high))
        .collect()
}
