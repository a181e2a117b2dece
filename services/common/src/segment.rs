//! Chart segments: contiguous candle slices of one instrument

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candle::Candle;

/// A contiguous slice of one instrument's time series.
///
/// Candles are sorted ascending by date; `from` and `to` equal the first and
/// last candle timestamps whenever the series is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSegment {
    /// Instrument identifier (letters-only, uppercase)
    pub ticker: String,
    /// Timestamp of the first candle
    pub from: DateTime<Utc>,
    /// Timestamp of the last candle
    pub to: DateTime<Utc>,
    /// The candles themselves, ascending by date
    pub candles: Vec<Candle>,
}

impl ChartSegment {
    /// Build a segment whose bounds come from the first and last candle.
    /// Candles must already be sorted ascending by date.
    #[must_use]
    pub fn from_candles(ticker: impl Into<String>, candles: Vec<Candle>) -> Self {
        let from = candles.first().map(|c| c.date).unwrap_or_default();
        let to = candles.last().map(|c| c.date).unwrap_or_default();

        Self {
            ticker: ticker.into(),
            from,
            to,
            candles,
        }
    }

    /// Whether two segments of the same instrument share a non-boundary
    /// instant. Touching endpoints (`a.to == b.from`) do not count.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.ticker != other.ticker {
            return false;
        }

        !(self.to < other.from
            || self.to == other.from
            || other.to < self.from
            || other.to == self.from)
    }
}
