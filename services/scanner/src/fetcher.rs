//! Candle acquisition capability
//!
//! The scanner core never talks to a data source directly; it is handed an
//! implementation of [`CandleFetcher`]. Implementations must be safe for
//! concurrent use, since scanners call them from parallel workers.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use services_common::Candle;

/// Source of historical candles for a single instrument.
#[async_trait]
pub trait CandleFetcher: Send + Sync {
    /// Fetch candles for `ticker` inside the inclusive `[from, to]` window,
    /// ascending by date. An empty result means no data; an error means the
    /// source failed and the caller decides whether to skip or surface it.
    async fn fetch(&self, ticker: &str, from: DateTime<Utc>, to: DateTime<Utc>)
        -> Result<Vec<Candle>>;
}

/// Whether `ticker` is a well-formed instrument identifier: non-empty and
/// ASCII uppercase letters only. Fetcher implementations reject anything
/// else; scanners never see the violation because they skip failed tickers.
#[must_use]
pub fn validate_ticker(ticker: &str) -> bool {
    !ticker.is_empty() && ticker.chars().all(|c| c.is_ascii_uppercase())
}
