//! Shared domain types for the pattern scanner services
//!
//! Plain, transport-agnostic data: OHLC candles, chart segments and the
//! aggregated scan statistics exchanged between the scanner core and its
//! adapters.

#![forbid(unsafe_code)]

pub mod candle;
pub mod segment;
pub mod stats;

pub use candle::*;
pub use segment::*;
pub use stats::*;
