//! Aggregated forward statistics over a set of matches

use serde::{Deserialize, Serialize};

/// Forward-looking statistics derived from a match set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Number of matches that contributed a forward window
    pub total_matches: usize,
    /// Signed average relative price change in the prevailing direction
    pub price_change: f64,
    /// Fraction of contributing matches that moved in the prevailing
    /// direction, in `[0, 1]`
    pub probability: f64,
}

impl ScanStats {
    /// The all-zero result used for empty inputs and absent collaborators.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            total_matches: 0,
            price_change: 0.0,
            probability: 0.0,
        }
    }
}
