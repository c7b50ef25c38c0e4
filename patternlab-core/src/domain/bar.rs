//! One trading day of OHLCV data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar.
///
/// The symbol lives on the owning [`Series`](super::Series); a bar on its own
/// is just a dated price record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Price envelope check: `high >= max(open, close) >= min(open, close) >= low >= 0`
    /// with strictly positive open and close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.low >= 0.0
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Close above open.
    pub fn is_green(&self) -> bool {
        self.close > self.open
    }
}
