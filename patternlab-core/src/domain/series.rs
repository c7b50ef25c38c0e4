//! A validated, immutable run of daily bars for one instrument.
//!
//! Validation happens once at construction. Every strategy borrows the
//! series read-only and may assume dates strictly increase and every bar
//! passes [`Bar::is_sane`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Bar;

/// Rejection reasons for malformed bar sequences.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bar {index} dated {date} does not follow {previous}")]
    NonMonotonicDate {
        index: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("bar {index} dated {date} has missing or inconsistent OHLC values")]
    InsaneBar { index: usize, date: NaiveDate },
}

/// Ordered daily bars for a single symbol.
///
/// An empty series is valid and means "no data".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct Series {
    symbol: String,
    bars: Vec<Bar>,
}

#[derive(Deserialize)]
struct RawSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl TryFrom<RawSeries> for Series {
    type Error = SeriesError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        Series::new(raw.symbol, raw.bars)
    }
}

impl Series {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        for (index, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(SeriesError::InsaneBar {
                    index,
                    date: bar.date,
                });
            }
            if index > 0 && bar.date <= bars[index - 1].date {
                return Err(SeriesError::NonMonotonicDate {
                    index,
                    date: bar.date,
                    previous: bars[index - 1].date,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    /// A series with no bars.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bars: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Last bar, if any.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Close of the last bar.
    pub fn current_price(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume as f64).collect()
    }

    /// The trailing `n` bars (all of them when `n >= len`).
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    /// Index of the first bar dated on or after `date`.
    pub fn index_on_or_after(&self, date: NaiveDate) -> usize {
        self.bars.partition_point(|b| b.date < date)
    }

    /// Calendar days between `date` and the last bar.
    pub fn days_since(&self, date: NaiveDate) -> i64 {
        self.last_date()
            .map(|last| (last - date).num_days())
            .unwrap_or(0)
    }

    /// A new series holding only the trailing `n` bars.
    pub fn trailing(&self, n: usize) -> Series {
        Series {
            symbol: self.symbol.clone(),
            bars: self.tail(n).to_vec(),
        }
    }
}
