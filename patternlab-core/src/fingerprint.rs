//! Series fingerprinting.
//!
//! A [`SeriesHash`] identifies the exact bars a verdict was computed from.
//! Hashing covers the symbol plus each bar's date, OHLC bit patterns and
//! volume in little-endian order, so two series hash equal only if every
//! field matches.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Horizon, Series};

/// BLAKE3 digest of a series, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesHash(pub String);

impl SeriesHash {
    /// Short form for logs and tables.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for SeriesHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash every field of every bar.
pub fn series_hash(series: &Series) -> SeriesHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(series.symbol().as_bytes());
    for bar in series.bars() {
        hasher.update(bar.date.to_string().as_bytes());
        for v in [bar.open, bar.high, bar.low, bar.close] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
        hasher.update(&bar.volume.to_le_bytes());
    }
    SeriesHash(hasher.finalize().to_hex().to_string())
}

/// Deterministic seed for data keyed by `(symbol, horizon)`.
///
/// Independent of call order, so parallel generators agree with sequential ones.
pub fn symbol_seed(symbol: &str, horizon: Horizon) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(horizon.as_str().as_bytes());
    let hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    fn series(symbol: &str, close: f64) -> Series {
        let bar = Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 10.0,
            high: 12.0,
            low: 9.0,
            close,
            volume: 500,
        };
        Series::new(symbol, vec![bar]).unwrap()
    }

    #[test]
    fn identical_series_hash_equal() {
        assert_eq!(series_hash(&series("A", 11.0)), series_hash(&series("A", 11.0)));
    }

    #[test]
    fn any_field_change_changes_hash() {
        let base = series_hash(&series("A", 11.0));
        assert_ne!(base, series_hash(&series("A", 11.5)));
        assert_ne!(base, series_hash(&series("B", 11.0)));
    }

    #[test]
    fn seeds_depend_on_symbol_and_horizon() {
        let a = symbol_seed("AAA", Horizon::OneYear);
        assert_eq!(a, symbol_seed("AAA", Horizon::OneYear));
        assert_ne!(a, symbol_seed("BBB", Horizon::OneYear));
        assert_ne!(a, symbol_seed("AAA", Horizon::Max));
    }

    #[test]
    fn short_form_is_a_prefix() {
        let h = series_hash(&series("A", 11.0));
        assert_eq!(h.short().len(), 12);
        assert!(h.0.starts_with(h.short()));
        assert_eq!(SeriesHash("abc".into()).short(), "abc");
    }
}
