//! In-memory `SeriesStore`.

use std::collections::HashMap;
use std::sync::RwLock;

use patternlab_core::data::{DataError, SeriesStore};
use patternlab_core::domain::{FundamentalSnapshot, Horizon, Series};

/// Process-local store keyed by `(symbol, horizon)`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    series: RwLock<HashMap<(String, Horizon), Series>>,
    fundamentals: RwLock<HashMap<String, FundamentalSnapshot>>,
}

fn poisoned(e: impl std::fmt::Display) -> DataError {
    DataError::Store(format!("lock poisoned: {e}"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored series across all horizons.
    pub fn series_count(&self) -> usize {
        self.series.read().map(|m| m.len()).unwrap_or(0)
    }
}

impl SeriesStore for MemoryStore {
    fn save_series(&self, symbol: &str, horizon: Horizon, series: &Series) -> Result<(), DataError> {
        self.series
            .write()
            .map_err(poisoned)?
            .insert((symbol.to_string(), horizon), series.clone());
        Ok(())
    }

    fn load_series(&self, symbol: &str, horizon: Horizon) -> Result<Series, DataError> {
        Ok(self
            .series
            .read()
            .map_err(poisoned)?
            .get(&(symbol.to_string(), horizon))
            .cloned()
            .unwrap_or_else(|| Series::empty(symbol)))
    }

    fn save_fundamentals(
        &self,
        symbol: &str,
        snapshot: &FundamentalSnapshot,
    ) -> Result<(), DataError> {
        self.fundamentals
            .write()
            .map_err(poisoned)?
            .insert(symbol.to_string(), snapshot.clone());
        Ok(())
    }

    fn load_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError> {
        Ok(self
            .fundamentals
            .read()
            .map_err(poisoned)?
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use patternlab_core::domain::fundamentals::RETURN_ON_EQUITY;
    use patternlab_core::domain::Bar;

    fn one_bar(symbol: &str) -> Series {
        let bar = Bar {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            open: 50.0,
            high: 52.0,
            low: 49.0,
            close: 51.0,
            volume: 10,
        };
        Series::new(symbol, vec![bar]).unwrap()
    }

    #[test]
    fn series_are_keyed_by_horizon() {
        let store = MemoryStore::new();
        store.save_series("A", Horizon::OneYear, &one_bar("A")).unwrap();
        assert_eq!(store.load_series("A", Horizon::OneYear).unwrap().len(), 1);
        assert!(store.load_series("A", Horizon::Max).unwrap().is_empty());
        assert_eq!(store.series_count(), 1);
    }

    #[test]
    fn missing_fundamentals_are_empty() {
        let store = MemoryStore::new();
        assert!(store.load_fundamentals("A").unwrap().is_empty());
        let snap = FundamentalSnapshot::new().with(RETURN_ON_EQUITY, 0.21);
        store.save_fundamentals("A", &snap).unwrap();
        assert_eq!(store.load_fundamentals("A").unwrap(), snap);
    }
}
