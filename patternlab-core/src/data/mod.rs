//! Data ports consumed by the pattern engine.
//!
//! The core never fetches or persists anything itself. Adapters (CSV files,
//! synthetic walks, in-memory stores) implement these traits outside the
//! core; tests mock them.

use thiserror::Error;

use crate::domain::{FundamentalSnapshot, Horizon, Series, SeriesError};

/// Structured error types for source and store adapters.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error for '{symbol}': {message}")]
    Io { symbol: String, message: String },

    #[error("could not parse data for '{symbol}': {message}")]
    Parse { symbol: String, message: String },

    #[error("malformed series for '{symbol}': {source}")]
    MalformedSeries {
        symbol: String,
        #[source]
        source: SeriesError,
    },

    #[error("store error: {0}")]
    Store(String),
}

/// Where series and fundamentals come from.
///
/// A missing symbol is not an error: `fetch_series` returns an empty series
/// and `fetch_fundamentals` an empty snapshot.
pub trait DataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn fetch_series(&self, symbol: &str, horizon: Horizon) -> Result<Series, DataError>;

    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError>;
}

/// Read/write persistence for series and snapshots.
///
/// Loads of unknown keys return empty values, mirroring [`DataSource`].
pub trait SeriesStore: Send + Sync {
    fn save_series(&self, symbol: &str, horizon: Horizon, series: &Series) -> Result<(), DataError>;

    fn load_series(&self, symbol: &str, horizon: Horizon) -> Result<Series, DataError>;

    fn save_fundamentals(
        &self,
        symbol: &str,
        snapshot: &FundamentalSnapshot,
    ) -> Result<(), DataError>;

    fn load_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError>;
}

/// Fetch through `source`, persisting into `store` on the way.
pub fn fetch_and_store(
    source: &dyn DataSource,
    store: &dyn SeriesStore,
    symbol: &str,
    horizon: Horizon,
) -> Result<(Series, FundamentalSnapshot), DataError> {
    let series = source.fetch_series(symbol, horizon)?;
    let snapshot = source.fetch_fundamentals(symbol)?;
    if !series.is_empty() {
        store.save_series(symbol, horizon, &series)?;
    }
    if !snapshot.is_empty() {
        store.save_fundamentals(symbol, &snapshot)?;
    }
    Ok((series, snapshot))
}
