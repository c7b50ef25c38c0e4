//! Directory of CSV price files.
//!
//! Layout: `{dir}/{SYMBOL}.csv` with a `date,open,high,low,close,volume`
//! header (capitalized headers such as Yahoo exports are accepted), plus an
//! optional `{dir}/{SYMBOL}.fundamentals.json` holding a flat map of ratios.
//!
//! The directory doubles as a store: one file per symbol, trimmed to the
//! requested horizon on load.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde::Deserialize;

use patternlab_core::data::{DataError, DataSource, SeriesStore};
use patternlab_core::domain::{Bar, FundamentalSnapshot, Horizon, Series};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
}

impl From<CsvRow> for Bar {
    fn from(row: CsvRow) -> Self {
        Bar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.max(0.0).round() as u64,
        }
    }
}

/// CSV-backed source and store.
#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn series_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    fn fundamentals_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.fundamentals.json"))
    }

    /// Symbols with a price file in the directory, sorted.
    pub fn symbols(&self) -> Result<Vec<String>, DataError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| io_error("*", e))?;
        let mut symbols: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_suffix(".csv").map(str::to_string)
            })
            .collect();
        symbols.sort();
        Ok(symbols)
    }

    fn read_bars(&self, symbol: &str) -> Result<Option<Vec<Bar>>, DataError> {
        let path = self.series_path(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| parse_error(symbol, e))?;
        let bars = reader
            .deserialize::<CsvRow>()
            .map(|row| row.map(Bar::from).map_err(|e| parse_error(symbol, e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(bars))
    }
}

fn io_error(symbol: &str, e: impl std::fmt::Display) -> DataError {
    DataError::Io {
        symbol: symbol.to_string(),
        message: e.to_string(),
    }
}

fn parse_error(symbol: &str, e: impl std::fmt::Display) -> DataError {
    DataError::Parse {
        symbol: symbol.to_string(),
        message: e.to_string(),
    }
}

/// Keep the bars covered by `horizon`, counted back from the last bar.
pub fn trim_to_horizon(bars: Vec<Bar>, horizon: Horizon) -> Vec<Bar> {
    let (Some(days), Some(last)) = (horizon.days(), bars.last().map(|b| b.date)) else {
        return bars;
    };
    let cutoff = last - Duration::days(days);
    bars.into_iter().filter(|b| b.date >= cutoff).collect()
}

impl DataSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_series(&self, symbol: &str, horizon: Horizon) -> Result<Series, DataError> {
        let Some(bars) = self.read_bars(symbol)? else {
            return Ok(Series::empty(symbol));
        };
        Series::new(symbol, trim_to_horizon(bars, horizon)).map_err(|source| {
            DataError::MalformedSeries {
                symbol: symbol.to_string(),
                source,
            }
        })
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError> {
        let path = self.fundamentals_path(symbol);
        if !path.exists() {
            return Ok(FundamentalSnapshot::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| io_error(symbol, e))?;
        serde_json::from_str(&content).map_err(|e| parse_error(symbol, e))
    }
}

impl SeriesStore for CsvSource {
    fn save_series(&self, symbol: &str, _horizon: Horizon, series: &Series) -> Result<(), DataError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(symbol, e))?;
        let mut wtr = csv::Writer::from_path(self.series_path(symbol)).map_err(|e| io_error(symbol, e))?;
        wtr.write_record(["date", "open", "high", "low", "close", "volume"])
            .map_err(|e| io_error(symbol, e))?;
        for b in series.bars() {
            wtr.write_record([
                &b.date.to_string(),
                &b.open.to_string(),
                &b.high.to_string(),
                &b.low.to_string(),
                &b.close.to_string(),
                &b.volume.to_string(),
            ])
            .map_err(|e| io_error(symbol, e))?;
        }
        wtr.flush().map_err(|e| io_error(symbol, e))
    }

    fn load_series(&self, symbol: &str, horizon: Horizon) -> Result<Series, DataError> {
        self.fetch_series(symbol, horizon)
    }

    fn save_fundamentals(
        &self,
        symbol: &str,
        snapshot: &FundamentalSnapshot,
    ) -> Result<(), DataError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(symbol, e))?;
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| parse_error(symbol, e))?;
        fs::write(self.fundamentals_path(symbol), json).map_err(|e| io_error(symbol, e))
    }

    fn load_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError> {
        self.fetch_fundamentals(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100,
        }
    }

    #[test]
    fn horizon_trim_counts_back_from_last_bar() {
        let bars = vec![bar(1, 10.0), bar(2, 11.0), bar(3, 12.0)];
        assert_eq!(trim_to_horizon(bars.clone(), Horizon::Max).len(), 3);
        let mut long = bars;
        long.insert(
            0,
            Bar {
                date: NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
                ..bar(1, 9.0)
            },
        );
        assert_eq!(trim_to_horizon(long, Horizon::OneYear).len(), 3);
    }

    #[test]
    fn capitalized_headers_parse() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("CAP.csv"),
            "Date,Open,High,Low,Close,Volume\n2024-01-02,10,11,9,10.5,1200.0\n",
        )
        .unwrap();
        let series = CsvSource::new(dir.path())
            .fetch_series("CAP", Horizon::Max)
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars()[0].volume, 1200);
    }
}
