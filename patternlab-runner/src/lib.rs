//! PatternLab Runner: scan orchestration and data adapters.
//!
//! This crate builds on `patternlab-core` to provide:
//! - TOML scan configuration
//! - A bounded worker pool with per-call deadlines
//! - CSV and synthetic data sources
//! - An in-memory series store

pub mod config;
pub mod csv_source;
pub mod scan;
pub mod store;
pub mod synthetic;

pub use config::{ConfigError, ScanConfig, UniverseEntry};
pub use csv_source::CsvSource;
pub use scan::{run_scan, OutcomeStatus, ScanError, ScanReport, Scanner, StockVerdict, StrategyOutcome};
pub use store::MemoryStore;
pub use synthetic::SyntheticSource;
