//! Scan configuration loaded from TOML.
//!
//! ```toml
//! timeout_ms = 5000
//! workers = 4
//! horizon = "2y"
//! data_dir = "data"
//! strategies = ["v20", "range_bound"]
//!
//! [[universe]]
//! symbol = "INFY"
//! group = "V40"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use patternlab_core::domain::Horizon;
use patternlab_core::strategy::strategy_by_name;

/// Upper bound on the default worker count.
pub const MAX_DEFAULT_WORKERS: usize = 8;

/// Errors from loading or validating a scan config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("could not parse scan config: {0}")]
    Parse(String),

    #[error("invalid scan config: {0}")]
    Invalid(String),
}

/// One stock to scan and the group its strategies are filtered by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub symbol: String,
    pub group: String,
}

impl UniverseEntry {
    pub fn new(symbol: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            group: group.into(),
        }
    }
}

/// Everything a scan needs besides the data source itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Hard deadline per strategy call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Worker threads in the scan pool.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub horizon: Horizon,

    #[serde(default)]
    pub universe: Vec<UniverseEntry>,

    /// Directory read by the CSV source.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Allow-list of strategy machine names; `None` runs every strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategies: Option<Vec<String>>,
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_WORKERS)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            workers: default_workers(),
            horizon: Horizon::default(),
            universe: Vec::new(),
            data_dir: default_data_dir(),
            strategies: None,
        }
    }
}

impl ScanConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be positive".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        for (i, entry) in self.universe.iter().enumerate() {
            if entry.symbol.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("universe[{i}] has an empty symbol")));
            }
            if self.universe[..i].iter().any(|e| e.symbol == entry.symbol) {
                return Err(ConfigError::Invalid(format!(
                    "symbol '{}' appears more than once in the universe",
                    entry.symbol
                )));
            }
        }
        if let Some(names) = &self.strategies {
            if names.is_empty() {
                return Err(ConfigError::Invalid("strategies allow-list is empty".into()));
            }
            if let Some(unknown) = names.iter().find(|n| strategy_by_name(n).is_none()) {
                return Err(ConfigError::Invalid(format!("unknown strategy '{unknown}'")));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether `name` passes the allow-list.
    pub fn allows(&self, name: &str) -> bool {
        self.strategies
            .as_ref()
            .map_or(true, |names| names.iter().any(|n| n == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = ScanConfig::from_toml("").unwrap();
        assert_eq!(config.timeout_ms, 5_000);
        assert_eq!(config.horizon, Horizon::TwoYears);
        assert!(config.workers >= 1 && config.workers <= MAX_DEFAULT_WORKERS);
        assert!(config.universe.is_empty());
        assert!(config.allows("v20"));
    }

    #[test]
    fn full_config_parses() {
        let config = ScanConfig::from_toml(
            r#"
            timeout_ms = 250
            workers = 2
            horizon = "5y"
            data_dir = "prices"
            strategies = ["v20", "range_bound"]

            [[universe]]
            symbol = "INFY"
            group = "V40"

            [[universe]]
            symbol = "TCS"
            group = "V200"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(250));
        assert_eq!(config.horizon, Horizon::FiveYears);
        assert_eq!(config.universe[1], UniverseEntry::new("TCS", "V200"));
        assert!(config.allows("range_bound"));
        assert!(!config.allows("cup_handle"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ScanConfig::from_toml("timeout_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ScanConfig::from_toml(r#"strategies = ["no_such"]"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ScanConfig::from_toml(r#"horizon = "3m""#),
            Err(ConfigError::Parse(_))
        ));
        let dup = r#"
            [[universe]]
            symbol = "A"
            group = "V40"
            [[universe]]
            symbol = "A"
            group = "V200"
        "#;
        assert!(matches!(ScanConfig::from_toml(dup), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            ScanConfig::from_toml("threads = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
