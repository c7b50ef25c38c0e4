//! Trading recommendation, lookback horizon, and stock group labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete recommendation produced by a strategy or the aggregator.
///
/// Variant order defines the tie-break priority: `Buy > Sell > Watch > Neutral`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Signal {
    #[default]
    Neutral,
    Watch,
    Sell,
    Buy,
}

impl Signal {
    pub const ALL: [Signal; 4] = [Signal::Buy, Signal::Sell, Signal::Watch, Signal::Neutral];

    pub fn is_neutral(self) -> bool {
        self == Signal::Neutral
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Buy => "Buy",
            Signal::Sell => "Sell",
            Signal::Watch => "Watch",
            Signal::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Lookback horizon requested from a data source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "1y")]
    OneYear,
    #[default]
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "max")]
    Max,
}

impl Horizon {
    /// Approximate calendar days covered, `None` for unbounded.
    pub fn days(self) -> Option<i64> {
        match self {
            Horizon::OneYear => Some(365),
            Horizon::TwoYears => Some(730),
            Horizon::FiveYears => Some(1826),
            Horizon::Max => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Horizon::OneYear => "1y",
            Horizon::TwoYears => "2y",
            Horizon::FiveYears => "5y",
            Horizon::Max => "max",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Horizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1y" => Ok(Horizon::OneYear),
            "2y" => Ok(Horizon::TwoYears),
            "5y" => Ok(Horizon::FiveYears),
            "max" => Ok(Horizon::Max),
            other => Err(format!("unknown horizon '{other}' (expected 1y, 2y, 5y or max)")),
        }
    }
}

/// Stock group labels that strategies declare applicability against.
pub mod group {
    pub const V40: &str = "V40";
    pub const V40_NEXT: &str = "V40_Next";
    pub const V200: &str = "V200";
    pub const PERSONAL_PORTFOLIO: &str = "Personal_Portfolio";

    pub const ALL: [&str; 4] = [V40, V40_NEXT, V200, PERSONAL_PORTFOLIO];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order() {
        assert!(Signal::Buy > Signal::Sell);
        assert!(Signal::Sell > Signal::Watch);
        assert!(Signal::Watch > Signal::Neutral);
    }

    #[test]
    fn display_matches_name() {
        assert_eq!(Signal::Buy.to_string(), "Buy");
        assert_eq!(Signal::Neutral.to_string(), "Neutral");
    }

    #[test]
    fn horizon_parses_and_serializes() {
        assert_eq!("5Y".parse::<Horizon>().unwrap(), Horizon::FiveYears);
        assert!("3m".parse::<Horizon>().is_err());
        assert_eq!(serde_json::to_string(&Horizon::Max).unwrap(), r#""max""#);
    }
}
