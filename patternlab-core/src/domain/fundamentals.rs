//! Fundamental-ratio snapshot.
//!
//! A loose bag of named numeric ratios. A missing key means "unknown"; no
//! getter ever fails.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REVENUE_GROWTH: &str = "revenue_growth";
pub const EARNINGS_GROWTH: &str = "earnings_growth";
pub const PROFIT_MARGINS: &str = "profit_margins";
pub const PE_RATIO: &str = "pe_ratio";
pub const DEBT_TO_EQUITY: &str = "debt_to_equity";
pub const RETURN_ON_EQUITY: &str = "return_on_equity";
pub const FIFTY_TWO_WEEK_HIGH: &str = "fifty_two_week_high";
pub const FIFTY_TWO_WEEK_LOW: &str = "fifty_two_week_low";
pub const LIFETIME_HIGH: &str = "lifetime_high";

/// Named fundamental ratios for one symbol.
///
/// `BTreeMap` keeps serialization order stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundamentalSnapshot {
    values: BTreeMap<String, f64>,
}

impl FundamentalSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a ratio. Non-finite values are treated as unknown and skipped.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        if value.is_finite() {
            self.values.insert(key.into(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn revenue_growth(&self) -> Option<f64> {
        self.get(REVENUE_GROWTH)
    }

    pub fn earnings_growth(&self) -> Option<f64> {
        self.get(EARNINGS_GROWTH)
    }

    pub fn profit_margins(&self) -> Option<f64> {
        self.get(PROFIT_MARGINS)
    }

    pub fn pe_ratio(&self) -> Option<f64> {
        self.get(PE_RATIO)
    }

    pub fn debt_to_equity(&self) -> Option<f64> {
        self.get(DEBT_TO_EQUITY)
    }

    pub fn return_on_equity(&self) -> Option<f64> {
        self.get(RETURN_ON_EQUITY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for FundamentalSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let mut snap = Self::new();
        for (k, v) in iter {
            snap.insert(k, v);
        }
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_unknown() {
        let snap = FundamentalSnapshot::new();
        assert_eq!(snap.pe_ratio(), None);
        assert!(snap.is_empty());
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let snap = FundamentalSnapshot::new()
            .with(PE_RATIO, f64::NAN)
            .with(RETURN_ON_EQUITY, 0.2);
        assert_eq!(snap.pe_ratio(), None);
        assert_eq!(snap.return_on_equity(), Some(0.2));
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn serializes_as_flat_map() {
        let snap = FundamentalSnapshot::new().with(PE_RATIO, 12.5);
        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(json, r#"{"pe_ratio":12.5}"#);
        let back: FundamentalSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
