//! Analysis output: detected patterns and the per-strategy report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::chart::ChartPoint;
use crate::domain::Signal;
use crate::geometry::Touch;

/// A detected pattern: common derived fields plus strategy-specific geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub target_price: f64,
    /// Level the strategy anchors entries to (neckline, support, buy level, ...).
    pub entry_reference: f64,
    /// Cup depth, head depth, range width or fall size, in price units.
    pub depth_or_range: f64,
    /// Normalised quality in [0, 1].
    pub quality_score: f64,
    pub pattern_start: NaiveDate,
    pub pattern_end: NaiveDate,
    pub shape: PatternShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CupType {
    UShaped,
    VShaped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    pub low: ChartPoint,
    pub end: ChartPoint,
    /// Retracement from the right rim, in price units.
    pub depth: f64,
}

/// Consolidation zone after the right shoulder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Base {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub high: f64,
    pub low: f64,
    /// `(1 - range / max_range) * volume_ratio`.
    pub quality: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeQuality {
    Strong,
    Acceptable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// price < MA20 < MA50 < MA200
    BelowStack,
    /// price > MA20 > MA50 > MA200
    AboveStack,
    Mixed,
}

/// Where a fundamentals verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundamentalsSource {
    Snapshot,
    PriceVolumeProxy,
}

/// Strategy-specific pattern geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternShape {
    CupWithHandle {
        left_rim: ChartPoint,
        right_rim: ChartPoint,
        bottom: ChartPoint,
        neckline: f64,
        cup_type: CupType,
        handle: Option<Handle>,
    },
    ReverseHeadShoulders {
        left_shoulder: ChartPoint,
        head: ChartPoint,
        right_shoulder: ChartPoint,
        neckline: f64,
        neckline_peaks: [ChartPoint; 2],
        base: Option<Base>,
        volume_confirmed: bool,
        /// Fractional gain from the current price to target.
        potential_gain: f64,
    },
    RangeBound {
        support: f64,
        resistance: f64,
        range_pct: f64,
        quality: RangeQuality,
        touches: Vec<Touch>,
        support_cluster_size: usize,
        resistance_cluster_size: usize,
    },
    SmaAlignment {
        price: f64,
        sma20: f64,
        sma50: f64,
        sma200: f64,
        alignment: Alignment,
    },
    V10 {
        high: ChartPoint,
        low: ChartPoint,
        fall_pct: f64,
        buy_level: f64,
        age_days: i64,
    },
    V20 {
        lower: f64,
        upper: f64,
        movement_pct: f64,
        green_count: usize,
        duration_days: i64,
    },
    LifetimeHigh {
        lifetime_high: ChartPoint,
        discount: f64,
        fundamentals_good: bool,
        at_highest: bool,
        fundamentals_source: FundamentalsSource,
    },
    Week52Low {
        low: ChartPoint,
        lifetime_high: f64,
        distance_from_low: f64,
        upside: f64,
    },
}

/// Full result of one strategy over one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub strategy_name: String,
    pub signal: Signal,
    pub entry_price: f64,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    /// `(target - entry) / entry * 100`, when a target exists.
    pub potential_gain_pct: Option<f64>,
    pub confidence: u8,
    pub reason: String,
    pub patterns: Vec<Pattern>,
    pub steps: Vec<String>,
    /// Numeric details for reporting (levels, ratios, flags as 0/1).
    pub metrics: BTreeMap<String, f64>,
}

impl AnalysisReport {
    pub fn new(strategy_name: &str, signal: Signal, entry_price: f64) -> Self {
        Self {
            strategy_name: strategy_name.to_string(),
            signal,
            entry_price,
            target_price: None,
            stop_loss: None,
            potential_gain_pct: None,
            confidence: 0,
            reason: String::new(),
            patterns: Vec::new(),
            steps: Vec::new(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn target(mut self, target: Option<f64>) -> Self {
        self.target_price = target;
        self.potential_gain_pct = target.and_then(|t| potential_gain_pct(self.entry_price, t));
        self
    }

    pub fn stop(mut self, stop: Option<f64>) -> Self {
        self.stop_loss = stop;
        self
    }

    pub fn confidence(mut self, confidence: u8) -> Self {
        self.confidence = confidence.min(100);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn patterns(mut self, patterns: Vec<Pattern>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn steps(mut self, steps: &[&str]) -> Self {
        self.steps = steps.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn metric(mut self, key: &str, value: f64) -> Self {
        if value.is_finite() {
            self.metrics.insert(key.to_string(), value);
        }
        self
    }

    pub fn flag(self, key: &str, value: bool) -> Self {
        self.metric(key, if value { 1.0 } else { 0.0 })
    }
}

/// Percentage gain from `entry` to `target`; `None` for a non-positive entry.
pub fn potential_gain_pct(entry: f64, target: f64) -> Option<f64> {
    (entry > 0.0).then(|| (target - entry) / entry * 100.0)
}
