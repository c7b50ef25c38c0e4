//! Support/resistance extraction and the touch log.
//!
//! Levels come from clustering multi-window pivot prices. Touches are bars
//! that reach into a tolerance band around a level; the log is reduced to a
//! strictly alternating sequence before a range is judged.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::cluster::{cluster_levels, PriceCluster};
use super::pivots::{scan_highs, scan_lows, Strictness};
use crate::domain::Bar;

/// Candidate levels for range detection.
#[derive(Debug, Clone, Default)]
pub struct LevelCandidates {
    pub support: Vec<PriceCluster>,
    pub resistance: Vec<PriceCluster>,
    /// Distinct pivot-low indices found across all windows.
    pub support_pivots: usize,
    /// Distinct pivot-high indices found across all windows.
    pub resistance_pivots: usize,
}

/// Union of non-strict pivot indices across several window sizes.
///
/// Returns `(high_indices, low_indices)`, each sorted and deduplicated.
pub fn multi_window_pivots(bars: &[Bar], windows: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    for &w in windows {
        highs.extend(scan_highs(bars, w, Strictness::NonStrict).into_iter().map(|p| p.index));
        lows.extend(scan_lows(bars, w, Strictness::NonStrict).into_iter().map(|p| p.index));
    }
    highs.sort_unstable();
    highs.dedup();
    lows.sort_unstable();
    lows.dedup();
    (highs, lows)
}

/// Cluster pivot highs into resistance and pivot lows into support.
pub fn support_resistance(bars: &[Bar], windows: &[usize], tolerance: f64) -> LevelCandidates {
    let (highs, lows) = multi_window_pivots(bars, windows);
    let high_prices: Vec<f64> = highs.iter().map(|&i| bars[i].high).collect();
    let low_prices: Vec<f64> = lows.iter().map(|&i| bars[i].low).collect();
    LevelCandidates {
        support: cluster_levels(&low_prices, tolerance),
        resistance: cluster_levels(&high_prices, tolerance),
        support_pivots: lows.len(),
        resistance_pivots: highs.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchKind {
    Support,
    Resistance,
}

impl TouchKind {
    pub fn label(self) -> &'static str {
        match self {
            TouchKind::Support => "Support",
            TouchKind::Resistance => "Resistance",
        }
    }
}

/// One bar reaching a level band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Touch {
    pub kind: TouchKind,
    pub index: usize,
    pub date: NaiveDate,
    /// Low for support touches, High for resistance touches.
    pub price: f64,
}

/// Record every bar whose low reaches `support * (1 + tol)` or, failing
/// that, whose high reaches `resistance * (1 - tol)`. Support wins when a
/// bar qualifies for both.
pub fn collect_touches(bars: &[Bar], support: f64, resistance: f64, tolerance: f64) -> Vec<Touch> {
    let support_band = support * (1.0 + tolerance);
    let resistance_band = resistance * (1.0 - tolerance);
    bars.iter()
        .enumerate()
        .filter_map(|(index, bar)| {
            if bar.low <= support_band {
                Some(Touch {
                    kind: TouchKind::Support,
                    index,
                    date: bar.date,
                    price: bar.low,
                })
            } else if bar.high >= resistance_band {
                Some(Touch {
                    kind: TouchKind::Resistance,
                    index,
                    date: bar.date,
                    price: bar.high,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Collapse each run of same-type touches to a single touch.
///
/// The kept touch is the most extreme one in the run: the lowest low for
/// support, the highest high for resistance. Earliest wins on ties.
pub fn enforce_alternation(touches: Vec<Touch>) -> Vec<Touch> {
    let mut out: Vec<Touch> = Vec::with_capacity(touches.len());
    for touch in touches {
        match out.last_mut() {
            Some(last) if last.kind == touch.kind => {
                let better = match touch.kind {
                    TouchKind::Support => touch.price < last.price,
                    TouchKind::Resistance => touch.price > last.price,
                };
                if better {
                    *last = touch;
                }
            }
            _ => out.push(touch),
        }
    }
    out
}

/// No two neighbouring touches share a type.
pub fn strictly_alternates(touches: &[Touch]) -> bool {
    touches.windows(2).all(|w| w[0].kind != w[1].kind)
}
