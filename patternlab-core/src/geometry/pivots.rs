//! Local-extremum scans.
//!
//! A pivot high at index i has the maximum High within `[i - w, i + w]`;
//! a pivot low has the minimum Low. Strict scans reject ties, non-strict
//! scans accept a bar that merely equals the window extreme. Bars closer
//! than `w` to either end of the slice are never pivots.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Which side of the price envelope a pivot sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotKind {
    High,
    Low,
}

/// Whether ties with the window extreme disqualify a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    Strict,
    NonStrict,
}

/// A local extreme found by a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotPoint {
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
    /// Relative distance from the mean of the surrounding window, as a fraction.
    /// For lows: `(mean - low) / low`; for highs: `(high - mean) / high`.
    pub significance: f64,
    pub kind: PivotKind,
}

/// Adaptive half-window: `max(5, min(cap, len / 20))`.
pub fn adaptive_window(len: usize, cap: usize) -> usize {
    5.max(cap.min(len / 20))
}

/// Scan for pivot highs on the High column.
pub fn scan_highs(bars: &[Bar], window: usize, strictness: Strictness) -> Vec<PivotPoint> {
    scan(bars, window, strictness, PivotKind::High)
}

/// Scan for pivot lows on the Low column.
pub fn scan_lows(bars: &[Bar], window: usize, strictness: Strictness) -> Vec<PivotPoint> {
    scan(bars, window, strictness, PivotKind::Low)
}

fn scan(bars: &[Bar], window: usize, strictness: Strictness, kind: PivotKind) -> Vec<PivotPoint> {
    let n = bars.len();
    if window == 0 || n < 2 * window + 1 {
        return Vec::new();
    }
    let value = |b: &Bar| match kind {
        PivotKind::High => b.high,
        PivotKind::Low => b.low,
    };
    // `beats(other, current)` is true when `other` disqualifies `current`
    let beats = |other: f64, current: f64| match (kind, strictness) {
        (PivotKind::High, Strictness::Strict) => other >= current,
        (PivotKind::High, Strictness::NonStrict) => other > current,
        (PivotKind::Low, Strictness::Strict) => other <= current,
        (PivotKind::Low, Strictness::NonStrict) => other < current,
    };

    let mut out = Vec::new();
    for i in window..(n - window) {
        let current = value(&bars[i]);
        let neighbours = (i - window..=i + window).filter(|&j| j != i);
        if neighbours.clone().any(|j| beats(value(&bars[j]), current)) {
            continue;
        }
        let surrounding: f64 =
            neighbours.map(|j| value(&bars[j])).sum::<f64>() / (2 * window) as f64;
        let significance = match kind {
            PivotKind::Low if current > 0.0 => (surrounding - current) / current,
            PivotKind::High if current > 0.0 => (current - surrounding) / current,
            _ => 0.0,
        };
        out.push(PivotPoint {
            index: i,
            date: bars[i].date,
            price: current,
            significance,
            kind,
        });
    }
    out
}

/// Drop pivots dated more than `days` calendar days before `last`.
pub fn retain_recent(pivots: &mut Vec<PivotPoint>, last: NaiveDate, days: i64) {
    let cutoff = last - chrono::Duration::days(days);
    pivots.retain(|p| p.date >= cutoff);
}
