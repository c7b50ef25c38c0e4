//! Strategy capability contract and the eight pattern strategies.
//!
//! Every strategy is a stateless value. `signal`, `analyze` and
//! `chart_config` all route through the strategy's own pattern finder, so
//! the three views of a series never disagree about geometry.
//!
//! Insufficient data is not an error: `signal` returns `Neutral`,
//! `analyze` returns `None`, and `chart_config` returns an empty descriptor.

pub mod confidence;
pub mod cup_handle;
pub mod lifetime_high;
pub mod range_bound;
pub mod report;
pub mod reverse_head_shoulders;
pub mod sma_alignment;
pub mod v10;
pub mod v20;
pub mod week52_low;

pub use confidence::Confidence;
pub use cup_handle::CupWithHandle;
pub use lifetime_high::LifetimeHigh;
pub use range_bound::RangeBound;
pub use report::{
    potential_gain_pct, Alignment, AnalysisReport, Base, CupType, FundamentalsSource, Handle,
    Pattern, PatternShape, RangeQuality,
};
pub use reverse_head_shoulders::ReverseHeadShoulders;
pub use sma_alignment::SmaAlignment;
pub use v10::V10;
pub use v20::V20;
pub use week52_low::Week52Low;

use crate::chart::{ChartPoint, OverlayDescriptor};
use crate::domain::{Bar, FundamentalSnapshot, Series, Signal};

/// Capability set shared by all pattern strategies.
///
/// # Contract
/// All methods are pure over an immutable series. Implementations must be
/// bounded-time by construction (capped pivot counts, capped candidate
/// combinations) and must never panic on a valid [`Series`].
pub trait Strategy: Send + Sync {
    /// Machine name (e.g., "cup_handle").
    fn name(&self) -> &'static str;

    /// Human-readable name (e.g., "Cup with Handle").
    fn display_name(&self) -> &'static str;

    /// Minimum number of bars before any pattern is considered.
    fn min_bars(&self) -> usize;

    /// Stock groups this strategy covers. Empty means every group.
    fn applicable_groups(&self) -> &'static [&'static str];

    /// Recommendation for the series. Total: never fails, `Neutral` when
    /// data is insufficient or nothing qualifies.
    fn signal(&self, series: &Series) -> Signal {
        self.analyze(series, None)
            .map(|r| r.signal)
            .unwrap_or(Signal::Neutral)
    }

    /// Full report, `None` when the series is shorter than [`min_bars`](Strategy::min_bars).
    fn analyze(
        &self,
        series: &Series,
        snapshot: Option<&FundamentalSnapshot>,
    ) -> Option<AnalysisReport>;

    /// Drawing primitives for the detected geometry.
    fn chart_config(&self, series: &Series) -> OverlayDescriptor;

    fn is_applicable(&self, group: &str) -> bool {
        let groups = self.applicable_groups();
        groups.is_empty() || groups.contains(&group)
    }

    fn has_enough_data(&self, series: &Series) -> bool {
        series.len() >= self.min_bars()
    }
}

/// All strategies in a fixed order.
pub fn all_strategies() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(CupWithHandle),
        Box::new(ReverseHeadShoulders),
        Box::new(RangeBound),
        Box::new(SmaAlignment),
        Box::new(V10),
        Box::new(V20),
        Box::new(LifetimeHigh),
        Box::new(Week52Low),
    ]
}

/// Look a strategy up by machine name.
pub fn strategy_by_name(name: &str) -> Option<Box<dyn Strategy>> {
    all_strategies().into_iter().find(|s| s.name() == name)
}

/// Chart coordinate of a bar's close.
pub(crate) fn close_point(bar: &Bar) -> ChartPoint {
    ChartPoint::new(bar.date, bar.close)
}

/// Calendar-day distance `from → to`.
pub(crate) fn days_between(from: chrono::NaiveDate, to: chrono::NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Flat candles (open = close) at each mid price with ±0.5 wicks, one per
/// calendar day from 2024-01-01, volume 1000.
#[cfg(test)]
pub(crate) fn candles(mids: &[f64]) -> Vec<Bar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    mids.iter()
        .enumerate()
        .map(|(i, &m)| Bar {
            date: start + chrono::Duration::days(i as i64),
            open: m,
            high: m + 0.5,
            low: m - 0.5,
            close: m,
            volume: 1_000,
        })
        .collect()
}

/// Piecewise-linear mid prices through `(index, price)` knots, inclusive of
/// the last knot.
#[cfg(test)]
pub(crate) fn path(knots: &[(usize, f64)]) -> Vec<f64> {
    let mut out = Vec::new();
    for w in knots.windows(2) {
        let ((i0, p0), (i1, p1)) = (w[0], w[1]);
        for i in i0..i1 {
            out.push(p0 + (p1 - p0) * (i - i0) as f64 / (i1 - i0) as f64);
        }
    }
    if let Some(&(_, p)) = knots.last() {
        out.push(p);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::group;

    #[test]
    fn registry_has_eight_unique_names() {
        let all = all_strategies();
        assert_eq!(all.len(), 8);
        let mut names: Vec<&str> = all.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(strategy_by_name("v20").map(|s| s.min_bars()), Some(30));
        assert!(strategy_by_name("nope").is_none());
    }

    #[test]
    fn applicability_follows_declared_groups() {
        let range = RangeBound;
        assert!(range.applicable_groups().is_empty());
        for g in group::ALL {
            assert!(range.is_applicable(g));
        }
        let sma = SmaAlignment;
        assert!(sma.is_applicable(group::V40));
        assert!(!sma.is_applicable(group::V40_NEXT));
        assert!(!sma.is_applicable("anything"));
    }

    #[test]
    fn minimum_lengths() {
        let mins: Vec<(&str, usize)> = all_strategies()
            .iter()
            .map(|s| (s.name(), s.min_bars()))
            .collect();
        assert_eq!(
            mins,
            vec![
                ("cup_handle", 100),
                ("reverse_head_shoulders", 100),
                ("range_bound", 60),
                ("sma_alignment", 200),
                ("v10", 50),
                ("v20", 30),
                ("lifetime_high", 100),
                ("week52_low", 240),
            ]
        );
    }

    #[test]
    fn empty_series_is_neutral_everywhere() {
        let series = Series::empty("NONE");
        for s in all_strategies() {
            assert_eq!(s.signal(&series), Signal::Neutral, "{}", s.name());
            assert!(s.analyze(&series, None).is_none(), "{}", s.name());
            assert!(s.chart_config(&series).is_empty(), "{}", s.name());
        }
    }
}
