//! Reverse (inverse) Head and Shoulders.
//!
//! Three significant pivot lows in time order: the head is the deepest, the
//! shoulders sit at least 3% above it, and each leg spans 20–70% of the
//! pattern. The neckline is a near-horizontal line through the two rebound
//! peaks. Only patterns whose measured-move target implies a 15% gain from
//! the current price are traded.

use crate::chart::{ChartPoint, Color, LineStyle, Overlay, OverlayDescriptor};
use crate::domain::{group, Bar, FundamentalSnapshot, Series, Signal};
use crate::geometry::{
    adaptive_window, retain_recent, scan_lows, PivotArena, PivotPoint, Strictness, EPS,
};
use crate::indicators::stats::{argmax_by, mean_volume, recent_volatility};

use super::{days_between, AnalysisReport, Base, Confidence, Pattern, PatternShape, Strategy};

const MIN_BARS: usize = 100;
const PIVOT_WINDOW_CAP: usize = 7;
const MIN_SIGNIFICANCE: f64 = 0.02;
const PIVOT_RECENCY_DAYS: i64 = 365;
const MIN_SPAN_DAYS: i64 = 20;
const MAX_SPAN_DAYS: i64 = 365;
const MIN_LEG_SHARE: f64 = 0.2;
const MAX_LEG_SHARE: f64 = 0.7;
const MIN_SHOULDER_DEPTH: f64 = 0.03;
const VOLATILITY_WINDOW: usize = 50;
const BASE_LOOKFORWARD: usize = 30;
const BASE_MIN_BARS: usize = 5;
const BASE_MIN_VOLUME_RATIO: f64 = 0.7;
const MIN_QUALITY: f64 = 0.6;
const MIN_GAIN: f64 = 0.15;
const MAX_PATTERNS: usize = 3;
const BREAKOUT_LOOKBACK: usize = 5;
const BREAKOUT_MARGIN: f64 = 1.005;
const BREAKOUT_VOLUME_WINDOW: usize = 20;
const BREAKOUT_VOLUME_RATIO: f64 = 0.8;
const TARGET_PROXIMITY: f64 = 0.95;

const STEPS: &[&str] = &[
    "1. Find strict pivot lows at least 2% below their surroundings in the last year",
    "2. Take three pivots in order: left shoulder, head, right shoulder",
    "3. Require the head to be the deepest and the right shoulder above it",
    "4. Require each leg to cover 20-70% of the span and each shoulder 3% above the head",
    "5. Locate the rebound peaks between the shoulders and the head",
    "6. Accept the neckline only if the peaks agree within 1.5-3% (volatility scaled)",
    "7. Target = neckline + (neckline - head)",
    "8. Keep patterns whose target is at least 15% above the current price",
    "9. Score symmetry, timing and depth; discard patterns below 0.6 quality",
    "10. Look for a tight base after the right shoulder (4-8% range)",
    "11. Require base volume at 70% of average or better",
    "12. Buy on a green close 0.5% above the base high with volume support",
    "13. Sell as price approaches the technical target",
];

/// Reverse Head and Shoulders strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReverseHeadShoulders;

#[derive(Debug, Clone)]
struct BaseFit {
    start: usize,
    end: usize,
    high: f64,
    low: f64,
    quality: f64,
}

#[derive(Debug, Clone)]
struct Formation {
    left: PivotPoint,
    head: PivotPoint,
    right: PivotPoint,
    peaks: [(usize, f64); 2],
    neckline: f64,
    base: Option<BaseFit>,
    quality: f64,
    volume_confirmed: bool,
    /// Fraction, relative to the current price.
    gain: f64,
}

impl Formation {
    fn depth(&self) -> f64 {
        self.neckline - self.head.price
    }

    fn target(&self) -> f64 {
        self.neckline + self.depth()
    }

    fn meets_gain(&self) -> bool {
        self.gain >= MIN_GAIN - EPS
    }
}

fn legs_are_proportional(left: &PivotPoint, head: &PivotPoint, right: &PivotPoint) -> bool {
    let span = days_between(left.date, right.date);
    if !(MIN_SPAN_DAYS..=MAX_SPAN_DAYS).contains(&span) {
        return false;
    }
    let span = span as f64;
    let in_share = |days: i64| {
        let d = days as f64;
        d >= span * MIN_LEG_SHARE && d <= span * MAX_LEG_SHARE
    };
    in_share(days_between(left.date, head.date)) && in_share(days_between(head.date, right.date))
}

fn is_valid(left: &PivotPoint, head: &PivotPoint, right: &PivotPoint) -> bool {
    if head.price <= 0.0 || head.price >= left.price || head.price >= right.price {
        return false;
    }
    if !legs_are_proportional(left, head, right) {
        return false;
    }
    let left_depth = (left.price - head.price) / head.price;
    let right_depth = (right.price - head.price) / head.price;
    left_depth >= MIN_SHOULDER_DEPTH - EPS && right_depth >= MIN_SHOULDER_DEPTH - EPS
}

/// Highest interior local peak strictly between `from` and `to`, or the
/// interior maximum when no local peak exists.
fn rebound_peak(bars: &[Bar], from: usize, to: usize) -> Option<(usize, f64)> {
    if to < from + 2 {
        return None;
    }
    let interior = &bars[from + 1..to];
    let mut best: Option<(usize, f64)> = None;
    for k in 1..interior.len().saturating_sub(1) {
        let h = interior[k].high;
        if h > interior[k - 1].high && h > interior[k + 1].high && best.map_or(true, |(_, p)| h > p) {
            best = Some((k, h));
        }
    }
    let (k, price) = match best {
        Some(found) => found,
        None => {
            let k = argmax_by(interior, |b| b.high)?;
            (k, interior[k].high)
        }
    };
    Some((from + 1 + k, price))
}

fn neckline(
    bars: &[Bar],
    left: &PivotPoint,
    head: &PivotPoint,
    right: &PivotPoint,
) -> Option<([(usize, f64); 2], f64)> {
    let p1 = rebound_peak(bars, left.index, head.index)?;
    let p2 = rebound_peak(bars, head.index, right.index)?;
    let lower = p1.1.min(p2.1);
    if lower <= 0.0 {
        return None;
    }
    let tolerance = (recent_volatility(bars, VOLATILITY_WINDOW) * 2.0).clamp(0.015, 0.03);
    if (p1.1 - p2.1).abs() / lower > tolerance + EPS {
        return None;
    }
    // later peak weighs more
    let level = 0.4 * p1.1 + 0.6 * p2.1;
    (level > head.price).then_some(([p1, p2], level))
}

fn right_shoulder_base(bars: &[Bar], start: usize) -> Option<BaseFit> {
    let lookforward = BASE_LOOKFORWARD.min(bars.len().checked_sub(start + 1)?);
    let window = &bars[start..start + lookforward];
    if window.len() < BASE_MIN_BARS {
        return None;
    }
    let high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    if low <= 0.0 {
        return None;
    }
    let range = (high - low) / low;

    let overall = mean_volume(bars).unwrap_or(0.0);
    let volume_ratio = match mean_volume(window) {
        Some(v) if overall > 0.0 => v / overall,
        _ => 1.0,
    };
    let max_range = (recent_volatility(bars, VOLATILITY_WINDOW) * 3.0).clamp(0.04, 0.08);

    (range <= max_range + EPS && volume_ratio >= BASE_MIN_VOLUME_RATIO - EPS).then(|| BaseFit {
        start,
        end: start + window.len() - 1,
        high,
        low,
        quality: (1.0 - range / max_range) * volume_ratio,
    })
}

fn formation_quality(left: &PivotPoint, head: &PivotPoint, right: &PivotPoint) -> f64 {
    let ratio = |a: f64, b: f64| if a.max(b) > 0.0 { a.min(b) / a.max(b) } else { 0.0 };

    let left_depth = left.price - head.price;
    let right_depth = right.price - head.price;
    let symmetry = ratio(left_depth, right_depth);

    let first_leg = days_between(left.date, head.date) as f64;
    let second_leg = days_between(head.date, right.date) as f64;
    let timing = ratio(first_leg, second_leg);

    let depth = (left_depth / head.price).min(0.25) / 0.25;

    (0.5 + 0.2 * symmetry + 0.15 * timing + 0.15 * depth).min(1.0)
}

fn find_formations(bars: &[Bar]) -> Vec<Formation> {
    let Some(last) = bars.last() else {
        return Vec::new();
    };
    let price = last.close;
    if price <= 0.0 {
        return Vec::new();
    }

    let window = adaptive_window(bars.len(), PIVOT_WINDOW_CAP);
    let mut lows = scan_lows(bars, window, Strictness::Strict);
    lows.retain(|p| p.significance >= MIN_SIGNIFICANCE - EPS);
    retain_recent(&mut lows, last.date, PIVOT_RECENCY_DAYS);
    let arena = PivotArena::new(lows);

    let overall_volume = mean_volume(bars).unwrap_or(0.0);
    let mut found = Vec::new();
    for (i, j, k) in arena.triples() {
        let (Some(left), Some(head), Some(right)) = (arena.get(i), arena.get(j), arena.get(k)) else {
            continue;
        };
        if !is_valid(left, head, right) {
            continue;
        }
        let Some((peaks, level)) = neckline(bars, left, head, right) else {
            continue;
        };
        let quality = formation_quality(left, head, right);
        if quality < MIN_QUALITY - EPS {
            continue;
        }
        let target = level + (level - head.price);
        let volume_confirmed = mean_volume(&bars[left.index..=right.index])
            .map_or(false, |v| v > overall_volume * 0.9);

        found.push(Formation {
            left: left.clone(),
            head: head.clone(),
            right: right.clone(),
            peaks,
            neckline: level,
            base: right_shoulder_base(bars, right.index),
            quality,
            volume_confirmed,
            gain: (target - price) / price,
        });
    }

    found.sort_by(|a, b| {
        b.meets_gain()
            .cmp(&a.meets_gain())
            .then(b.quality.total_cmp(&a.quality))
            .then(b.gain.total_cmp(&a.gain))
            .then(b.right.date.cmp(&a.right.date))
    });
    found.truncate(MAX_PATTERNS);
    found
}

/// Formations worth trading: top candidates that clear the gain floor.
fn tradeable(bars: &[Bar]) -> (Vec<Formation>, usize) {
    let all = find_formations(bars);
    let total = all.len();
    (all.into_iter().filter(Formation::meets_gain).collect(), total)
}

fn breakout_confirmed(bars: &[Bar], base: &BaseFit) -> bool {
    let recent = &bars[bars.len().saturating_sub(BREAKOUT_LOOKBACK)..];
    let Some(candle) = recent
        .iter()
        .find(|b| b.is_green() && b.close > base.high * BREAKOUT_MARGIN)
    else {
        return false;
    };
    let volume_window = &bars[bars.len().saturating_sub(BREAKOUT_VOLUME_WINDOW)..];
    mean_volume(volume_window).map_or(false, |avg| candle.volume as f64 > avg * BREAKOUT_VOLUME_RATIO)
}

fn base_forming(price: f64, base: &BaseFit) -> bool {
    let pad = (base.high - base.low) * 0.1;
    price >= base.low - pad && price <= base.high + pad
}

fn evaluate(bars: &[Bar], formations: &[Formation]) -> Signal {
    let Some(price) = bars.last().map(|b| b.close) else {
        return Signal::Neutral;
    };
    for f in formations {
        if f.base.as_ref().is_some_and(|b| breakout_confirmed(bars, b)) {
            return Signal::Buy;
        }
        if price >= f.target() * TARGET_PROXIMITY {
            return Signal::Sell;
        }
        if f.base.as_ref().is_some_and(|b| base_forming(price, b)) {
            return Signal::Watch;
        }
    }
    Signal::Neutral
}

fn confidence(bars: &[Bar], f: &Formation) -> u8 {
    let mut c = Confidence::base(50.0);
    c.add((f.quality * 25.0).trunc());
    c.tier_above(
        f.depth() / f.head.price,
        &[(0.20, 20.0), (0.15, 17.0), (0.10, 13.0), (0.05, 8.0)],
    );
    if let Some(base) = &f.base {
        c.add((base.quality * 20.0).trunc());
    }
    c.add_if(f.volume_confirmed, 15.0);
    c.tier_at_least(f.gain, &[(0.30, 15.0), (0.25, 12.0), (0.20, 9.0), (0.15, 6.0)]);

    let span = days_between(f.left.date, f.right.date);
    c.add(if (45..=120).contains(&span) {
        10.0
    } else if (30..=150).contains(&span) {
        7.0
    } else if (20..=200).contains(&span) {
        4.0
    } else {
        0.0
    });

    if let Some(last) = bars.last() {
        let since = days_between(f.right.date, last.date) as f64;
        c.tier_at_most(since, &[(30.0, 10.0), (60.0, 7.0), (90.0, 4.0)]);
    }
    c.finish()
}

fn point(p: &PivotPoint) -> ChartPoint {
    ChartPoint::new(p.date, p.price)
}

fn to_pattern(bars: &[Bar], f: &Formation) -> Pattern {
    let peak = |(i, price): (usize, f64)| ChartPoint::new(bars[i].date, price);
    Pattern {
        target_price: f.target(),
        entry_reference: f.neckline,
        depth_or_range: f.depth(),
        quality_score: f.quality,
        pattern_start: f.left.date,
        pattern_end: f.right.date,
        shape: PatternShape::ReverseHeadShoulders {
            left_shoulder: point(&f.left),
            head: point(&f.head),
            right_shoulder: point(&f.right),
            neckline: f.neckline,
            neckline_peaks: [peak(f.peaks[0]), peak(f.peaks[1])],
            base: f.base.as_ref().map(|b| Base {
                start: bars[b.start].date,
                end: bars[b.end].date,
                high: b.high,
                low: b.low,
                quality: b.quality,
            }),
            volume_confirmed: f.volume_confirmed,
            potential_gain: f.gain,
        },
    }
}

impl Strategy for ReverseHeadShoulders {
    fn name(&self) -> &'static str {
        "reverse_head_shoulders"
    }

    fn display_name(&self) -> &'static str {
        "Reverse Head and Shoulders"
    }

    fn min_bars(&self) -> usize {
        MIN_BARS
    }

    fn applicable_groups(&self) -> &'static [&'static str] {
        &[group::V40, group::V40_NEXT]
    }

    fn signal(&self, series: &Series) -> Signal {
        if !self.has_enough_data(series) {
            return Signal::Neutral;
        }
        let bars = series.bars();
        evaluate(bars, &tradeable(bars).0)
    }

    fn analyze(
        &self,
        series: &Series,
        _snapshot: Option<&FundamentalSnapshot>,
    ) -> Option<AnalysisReport> {
        if !self.has_enough_data(series) {
            return None;
        }
        let bars = series.bars();
        let price = series.current_price()?;
        let (formations, total) = tradeable(bars);
        let rejected = (total - formations.len()) as f64;

        let Some(active) = formations.first() else {
            let reason = if total > 0 {
                "No patterns with 15%+ gain potential"
            } else {
                "No valid Reverse Head and Shoulders pattern identified"
            };
            return Some(
                AnalysisReport::new(self.display_name(), Signal::Neutral, price)
                    .reason(reason)
                    .steps(STEPS)
                    .metric("rejected_patterns", rejected),
            );
        };

        let signal = evaluate(bars, &formations);
        let gain_pct = active.gain * 100.0;
        let reason = match signal {
            Signal::Buy => format!(
                "Green breakout above the right shoulder base with {gain_pct:.1}% gain potential"
            ),
            Signal::Sell => "Technical target price reached".to_string(),
            Signal::Watch => format!(
                "Right shoulder base forming with {gain_pct:.1}% gain potential, waiting for breakout"
            ),
            Signal::Neutral => "No actionable setup on patterns with 15%+ gain potential".to_string(),
        };

        let mut report = AnalysisReport::new(self.display_name(), signal, price)
            .target(Some(active.target()))
            .confidence(confidence(bars, active))
            .reason(reason)
            .patterns(formations.iter().map(|f| to_pattern(bars, f)).collect())
            .steps(STEPS)
            .metric("neckline", active.neckline)
            .metric("pattern_depth", active.depth())
            .metric("pattern_quality", active.quality)
            .metric("rejected_patterns", rejected)
            .flag("volume_confirmed", active.volume_confirmed);
        if let Some(base) = &active.base {
            report = report
                .metric("base_high", base.high)
                .metric("base_low", base.low);
        }
        Some(report)
    }

    fn chart_config(&self, series: &Series) -> OverlayDescriptor {
        let mut chart = OverlayDescriptor::new();
        if !self.has_enough_data(series) {
            return chart;
        }
        let bars = series.bars();
        let Some(last) = series.last_date() else {
            return chart;
        };
        for f in tradeable(bars).0 {
            let gain_pct = f.gain * 100.0;
            let (ls, h, rs) = (point(&f.left), point(&f.head), point(&f.right));
            chart.push(Overlay::Polyline {
                points: vec![ls, h, rs],
                style: LineStyle::solid(Color::Purple, 2),
                markers: true,
                label: Some(format!("RHS Pattern ({gain_pct:.1}% gain)")),
            });
            chart.push(Overlay::Segment {
                from: ChartPoint::new(f.left.date, f.neckline),
                to: ChartPoint::new(last, f.neckline),
                style: LineStyle::dashed(Color::Blue, 2),
                label: Some("Neckline".into()),
            });
            chart.push(Overlay::Segment {
                from: ChartPoint::new(f.left.date, f.target()),
                to: ChartPoint::new(last, f.target()),
                style: LineStyle::dotted(Color::Green, 3),
                label: Some("Target".into()),
            });
            if let Some(base) = &f.base {
                chart.push(Overlay::Rectangle {
                    from: ChartPoint::new(f.right.date, base.low),
                    to: ChartPoint::new(last, base.high),
                    fill: Color::Orange,
                    opacity: 0.2,
                    border: Some(LineStyle::solid(Color::Orange, 1)),
                });
            }
            chart
                .annotate(ls, "LS", Color::Purple)
                .annotate(h, "H", Color::Purple)
                .annotate(rs, "RS", Color::Purple)
                .annotate(
                    ChartPoint::new(last, f.target()),
                    format!("+{gain_pct:.1}%"),
                    Color::Green,
                );
        }
        chart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{candles, path};

    /// LS at 30, head at 55, RS at 80, rebound peaks of 110.5 at 40 and 70,
    /// then a flat base at 102.5.
    fn rhs_path() -> Vec<f64> {
        path(&[
            (0, 112.0),
            (20, 110.0),
            (30, 100.0),
            (40, 110.0),
            (55, 90.0),
            (70, 110.0),
            (80, 100.0),
            (85, 102.5),
            (139, 102.5),
        ])
    }

    fn series(bars: Vec<Bar>) -> Series {
        Series::new("RHS", bars).unwrap()
    }

    #[test]
    fn finds_formation_and_measured_target() {
        let bars = candles(&rhs_path());
        let (formations, total) = tradeable(&bars);
        assert_eq!(total, 1);
        let f = &formations[0];
        assert_eq!((f.left.index, f.head.index, f.right.index), (30, 55, 80));
        assert!((f.neckline - 110.5).abs() < 1e-9);
        assert!((f.target() - 131.5).abs() < 1e-9);
        assert!(f.base.is_some());
        assert!(f.quality >= MIN_QUALITY);
    }

    #[test]
    fn price_inside_base_is_watch() {
        let s = series(candles(&rhs_path()));
        assert_eq!(ReverseHeadShoulders.signal(&s), Signal::Watch);
        let report = ReverseHeadShoulders.analyze(&s, None).unwrap();
        assert_eq!(report.signal, Signal::Watch);
        assert_eq!(report.target_price, Some(131.5));
        assert!(report.confidence <= 100);
    }

    #[test]
    fn green_volume_breakout_is_buy() {
        let mut bars = candles(&rhs_path());
        let last = bars.last_mut().unwrap();
        last.open = 102.5;
        last.close = 104.5;
        last.high = 105.0;
        last.low = 102.0;
        let s = series(bars);
        assert_eq!(ReverseHeadShoulders.signal(&s), Signal::Buy);
    }

    #[test]
    fn head_above_shoulders_rejected() {
        // shallow middle trough: the middle low is no longer the deepest
        let mids = path(&[
            (0, 112.0),
            (20, 110.0),
            (30, 95.0),
            (40, 110.0),
            (55, 100.0),
            (70, 110.0),
            (80, 95.0),
            (85, 97.5),
            (139, 97.5),
        ]);
        let (formations, total) = tradeable(&candles(&mids));
        assert!(formations.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn chart_marks_shoulders_and_head() {
        let s = series(candles(&rhs_path()));
        let chart = ReverseHeadShoulders.chart_config(&s);
        let labels: Vec<&str> = chart.annotations.iter().map(|a| a.text.as_str()).collect();
        assert!(labels.starts_with(&["LS", "H", "RS"]));
        assert!(chart
            .overlays
            .iter()
            .any(|o| matches!(o, Overlay::Rectangle { fill: Color::Orange, .. })));
    }
}
