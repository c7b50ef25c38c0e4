//! Cup with Handle.
//!
//! Two strict pivot highs within 1% of each other form the rims; their mean
//! is the neckline. Between them the cup must fall at least 15% below the
//! neckline and the right rim must recover at least 80% of that fall. An
//! optional handle is a shallow pullback after the right rim that settles
//! into a tight base and climbs back toward the rim.
//!
//! Target is the measured move: neckline + cup depth.

use crate::chart::{ChartPoint, Color, LineStyle, Overlay, OverlayDescriptor};
use crate::domain::{group, Bar, FundamentalSnapshot, Series, Signal};
use crate::geometry::{retain_recent, scan_highs, PivotArena, Strictness, EPS};
use crate::indicators::stats::{argmin_by, mean_volume};

use super::{days_between, AnalysisReport, Confidence, CupType, Handle, Pattern, PatternShape, Strategy};

const MIN_BARS: usize = 100;
const PEAK_WINDOW: usize = 5;
const PEAK_RECENCY_DAYS: i64 = 180;
const RIM_TOLERANCE: f64 = 0.01;
const MIN_CUP_BARS: usize = 20;
const MIN_DEPTH: f64 = 0.15;
const MIN_RECOVERY: f64 = 0.80;
const U_SHAPE_RATIO: f64 = 0.3;
const HANDLE_MIN_BARS: usize = 10;
const HANDLE_SEARCH_BARS: usize = 50;
const MAX_HANDLE_RATIO: f64 = 0.5;
const BASE_MIN_BARS: usize = 5;
const BASE_CHECK_BARS: usize = 10;
const MAX_BASE_RANGE: f64 = 0.05;
const HANDLE_END_RECOVERY: f64 = 0.95;
const MAX_PATTERNS: usize = 2;
const BREAKOUT_LOOKBACK: usize = 5;
const TARGET_PROXIMITY: f64 = 0.95;
const NECKLINE_STOP: f64 = -0.02;
const FORMING_DAYS: i64 = 30;

const STEPS: &[&str] = &[
    "1. Find strict pivot highs (±5 bars) from the last 180 days",
    "2. Pair rims whose highs differ by at most 1%; neckline is their average",
    "3. Require a cup of at least 20 bars falling 15% or more below the neckline",
    "4. Require the right rim to recover at least 80% of the decline",
    "5. Classify the cup as U-shaped or V-shaped from its midpoint close",
    "6. Look for a handle retracing at most 50% of cup depth within 50 bars",
    "7. Require the handle base to consolidate inside a 5% range",
    "8. Buy on a green close above the neckline; target = neckline + cup depth",
    "9. Sell near target or when price slips more than 2% below the neckline",
];

/// Cup with Handle strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct CupWithHandle;

#[derive(Debug, Clone)]
struct HandleFit {
    low: usize,
    end: usize,
    depth: f64,
}

#[derive(Debug, Clone)]
struct CupFit {
    left: usize,
    right: usize,
    bottom: usize,
    left_price: f64,
    right_price: f64,
    neckline: f64,
    depth: f64,
    cup_type: CupType,
    handle: Option<HandleFit>,
}

impl CupFit {
    fn target(&self) -> f64 {
        self.neckline + self.depth
    }

    fn end_index(&self) -> usize {
        self.handle.as_ref().map_or(self.right, |h| h.end)
    }

    fn depth_pct(&self) -> f64 {
        self.depth / self.neckline * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Trigger {
    Breakout,
    TargetReached,
    BelowNeckline,
    Forming,
}

fn find_cups(bars: &[Bar]) -> Vec<CupFit> {
    let Some(last) = bars.last() else {
        return Vec::new();
    };
    let mut highs = scan_highs(bars, PEAK_WINDOW, Strictness::Strict);
    retain_recent(&mut highs, last.date, PEAK_RECENCY_DAYS);
    let arena = PivotArena::new(highs);

    let mut cups = Vec::new();
    for (i, j) in arena.pairs() {
        let (Some(a), Some(b)) = (arena.get(i), arena.get(j)) else {
            continue;
        };
        if a.price <= 0.0 || (a.price - b.price).abs() / a.price > RIM_TOLERANCE + EPS {
            continue;
        }
        let neckline = (a.price + b.price) / 2.0;

        let span = &bars[a.index..=b.index];
        if span.len() < MIN_CUP_BARS {
            continue;
        }
        let Some(offset) = argmin_by(span, |bar| bar.low) else {
            continue;
        };
        let bottom = a.index + offset;
        let bottom_price = bars[bottom].low;

        let depth = neckline - bottom_price;
        if depth <= 0.0 || depth / neckline < MIN_DEPTH - EPS {
            continue;
        }
        if (b.price - bottom_price) / depth < MIN_RECOVERY - EPS {
            continue;
        }

        let mid_close = span[span.len() / 2].close;
        let left_drop = a.price - bottom_price;
        let mid_ratio = if left_drop > 0.0 {
            (mid_close - bottom_price) / left_drop
        } else {
            0.0
        };
        let cup_type = if mid_ratio > U_SHAPE_RATIO {
            CupType::UShaped
        } else {
            CupType::VShaped
        };

        cups.push(CupFit {
            left: a.index,
            right: b.index,
            bottom,
            left_price: a.price,
            right_price: b.price,
            neckline,
            depth,
            cup_type,
            handle: find_handle(bars, b.index, b.price, depth),
        });
    }

    cups.sort_by(|x, y| bars[y.end_index()].date.cmp(&bars[x.end_index()].date));
    cups.truncate(MAX_PATTERNS);
    cups
}

fn find_handle(bars: &[Bar], rim: usize, rim_price: f64, cup_depth: f64) -> Option<HandleFit> {
    let after = &bars[rim..];
    if after.len() < HANDLE_MIN_BARS {
        return None;
    }
    let window = &after[..after.len().min(HANDLE_SEARCH_BARS)];
    let low_offset = argmin_by(window, |b| b.low)?;
    let depth = rim_price - window[low_offset].low;
    if depth > cup_depth * MAX_HANDLE_RATIO + EPS {
        return None;
    }

    let base = &window[low_offset..];
    if base.len() < BASE_MIN_BARS {
        return None;
    }
    let check = &base[..base.len().min(BASE_CHECK_BARS)];
    let base_high = check.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let base_low = check.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    if base_low <= 0.0 || (base_high - base_low) / base_low > MAX_BASE_RANGE + EPS {
        return None;
    }

    let end_offset = base
        .iter()
        .position(|b| b.high >= rim_price * HANDLE_END_RECOVERY - EPS)?;
    Some(HandleFit {
        low: rim + low_offset,
        end: rim + low_offset + end_offset,
        depth,
    })
}

fn breakout_confirmed(bars: &[Bar], cup: &CupFit) -> bool {
    let start = bars.len().saturating_sub(BREAKOUT_LOOKBACK);
    bars[start..]
        .iter()
        .any(|b| b.is_green() && b.close > cup.neckline)
}

/// First pattern, in recency order, that triggers a signal.
fn evaluate(bars: &[Bar], cups: &[CupFit]) -> Option<(usize, Signal, Trigger)> {
    let last = bars.last()?;
    let price = last.close;
    for (k, cup) in cups.iter().enumerate() {
        let breakout = breakout_confirmed(bars, cup);
        if breakout {
            return Some((k, Signal::Buy, Trigger::Breakout));
        }
        if price >= cup.target() * TARGET_PROXIMITY {
            return Some((k, Signal::Sell, Trigger::TargetReached));
        }
        if (price - cup.neckline) / cup.neckline < NECKLINE_STOP {
            return Some((k, Signal::Sell, Trigger::BelowNeckline));
        }
        if days_between(bars[cup.end_index()].date, last.date) <= FORMING_DAYS {
            return Some((k, Signal::Watch, Trigger::Forming));
        }
    }
    None
}

fn confidence(bars: &[Bar], cup: &CupFit) -> u8 {
    let mut c = Confidence::base(50.0);
    c.tier_above(cup.depth_pct(), &[(30.0, 20.0), (20.0, 15.0), (15.0, 10.0)]);
    if let Some(handle) = &cup.handle {
        c.add(15.0);
        c.add_if(handle.depth / cup.depth < 0.3, 10.0);
    }
    c.add(match cup.cup_type {
        CupType::UShaped => 15.0,
        CupType::VShaped => 10.0,
    });
    let pattern_volume = mean_volume(&bars[cup.left..=cup.end_index()]);
    let overall_volume = mean_volume(bars);
    if let (Some(p), Some(o)) = (pattern_volume, overall_volume) {
        c.add_if(p > o, 5.0);
    }
    c.finish()
}

fn to_pattern(bars: &[Bar], cup: &CupFit) -> Pattern {
    let point = |i: usize, price: f64| ChartPoint::new(bars[i].date, price);
    let handle = cup.handle.as_ref().map(|h| Handle {
        low: point(h.low, bars[h.low].low),
        end: point(h.end, bars[h.end].high),
        depth: h.depth,
    });
    Pattern {
        target_price: cup.target(),
        entry_reference: cup.neckline,
        depth_or_range: cup.depth,
        quality_score: f64::from(confidence(bars, cup)) / 100.0,
        pattern_start: bars[cup.left].date,
        pattern_end: bars[cup.end_index()].date,
        shape: PatternShape::CupWithHandle {
            left_rim: point(cup.left, cup.left_price),
            right_rim: point(cup.right, cup.right_price),
            bottom: point(cup.bottom, bars[cup.bottom].low),
            neckline: cup.neckline,
            cup_type: cup.cup_type,
            handle,
        },
    }
}

impl Strategy for CupWithHandle {
    fn name(&self) -> &'static str {
        "cup_handle"
    }

    fn display_name(&self) -> &'static str {
        "Cup with Handle"
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
        evaluate(bars, &find_cups(bars)).map_or(Signal::Neutral, |(_, s, _)| s)
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
        let cups = find_cups(bars);

        let Some(first) = cups.first() else {
            return Some(
                AnalysisReport::new(self.display_name(), Signal::Neutral, price)
                    .reason("No valid Cup with Handle pattern identified")
                    .steps(STEPS),
            );
        };

        let verdict = evaluate(bars, &cups);
        let (signal, active, reason) = match verdict {
            Some((k, signal, trigger)) => {
                let reason = match trigger {
                    Trigger::Breakout => "Breakout confirmed: green close above the neckline",
                    Trigger::TargetReached => "Technical target reached",
                    Trigger::BelowNeckline => "Price more than 2% below the neckline; pattern failed",
                    Trigger::Forming => "Cup with Handle forming, waiting for breakout",
                };
                (signal, &cups[k], reason)
            }
            None => (Signal::Neutral, first, "Pattern is stale and unconfirmed"),
        };

        Some(
            AnalysisReport::new(self.display_name(), signal, price)
                .target(Some(active.target()))
                .confidence(confidence(bars, active))
                .reason(reason)
                .patterns(cups.iter().map(|c| to_pattern(bars, c)).collect())
                .steps(STEPS)
                .metric("neckline", active.neckline)
                .metric("cup_depth", active.depth)
                .metric("cup_depth_pct", active.depth_pct())
                .metric("handle_depth", active.handle.as_ref().map_or(0.0, |h| h.depth))
                .flag("has_handle", active.handle.is_some())
                .flag("u_shaped", active.cup_type == CupType::UShaped),
        )
    }

    fn chart_config(&self, series: &Series) -> OverlayDescriptor {
        let mut chart = OverlayDescriptor::new();
        if !self.has_enough_data(series) {
            return chart;
        }
        let bars = series.bars();
        for cup in find_cups(bars) {
            let left = ChartPoint::new(bars[cup.left].date, cup.left_price);
            let bottom = ChartPoint::new(bars[cup.bottom].date, bars[cup.bottom].low);
            let right = ChartPoint::new(bars[cup.right].date, cup.right_price);
            chart.push(Overlay::Polyline {
                points: vec![left, bottom, right],
                style: LineStyle::solid(Color::Blue, 2),
                markers: false,
                label: Some("Cup".into()),
            });
            if let Some(h) = &cup.handle {
                chart.push(Overlay::Polyline {
                    points: vec![
                        right,
                        ChartPoint::new(bars[h.low].date, bars[h.low].low),
                        ChartPoint::new(bars[h.end].date, bars[h.end].high),
                    ],
                    style: LineStyle::solid(Color::Orange, 2),
                    markers: false,
                    label: Some("Handle".into()),
                });
            }
            chart
                .level(cup.neckline, LineStyle::dashed(Color::Purple, 2), "Neckline")
                .level(cup.target(), LineStyle::dotted(Color::Green, 2), "Target")
                .annotate(left, "Cup Start", Color::Blue)
                .annotate(bottom, "Cup Bottom", Color::Blue);
        }
        chart
    }
}
