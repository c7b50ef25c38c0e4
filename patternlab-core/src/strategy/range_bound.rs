//! Range-Bound trading.
//!
//! Support and resistance come from clustering multi-window pivot prices
//! over the last trading year. A candidate range is accepted only when the
//! touch log, reduced to alternating runs, still holds at least two support
//! and two resistance touches that strictly zig-zag from start to end.

use crate::chart::{ChartPoint, Color, LineStyle, Overlay, OverlayDescriptor};
use crate::domain::{Bar, FundamentalSnapshot, Series, Signal};
use crate::geometry::{
    collect_touches, enforce_alternation, strictly_alternates, support_resistance, Touch,
    TouchKind, EPS,
};

use super::{AnalysisReport, Confidence, Pattern, PatternShape, RangeQuality, Strategy};

const MIN_BARS: usize = 60;
const LOOKBACK_BARS: usize = 252;
const PIVOT_WINDOWS: [usize; 3] = [5, 8, 12];
const CLUSTER_TOLERANCE: f64 = 0.025;
const TOP_CLUSTERS: usize = 3;
const TOUCH_TOLERANCE: f64 = 0.03;
const MIN_TOUCHES: usize = 2;
const MIN_RANGE_PCT: f64 = 14.0;
const PREFERRED_RANGE_PCT: f64 = 20.0;
const ENTRY_TOLERANCE: f64 = 0.02;
const STOP_BELOW_SUPPORT: f64 = 0.97;

const STEPS: &[&str] = &[
    "1. Work on daily bars from the last trading year",
    "2. Collect pivot highs and lows over 5, 8 and 12 bar windows",
    "3. Cluster pivot prices within 2.5% into support and resistance levels",
    "4. Pair the strongest levels and require a range of at least 14% (20% preferred)",
    "5. Log every bar that reaches within 3% of either level",
    "6. Collapse repeated same-level touches to the most extreme one",
    "7. Require at least 2 support and 2 resistance touches in strict alternation",
    "8. Reject candidates whose touches do not zig-zag between the levels",
    "9. Buy within 2% of support",
    "10. Sell within 2% of resistance",
    "11. Watch while price trades inside a validated range",
];

/// Range-Bound strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeBound;

#[derive(Debug, Clone)]
struct RangeFit {
    support: f64,
    resistance: f64,
    range_pct: f64,
    touches: Vec<Touch>,
    support_cluster: usize,
    resistance_cluster: usize,
}

impl RangeFit {
    fn count(&self, kind: TouchKind) -> usize {
        self.touches.iter().filter(|t| t.kind == kind).count()
    }

    fn quality(&self) -> RangeQuality {
        if self.range_pct >= PREFERRED_RANGE_PCT - EPS {
            RangeQuality::Strong
        } else {
            RangeQuality::Acceptable
        }
    }
}

fn find_range(bars: &[Bar]) -> Option<RangeFit> {
    let offset = bars.len().saturating_sub(LOOKBACK_BARS);
    let window = &bars[offset..];

    let levels = support_resistance(window, &PIVOT_WINDOWS, CLUSTER_TOLERANCE);
    if levels.support_pivots < MIN_TOUCHES || levels.resistance_pivots < MIN_TOUCHES {
        return None;
    }

    let mut best: Option<(f64, RangeFit)> = None;
    for s in levels.support.iter().take(TOP_CLUSTERS) {
        for r in levels.resistance.iter().take(TOP_CLUSTERS) {
            if r.center <= s.center || s.center <= 0.0 {
                continue;
            }
            let range_pct = (r.center - s.center) / s.center * 100.0;
            if range_pct < MIN_RANGE_PCT - EPS {
                continue;
            }

            let touches = enforce_alternation(collect_touches(
                window,
                s.center,
                r.center,
                TOUCH_TOLERANCE,
            ));
            let fit = RangeFit {
                support: s.center,
                resistance: r.center,
                range_pct,
                touches,
                support_cluster: s.count(),
                resistance_cluster: r.count(),
            };
            let (sup, res) = (fit.count(TouchKind::Support), fit.count(TouchKind::Resistance));
            if sup < MIN_TOUCHES || res < MIN_TOUCHES || sup + res < 2 * MIN_TOUCHES {
                continue;
            }
            if !strictly_alternates(&fit.touches) {
                continue;
            }

            let score = range_pct * 0.4
                + (sup + res) as f64 * 10.0
                + (fit.support_cluster + fit.resistance_cluster) as f64 * 5.0;
            if score > best.as_ref().map_or(0.0, |(b, _)| *b) {
                best = Some((score, fit));
            }
        }
    }

    best.map(|(_, mut fit)| {
        for t in &mut fit.touches {
            t.index += offset;
        }
        fit
    })
}

fn evaluate(price: f64, fit: &RangeFit) -> Signal {
    if price <= fit.support * (1.0 + ENTRY_TOLERANCE) {
        Signal::Buy
    } else if price >= fit.resistance * (1.0 - ENTRY_TOLERANCE) {
        Signal::Sell
    } else {
        Signal::Watch
    }
}

fn confidence(price: f64, fit: &RangeFit) -> u8 {
    let mut c = Confidence::base(40.0);
    c.tier_at_least(fit.range_pct, &[(PREFERRED_RANGE_PCT, 25.0), (MIN_RANGE_PCT, 15.0)]);
    c.add((3.0 * fit.touches.len() as f64).min(20.0));
    let near = |level: f64| price > 0.0 && (price - level).abs() / price <= ENTRY_TOLERANCE;
    let inside = fit.support <= price && price <= fit.resistance;
    c.add_if(inside || near(fit.support) || near(fit.resistance), 10.0);
    c.finish()
}

fn to_pattern(bars: &[Bar], fit: &RangeFit, quality_score: f64) -> Pattern {
    let start = fit.touches.first().map_or(bars[0].date, |t| t.date);
    let end = fit.touches.last().map_or(start, |t| t.date);
    Pattern {
        target_price: fit.resistance,
        entry_reference: fit.support,
        depth_or_range: fit.resistance - fit.support,
        quality_score,
        pattern_start: start,
        pattern_end: end,
        shape: PatternShape::RangeBound {
            support: fit.support,
            resistance: fit.resistance,
            range_pct: fit.range_pct,
            quality: fit.quality(),
            touches: fit.touches.clone(),
            support_cluster_size: fit.support_cluster,
            resistance_cluster_size: fit.resistance_cluster,
        },
    }
}

impl Strategy for RangeBound {
    fn name(&self) -> &'static str {
        "range_bound"
    }

    fn display_name(&self) -> &'static str {
        "Range-Bound"
    }

    fn min_bars(&self) -> usize {
        MIN_BARS
    }

    fn applicable_groups(&self) -> &'static [&'static str] {
        &[]
    }

    fn signal(&self, series: &Series) -> Signal {
        if !self.has_enough_data(series) {
            return Signal::Neutral;
        }
        match (series.current_price(), find_range(series.bars())) {
            (Some(price), Some(fit)) => evaluate(price, &fit),
            _ => Signal::Neutral,
        }
    }

    fn analyze(
        &self,
        series: &Series,
        _snapshot: Option<&FundamentalSnapshot>,
    ) -> Option<AnalysisReport> {
        if !self.has_enough_data(series) {
            return None;
        }
        let price = series.current_price()?;
        let Some(fit) = find_range(series.bars()) else {
            return Some(
                AnalysisReport::new(self.display_name(), Signal::Neutral, price)
                    .reason(
                        "No range meets the 14% width, paired touch and strict alternation criteria",
                    )
                    .steps(STEPS),
            );
        };

        let signal = evaluate(price, &fit);
        let reason = match signal {
            Signal::Buy => format!("Price near support ({:.2}) of a validated range", fit.support),
            Signal::Sell => format!(
                "Price near resistance ({:.2}) of a validated range",
                fit.resistance
            ),
            _ => format!(
                "Price inside range {:.2} - {:.2}; watch the levels",
                fit.support, fit.resistance
            ),
        };
        let score = confidence(price, &fit);
        let (sup, res) = (fit.count(TouchKind::Support), fit.count(TouchKind::Resistance));

        Some(
            AnalysisReport::new(self.display_name(), signal, price)
                .target(Some(fit.resistance))
                .stop(Some(fit.support * STOP_BELOW_SUPPORT))
                .confidence(score)
                .reason(reason)
                .patterns(vec![to_pattern(series.bars(), &fit, f64::from(score) / 100.0)])
                .steps(STEPS)
                .metric("support", fit.support)
                .metric("resistance", fit.resistance)
                .metric("range_pct", fit.range_pct)
                .metric("support_touches", sup as f64)
                .metric("resistance_touches", res as f64)
                .metric("buy_zone_upper", fit.support * (1.0 + ENTRY_TOLERANCE))
                .metric("sell_zone_lower", fit.resistance * (1.0 - ENTRY_TOLERANCE))
                .flag("strong", fit.quality() == RangeQuality::Strong),
        )
    }

    fn chart_config(&self, series: &Series) -> OverlayDescriptor {
        let mut chart = OverlayDescriptor::new();
        if !self.has_enough_data(series) {
            return chart;
        }
        let (Some(first), Some(last), Some(fit)) =
            (series.first_date(), series.last_date(), find_range(series.bars()))
        else {
            return chart;
        };

        chart
            .level(fit.support, LineStyle::solid(Color::Green, 3), "Support")
            .level(fit.resistance, LineStyle::solid(Color::Red, 3), "Resistance")
            .push(Overlay::Rectangle {
                from: ChartPoint::new(first, fit.support),
                to: ChartPoint::new(last, fit.resistance),
                fill: Color::Gray,
                opacity: 0.1,
                border: Some(LineStyle::dotted(Color::Gray, 1)),
            });
        for t in &fit.touches {
            let color = match t.kind {
                TouchKind::Support => Color::Green,
                TouchKind::Resistance => Color::Red,
            };
            chart.annotate(
                ChartPoint::new(t.date, t.price),
                format!("{} {:.2}", t.kind.label(), t.price),
                color,
            );
        }
        chart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{candles, path};

    fn series(knots: &[(usize, f64)]) -> Series {
        Series::new("RB", candles(&path(knots))).unwrap()
    }

    fn zigzag() -> Vec<(usize, f64)> {
        vec![
            (0, 110.0),
            (10, 100.0),
            (25, 120.0),
            (40, 100.0),
            (55, 120.0),
            (70, 100.0),
            (85, 120.0),
            (100, 100.0),
            (110, 110.0),
        ]
    }

    #[test]
    fn zigzag_range_is_watch_inside() {
        let s = series(&zigzag());
        let fit = find_range(s.bars()).unwrap();
        assert!((fit.support - 99.5).abs() < 1e-9);
        assert!((fit.resistance - 120.5).abs() < 1e-9);
        assert_eq!(fit.quality(), RangeQuality::Strong);
        assert!(strictly_alternates(&fit.touches));
        assert_eq!(fit.count(TouchKind::Support), 4);
        assert_eq!(fit.count(TouchKind::Resistance), 3);
        assert_eq!(RangeBound.signal(&s), Signal::Watch);

        let report = RangeBound.analyze(&s, None).unwrap();
        assert_eq!(report.target_price, Some(120.5));
        assert_eq!(report.stop_loss, Some(99.5 * 0.97));
        assert_eq!(report.confidence, 95);
    }

    #[test]
    fn price_at_support_is_buy() {
        let mut knots = zigzag();
        knots.truncate(knots.len() - 1);
        assert_eq!(RangeBound.signal(&series(&knots)), Signal::Buy);
    }

    #[test]
    fn repeated_support_touches_rejected() {
        // three support visits in a row before resistance is ever reached
        let s = series(&[
            (0, 110.0),
            (10, 100.0),
            (20, 108.0),
            (30, 100.0),
            (40, 108.0),
            (50, 100.0),
            (65, 120.0),
            (80, 100.0),
            (90, 110.0),
        ]);
        assert!(find_range(s.bars()).is_none());
        assert_eq!(RangeBound.signal(&s), Signal::Neutral);
        assert!(RangeBound.chart_config(&s).is_empty());
    }

    #[test]
    fn chart_draws_levels_and_touches() {
        let chart = RangeBound.chart_config(&series(&zigzag()));
        assert_eq!(chart.overlays.len(), 3);
        assert_eq!(chart.annotations.len(), 7);
        assert!(chart.annotations[0].text.starts_with("Support"));
    }
}
