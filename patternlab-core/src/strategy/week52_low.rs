//! 52-Week Low: buy quality names near their yearly low, target the
//! all-time high.

use crate::chart::{ChartPoint, Color, LineStyle, Overlay, OverlayDescriptor};
use crate::domain::{group, Bar, FundamentalSnapshot, Series, Signal};
use crate::geometry::EPS;
use crate::indicators::stats::{argmax_by, argmin_by, mean_volume};

use super::{close_point, days_between, AnalysisReport, Confidence, Pattern, PatternShape, Strategy};

const MIN_BARS: usize = 240;
const YEAR_BARS: usize = 252;
const MIN_UPSIDE: f64 = 0.20;
const MIN_HIGH_TO_LOW: f64 = 1.15;
const BUY_DISTANCE: f64 = 0.05;
const WATCH_DISTANCE: f64 = 0.10;
const SELL_PROXIMITY: f64 = 0.95;
const STOP_BELOW_LOW: f64 = 0.90;
const VOLUME_WINDOW: usize = 10;

const STEPS: &[&str] = &[
    "1. Monitor quality V40 and V40 Next stocks",
    "2. Identify stocks at or near their 52-week low",
    "3. Require at least 20% upside from the 52-week low to the lifetime high",
    "4. Buy within 5% of the 52-week low",
    "5. Treat the 52-week low as the ideal entry",
    "6. Stop out 10% below the 52-week low",
    "7. Target the lifetime high",
    "8. Averaging down below the entry is allowed",
    "9. Look for volume confirmation while the low forms",
    "10. Exit near the lifetime high or at the stop",
];

/// 52-Week Low strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Week52Low;

#[derive(Debug, Clone, Copy)]
struct Conditions {
    low_index: usize,
    low: f64,
    lifetime_high: f64,
    price: f64,
    days_since_low: i64,
}

impl Conditions {
    fn of(bars: &[Bar]) -> Option<Self> {
        let offset = bars.len().saturating_sub(YEAR_BARS);
        let low_index = offset + argmin_by(&bars[offset..], |b| b.low)?;
        let low = bars[low_index].low;
        if low <= 0.0 {
            return None;
        }
        let last = bars.last()?;
        Some(Self {
            low_index,
            low,
            lifetime_high: bars[argmax_by(bars, |b| b.high)?].high,
            price: last.close,
            days_since_low: days_between(bars[low_index].date, last.date),
        })
    }

    fn distance(&self) -> f64 {
        (self.price - self.low) / self.low
    }

    fn upside(&self) -> f64 {
        (self.lifetime_high - self.low) / self.low
    }

    fn qualified(&self) -> bool {
        self.upside() >= MIN_UPSIDE - EPS && self.lifetime_high > self.low * MIN_HIGH_TO_LOW
    }

    fn signal(&self) -> Signal {
        if !self.qualified() {
            Signal::Neutral
        } else if self.distance() <= BUY_DISTANCE + EPS {
            Signal::Buy
        } else if self.price >= self.lifetime_high * SELL_PROXIMITY {
            Signal::Sell
        } else if self.distance() <= WATCH_DISTANCE + EPS {
            Signal::Watch
        } else {
            Signal::Neutral
        }
    }
}

fn confidence(bars: &[Bar], c: &Conditions, snapshot: Option<&FundamentalSnapshot>) -> u8 {
    let mut score = Confidence::base(30.0);
    score
        .tier_at_most(
            c.distance(),
            &[(0.02 + EPS, 30.0), (0.05 + EPS, 25.0), (0.10 + EPS, 15.0), (0.20 + EPS, 10.0)],
        )
        .tier_above(c.upside(), &[(1.0, 20.0), (0.75, 15.0), (0.50, 10.0), (0.30, 5.0)]);

    let recent = &bars[bars.len().saturating_sub(VOLUME_WINDOW)..];
    if let (Some(recent), Some(overall)) = (mean_volume(recent), mean_volume(bars)) {
        if overall > 0.0 {
            score.tier_above(recent / overall, &[(1.5, 10.0), (1.2, 5.0)]);
        }
    }

    if let Some(s) = snapshot {
        if let Some(pe) = s.pe_ratio().filter(|pe| *pe > 0.0) {
            score.tier_below(pe, &[(15.0, 10.0), (25.0, 5.0)]);
        }
        if let Some(de) = s.debt_to_equity() {
            score.tier_below(de, &[(0.3, 8.0), (0.5, 5.0)]);
        }
        if let Some(roe) = s.return_on_equity() {
            score.tier_above(roe, &[(0.20, 7.0), (0.15, 5.0)]);
        }
    }

    score.tier_at_most(c.days_since_low as f64, &[(5.0, 5.0), (30.0, 3.0)]);
    score.finish()
}

impl Strategy for Week52Low {
    fn name(&self) -> &'static str {
        "week52_low"
    }

    fn display_name(&self) -> &'static str {
        "52-Week Low"
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
        Conditions::of(series.bars()).map_or(Signal::Neutral, |c| c.signal())
    }

    fn analyze(
        &self,
        series: &Series,
        snapshot: Option<&FundamentalSnapshot>,
    ) -> Option<AnalysisReport> {
        if !self.has_enough_data(series) {
            return None;
        }
        let bars = series.bars();
        let c = Conditions::of(bars)?;
        let signal = c.signal();
        let distance_pct = c.distance() * 100.0;

        let reason = match signal {
            Signal::Buy => format!(
                "At the 52-week low ({distance_pct:.1}% above it) with the lifetime high as target"
            ),
            Signal::Sell => "Price near the lifetime high target".to_string(),
            Signal::Watch => format!("Approaching the 52-week low ({distance_pct:.1}% above it)"),
            Signal::Neutral if !c.qualified() => format!(
                "Upside from the 52-week low to the lifetime high is only {:.1}%",
                c.upside() * 100.0
            ),
            Signal::Neutral => format!("Not near the 52-week low ({distance_pct:.1}% above it)"),
        };

        let low_point = ChartPoint::new(bars[c.low_index].date, c.low);
        let score = confidence(bars, &c, snapshot.filter(|s| !s.is_empty()));
        let patterns = if c.qualified() {
            vec![Pattern {
                target_price: c.lifetime_high,
                entry_reference: c.low,
                depth_or_range: c.lifetime_high - c.low,
                quality_score: f64::from(score) / 100.0,
                pattern_start: low_point.date,
                pattern_end: bars[bars.len() - 1].date,
                shape: PatternShape::Week52Low {
                    low: low_point,
                    lifetime_high: c.lifetime_high,
                    distance_from_low: c.distance(),
                    upside: c.upside(),
                },
            }]
        } else {
            Vec::new()
        };

        Some(
            AnalysisReport::new(self.display_name(), signal, c.low)
                .target(Some(c.lifetime_high))
                .stop(Some(c.low * STOP_BELOW_LOW))
                .confidence(score)
                .reason(reason)
                .patterns(patterns)
                .steps(STEPS)
                .metric("week_52_low", c.low)
                .metric("lifetime_high", c.lifetime_high)
                .metric("distance_from_low_pct", distance_pct)
                .metric("upside_pct", c.upside() * 100.0)
                .metric("days_since_low", c.days_since_low as f64)
                .flag("averaging_allowed", true),
        )
    }

    fn chart_config(&self, series: &Series) -> OverlayDescriptor {
        let mut chart = OverlayDescriptor::new();
        if !self.has_enough_data(series) {
            return chart;
        }
        let bars = series.bars();
        let (Some(c), Some(first), Some(last)) = (Conditions::of(bars), bars.first(), series.last())
        else {
            return chart;
        };
        let buy_zone = c.low * (1.0 + BUY_DISTANCE);
        let watch_zone = c.low * (1.0 + WATCH_DISTANCE);
        let stop = c.low * STOP_BELOW_LOW;
        let at = |price: f64| ChartPoint::new(last.date, price);

        chart
            .level(c.lifetime_high, LineStyle::solid(Color::Gold, 3), "Lifetime High (Target)")
            .level(c.low, LineStyle::solid(Color::Red, 3), "52W Low (Entry)")
            .level(buy_zone, LineStyle::dashed(Color::Green, 2), "Buy Zone (+5%)")
            .level(watch_zone, LineStyle::dotted(Color::Orange, 2), "Watch Zone (+10%)")
            .level(stop, LineStyle::dash_dot(Color::DarkRed, 2), "Stop Loss (-10%)")
            .push(Overlay::Rectangle {
                from: ChartPoint::new(first.date, c.low),
                to: at(buy_zone),
                fill: Color::Green,
                opacity: 0.1,
                border: None,
            })
            .push(Overlay::Rectangle {
                from: ChartPoint::new(first.date, buy_zone),
                to: at(watch_zone),
                fill: Color::Orange,
                opacity: 0.1,
                border: None,
            })
            .annotate(at(c.lifetime_high), "Lifetime High (Target)", Color::Gold)
            .annotate(at(c.low), "52W Low (Entry)", Color::Red)
            .annotate(at(buy_zone), "Buy Zone (+5%)", Color::Green)
            .annotate(at(watch_zone), "Watch Zone (+10%)", Color::Orange)
            .annotate(at(stop), "Stop Loss (-10%)", Color::DarkRed)
            .annotate(close_point(last), "Current Price", Color::Blue);
        chart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fundamentals::{DEBT_TO_EQUITY, PE_RATIO, RETURN_ON_EQUITY};
    use crate::strategy::{candles, path};

    /// High of 200 at bar 60, 52-week low of 100 at bar 200, close at `end`.
    fn series(end: f64) -> Series {
        Series::new(
            "W52",
            candles(&path(&[(0, 150.0), (60, 199.5), (200, 100.5), (259, end)])),
        )
        .unwrap()
    }

    #[test]
    fn near_low_is_buy() {
        let s = series(102.0);
        assert_eq!(Week52Low.signal(&s), Signal::Buy);
        let report = Week52Low.analyze(&s, None).unwrap();
        assert_eq!(report.entry_price, 100.0);
        assert_eq!(report.target_price, Some(200.0));
        assert_eq!(report.stop_loss, Some(90.0));
        // 30 base, 30 distance, 15 upside (exactly 100%)
        assert_eq!(report.confidence, 75);
        assert_eq!(report.metrics["averaging_allowed"], 1.0);
    }

    #[test]
    fn snapshot_ratios_add_confidence() {
        let s = series(102.0);
        let snapshot = FundamentalSnapshot::new()
            .with(PE_RATIO, 12.0)
            .with(DEBT_TO_EQUITY, 0.4)
            .with(RETURN_ON_EQUITY, 0.18);
        let report = Week52Low.analyze(&s, Some(&snapshot)).unwrap();
        assert_eq!(report.confidence, 75 + 10 + 5 + 5);
    }

    #[test]
    fn watch_then_neutral_as_price_leaves_low() {
        assert_eq!(Week52Low.signal(&series(108.0)), Signal::Watch);
        assert_eq!(Week52Low.signal(&series(130.0)), Signal::Neutral);
    }

    #[test]
    fn small_upside_never_qualifies() {
        let s = Series::new(
            "W52",
            candles(&path(&[(0, 105.0), (100, 109.5), (200, 100.5), (259, 100.5)])),
        )
        .unwrap();
        assert_eq!(Week52Low.signal(&s), Signal::Neutral);
        let report = Week52Low.analyze(&s, None).unwrap();
        assert_eq!(report.signal, Signal::Neutral);
        assert!(report.patterns.is_empty());
    }

    #[test]
    fn chart_draws_five_levels_and_two_zones() {
        let chart = Week52Low.chart_config(&series(102.0));
        assert_eq!(chart.overlays.len(), 7);
        assert_eq!(chart.annotations.len(), 6);
    }
}
