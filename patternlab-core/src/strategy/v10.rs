//! V10: buy a 10% fall from a recent high, sell the full reversal.
//!
//! Each strict pivot high of the last six months is paired with the lowest
//! low that followed it. Falls of 10% or more that bottomed within the last
//! 90 days become opportunities with a buy level 2% above the low and the
//! high itself as target. Opportunities with buy levels within 5% of a
//! better-ranked one are dropped.

use chrono::NaiveDate;

use crate::chart::{ChartPoint, Color, LineStyle, OverlayDescriptor};
use crate::domain::{group, Bar, FundamentalSnapshot, Series, Signal};
use crate::geometry::{retain_recent, scan_highs, PivotArena, Strictness, EPS};
use crate::indicators::stats::{argmin_by, mean_volume};

use super::{days_between, AnalysisReport, Confidence, Pattern, PatternShape, Strategy};

const MIN_BARS: usize = 50;
const PEAK_WINDOW: usize = 5;
const PEAK_RECENCY_DAYS: i64 = 180;
const MIN_BARS_AFTER_HIGH: usize = 10;
const FALL_THRESHOLD: f64 = 0.10;
const BUY_ABOVE_LOW: f64 = 1.02;
const MAX_AGE_DAYS: i64 = 90;
const MIN_GAP: f64 = 0.05;
const MAX_OPPORTUNITIES: usize = 3;
const ENTRY_TOLERANCE: f64 = 0.02;
const STOP_BELOW_LOW: f64 = 0.95;

const STEPS: &[&str] = &[
    "1. Use V10 as an add-on once a stock qualifies under a base pattern",
    "2. Track strict pivot highs from the last six months",
    "3. Flag a fall of 10% or more from a high to its subsequent low",
    "4. Enter 2% above the low as the reversal begins",
    "5. Target the full reversal back to the high",
    "6. Space repeated V10 entries at least 5% apart",
    "7. Ignore falls that bottomed more than 90 days ago",
    "8. Apply only to V40 and V40 Next companies",
];

/// V10 strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct V10;

#[derive(Debug, Clone)]
struct Opportunity {
    high_index: usize,
    high: f64,
    low_index: usize,
    low: f64,
    age_days: i64,
}

impl Opportunity {
    fn fall(&self) -> f64 {
        (self.high - self.low) / self.high
    }

    fn buy_level(&self) -> f64 {
        self.low * BUY_ABOVE_LOW
    }

    /// Full reversal of the fall: the high itself.
    fn target(&self) -> f64 {
        self.low + (self.high - self.low)
    }
}

fn find_opportunities(bars: &[Bar]) -> Vec<Opportunity> {
    let Some(last) = bars.last() else {
        return Vec::new();
    };
    let mut highs = scan_highs(bars, PEAK_WINDOW, Strictness::Strict);
    retain_recent(&mut highs, last.date, PEAK_RECENCY_DAYS);
    let arena = PivotArena::new(highs);

    let mut found: Vec<Opportunity> = arena
        .points()
        .iter()
        .filter_map(|high| {
            let after = &bars[high.index..];
            if after.len() < MIN_BARS_AFTER_HIGH || high.price <= 0.0 {
                return None;
            }
            let low_index = high.index + argmin_by(after, |b| b.low)?;
            let opportunity = Opportunity {
                high_index: high.index,
                high: high.price,
                low_index,
                low: bars[low_index].low,
                age_days: days_between(bars[low_index].date, last.date),
            };
            (opportunity.fall() >= FALL_THRESHOLD - EPS && opportunity.age_days <= MAX_AGE_DAYS)
                .then_some(opportunity)
        })
        .collect();

    found.sort_by(|a, b| {
        a.age_days
            .cmp(&b.age_days)
            .then(b.fall().total_cmp(&a.fall()))
    });

    let mut kept: Vec<Opportunity> = Vec::new();
    for opp in found {
        let crowded = kept
            .iter()
            .any(|k| (opp.buy_level() - k.buy_level()).abs() / k.buy_level() < MIN_GAP);
        if !crowded {
            kept.push(opp);
        }
        if kept.len() == MAX_OPPORTUNITIES {
            break;
        }
    }
    kept
}

fn evaluate(price: f64, opportunities: &[Opportunity]) -> Signal {
    if opportunities.is_empty() {
        return Signal::Neutral;
    }
    for opp in opportunities {
        if price <= opp.buy_level() * (1.0 + ENTRY_TOLERANCE) {
            return Signal::Buy;
        }
        if price >= opp.target() * (1.0 - ENTRY_TOLERANCE) {
            return Signal::Sell;
        }
    }
    Signal::Watch
}

fn confidence(bars: &[Bar], opp: &Opportunity) -> u8 {
    let mut c = Confidence::base(60.0);
    c.tier_above(opp.fall() * 100.0, &[(15.0, 20.0), (12.0, 15.0), (10.0, 10.0)])
        .tier_at_most(opp.age_days as f64, &[(30.0, 15.0), (60.0, 10.0), (90.0, 5.0)]);
    let fall_volume = mean_volume(&bars[opp.high_index..=opp.low_index]);
    if let (Some(fall), Some(overall)) = (fall_volume, mean_volume(bars)) {
        c.add_if(fall > overall, 5.0);
    }
    c.finish()
}

fn date(bars: &[Bar], index: usize) -> NaiveDate {
    bars[index].date
}

fn to_pattern(bars: &[Bar], opp: &Opportunity) -> Pattern {
    Pattern {
        target_price: opp.target(),
        entry_reference: opp.buy_level(),
        depth_or_range: opp.high - opp.low,
        quality_score: f64::from(confidence(bars, opp)) / 100.0,
        pattern_start: date(bars, opp.high_index),
        pattern_end: date(bars, opp.low_index),
        shape: PatternShape::V10 {
            high: ChartPoint::new(date(bars, opp.high_index), opp.high),
            low: ChartPoint::new(date(bars, opp.low_index), opp.low),
            fall_pct: opp.fall() * 100.0,
            buy_level: opp.buy_level(),
            age_days: opp.age_days,
        },
    }
}

impl Strategy for V10 {
    fn name(&self) -> &'static str {
        "v10"
    }

    fn display_name(&self) -> &'static str {
        "V10"
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
        series.current_price().map_or(Signal::Neutral, |price| {
            evaluate(price, &find_opportunities(series.bars()))
        })
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
        let opportunities = find_opportunities(bars);

        let Some(active) = opportunities.first() else {
            return Some(
                AnalysisReport::new(self.display_name(), Signal::Neutral, price)
                    .reason("No 10% fall from a recent high within the last 90 days")
                    .steps(STEPS),
            );
        };

        let signal = evaluate(price, &opportunities);
        let reason = match signal {
            Signal::Buy => format!(
                "{:.1}% fall from {:.2} to {:.2}; price at the buy level",
                active.fall() * 100.0,
                active.high,
                active.low
            ),
            Signal::Sell => "Reversal target reached".to_string(),
            _ => "Monitoring a 10% fall for its reversal".to_string(),
        };

        Some(
            AnalysisReport::new(self.display_name(), signal, active.buy_level())
                .target(Some(active.target()))
                .stop(Some(active.low * STOP_BELOW_LOW))
                .confidence(confidence(bars, active))
                .reason(reason)
                .patterns(opportunities.iter().map(|o| to_pattern(bars, o)).collect())
                .steps(STEPS)
                .metric("fall_pct", active.fall() * 100.0)
                .metric("high_price", active.high)
                .metric("low_price", active.low)
                .metric("opportunity_age_days", active.age_days as f64),
        )
    }

    fn chart_config(&self, series: &Series) -> OverlayDescriptor {
        let mut chart = OverlayDescriptor::new();
        if !self.has_enough_data(series) {
            return chart;
        }
        let bars = series.bars();
        for (i, opp) in find_opportunities(bars).iter().enumerate() {
            let high = ChartPoint::new(date(bars, opp.high_index), opp.high);
            let low = ChartPoint::new(date(bars, opp.low_index), opp.low);
            chart
                .segment(high, low, LineStyle::solid(Color::Red, 3))
                .level(opp.target(), LineStyle::dotted(Color::Green, 2), "V10 Target")
                .annotate(high, format!("V10 High {}", i + 1), Color::Red)
                .annotate(low, "10% Fall", Color::Red)
                .annotate(ChartPoint::new(low.date, opp.target()), "V10 Target", Color::Green);
        }
        chart
    }
}
