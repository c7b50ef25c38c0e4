//! Lifetime High: buy best-in-class names at a discount to their peak.
//!
//! A stock qualifies when it trades no more than 30% below its all-time high
//! and its fundamentals look strong. With a snapshot the test uses reported
//! growth and margins; without one it falls back to a price/volume proxy.
//! The target is always the lifetime high.

use crate::chart::{ChartPoint, Color, LineStyle, OverlayDescriptor};
use crate::domain::{group, Bar, FundamentalSnapshot, Series, Signal};
use crate::geometry::EPS;
use crate::indicators::stats::{argmax_by, coefficient_of_variation, mean_volume, month_end_closes, pct_change};

use super::{close_point, AnalysisReport, Confidence, FundamentalsSource, Pattern, PatternShape, Strategy};

const MIN_BARS: usize = 100;
const MAX_DISCOUNT: f64 = 0.30;
const BUY_DISCOUNT: f64 = 0.20;
const WATCH_DISCOUNT: f64 = 0.15;
const SELL_PROXIMITY: f64 = 0.95;
const PROXY_WINDOW: usize = 30;
const PROXY_VOLUME_RATIO: f64 = 1.2;
const PROXY_MONTHS: usize = 6;
const PROXY_POSITIVE_MONTHS: usize = 4;
const STOP_BELOW_PRICE: f64 = 0.9;

const STEPS: &[&str] = &[
    "1. Look for companies posting lifetime-high trailing revenue and profit",
    "2. Restrict to best-in-class V40 and V40 Next companies",
    "3. Require price within 30% of the lifetime high",
    "4. Confirm strong growth, margins and returns on equity",
    "5. Buy when price sits 20-30% below the lifetime high",
    "6. Average on further declines only if trailing numbers are not at their peak",
    "7. Do not average when trailing numbers are at their highest",
    "8. Target the lifetime high",
    "9. Aim for a 30-40% gain per trade",
];

/// Lifetime High strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifetimeHigh;

#[derive(Debug, Clone, Copy)]
struct Strength {
    good: bool,
    at_highest: bool,
    source: FundamentalsSource,
}

#[derive(Debug, Clone, Copy)]
struct Conditions {
    high_index: usize,
    lifetime_high: f64,
    price: f64,
    discount: f64,
    strength: Strength,
}

impl Conditions {
    fn qualified(&self) -> bool {
        self.discount <= MAX_DISCOUNT + EPS && self.strength.good
    }

    fn signal(&self) -> Signal {
        if !self.qualified() {
            Signal::Neutral
        } else if self.discount >= BUY_DISCOUNT - EPS {
            Signal::Buy
        } else if self.price >= self.lifetime_high * SELL_PROXIMITY {
            Signal::Sell
        } else if self.discount >= WATCH_DISCOUNT - EPS {
            Signal::Watch
        } else {
            Signal::Neutral
        }
    }
}

fn snapshot_strength(snapshot: &FundamentalSnapshot) -> Strength {
    let revenue = snapshot.revenue_growth().unwrap_or(0.0);
    let earnings = snapshot.earnings_growth().unwrap_or(0.0);
    let margins = snapshot.profit_margins().unwrap_or(0.0);
    let good = revenue > 0.10 && earnings > 0.15 && margins > 0.15;
    Strength {
        good,
        at_highest: good && revenue > 0.20 && earnings > 0.25,
        source: FundamentalsSource::Snapshot,
    }
}

/// Two of three: rising participation, calmer recent trading, mostly
/// positive recent months.
fn proxy_strength(bars: &[Bar]) -> Strength {
    let recent = &bars[bars.len().saturating_sub(PROXY_WINDOW)..];

    let volume = match (mean_volume(recent), mean_volume(bars)) {
        (Some(r), Some(all)) => r > all * PROXY_VOLUME_RATIO,
        _ => false,
    };

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let recent_closes = &closes[closes.len().saturating_sub(PROXY_WINDOW)..];
    let stability = match (
        coefficient_of_variation(recent_closes),
        coefficient_of_variation(&closes),
    ) {
        (Some(r), Some(all)) => r <= all,
        _ => false,
    };

    let monthly = pct_change(&month_end_closes(bars));
    let tail = &monthly[monthly.len().saturating_sub(PROXY_MONTHS)..];
    let consistency = tail.iter().filter(|r| **r > 0.0).count() >= PROXY_POSITIVE_MONTHS;

    let passed = [volume, stability, consistency].iter().filter(|b| **b).count();
    Strength {
        good: passed >= 2,
        at_highest: false,
        source: FundamentalsSource::PriceVolumeProxy,
    }
}

fn conditions(bars: &[Bar], snapshot: Option<&FundamentalSnapshot>) -> Option<Conditions> {
    let high_index = argmax_by(bars, |b| b.high)?;
    let lifetime_high = bars[high_index].high;
    let price = bars.last()?.close;
    if lifetime_high <= 0.0 {
        return None;
    }
    let strength = match snapshot {
        Some(s) if !s.is_empty() => snapshot_strength(s),
        _ => proxy_strength(bars),
    };
    Some(Conditions {
        high_index,
        lifetime_high,
        price,
        discount: (lifetime_high - price) / lifetime_high,
        strength,
    })
}

fn confidence(c: &Conditions, snapshot: Option<&FundamentalSnapshot>) -> u8 {
    let mut score = Confidence::base(40.0);
    score.tier_at_least(c.discount, &[(0.25, 25.0), (0.20, 20.0), (0.15, 15.0)]);
    if c.strength.good {
        score.add(20.0).add_if(c.strength.at_highest, 10.0);
    }
    if let Some(s) = snapshot {
        score
            .add_if(s.pe_ratio().is_some_and(|pe| pe > 0.0 && pe < 20.0), 5.0)
            .add_if(s.debt_to_equity().is_some_and(|de| de < 0.5), 5.0)
            .add_if(s.return_on_equity().is_some_and(|roe| roe > 0.15), 5.0);
    }
    score.add(5.0);
    score.finish()
}

impl Strategy for LifetimeHigh {
    fn name(&self) -> &'static str {
        "lifetime_high"
    }

    fn display_name(&self) -> &'static str {
        "Lifetime High"
    }

    fn min_bars(&self) -> usize {
        MIN_BARS
    }

    fn applicable_groups(&self) -> &'static [&'static str] {
        &[group::V40, group::V40_NEXT]
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
        let c = conditions(bars, snapshot)?;
        let signal = c.signal();

        let reason = match signal {
            Signal::Buy => format!(
                "Strong fundamentals with a {:.1}% discount from the lifetime high",
                c.discount * 100.0
            ),
            Signal::Sell => "Price near the lifetime high target".to_string(),
            Signal::Watch => "Good fundamentals, waiting for a deeper discount".to_string(),
            Signal::Neutral => {
                let mut parts = Vec::new();
                if !c.strength.good {
                    parts.push("Fundamentals not strong enough");
                }
                if c.discount > MAX_DISCOUNT {
                    parts.push("More than 30% below the lifetime high");
                } else if c.discount < BUY_DISCOUNT {
                    parts.push("Insufficient discount from the lifetime high");
                }
                if parts.is_empty() {
                    "Conditions not met".to_string()
                } else {
                    parts.join("; ")
                }
            }
        };

        let high_point = ChartPoint::new(bars[c.high_index].date, c.lifetime_high);
        let patterns = if c.qualified() {
            vec![Pattern {
                target_price: c.lifetime_high,
                entry_reference: c.lifetime_high * (1.0 - BUY_DISCOUNT),
                depth_or_range: c.lifetime_high - c.price,
                quality_score: 1.0 - c.discount,
                pattern_start: high_point.date,
                pattern_end: bars[bars.len() - 1].date,
                shape: PatternShape::LifetimeHigh {
                    lifetime_high: high_point,
                    discount: c.discount,
                    fundamentals_good: c.strength.good,
                    at_highest: c.strength.at_highest,
                    fundamentals_source: c.strength.source,
                },
            }]
        } else {
            Vec::new()
        };

        let averaging_allowed = signal != Signal::Buy || !c.strength.at_highest;
        Some(
            AnalysisReport::new(self.display_name(), signal, c.price)
                .target(Some(c.lifetime_high))
                .stop(Some(c.price * STOP_BELOW_PRICE))
                .confidence(confidence(&c, snapshot.filter(|s| !s.is_empty())))
                .reason(reason)
                .patterns(patterns)
                .steps(STEPS)
                .metric("lifetime_high", c.lifetime_high)
                .metric("discount_pct", c.discount * 100.0)
                .flag("fundamentals_good", c.strength.good)
                .flag("at_highest", c.strength.at_highest)
                .flag("averaging_allowed", averaging_allowed),
        )
    }

    fn chart_config(&self, series: &Series) -> OverlayDescriptor {
        let mut chart = OverlayDescriptor::new();
        if !self.has_enough_data(series) {
            return chart;
        }
        let (Some(c), Some(last)) = (conditions(series.bars(), None), series.last()) else {
            return chart;
        };
        let lh = c.lifetime_high;
        let at = |price: f64| ChartPoint::new(last.date, price);
        chart
            .level(lh, LineStyle::solid(Color::Gold, 3), "Lifetime High")
            .level(lh * 0.7, LineStyle::dashed(Color::Green, 2), "30% Discount")
            .level(lh * 0.8, LineStyle::dotted(Color::Orange, 2), "20% Discount")
            .annotate(at(lh), "Lifetime High", Color::Gold)
            .annotate(at(lh * 0.7), "30% Discount", Color::Green)
            .annotate(at(lh * 0.8), "20% Discount", Color::Orange)
            .annotate(close_point(last), "Current", Color::Blue);
        chart
    }
}
