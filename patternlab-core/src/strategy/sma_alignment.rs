//! SMA Alignment (contrarian).
//!
//! Compares the last close with the 20/50/200-day simple moving averages.
//! A fully bearish stack (price < MA20 < MA50 < MA200) is a Buy, a fully
//! bullish stack is a Sell, anything else is Neutral. Strict comparisons only.

use crate::chart::{ChartPoint, Color, LineStyle, Overlay, OverlayDescriptor};
use crate::domain::{group, Bar, FundamentalSnapshot, Series, Signal};
use crate::indicators::stats::mean_volume;
use crate::indicators::{Ema, Indicator, Rsi, Sma};

use super::{close_point, Alignment, AnalysisReport, Confidence, Pattern, PatternShape, Strategy};

const MIN_BARS: usize = 200;
const VOLUME_WINDOW: usize = 20;

const STEPS: &[&str] = &[
    "1. Plot the 20-day (green), 50-day (red) and 200-day (blue) simple moving averages",
    "2. Buy when price < SMA20 < SMA50 < SMA200, all conditions together",
    "3. Sell when price > SMA20 > SMA50 > SMA200, all conditions together",
    "4. Trade against the stretched trend: buy deep downtrends, sell extended uptrends",
    "5. Target a reversion to the 20-day average; stop at the 200-day average",
];

/// SMA Alignment strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmaAlignment;

#[derive(Debug, Clone, Copy)]
struct Stack {
    price: f64,
    sma20: f64,
    sma50: f64,
    sma200: f64,
}

impl Stack {
    fn of(bars: &[Bar]) -> Option<Self> {
        Some(Self {
            price: bars.last()?.close,
            sma20: Sma::new(20).latest(bars)?,
            sma50: Sma::new(50).latest(bars)?,
            sma200: Sma::new(200).latest(bars)?,
        })
    }

    fn alignment(&self) -> Alignment {
        let Self {
            price,
            sma20,
            sma50,
            sma200,
        } = *self;
        if price < sma20 && sma20 < sma50 && sma50 < sma200 {
            Alignment::BelowStack
        } else if price > sma20 && sma20 > sma50 && sma50 > sma200 {
            Alignment::AboveStack
        } else {
            Alignment::Mixed
        }
    }

    fn signal(&self) -> Signal {
        match self.alignment() {
            Alignment::BelowStack => Signal::Buy,
            Alignment::AboveStack => Signal::Sell,
            Alignment::Mixed => Signal::Neutral,
        }
    }

    fn vs(&self, average: f64) -> f64 {
        (self.price - average) / average * 100.0
    }
}

fn confidence(bars: &[Bar], stack: &Stack) -> u8 {
    let aligned = stack.alignment() != Alignment::Mixed;
    let volume_up = match (bars.last(), mean_volume(&bars[bars.len().saturating_sub(VOLUME_WINDOW)..])) {
        (Some(last), Some(avg)) => last.volume as f64 > avg,
        _ => false,
    };
    let mut c = Confidence::base(0.0);
    c.add_if(aligned, 30.0)
        .add(if volume_up { 20.0 } else { 10.0 })
        .add_if(aligned, 25.0)
        .add_if(bars.len() > 10, 25.0);
    c.finish()
}

/// Indicator line with warmup bars dropped.
fn line(bars: &[Bar], indicator: &dyn Indicator) -> Vec<ChartPoint> {
    bars.iter()
        .zip(indicator.compute(bars))
        .filter(|(_, v)| v.is_finite())
        .map(|(b, v)| ChartPoint::new(b.date, v))
        .collect()
}

impl Strategy for SmaAlignment {
    fn name(&self) -> &'static str {
        "sma_alignment"
    }

    fn display_name(&self) -> &'static str {
        "SMA Alignment"
    }

    fn min_bars(&self) -> usize {
        MIN_BARS
    }

    fn applicable_groups(&self) -> &'static [&'static str] {
        &[group::V40]
    }

    fn signal(&self, series: &Series) -> Signal {
        if !self.has_enough_data(series) {
            return Signal::Neutral;
        }
        Stack::of(series.bars()).map_or(Signal::Neutral, |s| s.signal())
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
        let stack = Stack::of(bars)?;
        let alignment = stack.alignment();
        let signal = stack.signal();
        let reason = match alignment {
            Alignment::BelowStack => {
                "Bearish alignment (Price < SMA20 < SMA50 < SMA200): contrarian buy"
            }
            Alignment::AboveStack => {
                "Bullish alignment (Price > SMA20 > SMA50 > SMA200): contrarian sell"
            }
            Alignment::Mixed => "Moving averages are not stacked for a buy or sell",
        };
        let score = confidence(bars, &stack);

        let patterns = if alignment == Alignment::Mixed {
            Vec::new()
        } else {
            vec![Pattern {
                target_price: stack.sma20,
                entry_reference: stack.price,
                depth_or_range: (stack.sma200 - stack.price).abs(),
                quality_score: f64::from(score) / 100.0,
                pattern_start: bars[bars.len() - MIN_BARS].date,
                pattern_end: bars[bars.len() - 1].date,
                shape: PatternShape::SmaAlignment {
                    price: stack.price,
                    sma20: stack.sma20,
                    sma50: stack.sma50,
                    sma200: stack.sma200,
                    alignment,
                },
            }]
        };

        let mut report = AnalysisReport::new(self.display_name(), signal, stack.price)
            .target(Some(stack.sma20))
            .stop((signal == Signal::Buy).then_some(stack.sma200))
            .confidence(score)
            .reason(reason)
            .patterns(patterns)
            .steps(STEPS)
            .metric("sma_20", stack.sma20)
            .metric("sma_50", stack.sma50)
            .metric("sma_200", stack.sma200)
            .metric("price_vs_sma_20", stack.vs(stack.sma20))
            .metric("price_vs_sma_50", stack.vs(stack.sma50))
            .metric("price_vs_sma_200", stack.vs(stack.sma200));
        if let Some(ema) = Ema::new(20).latest(bars) {
            report = report.metric("ema_20", ema);
        }
        if let Some(rsi) = Rsi::new(14).latest(bars) {
            report = report.metric("rsi_14", rsi);
        }
        Some(report)
    }

    fn chart_config(&self, series: &Series) -> OverlayDescriptor {
        let mut chart = OverlayDescriptor::new();
        if !self.has_enough_data(series) {
            return chart;
        }
        let bars = series.bars();
        for (period, color, width) in [(20, Color::Green, 2), (50, Color::Red, 2), (200, Color::Blue, 3)] {
            let sma = Sma::new(period);
            chart.push(Overlay::Series {
                name: format!("SMA {period}"),
                points: line(bars, &sma),
                style: LineStyle::solid(color, width),
            });
        }
        if let (Some(stack), Some(last)) = (Stack::of(bars), series.last()) {
            match stack.signal() {
                Signal::Buy => {
                    chart.annotate(close_point(last), "Buy Signal", Color::Green);
                }
                Signal::Sell => {
                    chart.annotate(close_point(last), "Sell Signal", Color::Red);
                }
                _ => {}
            }
        }
        chart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn series(closes: &[f64]) -> Series {
        Series::new("SMA", make_bars(closes)).unwrap()
    }

    #[test]
    fn steady_decline_is_contrarian_buy() {
        let closes: Vec<f64> = (0..260).map(|i| 300.0 - i as f64 * 0.5).collect();
        let s = series(&closes);
        assert_eq!(SmaAlignment.signal(&s), Signal::Buy);
        let report = SmaAlignment.analyze(&s, None).unwrap();
        assert_eq!(report.signal, Signal::Buy);
        assert!(report.stop_loss.is_some());
        assert!(report.metrics.contains_key("rsi_14"));
        // volume is flat, so only the +10 volume score
        assert_eq!(report.confidence, 90);
        assert_eq!(report.patterns.len(), 1);
    }

    #[test]
    fn steady_rise_is_contrarian_sell() {
        let closes: Vec<f64> = (0..260).map(|i| 100.0 + i as f64 * 0.5).collect();
        let s = series(&closes);
        assert_eq!(SmaAlignment.signal(&s), Signal::Sell);
        let report = SmaAlignment.analyze(&s, None).unwrap();
        assert_eq!(report.stop_loss, None);
    }

    #[test]
    fn flat_prices_are_neutral() {
        let s = series(&[50.0; 220]);
        assert_eq!(SmaAlignment.signal(&s), Signal::Neutral);
        let report = SmaAlignment.analyze(&s, None).unwrap();
        assert!(report.patterns.is_empty());
        assert_eq!(report.confidence, 35);
    }

    #[test]
    fn insufficient_history() {
        let s = series(&[50.0; 199]);
        assert_eq!(SmaAlignment.signal(&s), Signal::Neutral);
        assert!(SmaAlignment.analyze(&s, None).is_none());
    }

    #[test]
    fn chart_has_three_lines_without_warmup() {
        let closes: Vec<f64> = (0..210).map(|i| 300.0 - i as f64).collect();
        let chart = SmaAlignment.chart_config(&series(&closes));
        let lens: Vec<usize> = chart
            .overlays
            .iter()
            .map(|o| match o {
                Overlay::Series { points, .. } => points.len(),
                _ => 0,
            })
            .collect();
        assert_eq!(lens, vec![191, 161, 11]);
        assert_eq!(chart.annotations[0].text, "Buy Signal");
    }
}
