//! V20: ranges drawn from 20% green-candle runs.
//!
//! Within the last twelve months, every maximal run of consecutive green
//! candles whose high/low span reaches 20% defines a lower (buy) line at the
//! run's lowest low and an upper (sell) line at its highest high.

use chrono::Months;

use crate::chart::{ChartPoint, Color, LineStyle, Overlay, OverlayDescriptor};
use crate::domain::{group, Bar, FundamentalSnapshot, Series, Signal};
use crate::geometry::EPS;

use super::{days_between, AnalysisReport, Confidence, Pattern, PatternShape, Strategy};

const MIN_BARS: usize = 30;
const WINDOW_MONTHS: u32 = 12;
const MIN_WINDOW_BARS: usize = 10;
const MOVEMENT_THRESHOLD: f64 = 0.20;
const MAX_SCANNED: usize = 10;
const MAX_PATTERNS: usize = 5;
const ENTRY_TOLERANCE: f64 = 0.02;
const AVERAGING_GAP: f64 = 0.10;
const STOP_BELOW_LOWER: f64 = 0.95;

const STEPS: &[&str] = &[
    "1. Find green candles, alone or in runs with no red candle in between",
    "2. Measure the run from its lowest low to its highest high",
    "3. Keep runs that moved 20% or more within the last 12 months",
    "4. Lower line = lowest point of the run",
    "5. Upper line = highest point of the run",
    "6. Buy when price retraces to the lower line",
    "7. Average down if price falls 10% or more below the lower line",
    "8. Sell when price returns to the upper line",
    "9. Treat each range independently; wait for a new 20% run after completion",
];

/// V20 strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct V20;

#[derive(Debug, Clone)]
struct GreenRun {
    start: usize,
    end: usize,
    lower: f64,
    upper: f64,
}

impl GreenRun {
    fn movement(&self) -> f64 {
        (self.upper - self.lower) / self.lower
    }

    fn green_count(&self) -> usize {
        self.end - self.start + 1
    }
}

fn find_runs(bars: &[Bar]) -> Vec<GreenRun> {
    let Some(last) = bars.last() else {
        return Vec::new();
    };
    let cutoff = last
        .date
        .checked_sub_months(Months::new(WINDOW_MONTHS))
        .unwrap_or(last.date);
    let offset = bars.partition_point(|b| b.date < cutoff);
    let window = &bars[offset..];
    if window.len() < MIN_WINDOW_BARS {
        return Vec::new();
    }

    let mut runs = Vec::new();
    let mut i = 0;
    while i + 1 < window.len() && runs.len() < MAX_SCANNED {
        if !window[i].is_green() {
            i += 1;
            continue;
        }
        let mut end = i;
        while end + 1 < window.len() && window[end + 1].is_green() {
            end += 1;
        }
        let run = &window[i..=end];
        let lower = run.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let upper = run.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        if lower > 0.0 && (upper - lower) / lower >= MOVEMENT_THRESHOLD - EPS {
            runs.push(GreenRun {
                start: offset + i,
                end: offset + end,
                lower,
                upper,
            });
        }
        i = end + 1;
    }

    runs.sort_by(|a, b| {
        bars[b.end]
            .date
            .cmp(&bars[a.end].date)
            .then(b.movement().total_cmp(&a.movement()))
    });
    runs.truncate(MAX_PATTERNS);
    runs
}

fn evaluate(price: f64, runs: &[GreenRun]) -> Signal {
    for run in runs {
        if price <= run.lower * (1.0 + ENTRY_TOLERANCE) {
            return Signal::Buy;
        }
        if price >= run.upper * (1.0 - ENTRY_TOLERANCE) {
            return Signal::Sell;
        }
        if run.lower < price && price < run.upper {
            return Signal::Watch;
        }
    }
    Signal::Neutral
}

fn confidence(bars: &[Bar], run: &GreenRun) -> u8 {
    let mut c = Confidence::base(50.0);
    c.tier_above(run.movement() * 100.0, &[(30.0, 25.0), (25.0, 20.0), (20.0, 15.0)])
        .tier_at_least(run.green_count() as f64, &[(5.0, 15.0), (3.0, 10.0), (2.0, 5.0)]);
    if let Some(last) = bars.last() {
        let days_old = days_between(bars[run.end].date, last.date) as f64;
        c.tier_below(days_old, &[(30.0, 20.0), (90.0, 15.0), (180.0, 10.0)]);
    }
    let duration = days_between(bars[run.start].date, bars[run.end].date);
    c.add(if (5..=30).contains(&duration) {
        10.0
    } else if (1..=60).contains(&duration) {
        5.0
    } else {
        0.0
    });
    c.finish()
}

fn to_pattern(bars: &[Bar], run: &GreenRun) -> Pattern {
    Pattern {
        target_price: run.upper,
        entry_reference: run.lower,
        depth_or_range: run.upper - run.lower,
        quality_score: f64::from(confidence(bars, run)) / 100.0,
        pattern_start: bars[run.start].date,
        pattern_end: bars[run.end].date,
        shape: PatternShape::V20 {
            lower: run.lower,
            upper: run.upper,
            movement_pct: run.movement() * 100.0,
            green_count: run.green_count(),
            duration_days: days_between(bars[run.start].date, bars[run.end].date),
        },
    }
}

impl Strategy for V20 {
    fn name(&self) -> &'static str {
        "v20"
    }

    fn display_name(&self) -> &'static str {
        "V20"
    }

    fn min_bars(&self) -> usize {
        MIN_BARS
    }

    fn applicable_groups(&self) -> &'static [&'static str] {
        &[group::V40, group::V40_NEXT, group::V200]
    }

    fn signal(&self, series: &Series) -> Signal {
        if !self.has_enough_data(series) {
            return Signal::Neutral;
        }
        series
            .current_price()
            .map_or(Signal::Neutral, |price| evaluate(price, &find_runs(series.bars())))
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
        let runs = find_runs(bars);

        let Some(active) = runs.first() else {
            return Some(
                AnalysisReport::new(self.display_name(), Signal::Neutral, price)
                    .reason("No 20% green candle run in the last 12 months")
                    .steps(STEPS),
            );
        };

        let signal = evaluate(price, &runs);
        let reason = match signal {
            Signal::Buy => format!("Price at or below the lower line ({:.2}) of a 20% green run", active.lower),
            Signal::Sell => format!("Price reached the upper line ({:.2}) of a 20% green run", active.upper),
            Signal::Watch => format!(
                "Price inside the green run range ({:.2} - {:.2})",
                active.lower, active.upper
            ),
            Signal::Neutral => "Price is outside every green run range".to_string(),
        };
        let averaging_down = price <= active.lower * (1.0 - AVERAGING_GAP) + EPS;

        Some(
            AnalysisReport::new(self.display_name(), signal, price)
                .target(Some(active.upper))
                .stop(Some(active.lower * STOP_BELOW_LOWER))
                .confidence(confidence(bars, active))
                .reason(reason)
                .patterns(runs.iter().map(|r| to_pattern(bars, r)).collect())
                .steps(STEPS)
                .metric("lower_line", active.lower)
                .metric("upper_line", active.upper)
                .metric("movement_pct", active.movement() * 100.0)
                .flag("averaging_down", averaging_down),
        )
    }

    fn chart_config(&self, series: &Series) -> OverlayDescriptor {
        let mut chart = OverlayDescriptor::new();
        if !self.has_enough_data(series) {
            return chart;
        }
        let bars = series.bars();
        for (i, run) in find_runs(bars).iter().enumerate() {
            let (start, end) = (bars[run.start].date, bars[run.end].date);
            chart.push(Overlay::Segment {
                from: ChartPoint::new(start, run.lower),
                to: ChartPoint::new(end, run.lower),
                style: LineStyle::solid(Color::Green, 2),
                label: Some(format!("Lower Line {}", i + 1)),
            });
            chart.push(Overlay::Segment {
                from: ChartPoint::new(start, run.upper),
                to: ChartPoint::new(end, run.upper),
                style: LineStyle::solid(Color::Red, 2),
                label: Some(format!("Upper Line {}", i + 1)),
            });
            chart
                .annotate(ChartPoint::new(start, run.lower), format!("Buy Line {}", i + 1), Color::Green)
                .annotate(ChartPoint::new(end, run.upper), format!("Sell Line {}", i + 1), Color::Red);
        }
        chart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap() + chrono::Duration::days(day),
            open,
            high,
            low,
            close,
            volume: 1_000,
        }
    }

    /// Doji padding, a four-candle green run from 100 to `top`, then dojis at `tail`.
    fn run_series(lead: usize, top: f64, tail: f64) -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..lead)
            .map(|d| bar(d as i64, 125.0, 125.5, 124.5, 125.0))
            .collect();
        let d = lead as i64;
        bars.push(bar(d, 101.0, 106.0, 100.0, 105.0));
        bars.push(bar(d + 1, 105.0, 111.0, 104.0, 110.0));
        bars.push(bar(d + 2, 110.0, 116.0, 109.0, 115.0));
        bars.push(bar(d + 3, 115.0, top, 114.0, 119.0));
        for k in 0..6 {
            bars.push(bar(d + 4 + k, tail, tail + 0.5, tail - 0.5, tail));
        }
        bars
    }

    #[test]
    fn exact_twenty_percent_run_qualifies() {
        let runs = find_runs(&run_series(20, 120.0, 118.0));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].green_count(), 4);
        assert_eq!((runs[0].lower, runs[0].upper), (100.0, 120.0));
    }

    #[test]
    fn just_below_twenty_percent_does_not() {
        assert!(find_runs(&run_series(20, 119.99, 118.0)).is_empty());
    }

    #[test]
    fn signals_follow_lines() {
        let at = |tail: f64| V20.signal(&Series::new("V", run_series(20, 120.0, tail)).unwrap());
        assert_eq!(at(118.0), Signal::Sell);
        assert_eq!(at(101.0), Signal::Buy);
        assert_eq!(at(110.0), Signal::Watch);
    }

    #[test]
    fn minimum_length_gate() {
        let short = Series::new("V", run_series(19, 120.0, 118.0)).unwrap();
        assert_eq!(short.len(), 29);
        assert_eq!(V20.signal(&short), Signal::Neutral);
        assert!(V20.analyze(&short, None).is_none());
    }

    #[test]
    fn averaging_down_flag() {
        let s = Series::new("V", run_series(20, 120.0, 89.0)).unwrap();
        let report = V20.analyze(&s, None).unwrap();
        assert_eq!(report.signal, Signal::Buy);
        assert_eq!(report.metrics["averaging_down"], 1.0);
        assert_eq!(report.stop_loss, Some(95.0));
        assert_eq!(report.target_price, Some(120.0));
    }
}
