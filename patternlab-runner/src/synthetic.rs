//! Seeded equity-like price paths for development and demos.
//!
//! Each `(symbol, horizon)` pair gets its own BLAKE3-derived seed, so the
//! same request always yields the same bars regardless of scan order.
//!
//! The path is a geometric walk with Gaussian daily log-returns, a small
//! upward drift and volatility that switches between calm and turbulent
//! regimes, which is enough to produce the swings, ranges and drawdowns the
//! pattern strategies look for. Volume rises with the size of the move.
//! These series are clearly fake.

use std::f64::consts::TAU;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use patternlab_core::data::{DataError, DataSource};
use patternlab_core::domain::fundamentals::{
    DEBT_TO_EQUITY, EARNINGS_GROWTH, PE_RATIO, PROFIT_MARGINS, RETURN_ON_EQUITY, REVENUE_GROWTH,
};
use patternlab_core::domain::{Bar, FundamentalSnapshot, Horizon, Series};
use patternlab_core::fingerprint::symbol_seed;

/// Calendar days generated for `Horizon::Max`.
const MAX_HORIZON_DAYS: i64 = 3_652;
/// Daily chance of switching volatility regime.
const REGIME_SWITCH: f64 = 0.025;
const TURBULENT_FACTOR: f64 = 2.2;
/// Share of daily volatility that shows up as an overnight gap.
const GAP_SHARE: f64 = 0.3;

/// Standard normal draw (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// Geometric-walk source ending at a fixed date.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    end: NaiveDate,
    start_price: f64,
    /// Mean daily log-return.
    drift: f64,
    /// Daily log-return standard deviation in the calm regime.
    volatility: f64,
}

impl SyntheticSource {
    pub fn new(end: NaiveDate) -> Self {
        Self {
            end,
            start_price: 100.0,
            drift: 0.0003,
            volatility: 0.012,
        }
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    pub fn with_drift(mut self, daily: f64) -> Self {
        self.drift = daily;
        self
    }

    pub fn with_volatility(mut self, daily: f64) -> Self {
        self.volatility = daily.abs();
        self
    }

    /// Weekday bars from `end - horizon` through `end`.
    pub fn generate(&self, symbol: &str, horizon: Horizon) -> Vec<Bar> {
        let mut rng = StdRng::seed_from_u64(symbol_seed(symbol, horizon));
        let days = horizon.days().unwrap_or(MAX_HORIZON_DAYS);
        let base_volume = rng.gen_range(300_000.0..3_000_000.0_f64);

        let mut bars = Vec::new();
        let mut close = self.start_price;
        let mut turbulent = false;
        let mut date = self.end - Duration::days(days);
        while date <= self.end {
            let day = date;
            date += Duration::days(1);
            if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }

            if rng.gen_bool(REGIME_SWITCH) {
                turbulent = !turbulent;
            }
            let sigma = if turbulent {
                self.volatility * TURBULENT_FACTOR
            } else {
                self.volatility
            };

            let open = close * (GAP_SHARE * sigma * gaussian(&mut rng)).exp();
            let ret = self.drift + sigma * gaussian(&mut rng);
            close = open * ret.exp();

            let wick = |rng: &mut StdRng| (0.5 * sigma * gaussian(rng).abs()).min(0.5);
            let high = open.max(close) * (1.0 + wick(&mut rng));
            let low = open.min(close) * (1.0 - wick(&mut rng));
            let participation = 1.0 + 8.0 * ret.abs() + 0.3 * gaussian(&mut rng).abs();

            bars.push(Bar {
                date: day,
                open,
                high,
                low,
                close,
                volume: (base_volume * participation).round() as u64,
            });
        }
        bars
    }
}

impl DataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_series(&self, symbol: &str, horizon: Horizon) -> Result<Series, DataError> {
        Series::new(symbol, self.generate(symbol, horizon)).map_err(|source| {
            DataError::MalformedSeries {
                symbol: symbol.to_string(),
                source,
            }
        })
    }

    /// Plausible ratios drawn from the symbol's seed.
    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError> {
        let mut rng = StdRng::seed_from_u64(symbol_seed(symbol, Horizon::Max) ^ 0x5eed);
        Ok(FundamentalSnapshot::new()
            .with(REVENUE_GROWTH, rng.gen_range(-0.05..0.35))
            .with(EARNINGS_GROWTH, rng.gen_range(-0.10..0.40))
            .with(PROFIT_MARGINS, rng.gen_range(0.02..0.30))
            .with(PE_RATIO, rng.gen_range(8.0..45.0))
            .with(DEBT_TO_EQUITY, rng.gen_range(0.0..1.5))
            .with(RETURN_ON_EQUITY, rng.gen_range(0.02..0.35)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SyntheticSource {
        SyntheticSource::new(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
    }

    #[test]
    fn walk_is_deterministic_and_valid() {
        let a = source().fetch_series("AAA", Horizon::OneYear).unwrap();
        let b = source().fetch_series("AAA", Horizon::OneYear).unwrap();
        assert_eq!(a, b);
        assert!(a.len() > 250 && a.len() < 265);
        assert!(a
            .bars()
            .iter()
            .all(|bar| !matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn symbols_get_different_walks() {
        let a = source().generate("AAA", Horizon::OneYear);
        let b = source().generate("BBB", Horizon::OneYear);
        assert_ne!(a, b);
    }

    #[test]
    fn turbulence_widens_the_spread_of_returns() {
        let spread = |vol: f64| {
            let bars = source().with_volatility(vol).generate("AAA", Horizon::TwoYears);
            let returns: Vec<f64> = bars.windows(2).map(|w| (w[1].close / w[0].close).ln()).collect();
            let mean = returns.iter().sum::<f64>() / returns.len() as f64;
            (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64).sqrt()
        };
        assert!(spread(0.03) > 2.0 * spread(0.01));
    }

    #[test]
    fn drift_pushes_prices_up() {
        let last = |drift: f64| {
            let bars = source()
                .with_volatility(0.0)
                .with_drift(drift)
                .generate("AAA", Horizon::OneYear);
            bars.last().map(|b| b.close).unwrap()
        };
        assert!(last(0.002) > 100.0 * 1.5);
        assert!((last(0.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn fundamentals_are_stable() {
        let s = source();
        assert_eq!(
            s.fetch_fundamentals("AAA").unwrap(),
            s.fetch_fundamentals("AAA").unwrap()
        );
        assert!(s.fetch_fundamentals("AAA").unwrap().pe_ratio().is_some());
    }
}
