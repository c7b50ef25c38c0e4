//! Small descriptive statistics shared by strategies.
//!
//! Standard deviations are sample (n - 1) deviations. Empty input yields
//! `None` rather than NaN so callers can drop degenerate candidates with `?`.

use chrono::Datelike;

use crate::domain::Bar;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation. Needs at least two values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// std / mean. `None` when the mean is not positive.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m <= 0.0 {
        return None;
    }
    Some(std_dev(values)? / m)
}

/// Simple returns `v[i] / v[i-1] - 1`; one shorter than the input.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Standard deviation of the trailing `window` close-to-close returns.
///
/// Zero when there are too few bars to say anything.
pub fn recent_volatility(bars: &[Bar], window: usize) -> f64 {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let returns = pct_change(&closes);
    let start = returns.len().saturating_sub(window);
    std_dev(&returns[start..]).unwrap_or(0.0)
}

/// Mean volume over a bar slice.
pub fn mean_volume(bars: &[Bar]) -> Option<f64> {
    if bars.is_empty() {
        return None;
    }
    Some(bars.iter().map(|b| b.volume as f64).sum::<f64>() / bars.len() as f64)
}

/// Index of the first minimum of `key` over `bars`.
pub fn argmin_by(bars: &[Bar], key: impl Fn(&Bar) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, bar) in bars.iter().enumerate() {
        let v = key(bar);
        if best.map_or(true, |(_, b)| v < b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the first maximum of `key` over `bars`.
pub fn argmax_by(bars: &[Bar], key: impl Fn(&Bar) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, bar) in bars.iter().enumerate() {
        let v = key(bar);
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Last close of each calendar month, in order.
pub fn month_end_closes(bars: &[Bar]) -> Vec<f64> {
    let mut out: Vec<f64> = Vec::new();
    let mut current: Option<(i32, u32)> = None;
    for bar in bars {
        let key = (bar.date.year(), bar.date.month());
        if current == Some(key) {
            if let Some(last) = out.last_mut() {
                *last = bar.close;
            }
        } else {
            out.push(bar.close);
            current = Some(key);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_approx(mean(&v).unwrap(), 5.0, DEFAULT_EPSILON);
        // sample variance = 32 / 7
        assert_approx(std_dev(&v).unwrap(), (32.0_f64 / 7.0).sqrt(), DEFAULT_EPSILON);
        assert_eq!(std_dev(&[1.0]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn pct_change_values() {
        let r = pct_change(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert_approx(r[0], 0.10, 1e-12);
        assert_approx(r[1], -0.10, 1e-12);
    }

    #[test]
    fn argmin_takes_first_occurrence() {
        let bars = make_bars(&[5.0, 3.0, 4.0, 3.0]);
        assert_eq!(argmin_by(&bars, |b| b.close), Some(1));
        assert_eq!(argmax_by(&bars, |b| b.close), Some(0));
        assert_eq!(argmin_by(&[], |b| b.close), None);
    }

    #[test]
    fn flat_series_has_zero_volatility() {
        let bars = make_bars(&[10.0; 60]);
        assert_eq!(recent_volatility(&bars, 50), 0.0);
    }

    #[test]
    fn month_end_picks_last_close() {
        // make_bars starts on 2024-01-02, 40 daily bars span January and February
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let ends = month_end_closes(&bars);
        assert_eq!(ends.len(), 2);
        // 2024-01-31 is index 29
        assert_eq!(ends[0], 129.0);
        assert_eq!(ends[1], 139.0);
    }
}
