//! Strategy behaviour through the public API: registry, gating, boundaries,
//! chart output and voting.

use chrono::{Duration, NaiveDate};
use patternlab_core::aggregate::{overall_for_group, overall_signal};
use patternlab_core::domain::{group, Bar, FundamentalSnapshot, Series, Signal};
use patternlab_core::strategy::{
    all_strategies, strategy_by_name, CupWithHandle, RangeBound, Strategy, Week52Low, V20,
};

fn candles(mids: &[f64]) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    mids.iter()
        .enumerate()
        .map(|(i, &m)| Bar {
            date: start + Duration::days(i as i64),
            open: m,
            high: m + 0.5,
            low: m - 0.5,
            close: m,
            volume: 1_000,
        })
        .collect()
}

fn path(knots: &[(usize, f64)]) -> Vec<f64> {
    let mut out = Vec::new();
    for w in knots.windows(2) {
        let ((i0, p0), (i1, p1)) = (w[0], w[1]);
        for i in i0..i1 {
            out.push(p0 + (p1 - p0) * (i - i0) as f64 / (i1 - i0) as f64);
        }
    }
    if let Some(&(_, p)) = knots.last() {
        out.push(p);
    }
    out
}

fn series(symbol: &str, mids: &[f64]) -> Series {
    Series::new(symbol, candles(mids)).unwrap()
}

fn cup_path(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let i = i as f64;
            if i <= 20.0 {
                89.5 + 10.0 * i / 20.0
            } else if i <= 40.0 {
                99.5 - 19.0 * (i - 20.0) / 20.0
            } else if i <= 60.0 {
                80.5 + 19.0 * (i - 40.0) / 20.0
            } else {
                99.5 - 0.05 * (i - 60.0)
            }
        })
        .collect()
}

fn v20_bar(day: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap() + Duration::days(day),
        open,
        high,
        low,
        close,
        volume: 1_000,
    }
}

fn green_run(lead: usize, top: f64, tail: f64) -> Series {
    let mut bars: Vec<Bar> = (0..lead)
        .map(|d| v20_bar(d as i64, 125.0, 125.5, 124.5, 125.0))
        .collect();
    let d = lead as i64;
    bars.push(v20_bar(d, 101.0, 106.0, 100.0, 105.0));
    bars.push(v20_bar(d + 1, 105.0, 111.0, 104.0, 110.0));
    bars.push(v20_bar(d + 2, 110.0, 116.0, 109.0, 115.0));
    bars.push(v20_bar(d + 3, 115.0, top, 114.0, 119.0));
    for k in 0..6 {
        bars.push(v20_bar(d + 4 + k, tail, tail + 0.5, tail - 0.5, tail));
    }
    Series::new("RUN", bars).unwrap()
}

#[test]
fn registry_is_ordered_and_addressable() {
    let names: Vec<&str> = all_strategies().iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        vec![
            "cup_handle",
            "reverse_head_shoulders",
            "range_bound",
            "sma_alignment",
            "v10",
            "v20",
            "lifetime_high",
            "week52_low",
        ]
    );
    for name in names {
        assert_eq!(strategy_by_name(name).map(|s| s.name()), Some(name));
    }
    assert!(strategy_by_name("head_shoulders").is_none());
}

#[test]
fn empty_series_is_neutral_everywhere() {
    let empty = Series::empty("NONE");
    for s in all_strategies() {
        assert_eq!(s.signal(&empty), Signal::Neutral, "{}", s.name());
        assert!(s.analyze(&empty, None).is_none(), "{}", s.name());
        assert!(s.chart_config(&empty).is_empty(), "{}", s.name());
    }
}

#[test]
fn cup_report_targets_measured_move() {
    let s = series("CUP", &cup_path(100));
    let report = CupWithHandle.analyze(&s, None).unwrap();
    let target = report.target_price.unwrap();
    assert!((target - 120.0).abs() < 1e-9);
    assert!((report.metrics["neckline"] - 100.0).abs() < 1e-9);
    assert_eq!(report.patterns.len(), 1);
    assert!(!CupWithHandle.chart_config(&s).is_empty());
}

#[test]
fn v20_needs_thirty_bars_and_a_full_twenty_percent() {
    let short = green_run(19, 120.0, 118.0);
    assert_eq!(short.len(), 29);
    assert_eq!(V20.signal(&short), Signal::Neutral);

    assert_eq!(V20.signal(&green_run(20, 120.0, 118.0)), Signal::Sell);
    assert_eq!(V20.signal(&green_run(20, 120.0, 101.0)), Signal::Buy);
    assert_eq!(V20.signal(&green_run(20, 119.99, 101.0)), Signal::Neutral);
}

#[test]
fn range_with_repeated_support_is_neutral() {
    let s = series(
        "RB",
        &path(&[
            (0, 110.0),
            (10, 100.0),
            (20, 108.0),
            (30, 100.0),
            (40, 108.0),
            (50, 100.0),
            (65, 120.0),
            (80, 100.0),
            (90, 110.0),
        ]),
    );
    assert_eq!(RangeBound.signal(&s), Signal::Neutral);
    assert!(RangeBound.chart_config(&s).is_empty());
}

#[test]
fn week52_low_needs_upside() {
    // lifetime high 110 over a 100 low: only 10% of room
    let s = series("LOW", &path(&[(0, 105.0), (60, 109.5), (200, 100.5), (259, 102.0)]));
    assert_eq!(Week52Low.signal(&s), Signal::Neutral);
    let report = Week52Low.analyze(&s, Some(&FundamentalSnapshot::new())).unwrap();
    assert_eq!(report.signal, Signal::Neutral);
}

#[test]
fn overlays_serialize_with_a_type_tag() {
    let s = series(
        "RB",
        &path(&[
            (0, 110.0),
            (10, 100.0),
            (25, 120.0),
            (40, 100.0),
            (55, 120.0),
            (70, 100.0),
            (85, 120.0),
            (100, 100.0),
            (110, 110.0),
        ]),
    );
    let chart = RangeBound.chart_config(&s);
    let json = serde_json::to_value(&chart).unwrap();
    let overlays = json["overlays"].as_array().unwrap();
    assert_eq!(overlays.len(), chart.overlays.len());
    assert!(overlays.iter().all(|o| o["type"].is_string()));
}

#[test]
fn voting_prefers_majority_then_priority() {
    use Signal::*;
    assert_eq!(overall_signal(&[Buy, Sell]), Buy);
    assert_eq!(overall_signal(&[Watch, Watch, Buy]), Watch);
    assert_eq!(overall_signal(&[Neutral, Neutral]), Neutral);
    assert_eq!(overall_signal(&[]), Neutral);
}

#[test]
fn analysis_is_deterministic() {
    let s = series("CUP", &cup_path(260));
    let strategies = all_strategies();
    for st in &strategies {
        let a = st.analyze(&s, None);
        let b = st.analyze(&s, None);
        assert_eq!(a, b, "{}", st.name());
        assert_eq!(st.chart_config(&s), st.chart_config(&s), "{}", st.name());
    }
    assert_eq!(
        overall_for_group(&strategies, group::V40, &s),
        overall_for_group(&strategies, group::V40, &s)
    );
}
