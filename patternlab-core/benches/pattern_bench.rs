//! Criterion benchmarks for pattern detection hot paths.
//!
//! Benchmarks:
//! 1. Each strategy's full analysis on one, two and five years of bars
//! 2. Group voting across all applicable strategies
//! 3. Pivot scanning and touch alternation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use patternlab_core::aggregate::overall_for_group;
use patternlab_core::domain::{group, Bar, Series};
use patternlab_core::geometry::{
    collect_touches, enforce_alternation, scan_highs, scan_lows, Strictness,
};
use patternlab_core::indicators::{Indicator, Sma};
use patternlab_core::strategy::all_strategies;

// ── Helpers ──────────────────────────────────────────────────────────

/// Swinging series with a slow drift, one bar per calendar day.
fn make_series(n: usize) -> Series {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let bars = (0..n)
        .map(|i| {
            let t = i as f64;
            let close = 100.0 + (t * 0.05).sin() * 15.0 + (t * 0.31).sin() * 3.0 + t * 0.01;
            let open = close - (t * 0.7).cos();
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.2,
                low: open.min(close) - 1.2,
                close,
                volume: 1_000_000 + (i as u64 * 7_919) % 500_000,
            }
        })
        .collect();
    Series::new("BENCH", bars).unwrap()
}

// ── 1. Strategy analysis ─────────────────────────────────────────────

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy_analyze");
    let strategies = all_strategies();

    for &bar_count in &[252, 504, 1260] {
        let series = make_series(bar_count);
        for strategy in &strategies {
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), bar_count),
                &series,
                |b, s| b.iter(|| strategy.analyze(black_box(s), None)),
            );
        }
    }

    group.finish();
}

// ── 2. Group voting ──────────────────────────────────────────────────

fn bench_voting(c: &mut Criterion) {
    let strategies = all_strategies();
    let series = make_series(504);
    c.bench_function("overall_for_group_v40_504", |b| {
        b.iter(|| overall_for_group(&strategies, black_box(group::V40), black_box(&series)))
    });
}

// ── 3. Geometry and indicators ───────────────────────────────────────

fn bench_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");
    let series = make_series(1260);
    let bars = series.bars();

    group.bench_function("pivots_strict_w5", |b| {
        b.iter(|| {
            (
                scan_highs(black_box(bars), 5, Strictness::Strict),
                scan_lows(black_box(bars), 5, Strictness::Strict),
            )
        })
    });
    group.bench_function("touches_alternation", |b| {
        b.iter(|| enforce_alternation(collect_touches(black_box(bars), 85.0, 118.0, 0.02)))
    });
    group.bench_function("sma_200", |b| b.iter(|| Sma::new(200).compute(black_box(bars))));

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_voting, bench_geometry);
criterion_main!(benches);
