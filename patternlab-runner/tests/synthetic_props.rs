//! Property tests for the synthetic source and scan config validation.

use chrono::NaiveDate;
use proptest::prelude::*;
use patternlab_core::data::DataSource;
use patternlab_core::domain::{group, Horizon};
use patternlab_runner::{ScanConfig, SyntheticSource, UniverseEntry};

fn arb_horizon() -> impl Strategy<Value = Horizon> {
    prop_oneof![
        Just(Horizon::OneYear),
        Just(Horizon::TwoYears),
        Just(Horizon::FiveYears),
        Just(Horizon::Max),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Any symbol yields a valid, weekday-only series that repeats exactly.
    #[test]
    fn synthetic_series_are_valid_and_repeatable(
        symbol in "[A-Z]{1,5}",
        horizon in arb_horizon(),
        start in 5.0..500.0_f64,
    ) {
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let source = SyntheticSource::new(end).with_start_price(start);
        let a = source.fetch_series(&symbol, horizon).unwrap();
        let b = source.fetch_series(&symbol, horizon).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert!(!a.is_empty());
        prop_assert!(a.bars().iter().all(|bar| bar.is_sane()));
        prop_assert!(a.last_date() <= Some(end));
    }

    /// Duplicate symbols are always rejected, distinct ones accepted.
    #[test]
    fn duplicate_symbols_fail_validation(symbols in prop::collection::btree_set("[A-Z]{2,4}", 1..6)) {
        let mut config = ScanConfig {
            universe: symbols.iter().map(|s| UniverseEntry::new(s, group::V40)).collect(),
            ..ScanConfig::default()
        };
        prop_assert!(config.validate().is_ok());

        let first = config.universe[0].symbol.clone();
        config.universe.push(UniverseEntry::new(first, group::V200));
        prop_assert!(config.validate().is_err());
    }
}
