//! Signal aggregation across strategies for one stock.
//!
//! Non-neutral votes are counted per kind; the most frequent kind wins and
//! ties fall back to the `Signal` priority order (Buy > Sell > Watch).
//! No votes, or only Neutral votes, aggregate to Neutral.

use crate::domain::{Series, Signal};
use crate::strategy::Strategy;

/// Majority vote over per-strategy signals.
pub fn overall_signal(signals: &[Signal]) -> Signal {
    let count = |kind: Signal| signals.iter().filter(|s| **s == kind).count();
    [Signal::Buy, Signal::Sell, Signal::Watch]
        .into_iter()
        .map(|kind| (count(kind), kind))
        .filter(|(n, _)| *n > 0)
        // (count, kind) ordering: higher count first, then the Signal order
        .max()
        .map_or(Signal::Neutral, |(_, kind)| kind)
}

/// Signals of every strategy applicable to `group`, in registry order.
pub fn signals_for_group<'a>(
    strategies: &'a [Box<dyn Strategy>],
    group: &'a str,
    series: &'a Series,
) -> impl Iterator<Item = (&'a str, Signal)> + 'a {
    strategies
        .iter()
        .filter(move |s| s.is_applicable(group))
        .map(move |s| (s.name(), s.signal(series)))
}

/// Run the strategies applicable to `group` and vote.
pub fn overall_for_group(strategies: &[Box<dyn Strategy>], group: &str, series: &Series) -> Signal {
    let signals: Vec<Signal> = signals_for_group(strategies, group, series)
        .map(|(_, s)| s)
        .collect();
    overall_signal(&signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::group;
    use crate::strategy::all_strategies;
    use Signal::*;

    #[test]
    fn buy_sell_tie_breaks_to_buy() {
        assert_eq!(overall_signal(&[Buy, Buy, Sell, Sell, Watch]), Buy);
    }

    #[test]
    fn sell_watch_tie_breaks_to_sell() {
        assert_eq!(overall_signal(&[Watch, Sell, Neutral]), Sell);
    }

    #[test]
    fn majority_beats_priority() {
        assert_eq!(overall_signal(&[Watch, Watch, Buy, Neutral, Neutral]), Watch);
    }

    #[test]
    fn neutral_only_and_empty() {
        assert_eq!(overall_signal(&[Neutral, Neutral, Neutral]), Neutral);
        assert_eq!(overall_signal(&[]), Neutral);
    }

    #[test]
    fn unknown_group_only_runs_universal_strategies() {
        let strategies = all_strategies();
        let series = Series::empty("X");
        let names: Vec<&str> = signals_for_group(&strategies, "Unlisted", &series)
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["range_bound"]);
        assert_eq!(overall_for_group(&strategies, group::V40, &series), Neutral);
    }
}
