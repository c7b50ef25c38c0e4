//! Universe scan: every applicable strategy for every stock, with deadlines.
//!
//! A private rayon pool bounds how many strategy calls are in flight. Each
//! pool worker runs one call on its own thread and waits on it with
//! `recv_timeout`, so the clock starts when the call starts and never
//! includes time spent queued. A call that misses its deadline degrades to
//! `Neutral` and is recorded as `TimedOut`; the worker moves on and the
//! abandoned thread finishes in the background, its late result dropped
//! with the channel. One stock's failure never stops the scan.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use patternlab_core::aggregate::overall_signal;
use patternlab_core::data::DataSource;
use patternlab_core::domain::{Horizon, Series, Signal};
use patternlab_core::fingerprint::{series_hash, SeriesHash};
use patternlab_core::strategy::{all_strategies, Strategy};

use crate::config::{ConfigError, ScanConfig, UniverseEntry};

/// Errors that stop a scan before it starts.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

/// How one strategy call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Completed,
    TimedOut,
    /// The call thread could not start or dropped its result (it panicked).
    Failed,
    NotApplicable,
}

/// One strategy's contribution to a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub strategy: String,
    pub display_name: String,
    pub status: OutcomeStatus,
    pub signal: Signal,
    pub elapsed_ms: u64,
}

/// Everything learned about one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockVerdict {
    pub symbol: String,
    pub group: String,
    pub overall: Signal,
    pub bars: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_hash: Option<SeriesHash>,
    pub outcomes: Vec<StrategyOutcome>,
    /// Data error that left this stock without a series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StockVerdict {
    pub fn outcome(&self, strategy: &str) -> Option<&StrategyOutcome> {
        self.outcomes.iter().find(|o| o.strategy == strategy)
    }
}

/// Verdicts ordered by (group, symbol).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub horizon: Horizon,
    pub verdicts: Vec<StockVerdict>,
    pub elapsed_ms: u64,
}

impl ScanReport {
    /// Strategy calls that missed their deadline.
    pub fn timed_out(&self) -> usize {
        self.verdicts
            .iter()
            .flat_map(|v| &v.outcomes)
            .filter(|o| o.status == OutcomeStatus::TimedOut)
            .count()
    }

    /// Stocks whose overall signal is `signal`.
    pub fn count(&self, signal: Signal) -> usize {
        self.verdicts.iter().filter(|v| v.overall == signal).count()
    }
}

/// Bounded pool plus the strategies it runs.
pub struct Scanner {
    pool: ThreadPool,
    timeout: Duration,
    horizon: Horizon,
    strategies: Vec<Arc<dyn Strategy>>,
}

impl Scanner {
    /// Registry strategies, filtered by the config's allow-list.
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        let strategies = all_strategies()
            .into_iter()
            .filter(|s| config.allows(s.name()))
            .map(Arc::<dyn Strategy>::from)
            .collect();
        Self::with_strategies(config, strategies)
    }

    pub fn with_strategies(
        config: &ScanConfig,
        strategies: Vec<Arc<dyn Strategy>>,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("patternlab-scan-{i}"))
            .build()
            .map_err(|e| ScanError::Pool(e.to_string()))?;
        Ok(Self {
            pool,
            timeout: config.timeout(),
            horizon: config.horizon,
            strategies,
        })
    }

    pub fn strategies(&self) -> &[Arc<dyn Strategy>] {
        &self.strategies
    }

    /// Fetch and evaluate every stock in `universe`.
    pub fn scan(&self, universe: &[UniverseEntry], source: &dyn DataSource) -> ScanReport {
        let started = Instant::now();
        info!(
            stocks = universe.len(),
            strategies = self.strategies.len(),
            source = source.name(),
            horizon = %self.horizon,
            "scan starting"
        );

        let mut verdicts: Vec<StockVerdict> = universe
            .iter()
            .map(|entry| match source.fetch_series(&entry.symbol, self.horizon) {
                Ok(series) => self.evaluate(&entry.group, series),
                Err(e) => {
                    warn!(symbol = %entry.symbol, error = %e, "skipping stock without a usable series");
                    self.unavailable(entry, e.to_string())
                }
            })
            .collect();
        verdicts.sort_by(|a, b| (&a.group, &a.symbol).cmp(&(&b.group, &b.symbol)));

        let report = ScanReport {
            horizon: self.horizon,
            verdicts,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            stocks = report.verdicts.len(),
            buy = report.count(Signal::Buy),
            sell = report.count(Signal::Sell),
            watch = report.count(Signal::Watch),
            timed_out = report.timed_out(),
            elapsed_ms = report.elapsed_ms,
            "scan finished"
        );
        report
    }

    /// Run every applicable strategy on one series and vote.
    ///
    /// Each call gets the full timeout, counted from the moment it starts.
    pub fn evaluate(&self, group: &str, series: Series) -> StockVerdict {
        let series = Arc::new(series);
        let outcomes: Vec<StrategyOutcome> = self.pool.install(|| {
            self.strategies
                .par_iter()
                .map(|strategy| {
                    if strategy.is_applicable(group) {
                        self.call(strategy, &series)
                    } else {
                        outcome(strategy.as_ref(), OutcomeStatus::NotApplicable, Signal::Neutral, Duration::ZERO)
                    }
                })
                .collect()
        });

        let votes: Vec<Signal> = outcomes
            .iter()
            .filter(|o| o.status != OutcomeStatus::NotApplicable)
            .map(|o| o.signal)
            .collect();

        StockVerdict {
            symbol: series.symbol().to_string(),
            group: group.to_string(),
            overall: overall_signal(&votes),
            bars: series.len(),
            series_hash: (!series.is_empty()).then(|| series_hash(&series)),
            outcomes,
            error: None,
        }
    }

    /// One strategy call on a dedicated thread, awaited for at most `timeout`.
    fn call(&self, strategy: &Arc<dyn Strategy>, series: &Arc<Series>) -> StrategyOutcome {
        let symbol = series.symbol();
        let (tx, rx) = mpsc::channel();
        let job_strategy = Arc::clone(strategy);
        let job_series = Arc::clone(series);
        let started = Instant::now();
        let spawned = thread::Builder::new()
            .name(format!("patternlab-call-{}", strategy.name()))
            .spawn(move || {
                let signal = job_strategy.signal(&job_series);
                // receiver is gone once the deadline passed
                let _ = tx.send(signal);
            });
        if let Err(e) = spawned {
            warn!(symbol, strategy = strategy.name(), error = %e, "could not start strategy call; using Neutral");
            return outcome(strategy.as_ref(), OutcomeStatus::Failed, Signal::Neutral, Duration::ZERO);
        }

        match rx.recv_timeout(self.timeout) {
            Ok(signal) => {
                let elapsed = started.elapsed();
                debug!(symbol, strategy = strategy.name(), elapsed_us = elapsed.as_micros() as u64, %signal, "strategy call");
                outcome(strategy.as_ref(), OutcomeStatus::Completed, signal, elapsed)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    symbol,
                    strategy = strategy.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "strategy call timed out; using Neutral"
                );
                outcome(strategy.as_ref(), OutcomeStatus::TimedOut, Signal::Neutral, self.timeout)
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(symbol, strategy = strategy.name(), "strategy call failed; using Neutral");
                outcome(strategy.as_ref(), OutcomeStatus::Failed, Signal::Neutral, started.elapsed())
            }
        }
    }

    fn unavailable(&self, entry: &UniverseEntry, error: String) -> StockVerdict {
        StockVerdict {
            symbol: entry.symbol.clone(),
            group: entry.group.clone(),
            overall: Signal::Neutral,
            bars: 0,
            series_hash: None,
            outcomes: Vec::new(),
            error: Some(error),
        }
    }
}

fn outcome(
    strategy: &dyn Strategy,
    status: OutcomeStatus,
    signal: Signal,
    elapsed: Duration,
) -> StrategyOutcome {
    StrategyOutcome {
        strategy: strategy.name().to_string(),
        display_name: strategy.display_name().to_string(),
        status,
        signal,
        elapsed_ms: elapsed.as_millis() as u64,
    }
}

/// Build a scanner from `config` and scan its universe.
pub fn run_scan(config: &ScanConfig, source: &dyn DataSource) -> Result<ScanReport, ScanError> {
    let scanner = Scanner::new(config)?;
    Ok(scanner.scan(&config.universe, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts() {
        let verdict = |symbol: &str, overall, status| StockVerdict {
            symbol: symbol.into(),
            group: "V40".into(),
            overall,
            bars: 10,
            series_hash: None,
            outcomes: vec![StrategyOutcome {
                strategy: "v20".into(),
                display_name: "V20".into(),
                status,
                signal: overall,
                elapsed_ms: 0,
            }],
            error: None,
        };
        let report = ScanReport {
            horizon: Horizon::OneYear,
            verdicts: vec![
                verdict("A", Signal::Buy, OutcomeStatus::Completed),
                verdict("B", Signal::Neutral, OutcomeStatus::TimedOut),
                verdict("C", Signal::Buy, OutcomeStatus::Completed),
            ],
            elapsed_ms: 1,
        };
        assert_eq!(report.count(Signal::Buy), 2);
        assert_eq!(report.timed_out(), 1);
        assert_eq!(report.verdicts[1].outcome("v20").map(|o| o.status), Some(OutcomeStatus::TimedOut));
    }

    #[test]
    fn zero_workers_is_a_config_error() {
        let config = ScanConfig {
            workers: 0,
            ..ScanConfig::default()
        };
        assert!(matches!(Scanner::new(&config), Err(ScanError::Config(_))));
    }
}
