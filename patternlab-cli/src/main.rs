//! PatternLab CLI: analyze, chart, scan and strategies commands.
//!
//! Commands:
//! - `analyze`: run strategies on one symbol and print their reports
//! - `chart`: emit a strategy's overlay descriptor as JSON
//! - `scan`: scan a TOML-configured universe on a bounded worker pool
//! - `strategies`: list the registered strategies

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use patternlab_core::aggregate::overall_signal;
use patternlab_core::data::DataSource;
use patternlab_core::domain::{group, Horizon, Series, Signal};
use patternlab_core::strategy::{all_strategies, strategy_by_name, AnalysisReport, Strategy};
use patternlab_runner::{run_scan, CsvSource, OutcomeStatus, ScanConfig, ScanReport, SyntheticSource};

#[derive(Parser)]
#[command(
    name = "patternlab",
    about = "PatternLab CLI: chart-pattern signals for stock price series"
)]
struct Cli {
    /// Log level filter (e.g. "debug", "patternlab_runner=debug"). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Directory of {SYMBOL}.csv and {SYMBOL}.fundamentals.json files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Use seeded synthetic data instead of CSV files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run strategies on one symbol and print their reports.
    Analyze {
        symbol: String,

        /// Strategy machine names. Defaults to every strategy applicable to --group.
        #[arg(long = "strategy")]
        strategies: Vec<String>,

        /// Stock group used to pick applicable strategies.
        #[arg(long, default_value = group::V40)]
        group: String,

        /// Lookback horizon: 1y, 2y, 5y or max.
        #[arg(long, default_value = "2y")]
        horizon: Horizon,

        #[command(flatten)]
        source: SourceArgs,

        /// Print reports as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print a strategy's chart overlays as JSON.
    Chart {
        symbol: String,

        #[arg(long)]
        strategy: String,

        #[arg(long, default_value = "2y")]
        horizon: Horizon,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Scan a universe from a TOML config file.
    Scan {
        #[arg(long)]
        config: PathBuf,

        /// Use seeded synthetic data instead of the config's data_dir.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Print the scan report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List registered strategies.
    Strategies,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    match cli.command {
        Commands::Analyze {
            symbol,
            strategies,
            group,
            horizon,
            source,
            json,
        } => run_analyze(&symbol, &strategies, &group, horizon, &source, json),
        Commands::Chart {
            symbol,
            strategy,
            horizon,
            source,
        } => run_chart(&symbol, &strategy, horizon, &source),
        Commands::Scan {
            config,
            synthetic,
            json,
        } => run_scan_cmd(&config, synthetic, json),
        Commands::Strategies => {
            print_strategies();
            Ok(())
        }
    }
}

/// Logs go to stderr so JSON output on stdout stays clean.
fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid --log-level '{directives}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn open_source(args: &SourceArgs) -> Box<dyn DataSource> {
    if args.synthetic {
        Box::new(SyntheticSource::new(chrono::Local::now().date_naive()))
    } else {
        Box::new(CsvSource::new(&args.data_dir))
    }
}

fn load_series(source: &dyn DataSource, symbol: &str, horizon: Horizon) -> Result<Series> {
    let series = source
        .fetch_series(symbol, horizon)
        .with_context(|| format!("loading {symbol} from {}", source.name()))?;
    if series.is_empty() {
        bail!("no price data for '{symbol}' in the {} source", source.name());
    }
    info!(symbol, bars = series.len(), source = source.name(), "series loaded");
    Ok(series)
}

fn resolve_strategies(names: &[String], group: &str) -> Result<Vec<Box<dyn Strategy>>> {
    if names.is_empty() {
        return Ok(all_strategies()
            .into_iter()
            .filter(|s| s.is_applicable(group))
            .collect());
    }
    names
        .iter()
        .map(|n| strategy_by_name(n).with_context(|| format!("unknown strategy '{n}'")))
        .collect()
}

fn run_analyze(
    symbol: &str,
    names: &[String],
    group: &str,
    horizon: Horizon,
    args: &SourceArgs,
    json: bool,
) -> Result<()> {
    let source = open_source(args);
    let series = load_series(source.as_ref(), symbol, horizon)?;
    let snapshot = source
        .fetch_fundamentals(symbol)
        .unwrap_or_else(|e| {
            warn!(symbol, error = %e, "fundamentals unavailable");
            Default::default()
        });
    let snapshot = (!snapshot.is_empty()).then_some(snapshot);

    let strategies = resolve_strategies(names, group)?;
    let mut reports: Vec<AnalysisReport> = Vec::new();
    for strategy in &strategies {
        match strategy.analyze(&series, snapshot.as_ref()) {
            Some(report) => reports.push(report),
            None => warn!(
                strategy = strategy.name(),
                bars = series.len(),
                needed = strategy.min_bars(),
                "not enough data"
            ),
        }
    }
    let overall = overall_signal(&reports.iter().map(|r| r.signal).collect::<Vec<_>>());

    if json {
        let out = serde_json::json!({
            "symbol": symbol,
            "group": group,
            "overall": overall,
            "reports": reports,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{symbol} ({group}, {} bars): overall {overall}", series.len());
    for r in &reports {
        println!();
        print_report(r);
    }
    Ok(())
}

fn print_report(r: &AnalysisReport) {
    let money = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
    println!("== {} ==", r.strategy_name);
    println!("  Signal:     {} (confidence {})", r.signal, r.confidence);
    println!("  Reason:     {}", r.reason);
    println!("  Entry:      {:.2}", r.entry_price);
    println!("  Target:     {}", money(r.target_price));
    println!("  Stop loss:  {}", money(r.stop_loss));
    if let Some(gain) = r.potential_gain_pct {
        println!("  Potential:  {gain:+.1}%");
    }
    if !r.patterns.is_empty() {
        println!("  Patterns:   {}", r.patterns.len());
    }
}

fn run_chart(symbol: &str, name: &str, horizon: Horizon, args: &SourceArgs) -> Result<()> {
    let Some(strategy) = strategy_by_name(name) else {
        bail!("unknown strategy '{name}'");
    };
    let source = open_source(args);
    let series = load_series(source.as_ref(), symbol, horizon)?;
    let chart = strategy.chart_config(&series);
    if chart.is_empty() {
        info!(symbol, strategy = name, "no pattern to draw");
    }
    println!("{}", serde_json::to_string_pretty(&chart)?);
    Ok(())
}

fn run_scan_cmd(path: &Path, synthetic: bool, json: bool) -> Result<()> {
    let config = ScanConfig::from_file(path)?;
    if config.universe.is_empty() {
        bail!("config {} has an empty universe", path.display());
    }
    let report = if synthetic {
        run_scan(&config, &SyntheticSource::new(chrono::Local::now().date_naive()))?
    } else {
        run_scan(&config, &CsvSource::new(&config.data_dir))?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_scan(&report);
    }
    Ok(())
}

fn print_scan(report: &ScanReport) {
    println!(
        "{:<20} {:<10} {:<8} {:>6}  {:<12}  {}",
        "Group", "Symbol", "Signal", "Bars", "Data hash", "Buy / Sell / Watch strategies"
    );
    println!("{}", "-".repeat(94));
    for v in &report.verdicts {
        let voters = |signal| {
            v.outcomes
                .iter()
                .filter(|o| o.status == OutcomeStatus::Completed && o.signal == signal)
                .map(|o| o.strategy.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };
        let detail = match &v.error {
            Some(e) => format!("error: {e}"),
            None => format!(
                "{} / {} / {}",
                voters(Signal::Buy),
                voters(Signal::Sell),
                voters(Signal::Watch)
            ),
        };
        let hash = v.series_hash.as_ref().map_or("-", |h| h.short());
        println!(
            "{:<20} {:<10} {:<8} {:>6}  {:<12}  {}",
            v.group, v.symbol, v.overall, v.bars, hash, detail
        );
    }
    println!();
    println!(
        "{} stocks in {} ms, {} timed-out calls",
        report.verdicts.len(),
        report.elapsed_ms,
        report.timed_out()
    );
}

fn print_strategies() {
    println!("{:<24} {:<28} {:>8}  {}", "Name", "Display name", "Min bars", "Groups");
    println!("{}", "-".repeat(80));
    for s in all_strategies() {
        let groups = if s.applicable_groups().is_empty() {
            "all".to_string()
        } else {
            s.applicable_groups().join(", ")
        };
        println!(
            "{:<24} {:<28} {:>8}  {}",
            s.name(),
            s.display_name(),
            s.min_bars(),
            groups
        );
    }
}
