//! TapeLab CLI — run backtests from TOML configs or named strategies.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file or a named strategy,
//!   against a CSV price series or a synthetic random walk
//! - `strategies` — list the built-in strategies and their parameters

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tapelab_core::domain::TradeRecord;
use tapelab_core::engine::{EventObserver, ExecutionEvent, Rejection};
use tapelab_core::error::StrategyError;
use tapelab_runner::{
    load_bars_csv, run_backtest_with_observer, save_artifacts, synthetic_walk, BacktestConfig,
    BacktestReport,
};

#[derive(Parser)]
#[command(name = "tapelab", about = "TapeLab CLI — strategy backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file or a named strategy.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Named strategy: sma_crossover, rsi, volatility_breakout.
        #[arg(long)]
        strategy: Option<String>,

        /// Instrument id (used with --strategy).
        #[arg(long, default_value = "BTC-USD")]
        instrument: String,

        /// CSV price series (timestamp,open,high,low,close,volume).
        #[arg(long)]
        data: Option<PathBuf>,

        /// Use a synthetic random-walk series instead of a CSV.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Number of synthetic bars.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// Seed for the synthetic series.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Simulation start (YYYY-MM-DD or RFC 3339). Overrides the config.
        #[arg(long)]
        start: Option<String>,

        /// Simulation end (YYYY-MM-DD or RFC 3339). Overrides the config.
        #[arg(long)]
        end: Option<String>,

        /// Output directory for artifacts (summary, CSVs, report JSON).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print every fill, rejection, and exit as it happens.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },
    /// List the built-in strategies and their default parameters.
    Strategies,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            strategy,
            instrument,
            data,
            synthetic,
            bars,
            seed,
            start,
            end,
            output,
            verbose,
        } => run_cmd(
            config, strategy, instrument, data, synthetic, bars, seed, start, end, output,
            verbose,
        ),
        Commands::Strategies => {
            print_strategies();
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_cmd(
    config_path: Option<PathBuf>,
    strategy_name: Option<String>,
    instrument: String,
    data: Option<PathBuf>,
    synthetic: bool,
    bars: usize,
    seed: u64,
    start: Option<String>,
    end: Option<String>,
    output: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    if config_path.is_some() && strategy_name.is_some() {
        bail!("--config and --strategy are mutually exclusive");
    }
    if config_path.is_none() && strategy_name.is_none() {
        bail!("one of --config or --strategy is required");
    }
    if data.is_some() && synthetic {
        bail!("--data and --synthetic are mutually exclusive");
    }
    if data.is_none() && !synthetic {
        bail!("one of --data or --synthetic is required");
    }

    let mut config = if let Some(path) = config_path {
        BacktestConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?
    } else {
        config_for_named_strategy(&strategy_name.unwrap(), &instrument)?
    };
    if start.is_some() {
        config.backtest.start = start;
    }
    if end.is_some() {
        config.backtest.end = end;
    }

    let series = if let Some(path) = data {
        load_bars_csv(&path).with_context(|| format!("loading bars from {}", path.display()))?
    } else {
        synthetic_walk(bars, seed, 100.0)
    };

    let mut strategy = config.build_strategy()?;
    let settings = config.to_settings()?;

    let report = if verbose {
        let mut observer = StdoutObserver;
        run_backtest_with_observer(strategy.as_mut(), &series, &settings, &mut observer)?
    } else {
        tapelab_runner::run_backtest(strategy.as_mut(), &series, &settings)?
    };

    print_summary(&report);

    if let Some(dir) = output {
        let out = save_artifacts(&report, &dir)?;
        println!("Artifacts saved to: {}", out.display());
    }

    Ok(())
}

/// Build a config for a named strategy via the same TOML path a file takes.
fn config_for_named_strategy(name: &str, instrument: &str) -> Result<BacktestConfig> {
    match name {
        "sma_crossover" | "rsi" | "volatility_breakout" => {}
        other => bail!(
            "unknown strategy '{other}'. Valid: sma_crossover, rsi, volatility_breakout"
        ),
    }

    let toml_str = format!(
        r#"[backtest]
instrument = "{instrument}"

[strategy]
type = "{name}"
"#
    );
    Ok(BacktestConfig::from_toml(&toml_str)?)
}

fn print_strategies() {
    println!("Built-in strategies:");
    println!();
    println!("  sma_crossover        Moving-average crossover.");
    println!("                       params: short_window (10), long_window (30)");
    println!("  rsi                  RSI mean reversion.");
    println!("                       params: period (14), oversold (30), overbought (70)");
    println!("  volatility_breakout  Rolling-band breakout with a volume gate.");
    println!("                       params: lookback (20), band_multiplier (2.0), min_volume (100000)");
}

fn print_summary(report: &BacktestReport) {
    println!();
    println!("{}", report.summary());
    println!();
}

/// Observer that narrates the run to stdout.
struct StdoutObserver;

impl EventObserver for StdoutObserver {
    fn on_fill(&mut self, event: &ExecutionEvent) {
        println!(
            "[fill] {} {:?} qty {:.6} @ {:.4} (notional {:.2}, commission {:.2})",
            event.timestamp.format("%Y-%m-%d %H:%M"),
            event.action,
            event.quantity,
            event.price,
            event.notional,
            event.commission
        );
    }

    fn on_rejection(&mut self, rejection: &Rejection) {
        println!(
            "[reject] {} {:?}: {:?}",
            rejection.timestamp.format("%Y-%m-%d %H:%M"),
            rejection.action,
            rejection.reason
        );
    }

    fn on_exit(&mut self, trade: &TradeRecord) {
        println!(
            "[exit] {} {} {:?} pnl {:.2} ({})",
            trade.exit_time.format("%Y-%m-%d %H:%M"),
            trade.instrument,
            trade.side,
            trade.pnl,
            trade.reason
        );
    }

    fn on_strategy_error(&mut self, timestamp: chrono::DateTime<chrono::Utc>, error: &StrategyError) {
        eprintln!(
            "[strategy-error] {}: {error}",
            timestamp.format("%Y-%m-%d %H:%M")
        );
    }
}
