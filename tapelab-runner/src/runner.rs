//! Backtest runner — wires the engine, metrics, and report together.

use crate::config::ConfigError;
use crate::data::DataError;
use crate::metrics::{PerformanceMetrics, DAILY_PERIODS_PER_YEAR};
use crate::report::BacktestReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tapelab_core::domain::{Bar, RiskLimits};
use tapelab_core::engine::{
    BacktestEngine, EngineConfig, EventObserver, ExecutionConfig, NullObserver,
};
use tapelab_core::error::EngineError;
use tapelab_core::strategy::Strategy;
use thiserror::Error;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Everything needed to run one backtest, independent of the strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    pub instrument: String,
    pub initial_capital: f64,
    pub commission_rate: f64,
    pub slippage_rate: f64,
    /// Annualization factor for volatility/Sharpe (252 for daily bars).
    pub periods_per_year: f64,
    pub limits: RiskLimits,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            instrument: "BTC-USD".to_string(),
            initial_capital: 10_000.0,
            commission_rate: 0.005,
            slippage_rate: 0.001,
            periods_per_year: DAILY_PERIODS_PER_YEAR,
            limits: RiskLimits::default(),
            start: None,
            end: None,
        }
    }
}

impl RunSettings {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            initial_capital: self.initial_capital,
            execution: ExecutionConfig::new(self.commission_rate, self.slippage_rate),
            limits: self.limits.clone(),
        }
    }
}

/// Content hash of the settings plus the strategy's declared parameters:
/// identical inputs hash identically across runs and processes.
fn config_hash(settings: &RunSettings, strategy: &dyn Strategy) -> String {
    let payload = serde_json::json!({
        "settings": settings,
        "strategy": strategy.name(),
        "params": strategy.params(),
    });
    let canonical = serde_json::to_string(&payload).expect("settings serialize");
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

/// Run one backtest over pre-loaded bars.
pub fn run_backtest(
    strategy: &mut dyn Strategy,
    bars: &[Bar],
    settings: &RunSettings,
) -> Result<BacktestReport, RunError> {
    run_backtest_with_observer(strategy, bars, settings, &mut NullObserver)
}

/// Run one backtest, forwarding engine events to `observer`.
pub fn run_backtest_with_observer(
    strategy: &mut dyn Strategy,
    bars: &[Bar],
    settings: &RunSettings,
    observer: &mut dyn EventObserver,
) -> Result<BacktestReport, RunError> {
    let hash = config_hash(settings, strategy);
    let mut engine = BacktestEngine::new(settings.engine_config());
    let log = engine.run_with_observer(
        strategy,
        bars,
        &settings.instrument,
        settings.start,
        settings.end,
        observer,
    )?;

    let metrics = PerformanceMetrics::compute(
        &log.equity_curve,
        &log.signals,
        &log.trades,
        log.initial_capital,
        log.first_close,
        log.last_close,
        settings.periods_per_year,
    );

    let name = strategy.name().to_string();
    let params = strategy.params();
    Ok(BacktestReport::from_run(log, metrics, &name, params, hash))
}
