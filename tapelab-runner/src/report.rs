//! BacktestReport — the complete result of one run, with a text summary.

use crate::metrics::PerformanceMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tapelab_core::domain::TradeRecord;
use tapelab_core::engine::{EquityPoint, RunLog, SignalRecord};

/// Current schema version for persisted report artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Everything a caller needs from a finished backtest: the logs, the metrics,
/// and the provenance of the strategy that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub strategy_name: String,
    pub strategy_params: BTreeMap<String, f64>,
    pub instrument: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub initial_capital: f64,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub total_commission: f64,
    pub total_slippage: f64,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub signals: Vec<SignalRecord>,
    pub trades: Vec<TradeRecord>,
    /// Content hash of the run settings and strategy parameters, for
    /// reproducibility checks across runs.
    pub config_hash: String,
}

impl BacktestReport {
    pub fn from_run(
        log: RunLog,
        metrics: PerformanceMetrics,
        strategy_name: &str,
        strategy_params: BTreeMap<String, f64>,
        config_hash: String,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            strategy_name: strategy_name.to_string(),
            strategy_params,
            instrument: log.instrument,
            start: log.equity_curve.first().map(|p| p.timestamp),
            end: log.equity_curve.last().map(|p| p.timestamp),
            initial_capital: log.initial_capital,
            bar_count: log.bar_count,
            warmup_bars: log.warmup_bars,
            total_commission: log.total_commission,
            total_slippage: log.total_slippage,
            metrics,
            equity_curve: log.equity_curve,
            signals: log.signals,
            trades: log.trades,
            config_hash,
        }
    }

    pub fn duration_days(&self) -> i64 {
        match (self.start, self.end) {
            (Some(start), Some(end)) => (end - start).num_days(),
            _ => 0,
        }
    }

    /// A formatted text summary of the run.
    pub fn summary(&self) -> String {
        let m = &self.metrics;
        let period = match (self.start, self.end) {
            (Some(start), Some(end)) => format!(
                "{} to {} ({} days)",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d"),
                self.duration_days()
            ),
            _ => "(no bars simulated)".to_string(),
        };

        format!(
            "=== Backtest Results Summary ===\n\
             Strategy: {name}\n\
             Instrument: {instrument}\n\
             Period: {period}\n\
             Bars: {bars} ({warmup} warmup)\n\
             \n\
             Performance Metrics:\n\
             {sp}Total Return: {total_return:.2}%\n\
             {sp}Buy & Hold Return: {buy_hold:.2}%\n\
             {sp}Excess Return: {excess:.2}%\n\
             {sp}Volatility: {vol:.2}%\n\
             {sp}Sharpe Ratio: {sharpe:.2}\n\
             {sp}Max Drawdown: {drawdown:.2}%\n\
             \n\
             Portfolio Metrics:\n\
             {sp}Initial Capital: ${capital:.2}\n\
             {sp}Final Value: ${final_value:.2}\n\
             {sp}Max Value: ${max_value:.2}\n\
             {sp}Total Commission: ${commission:.2}\n\
             \n\
             Trade Metrics:\n\
             {sp}Total Trades: {trades}\n\
             {sp}Winning Trades: {winners}\n\
             {sp}Losing Trades: {losers}\n\
             {sp}Win Rate: {win_rate:.1}%\n\
             {sp}Average Win: ${avg_win:.2}\n\
             {sp}Average Loss: ${avg_loss:.2}\n\
             {sp}Profit Factor: {profit_factor:.2}\n\
             \n\
             Signal Metrics:\n\
             {sp}Total Signals: {signal_count}\n\
             {sp}Buy Signals: {buys}\n\
             {sp}Sell Signals: {sells}\n\
             {sp}Hold Signals: {holds}\n\
             {sp}Average Confidence: {confidence:.2}",
            name = self.strategy_name,
            instrument = self.instrument,
            period = period,
            bars = self.bar_count,
            warmup = self.warmup_bars,
            total_return = m.total_return_pct,
            buy_hold = m.buy_hold_return_pct,
            excess = m.excess_return_pct,
            vol = m.annualized_volatility_pct,
            sharpe = m.sharpe_ratio,
            drawdown = m.max_drawdown_pct,
            capital = self.initial_capital,
            final_value = m.final_value,
            max_value = m.max_value,
            commission = self.total_commission,
            trades = m.total_trades,
            winners = m.winning_trades,
            losers = m.losing_trades,
            win_rate = m.win_rate * 100.0,
            avg_win = m.avg_win,
            avg_loss = m.avg_loss,
            profit_factor = m.profit_factor,
            signal_count = m.total_signals,
            buys = m.buy_signals,
            sells = m.sell_signals,
            holds = m.hold_signals,
            confidence = m.avg_confidence,
            sp = "  ",
        )
    }
}
