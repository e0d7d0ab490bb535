//! Performance metrics — pure functions over the run's recorded logs.
//!
//! Every metric is total: degenerate inputs (empty trade log, zero-variance
//! returns, single-point equity curves) yield zeros, never NaN or a panic.
//! Annualization takes an explicit periods-per-year factor so hourly and
//! daily bars are not silently conflated.

use serde::{Deserialize, Serialize};
use tapelab_core::domain::{SignalKind, TradeRecord};
use tapelab_core::engine::{EquityPoint, SignalRecord};

/// Trading periods per year for daily bars.
pub const DAILY_PERIODS_PER_YEAR: f64 = 252.0;

/// The fixed performance report for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    // Performance
    pub total_return_pct: f64,
    pub buy_hold_return_pct: f64,
    pub excess_return_pct: f64,
    pub annualized_volatility_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,

    // Portfolio
    pub final_value: f64,
    pub max_value: f64,
    pub min_value: f64,

    // Trades
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Winning trades / total trades, as a fraction. 0 with no trades.
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// |Σ winning PnL / Σ losing PnL|. 0 when there are no losses.
    pub profit_factor: f64,

    // Signals
    pub total_signals: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub hold_signals: usize,
    pub avg_confidence: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from the recorded logs.
    ///
    /// `first_close`/`last_close` bound the buy-and-hold benchmark;
    /// `periods_per_year` scales volatility and Sharpe to annual terms.
    pub fn compute(
        equity_curve: &[EquityPoint],
        signals: &[SignalRecord],
        trades: &[TradeRecord],
        initial_capital: f64,
        first_close: f64,
        last_close: f64,
        periods_per_year: f64,
    ) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let returns = step_returns(&equity);

        let final_value = *equity.last().unwrap_or(&initial_capital);
        let total_return_pct = if initial_capital > 0.0 {
            (final_value - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };
        let buy_hold_return_pct = if first_close > 0.0 {
            (last_close - first_close) / first_close * 100.0
        } else {
            0.0
        };

        let winners: Vec<f64> = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).collect();
        let losers: Vec<f64> = trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl).collect();

        let buy_signals = signals.iter().filter(|s| s.kind == SignalKind::Buy).count();
        let sell_signals = signals.iter().filter(|s| s.kind == SignalKind::Sell).count();
        let hold_signals = signals.iter().filter(|s| s.kind == SignalKind::Hold).count();
        let confidences: Vec<f64> = signals.iter().map(|s| s.confidence).collect();

        Self {
            total_return_pct,
            buy_hold_return_pct,
            excess_return_pct: total_return_pct - buy_hold_return_pct,
            annualized_volatility_pct: annualized_volatility(&returns, periods_per_year) * 100.0,
            sharpe_ratio: sharpe_ratio(&returns, periods_per_year),
            max_drawdown_pct: max_drawdown(&equity) * 100.0,
            final_value,
            max_value: equity.iter().cloned().fold(f64::NEG_INFINITY, f64::max).max(final_value),
            min_value: equity.iter().cloned().fold(f64::INFINITY, f64::min).min(final_value),
            total_trades: trades.len(),
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            win_rate: if trades.is_empty() {
                0.0
            } else {
                winners.len() as f64 / trades.len() as f64
            },
            avg_win: mean(&winners),
            avg_loss: mean(&losers),
            profit_factor: profit_factor(&winners, &losers),
            total_signals: signals.len(),
            buy_signals,
            sell_signals,
            hold_signals,
            avg_confidence: mean(&confidences),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Percentage change between consecutive equity values.
pub fn step_returns(equity: &[f64]) -> Vec<f64> {
    if equity.len() < 2 {
        return Vec::new();
    }
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Running product of (1 + return), one value per return.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    let mut acc = 1.0;
    returns
        .iter()
        .map(|r| {
            acc *= 1.0 + r;
            acc
        })
        .collect()
}

/// stdev(returns) × √periods_per_year, as a fraction.
pub fn annualized_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    std_dev(returns) * periods_per_year.sqrt()
}

/// mean/stdev × √periods_per_year; 0 when the stdev is 0.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean(returns) / std * periods_per_year.sqrt()
}

/// Worst peak-to-trough decline as a non-positive fraction.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }
    let mut peak = equity[0];
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

fn profit_factor(winners: &[f64], losers: &[f64]) -> f64 {
    let gross_profit: f64 = winners.iter().sum();
    let gross_loss: f64 = losers.iter().sum();
    if losers.is_empty() || gross_loss == 0.0 {
        return 0.0;
    }
    (gross_profit / gross_loss).abs()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
