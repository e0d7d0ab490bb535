//! Rows recorded during a run: equity snapshots, signals, executions.

use crate::domain::{SignalKind, TradeRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One snapshot of portfolio state, taken right after the mark step of a bar
/// and before any signal is evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    /// Total portfolio value: cash + signed position market values.
    pub equity: f64,
    pub cash: f64,
    /// Signed market value of open positions.
    pub invested: f64,
}

/// One strategy signal as recorded in the signal log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: SignalKind,
    pub confidence: f64,
    pub price: f64,
}

/// What an execution did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
    /// Exit-rule close (stop loss, take profit, strategy rule).
    Close,
}

/// A structured record of one executed fill or exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub timestamp: DateTime<Utc>,
    pub action: TradeAction,
    /// Fill price after slippage.
    pub price: f64,
    pub quantity: f64,
    pub notional: f64,
    pub commission: f64,
    /// Realized PnL when the fill reduced or closed a position.
    pub pnl: Option<f64>,
    pub confidence: f64,
}

/// Everything a completed run produced, in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub instrument: String,
    pub equity_curve: Vec<EquityPoint>,
    pub signals: Vec<SignalRecord>,
    pub executions: Vec<ExecutionEvent>,
    pub trades: Vec<TradeRecord>,
    /// Bars simulated after warmup.
    pub bar_count: usize,
    pub warmup_bars: usize,
    /// First and last close of the simulated series, for buy-and-hold
    /// benchmarking.
    pub first_close: f64,
    pub last_close: f64,
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
}
