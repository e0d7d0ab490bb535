//! TradeRecord — an immutable closed-lot entry in the trade history.

use super::position::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position (or part of one) was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Closed by an opposite-direction signal.
    Signal,
    StopLoss,
    TakeProfit,
    /// Closed as the first leg of a reversal fill.
    Reversal,
    /// Strategy-specific exit rule.
    Rule(String),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "signal"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::TakeProfit => write!(f, "take_profit"),
            ExitReason::Reversal => write!(f, "reversal"),
            ExitReason::Rule(name) => write!(f, "{name}"),
        }
    }
}

/// A closed lot: entry and exit of some quantity on one instrument.
///
/// Appended to the portfolio's trade history when a position is reduced or
/// closed; never mutated afterwards. PnL is gross (before commission) — the
/// portfolio carries commission separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub instrument: String,
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_time: DateTime<Utc>,
    pub pnl: f64,
    /// PnL as a percentage of the entry notional.
    pub return_pct: f64,
    pub reason: ExitReason,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
