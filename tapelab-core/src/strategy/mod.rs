//! Strategy contract — signal generation, sizing, and exit rules.
//!
//! Strategies see only bar history up to and including the current bar; the
//! engine guarantees no future bars are reachable. Signal generation must be
//! a pure function of that history.

pub mod rsi;
pub mod sma_crossover;
pub mod volatility_breakout;

pub use rsi::RsiStrategy;
pub use sma_crossover::SmaCrossover;
pub use volatility_breakout::VolatilityBreakout;

use crate::domain::{Bar, ExitReason, Side, Signal};
use crate::error::StrategyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sizing and exit parameters shared by all strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskParams {
    /// Base notional per trade in quote currency, scaled by signal confidence.
    pub base_notional: f64,
    /// Cap on the sized notional as a fraction of available cash.
    pub max_cash_fraction: f64,
    /// Exit when the position loses this fraction of entry.
    pub stop_loss_pct: f64,
    /// Exit when the position gains this fraction of entry.
    pub take_profit_pct: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            base_notional: 100.0,
            max_cash_fraction: 0.10,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.10,
        }
    }
}

/// A trading strategy, polymorphic over signal generation, position sizing,
/// and exit rules. The engine owns the loop; the strategy is a pure
/// synchronous collaborator.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Declared parameters, for report provenance.
    fn params(&self) -> BTreeMap<String, f64>;

    /// Minimum bars needed before any signal may be requested.
    fn required_history(&self) -> usize;

    /// One-time warmup with the first `required_history` bars. Called exactly
    /// once per run, before the first signal request.
    fn initialize(&mut self, _history: &[Bar]) {}

    /// Produce a signal from `history` (bars [0..=i]). Errors are recovered
    /// by the engine: the bar is treated as producing no signal.
    fn generate_signal(&self, history: &[Bar]) -> Result<Signal, StrategyError>;

    fn risk(&self) -> &RiskParams;

    /// Proposed trade notional in quote currency. The execution simulator
    /// enforces the minimum-size floor and cash ceiling independently.
    fn position_size(&self, available_cash: f64, _fill_price: f64, signal: &Signal) -> f64 {
        let risk = self.risk();
        let sized = risk.base_notional * signal.confidence;
        sized.min(available_cash * risk.max_cash_fraction)
    }

    /// Whether an open position should be closed, and why. Errors are
    /// recovered by the engine as "no exit this bar".
    fn should_exit(
        &self,
        _history: &[Bar],
        entry_price: f64,
        current_price: f64,
        side: Side,
    ) -> Result<Option<ExitReason>, StrategyError> {
        let risk = self.risk();
        let pnl_pct = match side {
            Side::Long => (current_price - entry_price) / entry_price,
            Side::Short => (entry_price - current_price) / entry_price,
        };
        if pnl_pct <= -risk.stop_loss_pct {
            Ok(Some(ExitReason::StopLoss))
        } else if pnl_pct >= risk.take_profit_pct {
            Ok(Some(ExitReason::TakeProfit))
        } else {
            Ok(None)
        }
    }
}
