//! Portfolio — the ledger: cash plus all open positions for one run.
//!
//! Single source of truth for money. Every fill and every mark flows through
//! here, and the conservation identity must hold after each one:
//!
//! `cash + Σ market_value(open) ==
//!  initial_capital + Σ realized_pnl + Σ unrealized_pnl − total_commission`

use super::position::{Position, Side};
use super::trade::{ExitReason, TradeRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Quantities below this are treated as a fully closed position.
const QTY_EPSILON: f64 = 1e-10;

/// Risk limits supplied at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum notional of a single fill.
    pub max_position_notional: f64,
    /// Maximum fraction of portfolio value at risk per position. Carried for
    /// configuration parity; sizing policies consult it, the ledger does not.
    pub max_portfolio_risk: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_notional: 1_000.0,
            max_portfolio_risk: 0.02,
        }
    }
}

/// Local-policy violations. The attempted fill is rejected and the ledger is
/// left exactly as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("insufficient funds: need ${required:.2}, have ${available:.2}")]
    InsufficientFunds { required: f64, available: f64 },
    #[error("fill notional ${notional:.2} exceeds limit ${limit:.2}")]
    PositionLimitExceeded { notional: f64, limit: f64 },
}

/// What a fill did to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    /// A fresh position was created.
    Opened,
    /// Same-side accretion into an existing position.
    Added,
    /// Partial close of an opposite-side position.
    Reduced { realized: f64 },
    /// Full close of an opposite-side position.
    Closed { realized: f64 },
    /// Full close plus a new position on the other side.
    Reversed { realized: f64 },
}

impl FillOutcome {
    /// Realized PnL if the fill closed anything.
    pub fn realized(&self) -> Option<f64> {
        match self {
            FillOutcome::Opened | FillOutcome::Added => None,
            FillOutcome::Reduced { realized }
            | FillOutcome::Closed { realized }
            | FillOutcome::Reversed { realized } => Some(*realized),
        }
    }
}

/// The ledger for one simulation run. Never shared across concurrent runs.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub initial_capital: f64,
    pub cash: f64,
    pub positions: HashMap<String, Position>,
    /// Append-only closed-lot history.
    pub trades: Vec<TradeRecord>,
    pub total_commission: f64,
    pub total_slippage: f64,
    pub limits: RiskLimits,
}

impl Portfolio {
    pub fn new(initial_capital: f64, limits: RiskLimits) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: HashMap::new(),
            trades: Vec::new(),
            total_commission: 0.0,
            total_slippage: 0.0,
            limits,
        }
    }

    /// Restore the empty, fully-capitalized state for a fresh run.
    pub fn reset(&mut self) {
        self.cash = self.initial_capital;
        self.positions.clear();
        self.trades.clear();
        self.total_commission = 0.0;
        self.total_slippage = 0.0;
    }

    pub fn available_cash(&self) -> f64 {
        self.cash
    }

    /// Sum of signed market values of all open positions.
    pub fn invested_value(&self) -> f64 {
        self.positions.values().map(|p| p.market_value()).sum()
    }

    pub fn total_value(&self) -> f64 {
        self.cash + self.invested_value()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.unrealized_pnl()).sum()
    }

    pub fn position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    pub fn has_position(&self, instrument: &str) -> bool {
        self.positions.contains_key(instrument)
    }

    /// Mark a position to market. No cash effect; unknown instrument is a no-op.
    pub fn mark(&mut self, instrument: &str, price: f64) {
        if let Some(pos) = self.positions.get_mut(instrument) {
            pos.update_mark(price);
        }
    }

    /// Apply a fill: open, accrete, reduce, close, or reverse.
    ///
    /// All policy checks run before any mutation, so a rejected fill leaves
    /// cash, positions, and trade history untouched — including the residual
    /// leg of a reversal, which is validated against post-close cash.
    pub fn open_or_add(
        &mut self,
        instrument: &str,
        side: Side,
        quantity: f64,
        price: f64,
        time: DateTime<Utc>,
    ) -> Result<FillOutcome, LedgerError> {
        let notional = quantity * price;

        match self.positions.get(instrument) {
            None => {
                self.check_fill(side, notional, self.cash)?;
                self.apply_open_cash(side, notional);
                self.positions.insert(
                    instrument.to_string(),
                    Position::new(instrument.to_string(), side, quantity, price, time),
                );
                Ok(FillOutcome::Opened)
            }
            Some(pos) if pos.side == side => {
                self.check_fill(side, notional, self.cash)?;
                self.apply_open_cash(side, notional);
                let pos = self
                    .positions
                    .get_mut(instrument)
                    .expect("position checked above");
                let blended =
                    (pos.entry_price * pos.quantity + price * quantity) / (pos.quantity + quantity);
                pos.entry_price = blended;
                pos.quantity += quantity;
                Ok(FillOutcome::Added)
            }
            Some(pos) => {
                let open_qty = pos.quantity;
                if quantity < open_qty - QTY_EPSILON {
                    let realized = self.reduce(instrument, quantity, price, time);
                    Ok(FillOutcome::Reduced { realized })
                } else if quantity <= open_qty + QTY_EPSILON {
                    let realized = self
                        .close_with_reason(instrument, price, time, ExitReason::Signal)
                        .expect("position checked above");
                    Ok(FillOutcome::Closed { realized })
                } else {
                    // Reversal: validate the residual leg against post-close
                    // cash before touching anything.
                    let residual_qty = quantity - open_qty;
                    let residual_notional = residual_qty * price;
                    let cash_after_close = match pos.side {
                        Side::Long => self.cash + open_qty * price,
                        Side::Short => self.cash - open_qty * price,
                    };
                    self.check_fill(side, residual_notional, cash_after_close)?;

                    let realized = self
                        .close_with_reason(instrument, price, time, ExitReason::Reversal)
                        .expect("position checked above");
                    self.apply_open_cash(side, residual_notional);
                    self.positions.insert(
                        instrument.to_string(),
                        Position::new(instrument.to_string(), side, residual_qty, price, time),
                    );
                    Ok(FillOutcome::Reversed { realized })
                }
            }
        }
    }

    /// Fully close a position at `price`, realizing PnL and appending a trade.
    ///
    /// Returns the gross realized PnL, or None if no position exists — a
    /// reported condition, not a crash.
    pub fn close(
        &mut self,
        instrument: &str,
        price: f64,
        time: DateTime<Utc>,
    ) -> Option<f64> {
        self.close_with_reason(instrument, price, time, ExitReason::Signal)
    }

    pub fn close_with_reason(
        &mut self,
        instrument: &str,
        price: f64,
        time: DateTime<Utc>,
        reason: ExitReason,
    ) -> Option<f64> {
        let pos = self.positions.remove(instrument)?;
        let pnl = pos.pnl_at(price, pos.quantity);
        match pos.side {
            // Long close credits the sale proceeds; short close debits the
            // cover cost (the entry credit plus this debit nets to the PnL).
            Side::Long => self.cash += pos.quantity * price,
            Side::Short => self.cash -= pos.quantity * price,
        }
        self.record_trade(&pos, price, pos.quantity, pnl, time, reason);
        Some(pnl)
    }

    /// Debit commission from cash and accrue the running total.
    pub fn charge_commission(&mut self, amount: f64) {
        self.cash -= amount;
        self.total_commission += amount;
    }

    /// Accrue slippage dollars (already embedded in fill prices).
    pub fn add_slippage(&mut self, amount: f64) {
        self.total_slippage += amount;
    }

    /// Return total value, asserting the conservation identity in debug builds.
    pub fn verify_conservation(&self) -> f64 {
        let total = self.total_value();

        #[cfg(debug_assertions)]
        {
            let expected = self.initial_capital + self.realized_pnl() + self.unrealized_pnl()
                - self.total_commission;
            let tolerance = 1e-6 * total.abs().max(1.0);
            assert!(
                (total - expected).abs() < tolerance,
                "conservation violated: total={total}, expected={expected} \
                 (cash={}, invested={}, realized={}, unrealized={}, commission={})",
                self.cash,
                self.invested_value(),
                self.realized_pnl(),
                self.unrealized_pnl(),
                self.total_commission
            );
        }

        total
    }

    fn check_fill(&self, side: Side, notional: f64, cash: f64) -> Result<(), LedgerError> {
        if notional > self.limits.max_position_notional {
            return Err(LedgerError::PositionLimitExceeded {
                notional,
                limit: self.limits.max_position_notional,
            });
        }
        if side == Side::Long && notional > cash {
            return Err(LedgerError::InsufficientFunds {
                required: notional,
                available: cash,
            });
        }
        Ok(())
    }

    fn apply_open_cash(&mut self, side: Side, notional: f64) {
        match side {
            Side::Long => self.cash -= notional,
            Side::Short => self.cash += notional,
        }
    }

    /// Partial close: `quantity` units leave at `price`, the rest keep the
    /// original entry.
    fn reduce(
        &mut self,
        instrument: &str,
        quantity: f64,
        price: f64,
        time: DateTime<Utc>,
    ) -> f64 {
        let pos = self
            .positions
            .get_mut(instrument)
            .expect("reduce requires an open position");
        let pnl = pos.pnl_at(price, quantity);
        match pos.side {
            Side::Long => self.cash += quantity * price,
            Side::Short => self.cash -= quantity * price,
        }
        pos.quantity -= quantity;
        pos.realized_pnl += pnl;
        let snapshot = pos.clone();
        self.record_trade(&snapshot, price, quantity, pnl, time, ExitReason::Signal);
        pnl
    }

    fn record_trade(
        &mut self,
        pos: &Position,
        exit_price: f64,
        quantity: f64,
        pnl: f64,
        exit_time: DateTime<Utc>,
        reason: ExitReason,
    ) {
        let entry_notional = pos.entry_price * quantity;
        let return_pct = if entry_notional > 0.0 {
            pnl / entry_notional * 100.0
        } else {
            0.0
        };
        self.trades.push(TradeRecord {
            instrument: pos.instrument.clone(),
            side: pos.side,
            quantity,
            entry_price: pos.entry_price,
            entry_time: pos.entry_time,
            exit_price,
            exit_time,
            pnl,
            return_pct,
            reason,
        });
    }
}
