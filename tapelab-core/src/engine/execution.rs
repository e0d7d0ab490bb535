//! Execution simulator — converts a signal into a simulated fill, or a no-op.
//!
//! Slippage is directional: buyers pay more, sellers receive less. Commission
//! is a rate on notional, added to the cost of a buy and taken out of the
//! proceeds of a sell. Proposals below the minimum trade size are rejected
//! before the ledger is touched.

use super::events::{ExecutionEvent, TradeAction};
use super::observer::{EventObserver, Rejection, RejectionReason};
use crate::domain::{LedgerError, Portfolio, Side, Signal, SignalKind};
use crate::strategy::Strategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution friction and gating parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Commission as a fraction of notional, charged per fill.
    pub commission_rate: f64,
    /// Adverse price movement as a fraction of the quoted price.
    pub slippage_rate: f64,
    /// Proposed notionals below this are rejected as dust.
    pub min_trade_notional: f64,
    /// Signals at or below this confidence are not executed.
    pub confidence_threshold: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            commission_rate: 0.005,
            slippage_rate: 0.001,
            min_trade_notional: 10.0,
            confidence_threshold: 0.5,
        }
    }
}

impl ExecutionConfig {
    pub fn new(commission_rate: f64, slippage_rate: f64) -> Self {
        Self {
            commission_rate,
            slippage_rate,
            ..Self::default()
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Stateless fill simulator over one ledger.
#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    config: ExecutionConfig,
}

impl ExecutionSimulator {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Quoted price adjusted adversely for the taker.
    pub fn fill_price(&self, kind: SignalKind, quoted: f64) -> f64 {
        match kind {
            SignalKind::Buy => quoted * (1.0 + self.config.slippage_rate),
            SignalKind::Sell => quoted * (1.0 - self.config.slippage_rate),
            SignalKind::Hold => quoted,
        }
    }

    /// Attempt to execute a signal against the ledger.
    ///
    /// Returns the execution event on success. Rejections (dust, funds,
    /// limits) notify the observer and leave the ledger untouched.
    pub fn execute(
        &self,
        signal: &Signal,
        strategy: &dyn Strategy,
        portfolio: &mut Portfolio,
        instrument: &str,
        time: DateTime<Utc>,
        observer: &mut dyn EventObserver,
    ) -> Option<ExecutionEvent> {
        if signal.is_hold() {
            return None;
        }

        let action = match signal.kind {
            SignalKind::Buy => TradeAction::Buy,
            SignalKind::Sell => TradeAction::Sell,
            SignalKind::Hold => unreachable!("hold handled above"),
        };
        let fill_price = self.fill_price(signal.kind, signal.price);

        // A sell against an open long closes the whole lot; everything else
        // is sized by the strategy.
        let closing_long = signal.kind == SignalKind::Sell
            && portfolio
                .position(instrument)
                .is_some_and(|p| p.side == Side::Long);

        if closing_long {
            let quantity = portfolio
                .position(instrument)
                .expect("checked above")
                .quantity;
            let notional = quantity * fill_price;
            let commission = notional * self.config.commission_rate;
            let slippage_cost = (signal.price - fill_price).abs() * quantity;

            let pnl = portfolio
                .close(instrument, fill_price, time)
                .expect("position checked above");
            portfolio.charge_commission(commission);
            portfolio.add_slippage(slippage_cost);

            let event = ExecutionEvent {
                timestamp: time,
                action,
                price: fill_price,
                quantity,
                notional,
                commission,
                pnl: Some(pnl),
                confidence: signal.confidence,
            };
            observer.on_fill(&event);
            return Some(event);
        }

        let notional = strategy.position_size(portfolio.available_cash(), fill_price, signal);
        if notional < self.config.min_trade_notional {
            observer.on_rejection(&Rejection {
                timestamp: time,
                action,
                reason: RejectionReason::BelowMinimumNotional {
                    notional,
                    minimum: self.config.min_trade_notional,
                },
            });
            return None;
        }

        let quantity = notional / fill_price;
        let commission = notional * self.config.commission_rate;
        let slippage_cost = (signal.price - fill_price).abs() * quantity;

        // A buy must fit within cash including its commission.
        if signal.kind == SignalKind::Buy {
            let available = portfolio.available_cash();
            if notional + commission > available {
                observer.on_rejection(&Rejection {
                    timestamp: time,
                    action,
                    reason: RejectionReason::InsufficientFunds {
                        required: notional + commission,
                        available,
                    },
                });
                return None;
            }
        }

        let side = match signal.kind {
            SignalKind::Buy => Side::Long,
            SignalKind::Sell => Side::Short,
            SignalKind::Hold => unreachable!(),
        };

        match portfolio.open_or_add(instrument, side, quantity, fill_price, time) {
            Ok(outcome) => {
                portfolio.charge_commission(commission);
                portfolio.add_slippage(slippage_cost);
                let event = ExecutionEvent {
                    timestamp: time,
                    action,
                    price: fill_price,
                    quantity,
                    notional,
                    commission,
                    pnl: outcome.realized(),
                    confidence: signal.confidence,
                };
                observer.on_fill(&event);
                Some(event)
            }
            Err(err) => {
                observer.on_rejection(&Rejection {
                    timestamp: time,
                    action,
                    reason: err.into(),
                });
                None
            }
        }
    }
}

impl From<LedgerError> for RejectionReason {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                required,
                available,
            } => RejectionReason::InsufficientFunds {
                required,
                available,
            },
            LedgerError::PositionLimitExceeded { notional, limit } => {
                RejectionReason::PositionLimitExceeded { notional, limit }
            }
        }
    }
}
