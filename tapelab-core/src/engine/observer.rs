//! Injected run observer.
//!
//! The engine has no ambient logging; anything worth watching is delivered to
//! an `EventObserver` supplied by the caller. The default observer ignores
//! everything.

use super::events::{ExecutionEvent, TradeAction};
use crate::domain::TradeRecord;
use crate::error::StrategyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why an execution attempt was turned away without touching the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectionReason {
    BelowMinimumNotional { notional: f64, minimum: f64 },
    InsufficientFunds { required: f64, available: f64 },
    PositionLimitExceeded { notional: f64, limit: f64 },
}

/// A rejected execution attempt. Rejections reach the observer but are not
/// rows in the execution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rejection {
    pub timestamp: DateTime<Utc>,
    pub action: TradeAction,
    pub reason: RejectionReason,
}

/// Receives one callback per mark, fill, rejection, and exit, plus recovered
/// strategy failures. All methods default to no-ops.
pub trait EventObserver {
    fn on_mark(&mut self, _instrument: &str, _price: f64, _equity: f64) {}
    fn on_fill(&mut self, _event: &ExecutionEvent) {}
    fn on_rejection(&mut self, _rejection: &Rejection) {}
    fn on_exit(&mut self, _trade: &TradeRecord) {}
    fn on_strategy_error(&mut self, _timestamp: DateTime<Utc>, _error: &StrategyError) {}
}

/// Observer that discards everything.
pub struct NullObserver;

impl EventObserver for NullObserver {}

/// Observer that keeps everything, for tests and diagnostics.
#[derive(Default)]
pub struct RecordingObserver {
    pub marks: usize,
    pub fills: Vec<ExecutionEvent>,
    pub rejections: Vec<Rejection>,
    pub exits: Vec<TradeRecord>,
    pub strategy_errors: Vec<String>,
}

impl EventObserver for RecordingObserver {
    fn on_mark(&mut self, _instrument: &str, _price: f64, _equity: f64) {
        self.marks += 1;
    }

    fn on_fill(&mut self, event: &ExecutionEvent) {
        self.fills.push(event.clone());
    }

    fn on_rejection(&mut self, rejection: &Rejection) {
        self.rejections.push(rejection.clone());
    }

    fn on_exit(&mut self, trade: &TradeRecord) {
        self.exits.push(trade.clone());
    }

    fn on_strategy_error(&mut self, _timestamp: DateTime<Utc>, error: &StrategyError) {
        self.strategy_errors.push(error.to_string());
    }
}
