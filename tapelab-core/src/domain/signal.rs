//! Trading signals — the contract between strategies and the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Directional action requested by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("confidence {0} outside [0.0, 1.0]")]
    ConfidenceOutOfRange(f64),
}

/// A signal emitted by a strategy at one bar.
///
/// The metadata map carries diagnostic values (indicator readings, breakout
/// levels) for the signal log; the engine never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    /// Conviction in [0.0, 1.0]. The engine only executes above its threshold.
    pub confidence: f64,
    /// Price the signal was evaluated at (the bar close).
    pub price: f64,
    pub metadata: BTreeMap<String, f64>,
}

impl Signal {
    /// Construct a signal, rejecting confidence outside [0.0, 1.0].
    pub fn new(kind: SignalKind, confidence: f64, price: f64) -> Result<Self, SignalError> {
        if !(0.0..=1.0).contains(&confidence) || confidence.is_nan() {
            return Err(SignalError::ConfidenceOutOfRange(confidence));
        }
        Ok(Self {
            kind,
            confidence,
            price,
            metadata: BTreeMap::new(),
        })
    }

    /// A zero-confidence HOLD at the given price.
    pub fn hold(price: f64) -> Self {
        Self {
            kind: SignalKind::Hold,
            confidence: 0.0,
            price,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: f64) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn is_hold(&self) -> bool {
        self.kind == SignalKind::Hold
    }
}
