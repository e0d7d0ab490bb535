//! Error taxonomy.
//!
//! Only two errors are fatal to a run: `EngineError::InsufficientData` (before
//! any bar is processed) and `ConfigError` (at construction). Everything else
//! — ledger policy rejections, per-bar strategy failures — is recovered
//! locally and the simulation continues.

use thiserror::Error;

/// Fatal run-level errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("insufficient data: need {required} bars, have {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("engine holds state from a prior run; call reset() first")]
    NotReset,
}

/// Invalid parameter combinations, rejected at construction before any run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// A single bar's signal or exit-check call failed. The engine logs it via
/// the observer and treats the bar as HOLD / no-exit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("insufficient history: need {required} bars, have {actual}")]
    InsufficientHistory { required: usize, actual: usize },
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}
