//! The engine: execution simulation, the bar loop, and run records.

pub mod backtest;
pub mod events;
pub mod execution;
pub mod observer;

pub use backtest::{BacktestEngine, EngineConfig, RunState};
pub use events::{EquityPoint, ExecutionEvent, RunLog, SignalRecord, TradeAction};
pub use execution::{ExecutionConfig, ExecutionSimulator};
pub use observer::{EventObserver, NullObserver, RecordingObserver, Rejection, RejectionReason};
