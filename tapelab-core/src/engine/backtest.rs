//! The simulation loop — one pass over the price series, five steps per bar.
//!
//! Per-run state machine: Uninitialized → WarmingUp → Running → Completed,
//! with Failed on unrecoverable input. Each bar, in strict order:
//! 1. mark open positions at the close
//! 2. snapshot equity (reflecting step 1, never later steps)
//! 3. request a signal from bars[0..=i] only
//! 4. execute the signal if confident enough
//! 5. ask the strategy whether to exit any remaining position

use super::events::{EquityPoint, ExecutionEvent, RunLog, SignalRecord, TradeAction};
use super::execution::{ExecutionConfig, ExecutionSimulator};
use super::observer::{EventObserver, NullObserver};
use crate::domain::{Bar, Portfolio, RiskLimits};
use crate::error::EngineError;
use crate::strategy::Strategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration for a single engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_capital: f64,
    pub execution: ExecutionConfig,
    pub limits: RiskLimits,
}

impl EngineConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            execution: ExecutionConfig::default(),
            limits: RiskLimits::default(),
        }
    }

    pub fn with_execution(initial_capital: f64, execution: ExecutionConfig) -> Self {
        Self {
            initial_capital,
            execution,
            limits: RiskLimits::default(),
        }
    }
}

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Uninitialized,
    WarmingUp,
    Running,
    Completed,
    Failed,
}

/// The backtest engine. Owns the ledger for one run at a time; never shared
/// across concurrent runs.
pub struct BacktestEngine {
    config: EngineConfig,
    portfolio: Portfolio,
    simulator: ExecutionSimulator,
    state: RunState,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig) -> Self {
        let portfolio = Portfolio::new(config.initial_capital, config.limits.clone());
        let simulator = ExecutionSimulator::new(config.execution.clone());
        Self {
            config,
            portfolio,
            simulator,
            state: RunState::Uninitialized,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Discard all state from a prior run. Required before re-running.
    pub fn reset(&mut self) {
        self.portfolio.reset();
        self.state = RunState::Uninitialized;
    }

    /// Run the strategy over the series, discarding observer callbacks.
    pub fn run(
        &mut self,
        strategy: &mut dyn Strategy,
        bars: &[Bar],
        instrument: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<RunLog, EngineError> {
        self.run_with_observer(strategy, bars, instrument, start, end, &mut NullObserver)
    }

    /// Run the strategy over the series, reporting marks, fills, rejections,
    /// exits, and recovered strategy failures to `observer`.
    pub fn run_with_observer(
        &mut self,
        strategy: &mut dyn Strategy,
        bars: &[Bar],
        instrument: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        observer: &mut dyn EventObserver,
    ) -> Result<RunLog, EngineError> {
        if self.state != RunState::Uninitialized {
            return Err(EngineError::NotReset);
        }

        let series: Vec<Bar> = bars
            .iter()
            .filter(|b| start.map_or(true, |s| b.timestamp >= s))
            .filter(|b| end.map_or(true, |e| b.timestamp <= e))
            .cloned()
            .collect();

        let min_history = strategy.required_history();
        if series.len() < min_history.max(1) {
            self.state = RunState::Failed;
            return Err(EngineError::InsufficientData {
                required: min_history.max(1),
                actual: series.len(),
            });
        }

        self.portfolio.reset();
        self.state = RunState::WarmingUp;
        strategy.initialize(&series[..min_history]);
        self.state = RunState::Running;

        let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(series.len() - min_history);
        let mut signals: Vec<SignalRecord> = Vec::new();
        let mut executions: Vec<ExecutionEvent> = Vec::new();

        for i in min_history..series.len() {
            let bar = &series[i];
            let time = bar.timestamp;
            let price = bar.close;
            let history = &series[..=i];

            // 1. Mark to market.
            self.portfolio.mark(instrument, price);
            let equity = self.portfolio.verify_conservation();
            observer.on_mark(instrument, price, equity);

            // 2. Snapshot, reflecting the mark and nothing later.
            equity_curve.push(EquityPoint {
                timestamp: time,
                equity,
                cash: self.portfolio.cash,
                invested: self.portfolio.invested_value(),
            });

            // 3. Signal from history only. A failing bar produces no signal
            // and must never abort the run.
            let signal = match strategy.generate_signal(history) {
                Ok(signal) => {
                    signals.push(SignalRecord {
                        timestamp: time,
                        kind: signal.kind,
                        confidence: signal.confidence,
                        price: signal.price,
                    });
                    Some(signal)
                }
                Err(err) => {
                    observer.on_strategy_error(time, &err);
                    None
                }
            };

            // 4. Execute above the confidence threshold.
            if let Some(signal) = signal {
                if signal.confidence > self.config.execution.confidence_threshold {
                    if let Some(event) = self.simulator.execute(
                        &signal,
                        strategy,
                        &mut self.portfolio,
                        instrument,
                        time,
                        observer,
                    ) {
                        executions.push(event);
                    }
                }
            }

            // 5. Exit check on whatever is still open.
            if let Some(pos) = self.portfolio.position(instrument) {
                let (entry_price, side, quantity) = (pos.entry_price, pos.side, pos.quantity);
                match strategy.should_exit(history, entry_price, price, side) {
                    Ok(Some(reason)) => {
                        if let Some(pnl) =
                            self.portfolio.close_with_reason(instrument, price, time, reason)
                        {
                            let trade = self
                                .portfolio
                                .trades
                                .last()
                                .cloned()
                                .expect("close appends a trade");
                            observer.on_exit(&trade);
                            executions.push(ExecutionEvent {
                                timestamp: time,
                                action: TradeAction::Close,
                                price,
                                quantity,
                                notional: quantity * price,
                                commission: 0.0,
                                pnl: Some(pnl),
                                confidence: 0.0,
                            });
                        }
                    }
                    Ok(None) => {}
                    Err(err) => observer.on_strategy_error(time, &err),
                }
            }
        }

        self.state = RunState::Completed;

        let final_value = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.config.initial_capital);

        Ok(RunLog {
            instrument: instrument.to_string(),
            equity_curve,
            signals,
            executions,
            trades: self.portfolio.trades.clone(),
            bar_count: series.len() - min_history,
            warmup_bars: min_history,
            first_close: series[0].close,
            last_close: series[series.len() - 1].close,
            initial_capital: self.config.initial_capital,
            final_value,
            total_commission: self.portfolio.total_commission,
            total_slippage: self.portfolio.total_slippage,
        })
    }
}
