//! End-to-end engine scenarios, driven by a scripted strategy so fills land
//! on known bars at known prices.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap};
use tapelab_core::domain::{Bar, RiskLimits, Side, Signal, SignalKind};
use tapelab_core::engine::{
    BacktestEngine, EngineConfig, ExecutionConfig, RecordingObserver, RunState, TradeAction,
};
use tapelab_core::error::StrategyError;
use tapelab_core::strategy::{RiskParams, Strategy};

/// Emits a predetermined signal at chosen bar indices and proposes a fixed
/// notional. Exit behavior comes from `RiskParams` (set the thresholds
/// absurdly wide to disable rule exits).
struct Scripted {
    min_history: usize,
    steps: HashMap<usize, (SignalKind, f64)>,
    notional: f64,
    risk: RiskParams,
}

impl Scripted {
    fn new(steps: &[(usize, SignalKind, f64)], notional: f64) -> Self {
        Self {
            min_history: 2,
            steps: steps
                .iter()
                .map(|&(i, kind, conf)| (i, (kind, conf)))
                .collect(),
            notional,
            risk: RiskParams {
                stop_loss_pct: 1_000.0,
                take_profit_pct: 1_000.0,
                ..RiskParams::default()
            },
        }
    }

    fn with_default_exits(mut self) -> Self {
        self.risk = RiskParams::default();
        self
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }
    fn params(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
    fn required_history(&self) -> usize {
        self.min_history
    }
    fn generate_signal(&self, history: &[Bar]) -> Result<Signal, StrategyError> {
        let i = history.len() - 1;
        let close = history[i].close;
        match self.steps.get(&i) {
            Some(&(kind, confidence)) => Signal::new(kind, confidence, close)
                .map_err(|e| StrategyError::Evaluation(e.to_string())),
            None => Ok(Signal::hold(close)),
        }
    }
    fn risk(&self) -> &RiskParams {
        &self.risk
    }
    fn position_size(&self, _cash: f64, _price: f64, _signal: &Signal) -> f64 {
        self.notional
    }
}

/// Fails on every signal request.
struct AlwaysFails {
    risk: RiskParams,
}

impl Strategy for AlwaysFails {
    fn name(&self) -> &str {
        "always_fails"
    }
    fn params(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
    fn required_history(&self) -> usize {
        2
    }
    fn generate_signal(&self, _history: &[Bar]) -> Result<Signal, StrategyError> {
        Err(StrategyError::Evaluation("synthetic failure".into()))
    }
    fn risk(&self) -> &RiskParams {
        &self.risk
    }
}

fn t(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: t(i),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        })
        .collect()
}

fn engine(capital: f64, execution: ExecutionConfig) -> BacktestEngine {
    BacktestEngine::new(EngineConfig {
        initial_capital: capital,
        execution,
        limits: RiskLimits {
            max_position_notional: 1_000_000.0,
            max_portfolio_risk: 0.02,
        },
    })
}

#[test]
fn worked_buy_scenario() {
    // $10,000, commission 0.5%, slippage 0.1%; BUY confidence 0.8 for $1,000
    // at price 100 → fill 100.1, commission $5, qty ≈ 9.99, cash ≈ 8,995.
    let bars = bars_from_closes(&[100.0, 100.0, 100.0, 100.0, 100.0]);
    let mut strategy = Scripted::new(&[(2, SignalKind::Buy, 0.8)], 1_000.0);
    let mut eng = engine(10_000.0, ExecutionConfig::new(0.005, 0.001));

    let log = eng.run(&mut strategy, &bars, "BTC-USD", None, None).unwrap();

    assert_eq!(log.executions.len(), 1);
    let fill = &log.executions[0];
    assert_eq!(fill.action, TradeAction::Buy);
    assert!((fill.price - 100.1).abs() < 1e-10);
    assert!((fill.notional - 1_000.0).abs() < 1e-10);
    assert!((fill.commission - 5.0).abs() < 1e-10);
    assert!((fill.quantity - 9.99000999).abs() < 1e-6);

    let portfolio = eng.portfolio();
    assert!((portfolio.cash - 8_995.0).abs() < 1e-10);
    portfolio.verify_conservation();
}

#[test]
fn sell_signal_closes_long_with_friction() {
    // Open exactly 10 units at fill 100.1, then a SELL at 110 closes the lot:
    // cash gains 10 × 110 × (1 − slippage) minus commission on that notional.
    let closes = [100.0, 100.0, 100.0, 110.0, 110.0];
    let bars = bars_from_closes(&closes);
    let mut strategy = Scripted::new(
        &[(2, SignalKind::Buy, 0.8), (3, SignalKind::Sell, 0.8)],
        1_001.0, // 10 units at the slipped price of 100.1
    );
    let mut eng = engine(10_000.0, ExecutionConfig::new(0.005, 0.001));

    let log = eng.run(&mut strategy, &bars, "BTC-USD", None, None).unwrap();

    assert_eq!(log.executions.len(), 2);
    let exit = &log.executions[1];
    assert_eq!(exit.action, TradeAction::Sell);

    let exit_fill = 110.0 * 0.999;
    let expected_pnl = (exit_fill - 100.1) * 10.0;
    assert!((exit.pnl.unwrap() - expected_pnl).abs() < 1e-6);

    assert!(!eng.portfolio().has_position("BTC-USD"));
    assert_eq!(log.trades.len(), 1);

    // Cash: 10000 − 1001 − commission_in + 10×110×0.999 − commission_out
    let commission_in = 1_001.0 * 0.005;
    let commission_out = 10.0 * exit_fill * 0.005;
    let expected_cash = 10_000.0 - 1_001.0 - commission_in + 10.0 * exit_fill - commission_out;
    assert!((eng.portfolio().cash - expected_cash).abs() < 1e-6);
    eng.portfolio().verify_conservation();
}

#[test]
fn oversized_buy_reverses_short() {
    // Short 10 @ 100, then a 15-unit buy at 100: cover 10, go long 5.
    let bars = bars_from_closes(&[100.0; 6]);
    // Buys are sized larger than sells so the cover overshoots into a long.
    struct TwoSizes {
        inner: Scripted,
    }
    impl Strategy for TwoSizes {
        fn name(&self) -> &str {
            "two_sizes"
        }
        fn params(&self) -> BTreeMap<String, f64> {
            BTreeMap::new()
        }
        fn required_history(&self) -> usize {
            self.inner.required_history()
        }
        fn generate_signal(&self, history: &[Bar]) -> Result<Signal, StrategyError> {
            self.inner.generate_signal(history)
        }
        fn risk(&self) -> &RiskParams {
            self.inner.risk()
        }
        fn position_size(&self, _cash: f64, _price: f64, signal: &Signal) -> f64 {
            match signal.kind {
                SignalKind::Buy => 1_500.0,
                _ => 1_000.0,
            }
        }
    }
    let mut two = TwoSizes {
        inner: Scripted::new(&[(2, SignalKind::Sell, 0.9), (4, SignalKind::Buy, 0.9)], 1_000.0),
    };

    let mut eng = engine(10_000.0, ExecutionConfig::frictionless());
    let log = eng.run(&mut two, &bars, "BTC-USD", None, None).unwrap();

    assert_eq!(log.executions.len(), 2);
    let pos = eng.portfolio().position("BTC-USD").unwrap();
    assert_eq!(pos.side, Side::Long);
    assert!((pos.quantity - 5.0).abs() < 1e-10);
    assert!((pos.entry_price - 100.0).abs() < 1e-10);
    assert_eq!(log.trades.len(), 1);
    assert_eq!(log.trades[0].side, Side::Short);
    eng.portfolio().verify_conservation();
}

#[test]
fn stop_loss_exit_closes_with_reason() {
    // Buy at 100, then the price collapses past the 5% stop.
    let closes = [100.0, 100.0, 100.0, 100.0, 90.0, 90.0];
    let bars = bars_from_closes(&closes);
    let mut strategy =
        Scripted::new(&[(2, SignalKind::Buy, 0.9)], 1_000.0).with_default_exits();
    let mut eng = engine(10_000.0, ExecutionConfig::frictionless());

    let mut obs = RecordingObserver::default();
    let log = eng
        .run_with_observer(&mut strategy, &bars, "BTC-USD", None, None, &mut obs)
        .unwrap();

    assert!(!eng.portfolio().has_position("BTC-USD"));
    assert_eq!(log.trades.len(), 1);
    assert_eq!(log.trades[0].reason.to_string(), "stop_loss");
    assert_eq!(obs.exits.len(), 1);

    let close_event = log
        .executions
        .iter()
        .find(|e| e.action == TradeAction::Close)
        .expect("close event recorded");
    assert_eq!(close_event.price, 90.0);
    assert!(close_event.pnl.unwrap() < 0.0);
}

#[test]
fn take_profit_exit_closes_with_reason() {
    let closes = [100.0, 100.0, 100.0, 100.0, 111.0, 111.0];
    let bars = bars_from_closes(&closes);
    let mut strategy =
        Scripted::new(&[(2, SignalKind::Buy, 0.9)], 1_000.0).with_default_exits();
    let mut eng = engine(10_000.0, ExecutionConfig::frictionless());

    let log = eng.run(&mut strategy, &bars, "BTC-USD", None, None).unwrap();
    assert_eq!(log.trades.len(), 1);
    assert_eq!(log.trades[0].reason.to_string(), "take_profit");
    assert!(log.trades[0].pnl > 0.0);
}

#[test]
fn low_confidence_signals_are_logged_but_not_executed() {
    let bars = bars_from_closes(&[100.0; 5]);
    let mut strategy = Scripted::new(&[(2, SignalKind::Buy, 0.5)], 1_000.0); // at threshold, not above
    let mut eng = engine(10_000.0, ExecutionConfig::frictionless());

    let log = eng.run(&mut strategy, &bars, "BTC-USD", None, None).unwrap();
    assert!(log.executions.is_empty());
    assert!(log.signals.iter().any(|s| s.kind == SignalKind::Buy));
    assert_eq!(eng.portfolio().cash, 10_000.0);
}

#[test]
fn failing_strategy_never_aborts_the_run() {
    let bars = bars_from_closes(&[100.0; 10]);
    let mut strategy = AlwaysFails {
        risk: RiskParams::default(),
    };
    let mut eng = engine(10_000.0, ExecutionConfig::default());

    let mut obs = RecordingObserver::default();
    let log = eng
        .run_with_observer(&mut strategy, &bars, "BTC-USD", None, None, &mut obs)
        .unwrap();

    assert_eq!(eng.state(), RunState::Completed);
    assert_eq!(log.bar_count, 8);
    assert!(log.signals.is_empty());
    assert_eq!(obs.strategy_errors.len(), 8);
    assert_eq!(log.equity_curve.len(), 8); // every bar still snapshotted
}

#[test]
fn equity_snapshot_precedes_execution() {
    // The snapshot on the fill bar must show pre-fill state: commission has
    // not been charged yet when the snapshot is taken.
    let bars = bars_from_closes(&[100.0; 5]);
    let mut strategy = Scripted::new(&[(2, SignalKind::Buy, 0.9)], 1_000.0);
    let mut eng = engine(10_000.0, ExecutionConfig::new(0.005, 0.001));

    let log = eng.run(&mut strategy, &bars, "BTC-USD", None, None).unwrap();
    // Warmup 2 → snapshots at bars 2, 3, 4; the fill lands on bar 2.
    assert_eq!(log.equity_curve[0].equity, 10_000.0);
    // By the next snapshot the commission and slippage show up.
    assert!(log.equity_curve[1].equity < 10_000.0);
}

#[test]
fn reset_then_rerun_is_deterministic() {
    let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
    let bars = bars_from_closes(&closes);
    let mut strategy = Scripted::new(
        &[(5, SignalKind::Buy, 0.9), (20, SignalKind::Sell, 0.9)],
        1_000.0,
    );
    let mut eng = engine(10_000.0, ExecutionConfig::default());

    let first = eng.run(&mut strategy, &bars, "BTC-USD", None, None).unwrap();
    eng.reset();
    let second = eng.run(&mut strategy, &bars, "BTC-USD", None, None).unwrap();

    let a = serde_json::to_string(&first).unwrap();
    let b = serde_json::to_string(&second).unwrap();
    assert_eq!(a, b);
}
