//! Look-ahead contamination tests.
//!
//! Invariant: no indicator value or strategy signal at bar t may depend on
//! price data from bar t+1 or later.
//!
//! Method: compute on a truncated series (bars 0..100) and a full series
//! (bars 0..200), and assert the first 100 outputs are identical. For
//! strategies, additionally perturb every future bar and compare the signal
//! at a fixed index.

use chrono::{Duration, TimeZone, Utc};
use tapelab_core::domain::Bar;
use tapelab_core::indicators::{rolling_std, rsi, sma};
use tapelab_core::strategy::{RsiStrategy, SmaCrossover, Strategy, VolatilityBreakout};

/// Generate N bars of synthetic OHLCV data with a deterministic LCG walk.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.05; // -5.0 to +5.0
        price += change;
        price = price.max(10.0);

        let open = price - 0.5;
        let close = price + 0.3;
        let high = open.max(close) + 2.0;
        let low = open.min(close) - 2.0;

        bars.push(Bar {
            timestamp: start + Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1_000.0 + (i as f64 * 100.0),
        });
    }

    bars
}

fn assert_prefix_equal(name: &str, truncated: &[f64], full: &[f64], len: usize) {
    for i in 0..len {
        let t = truncated[i];
        let f = full[i];
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            !t.is_nan() && !f.is_nan(),
            "{name}: NaN mismatch at bar {i} (truncated={t}, full={f})"
        );
        assert!(
            (t - f).abs() < 1e-10,
            "{name}: look-ahead contamination at bar {i}: truncated={t}, full={f}"
        );
    }
}

#[test]
fn lookahead_sma() {
    let bars = make_test_bars(200);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    for period in [5, 10, 20] {
        let full = sma(&closes, period);
        let truncated = sma(&closes[..100], period);
        assert_prefix_equal("sma", &truncated, &full, 100);
    }
}

#[test]
fn lookahead_rolling_std() {
    let bars = make_test_bars(200);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    for period in [5, 20] {
        let full = rolling_std(&closes, period);
        let truncated = rolling_std(&closes[..100], period);
        assert_prefix_equal("rolling_std", &truncated, &full, 100);
    }
}

#[test]
fn lookahead_rsi() {
    let bars = make_test_bars(200);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    for period in [7, 14] {
        let full = rsi(&closes, period);
        let truncated = rsi(&closes[..100], period);
        assert_prefix_equal("rsi", &truncated, &full, 100);
    }
}

/// A strategy's signal at bar i must be a pure function of bars[0..=i]:
/// rewriting every later bar must not change it.
fn assert_signal_unaffected_by_future(strategy: &dyn Strategy, bars: &[Bar], at: usize) {
    let baseline = strategy
        .generate_signal(&bars[..=at])
        .expect("signal generation");

    let mut perturbed = bars.to_vec();
    for bar in perturbed.iter_mut().skip(at + 1) {
        bar.open *= 3.0;
        bar.high *= 3.0;
        bar.low *= 3.0;
        bar.close *= 3.0;
        bar.volume *= 7.0;
    }
    let after = strategy
        .generate_signal(&perturbed[..=at])
        .expect("signal generation");

    assert_eq!(
        serde_json::to_string(&baseline).unwrap(),
        serde_json::to_string(&after).unwrap(),
        "{}: signal at bar {at} changed when future bars were perturbed",
        strategy.name()
    );
}

#[test]
fn lookahead_sma_crossover_strategy() {
    let bars = make_test_bars(200);
    let strategy = SmaCrossover::new(10, 30).unwrap();
    for at in [40, 80, 120, 160] {
        assert_signal_unaffected_by_future(&strategy, &bars, at);
    }
}

#[test]
fn lookahead_rsi_strategy() {
    let bars = make_test_bars(200);
    let strategy = RsiStrategy::new(14, 30.0, 70.0).unwrap();
    for at in [40, 80, 120, 160] {
        assert_signal_unaffected_by_future(&strategy, &bars, at);
    }
}

#[test]
fn lookahead_volatility_breakout_strategy() {
    let bars = make_test_bars(200);
    let strategy = VolatilityBreakout::new(20, 2.0, 500.0).unwrap();
    for at in [40, 80, 120, 160] {
        assert_signal_unaffected_by_future(&strategy, &bars, at);
    }
}

/// Exit decisions are also history-pure.
#[test]
fn lookahead_should_exit() {
    let bars = make_test_bars(200);
    let strategy = SmaCrossover::new(10, 30).unwrap();
    let at = 100;

    let baseline = strategy
        .should_exit(&bars[..=at], 100.0, bars[at].close, tapelab_core::domain::Side::Long)
        .unwrap();

    let mut perturbed = bars.clone();
    for bar in perturbed.iter_mut().skip(at + 1) {
        bar.close *= 5.0;
    }
    let after = strategy
        .should_exit(
            &perturbed[..=at],
            100.0,
            perturbed[at].close,
            tapelab_core::domain::Side::Long,
        )
        .unwrap();

    assert_eq!(baseline, after);
}
