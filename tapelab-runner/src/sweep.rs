//! Parallel parameter sweeps.
//!
//! Each variant gets its own strategy instance and its own engine (and thus
//! its own portfolio) — runs never share mutable state.

use crate::config::BacktestConfig;
use crate::report::BacktestReport;
use crate::runner::{run_backtest, RunError};
use rayon::prelude::*;
use tapelab_core::domain::Bar;

/// Run every config against the same bars in parallel.
///
/// Results come back in input order; a failing variant does not abort the
/// others.
pub fn run_sweep(
    configs: &[BacktestConfig],
    bars: &[Bar],
) -> Vec<Result<BacktestReport, RunError>> {
    configs
        .par_iter()
        .map(|config| {
            let mut strategy = config.build_strategy()?;
            let settings = config.to_settings()?;
            run_backtest(strategy.as_mut(), bars, &settings)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic_walk;

    fn config_with_windows(short: usize, long: usize) -> BacktestConfig {
        BacktestConfig::from_toml(&format!(
            r#"
[backtest]
instrument = "BTC-USD"

[strategy]
type = "sma_crossover"

[strategy.params]
short_window = {short}
long_window = {long}
"#
        ))
        .unwrap()
    }

    #[test]
    fn sweep_runs_all_variants() {
        let bars = synthetic_walk(200, 42, 100.0);
        let configs = vec![
            config_with_windows(5, 20),
            config_with_windows(10, 30),
            config_with_windows(10, 50),
        ];
        let results = run_sweep(&configs, &bars);
        assert_eq!(results.len(), 3);
        for result in &results {
            assert!(result.is_ok());
        }
        // Different windows, different warmups.
        assert_eq!(results[0].as_ref().unwrap().warmup_bars, 25);
        assert_eq!(results[2].as_ref().unwrap().warmup_bars, 55);
    }

    #[test]
    fn one_bad_variant_does_not_poison_the_sweep() {
        let bars = synthetic_walk(200, 42, 100.0);
        let configs = vec![
            config_with_windows(5, 20),
            config_with_windows(30, 10), // invalid: short >= long
        ];
        let results = run_sweep(&configs, &bars);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn sweep_matches_sequential_runs() {
        let bars = synthetic_walk(200, 42, 100.0);
        let config = config_with_windows(5, 20);

        let parallel = run_sweep(&[config.clone()], &bars);
        let mut strategy = config.build_strategy().unwrap();
        let sequential =
            run_backtest(strategy.as_mut(), &bars, &config.to_settings().unwrap()).unwrap();

        let a = serde_json::to_string(parallel[0].as_ref().unwrap()).unwrap();
        let b = serde_json::to_string(&sequential).unwrap();
        assert_eq!(a, b);
    }
}
