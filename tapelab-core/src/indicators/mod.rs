//! Rolling indicators over close-price slices.
//!
//! Each function returns one value per input element, NaN until the window is
//! full. A value at index i depends only on inputs [0..=i] — the look-ahead
//! tests in `tests/lookahead_test.rs` enforce this.

/// Simple moving average. First valid value at index `period - 1`.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "SMA period must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period {
        return result;
    }

    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = sum / period as f64;
    for i in period..n {
        sum += values[i] - values[i - period];
        result[i] = sum / period as f64;
    }
    result
}

/// Rolling sample standard deviation (n−1 denominator, the pandas default).
/// First valid value at index `period - 1`.
pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 2, "rolling std period must be >= 2");
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance =
            window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
        result[i] = variance.sqrt();
    }
    result
}

/// Relative Strength Index using rolling-mean average gain/loss (Cutler's
/// form). First valid value at index `period`.
///
/// Edge cases: no losses in the window → 100; no gains → 0; flat window → 50.
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "RSI period must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period + 1 {
        return result;
    }

    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let change = values[i] - values[i - 1];
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    for i in period..n {
        let window = i + 1 - period..=i;
        let avg_gain: f64 = gains[window.clone()].iter().sum::<f64>() / period as f64;
        let avg_loss: f64 = losses[window].iter().sum::<f64>() / period as f64;
        result[i] = if avg_gain == 0.0 && avg_loss == 0.0 {
            50.0
        } else if avg_loss == 0.0 {
            100.0
        } else if avg_gain == 0.0 {
            0.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };
    }
    result
}

/// Mean of a slice; 0.0 when empty.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
