//! Volatility breakout strategy.
//!
//! Bands are a rolling mean ± multiplier × rolling stdev of closes. BUY on a
//! close above the upper band, SELL below the lower band, both gated on a
//! minimum volume.

use super::{RiskParams, Strategy};
use crate::domain::{Bar, Signal, SignalKind};
use crate::error::{ConfigError, StrategyError};
use crate::indicators::{rolling_std, sma};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct VolatilityBreakout {
    lookback: usize,
    band_multiplier: f64,
    min_volume: f64,
    risk: RiskParams,
}

impl VolatilityBreakout {
    pub fn new(
        lookback: usize,
        band_multiplier: f64,
        min_volume: f64,
    ) -> Result<Self, ConfigError> {
        Self::with_risk(lookback, band_multiplier, min_volume, RiskParams::default())
    }

    pub fn with_risk(
        lookback: usize,
        band_multiplier: f64,
        min_volume: f64,
        risk: RiskParams,
    ) -> Result<Self, ConfigError> {
        if lookback < 2 {
            return Err(ConfigError::InvalidParameter(
                "lookback must be at least 2".into(),
            ));
        }
        if band_multiplier <= 0.0 {
            return Err(ConfigError::InvalidParameter(
                "band multiplier must be positive".into(),
            ));
        }
        if min_volume < 0.0 {
            return Err(ConfigError::InvalidParameter(
                "minimum volume must be non-negative".into(),
            ));
        }
        Ok(Self {
            lookback,
            band_multiplier,
            min_volume,
            risk,
        })
    }
}

impl Strategy for VolatilityBreakout {
    fn name(&self) -> &str {
        "volatility_breakout"
    }

    fn params(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("lookback".to_string(), self.lookback as f64),
            ("band_multiplier".to_string(), self.band_multiplier),
            ("min_volume".to_string(), self.min_volume),
        ])
    }

    fn required_history(&self) -> usize {
        self.lookback + 5
    }

    fn generate_signal(&self, history: &[Bar]) -> Result<Signal, StrategyError> {
        let last = history.last().ok_or(StrategyError::InsufficientHistory {
            required: self.required_history(),
            actual: 0,
        })?;
        let last_close = last.close;

        let closes: Vec<f64> = history.iter().map(|b| b.close).collect();
        let middle = sma(&closes, self.lookback);
        let stdev = rolling_std(&closes, self.lookback);

        let n = closes.len();
        let (mid, sd) = (middle[n - 1], stdev[n - 1]);
        if mid.is_nan() || sd.is_nan() {
            return Ok(Signal::hold(last_close));
        }
        let upper = mid + sd * self.band_multiplier;
        let lower = mid - sd * self.band_multiplier;

        let (kind, breakout_strength) = if last_close > upper && last.volume >= self.min_volume {
            (SignalKind::Buy, (last_close - upper) / upper)
        } else if last_close < lower && last.volume >= self.min_volume {
            (SignalKind::Sell, (lower - last_close) / lower)
        } else {
            return Ok(Signal::hold(last_close)
                .with_metadata("upper_band", upper)
                .with_metadata("lower_band", lower));
        };

        let volume_strength = if self.min_volume > 0.0 {
            (last.volume / self.min_volume).min(2.0)
        } else {
            1.0
        };
        let mut confidence = (breakout_strength * 5.0 * volume_strength).clamp(0.3, 0.9);

        // Trend confirmation: breakout aligned with the last five closes.
        if n >= 5 {
            let window_start = closes[n - 5];
            if window_start > 0.0 {
                let trend = (last_close - window_start) / window_start;
                let aligned = (kind == SignalKind::Buy && trend > 0.0)
                    || (kind == SignalKind::Sell && trend < 0.0);
                confidence *= if aligned { 1.2 } else { 0.8 };
                confidence = confidence.min(1.0);
            }
        }

        Signal::new(kind, confidence, last_close)
            .map(|s| {
                s.with_metadata("upper_band", upper)
                    .with_metadata("lower_band", lower)
                    .with_metadata("middle_band", mid)
                    .with_metadata("volatility", sd)
            })
            .map_err(|e| StrategyError::Evaluation(e.to_string()))
    }

    fn risk(&self) -> &RiskParams {
        &self.risk
    }
}
