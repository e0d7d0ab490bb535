//! RSI mean-reversion strategy.
//!
//! BUY when RSI is oversold, SELL when overbought. Confidence grows with the
//! depth of the extreme and is nudged by RSI-trend and volume confirmation.

use super::{RiskParams, Strategy};
use crate::domain::{Bar, Signal, SignalKind};
use crate::error::{ConfigError, StrategyError};
use crate::indicators::{mean, rsi};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct RsiStrategy {
    period: usize,
    oversold: f64,
    overbought: f64,
    risk: RiskParams,
}

impl RsiStrategy {
    pub fn new(period: usize, oversold: f64, overbought: f64) -> Result<Self, ConfigError> {
        Self::with_risk(period, oversold, overbought, RiskParams::default())
    }

    pub fn with_risk(
        period: usize,
        oversold: f64,
        overbought: f64,
        risk: RiskParams,
    ) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::InvalidParameter(
                "RSI period must be at least 1".into(),
            ));
        }
        if oversold >= overbought {
            return Err(ConfigError::InvalidParameter(format!(
                "oversold threshold ({oversold}) must be less than overbought ({overbought})"
            )));
        }
        if !(0.0..=100.0).contains(&oversold) || !(0.0..=100.0).contains(&overbought) {
            return Err(ConfigError::InvalidParameter(
                "RSI thresholds must lie in [0, 100]".into(),
            ));
        }
        Ok(Self {
            period,
            oversold,
            overbought,
            risk,
        })
    }
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &str {
        "rsi"
    }

    fn params(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("period".to_string(), self.period as f64),
            ("oversold".to_string(), self.oversold),
            ("overbought".to_string(), self.overbought),
        ])
    }

    fn required_history(&self) -> usize {
        self.period * 2 + 5
    }

    fn generate_signal(&self, history: &[Bar]) -> Result<Signal, StrategyError> {
        let last_close = history
            .last()
            .ok_or(StrategyError::InsufficientHistory {
                required: self.required_history(),
                actual: 0,
            })?
            .close;

        let closes: Vec<f64> = history.iter().map(|b| b.close).collect();
        let values = rsi(&closes, self.period);
        let current = *values.last().unwrap_or(&f64::NAN);
        if current.is_nan() {
            return Ok(Signal::hold(last_close));
        }

        let (kind, base_confidence) = if current < self.oversold {
            let depth = (self.oversold - current) / self.oversold;
            (SignalKind::Buy, depth.clamp(0.3, 0.9))
        } else if current > self.overbought {
            let depth = (current - self.overbought) / (100.0 - self.overbought);
            (SignalKind::Sell, depth.clamp(0.3, 0.9))
        } else {
            return Ok(Signal::hold(last_close).with_metadata("rsi", current));
        };

        let mut confidence = base_confidence;

        // Trend confirmation: RSI moving in the signal's direction.
        if values.len() >= 5 {
            let recent = mean(&values[values.len() - 5..]);
            if recent != 0.0 && !recent.is_nan() {
                let rsi_trend = (current - recent) / recent;
                let aligned = (kind == SignalKind::Buy && rsi_trend > 0.0)
                    || (kind == SignalKind::Sell && rsi_trend < 0.0);
                confidence *= if aligned { 1.1 } else { 0.9 };
                confidence = confidence.min(1.0);
            }
        }

        // Volume confirmation: last 3 bars vs last 10.
        if history.len() >= 10 {
            let volumes: Vec<f64> = history.iter().map(|b| b.volume).collect();
            let recent_volume = mean(&volumes[volumes.len() - 3..]);
            let avg_volume = mean(&volumes[volumes.len() - 10..]);
            if avg_volume > 0.0 {
                let ratio = recent_volume / avg_volume;
                if ratio > 1.2 {
                    confidence *= 1.1;
                } else if ratio < 0.8 {
                    confidence *= 0.9;
                }
                confidence = confidence.min(1.0);
            }
        }

        Signal::new(kind, confidence, last_close)
            .map(|s| {
                s.with_metadata("rsi", current)
                    .with_metadata("oversold", self.oversold)
                    .with_metadata("overbought", self.overbought)
            })
            .map_err(|e| StrategyError::Evaluation(e.to_string()))
    }

    fn risk(&self) -> &RiskParams {
        &self.risk
    }
}
