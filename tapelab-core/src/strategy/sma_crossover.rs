//! Moving-average crossover strategy.
//!
//! BUY when the short MA crosses above the long MA, SELL when it crosses
//! below, HOLD otherwise. Confidence scales with crossover magnitude and is
//! adjusted by a volume confirmation.

use super::{RiskParams, Strategy};
use crate::domain::{Bar, Signal, SignalKind};
use crate::error::{ConfigError, StrategyError};
use crate::indicators::{mean, sma};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct SmaCrossover {
    short_window: usize,
    long_window: usize,
    risk: RiskParams,
}

impl SmaCrossover {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, ConfigError> {
        Self::with_risk(short_window, long_window, RiskParams::default())
    }

    pub fn with_risk(
        short_window: usize,
        long_window: usize,
        risk: RiskParams,
    ) -> Result<Self, ConfigError> {
        if short_window == 0 {
            return Err(ConfigError::InvalidParameter(
                "short window must be at least 1".into(),
            ));
        }
        if short_window >= long_window {
            return Err(ConfigError::InvalidParameter(format!(
                "short window ({short_window}) must be less than long window ({long_window})"
            )));
        }
        Ok(Self {
            short_window,
            long_window,
            risk,
        })
    }
}

impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        "sma_crossover"
    }

    fn params(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("short_window".to_string(), self.short_window as f64),
            ("long_window".to_string(), self.long_window as f64),
        ])
    }

    fn required_history(&self) -> usize {
        // Extra bars beyond the long window so the previous MA pair exists.
        self.long_window + 5
    }

    fn generate_signal(&self, history: &[Bar]) -> Result<Signal, StrategyError> {
        let last_close = history
            .last()
            .ok_or(StrategyError::InsufficientHistory {
                required: self.required_history(),
                actual: 0,
            })?
            .close;
        if history.len() < self.long_window + 1 {
            return Ok(Signal::hold(last_close));
        }

        let closes: Vec<f64> = history.iter().map(|b| b.close).collect();
        let short = sma(&closes, self.short_window);
        let long = sma(&closes, self.long_window);

        let n = closes.len();
        let (cur_s, cur_l) = (short[n - 1], long[n - 1]);
        let (prev_s, prev_l) = (short[n - 2], long[n - 2]);
        if cur_s.is_nan() || cur_l.is_nan() || prev_s.is_nan() || prev_l.is_nan() {
            return Ok(Signal::hold(last_close));
        }

        let kind = if prev_s <= prev_l && cur_s > cur_l {
            SignalKind::Buy
        } else if prev_s >= prev_l && cur_s < cur_l {
            SignalKind::Sell
        } else {
            return Ok(Signal::hold(last_close)
                .with_metadata("short_ma", cur_s)
                .with_metadata("long_ma", cur_l));
        };

        let crossover_strength = (cur_s - cur_l).abs() / cur_l;
        let mut confidence = (crossover_strength * 10.0).clamp(0.3, 0.8);

        // Volume confirmation: recent activity vs the whole window.
        let volumes: Vec<f64> = history.iter().map(|b| b.volume).collect();
        let recent_volume = mean(&volumes[volumes.len().saturating_sub(5)..]);
        let avg_volume = mean(&volumes);
        if avg_volume > 0.0 {
            let volume_ratio = recent_volume / avg_volume;
            if volume_ratio > 1.2 {
                confidence *= 1.2;
            } else if volume_ratio < 0.8 {
                confidence *= 0.8;
            }
            confidence = confidence.min(1.0);
        }

        Signal::new(kind, confidence, last_close)
            .map(|s| {
                s.with_metadata("short_ma", cur_s)
                    .with_metadata("long_ma", cur_l)
                    .with_metadata("crossover_strength", crossover_strength)
                    .with_metadata("trend_strength", (cur_s - cur_l) / cur_l)
            })
            .map_err(|e| StrategyError::Evaluation(e.to_string()))
    }

    fn risk(&self) -> &RiskParams {
        &self.risk
    }
}
