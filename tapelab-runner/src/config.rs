//! Serializable backtest configuration (TOML) and the strategy factory.

use crate::data::parse_timestamp;
use crate::runner::RunSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tapelab_core::domain::RiskLimits;
use tapelab_core::strategy::{
    RiskParams, RsiStrategy, SmaCrossover, Strategy, VolatilityBreakout,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown strategy '{0}'. Valid: sma_crossover, rsi, volatility_breakout")]
    UnknownStrategy(String),
    #[error("strategy config: {0}")]
    Strategy(#[from] tapelab_core::error::ConfigError),
    #[error("unparseable date '{0}' (expected YYYY-MM-DD or RFC 3339)")]
    InvalidDate(String),
}

/// Complete TOML configuration for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub risk: RiskSection,
    pub strategy: StrategySection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestSection {
    pub instrument: String,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,
    #[serde(default = "default_slippage_rate")]
    pub slippage_rate: f64,
    /// Annualization factor for volatility and Sharpe. 252 fits daily bars;
    /// set explicitly for other granularities.
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskSection {
    #[serde(default = "default_max_position_notional")]
    pub max_position_notional: f64,
    #[serde(default = "default_max_portfolio_risk")]
    pub max_portfolio_risk: f64,
    #[serde(default = "default_base_notional")]
    pub base_notional: f64,
    #[serde(default = "default_max_cash_fraction")]
    pub max_cash_fraction: f64,
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: f64,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            max_position_notional: default_max_position_notional(),
            max_portfolio_risk: default_max_portfolio_risk(),
            base_notional: default_base_notional(),
            max_cash_fraction: default_max_cash_fraction(),
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_pct: default_take_profit_pct(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategySection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

fn default_initial_capital() -> f64 {
    10_000.0
}
fn default_commission_rate() -> f64 {
    0.005
}
fn default_slippage_rate() -> f64 {
    0.001
}
fn default_periods_per_year() -> f64 {
    crate::metrics::DAILY_PERIODS_PER_YEAR
}
fn default_max_position_notional() -> f64 {
    1_000.0
}
fn default_max_portfolio_risk() -> f64 {
    0.02
}
fn default_base_notional() -> f64 {
    100.0
}
fn default_max_cash_fraction() -> f64 {
    0.10
}
fn default_stop_loss_pct() -> f64 {
    0.05
}
fn default_take_profit_pct() -> f64 {
    0.10
}

impl BacktestConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn risk_params(&self) -> RiskParams {
        RiskParams {
            base_notional: self.risk.base_notional,
            max_cash_fraction: self.risk.max_cash_fraction,
            stop_loss_pct: self.risk.stop_loss_pct,
            take_profit_pct: self.risk.take_profit_pct,
        }
    }

    fn param(&self, key: &str, default: f64) -> f64 {
        self.strategy.params.get(key).copied().unwrap_or(default)
    }

    /// Instantiate the configured strategy. Parameter validation errors fail
    /// here, before any run starts.
    pub fn build_strategy(&self) -> Result<Box<dyn Strategy>, ConfigError> {
        let risk = self.risk_params();
        match self.strategy.kind.as_str() {
            "sma_crossover" => {
                let short = self.param("short_window", 10.0) as usize;
                let long = self.param("long_window", 30.0) as usize;
                Ok(Box::new(SmaCrossover::with_risk(short, long, risk)?))
            }
            "rsi" => {
                let period = self.param("period", 14.0) as usize;
                let oversold = self.param("oversold", 30.0);
                let overbought = self.param("overbought", 70.0);
                Ok(Box::new(RsiStrategy::with_risk(
                    period, oversold, overbought, risk,
                )?))
            }
            "volatility_breakout" => {
                let lookback = self.param("lookback", 20.0) as usize;
                let multiplier = self.param("band_multiplier", 2.0);
                let min_volume = self.param("min_volume", 100_000.0);
                Ok(Box::new(VolatilityBreakout::with_risk(
                    lookback, multiplier, min_volume, risk,
                )?))
            }
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }

    /// Translate the `[backtest]` and `[risk]` sections into run settings.
    pub fn to_settings(&self) -> Result<RunSettings, ConfigError> {
        fn parse(
            value: &Option<String>,
        ) -> Result<Option<chrono::DateTime<chrono::Utc>>, ConfigError> {
            value
                .as_deref()
                .map(|v| parse_timestamp(v).ok_or_else(|| ConfigError::InvalidDate(v.to_string())))
                .transpose()
        }

        Ok(RunSettings {
            instrument: self.backtest.instrument.clone(),
            initial_capital: self.backtest.initial_capital,
            commission_rate: self.backtest.commission_rate,
            slippage_rate: self.backtest.slippage_rate,
            periods_per_year: self.backtest.periods_per_year,
            limits: RiskLimits {
                max_position_notional: self.risk.max_position_notional,
                max_portfolio_risk: self.risk.max_portfolio_risk,
            },
            start: parse(&self.backtest.start)?,
            end: parse(&self.backtest.end)?,
        })
    }
}
