//! Backtest configuration, loaded from TOML.
//!
//! ```toml
//! [backtest]
//! symbol = "BTCUSDT"
//! interval = "1h"
//! start_date = "2024-01-01"
//! initial_balance = 10000.0
//! fee_pct = 0.001
//!
//! [strategy]
//! name = "moving_average"
//!
//! [strategy.params]
//! short_window = 10
//! long_window = 30
//!
//! [audit]
//! max_pnl_fraction = 0.5
//! max_duration_bars = 60
//! ```

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use flexbt_core::domain::Interval;
use flexbt_core::engine::SimulationConfig;
use flexbt_core::strategy::StrategyParams;

use crate::audit::AuditConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategySection,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    pub interval: Interval,
    /// Bars before this date are dropped.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default = "default_initial_balance")]
    pub initial_balance: f64,
    /// Proportional fee per side.
    #[serde(default = "default_fee_pct")]
    pub fee_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySection {
    pub name: String,
    #[serde(default)]
    pub params: StrategyParams,
}

fn default_initial_balance() -> f64 {
    10_000.0
}

fn default_fee_pct() -> f64 {
    0.001
}

impl BacktestConfig {
    pub fn new(symbol: impl Into<String>, interval: Interval, strategy: impl Into<String>) -> Self {
        Self {
            backtest: BacktestSection {
                symbol: symbol.into(),
                interval,
                start_date: None,
                initial_balance: default_initial_balance(),
                fee_pct: default_fee_pct(),
            },
            strategy: StrategySection {
                name: strategy.into(),
                params: StrategyParams::new(),
            },
            audit: AuditConfig::default(),
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if b.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        if !(b.initial_balance > 0.0) || !b.initial_balance.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "initial_balance must be positive, got {}",
                b.initial_balance
            )));
        }
        if !(0.0..1.0).contains(&b.fee_pct) {
            return Err(ConfigError::Invalid(format!(
                "fee_pct must be in [0, 1), got {}",
                b.fee_pct
            )));
        }
        if self.strategy.name.trim().is_empty() {
            return Err(ConfigError::Invalid("strategy name must not be empty".into()));
        }
        if !(self.audit.max_pnl_fraction >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "audit.max_pnl_fraction must be >= 0, got {}",
                self.audit.max_pnl_fraction
            )));
        }
        Ok(())
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig::new(self.backtest.initial_balance, self.backtest.fee_pct)
    }

    /// Start of the first day to keep, if a start date is set.
    pub fn start_datetime(&self) -> Option<NaiveDateTime> {
        self.backtest
            .start_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    /// Copy with different strategy parameters.
    pub fn with_params(&self, params: StrategyParams) -> Self {
        let mut config = self.clone();
        config.strategy.params = params;
        config
    }
}
