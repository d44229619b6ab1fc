//! Strategies: pluggable signal generators.
//!
//! A strategy sees only the bar series and returns one [`Signal`] per bar. It
//! never sees account state; execution timing is the engine's job.

pub mod buy_and_hold;
pub mod moving_average;
pub mod registry;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::{Bar, Signal};

pub use buy_and_hold::BuyAndHoldStrategy;
pub use moving_average::MovingAverageStrategy;
pub use registry::{StrategyConstructor, StrategyEntry, StrategyRegistry};

/// Strategy-specific parameters by name.
///
/// `BTreeMap` keeps serialization (and therefore fingerprints) deterministic.
pub type StrategyParams = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("strategy '{0}' not found")]
    NotFound(String),
    #[error("invalid parameter '{name}' for {strategy}: {reason}")]
    InvalidParam {
        strategy: String,
        name: String,
        reason: String,
    },
}

/// Trait for signal generators.
pub trait Strategy: Send + Sync {
    /// Registry identifier (e.g., "moving_average").
    fn name(&self) -> &str;

    /// One signal per bar, aligned to `bars` by timestamp.
    ///
    /// The signal at index t must only use `bars[0..=t]`.
    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal>;
}

/// Extract a named f64 parameter, falling back to `default`.
pub(crate) fn param(params: &StrategyParams, name: &str, default: f64) -> f64 {
    params.get(name).copied().unwrap_or(default)
}

/// Extract a named window-length parameter, rejecting non-integral or < 1 values.
pub(crate) fn param_window(
    strategy: &str,
    params: &StrategyParams,
    name: &str,
    default: usize,
) -> Result<usize, StrategyError> {
    let raw = param(params, name, default as f64);
    if !raw.is_finite() || raw < 1.0 || raw.fract() != 0.0 {
        return Err(StrategyError::InvalidParam {
            strategy: strategy.to_string(),
            name: name.to_string(),
            reason: format!("expected a positive integer, got {raw}"),
        });
    }
    Ok(raw as usize)
}
