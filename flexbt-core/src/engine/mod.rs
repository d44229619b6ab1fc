//! Backtest engine: signal normalization followed by trade simulation.
//!
//! The engine is a single deterministic pass. It owns no global state, so
//! separate invocations can run on separate threads.

pub mod normalizer;
pub mod simulator;

pub use normalizer::{normalize_signals, ExecutionRow};
pub use simulator::{simulate, SimulationConfig, SimulationOutput, Simulator};

use thiserror::Error;
use tracing::info;

use crate::domain::{validate_bars, Bar, BarError, Signal};

/// Failures that abort a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("no signal generated")]
    NoSignal,
    #[error("bars are not strictly increasing in time at index {index}")]
    UnorderedBars { index: usize },
    #[error("bar at index {index} has a NaN price")]
    VoidBar { index: usize },
    #[error("signals are not strictly increasing in time at index {index}")]
    UnorderedSignals { index: usize },
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
}

impl From<BarError> for EngineError {
    fn from(err: BarError) -> Self {
        match err {
            BarError::NotIncreasing { index, .. } => Self::UnorderedBars { index },
            BarError::Void { index, .. } => Self::VoidBar { index },
        }
    }
}

/// Validate, normalize, and simulate.
///
/// This is the engine's entry point: bar ordering and void prices are
/// checked here once, then the rows are built and walked.
pub fn run_simulation(
    bars: &[Bar],
    signals: &[Signal],
    config: &SimulationConfig,
) -> Result<SimulationOutput, EngineError> {
    if bars.is_empty() {
        return Err(EngineError::InsufficientData("no bars".into()));
    }
    validate_bars(bars)?;

    let rows = normalize_signals(bars, signals)?;
    let output = simulate(&rows, config)?;

    info!(
        bars = bars.len(),
        rows = rows.len(),
        trades = output.trades.len(),
        final_balance = output.final_balance,
        "simulation complete"
    );
    Ok(output)
}
