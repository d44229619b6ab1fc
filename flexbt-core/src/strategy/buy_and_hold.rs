//! Buy-and-hold: LONG on every bar.
//!
//! Through the engine this buys at the second bar's open and is liquidated at
//! the last row, so it differs from the fee-free benchmark only by the
//! execution delay and fees.

use crate::domain::{Bar, Signal, TargetPosition};

use super::{Strategy, StrategyError, StrategyParams};

pub const NAME: &str = "buy_and_hold";

#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHoldStrategy;

impl BuyAndHoldStrategy {
    pub fn from_params(_params: &StrategyParams) -> Result<Self, StrategyError> {
        Ok(Self)
    }
}

impl Strategy for BuyAndHoldStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal> {
        bars.iter()
            .map(|b| Signal::new(b.timestamp, TargetPosition::Long))
            .collect()
    }
}
