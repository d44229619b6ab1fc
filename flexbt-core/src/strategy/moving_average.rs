//! Moving average crossover: LONG while the short SMA is above the long SMA.
//!
//! Emits LONG when short > long, FLAT when short < long, HOLD when they are
//! equal or either average is still warming up.

use crate::domain::{Bar, Signal, TargetPosition};
use crate::indicators::{Indicator, Sma};

use super::{param_window, Strategy, StrategyError, StrategyParams};

pub const NAME: &str = "moving_average";

#[derive(Debug, Clone)]
pub struct MovingAverageStrategy {
    short: Sma,
    long: Sma,
}

impl MovingAverageStrategy {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, StrategyError> {
        if short_window == 0 || long_window <= short_window {
            return Err(StrategyError::InvalidParam {
                strategy: NAME.into(),
                name: "long_window".into(),
                reason: format!(
                    "long_window ({long_window}) must be greater than short_window ({short_window}) and both >= 1"
                ),
            });
        }
        Ok(Self {
            short: Sma::new(short_window),
            long: Sma::new(long_window),
        })
    }

    /// Build from parameters `short_window` (default 50) and `long_window` (default 200).
    pub fn from_params(params: &StrategyParams) -> Result<Self, StrategyError> {
        let short = param_window(NAME, params, "short_window", 50)?;
        let long = param_window(NAME, params, "long_window", 200)?;
        Self::new(short, long)
    }

    pub fn short_window(&self) -> usize {
        self.short.period()
    }

    pub fn long_window(&self) -> usize {
        self.long.period()
    }
}

impl Strategy for MovingAverageStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal> {
        let short = self.short.compute(bars);
        let long = self.long.compute(bars);

        bars.iter()
            .zip(short.iter().zip(long.iter()))
            .map(|(bar, (&s, &l))| {
                let target = if s > l {
                    TargetPosition::Long
                } else if s < l {
                    TargetPosition::Flat
                } else {
                    TargetPosition::Hold
                };
                Signal::new(bar.timestamp, target)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn rejects_inverted_windows() {
        assert!(MovingAverageStrategy::new(30, 10).is_err());
        assert!(MovingAverageStrategy::new(10, 10).is_err());
        assert!(MovingAverageStrategy::new(0, 10).is_err());
    }

    #[test]
    fn defaults_from_empty_params() {
        let s = MovingAverageStrategy::from_params(&StrategyParams::new()).unwrap();
        assert_eq!(s.short_window(), 50);
        assert_eq!(s.long_window(), 200);
    }

    #[test]
    fn warmup_is_hold_then_trend_is_long() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let signals = MovingAverageStrategy::new(2, 4).unwrap().generate_signals(&bars);

        assert_eq!(signals.len(), bars.len());
        for s in &signals[..3] {
            assert_eq!(s.target, Some(TargetPosition::Hold));
        }
        for s in &signals[3..] {
            assert_eq!(s.target, Some(TargetPosition::Long));
        }
    }

    #[test]
    fn downtrend_is_flat() {
        let closes: Vec<f64> = (0..10).map(|i| 200.0 - i as f64).collect();
        let bars = make_bars(&closes);
        let signals = MovingAverageStrategy::new(2, 4).unwrap().generate_signals(&bars);
        assert_eq!(signals.last().unwrap().target, Some(TargetPosition::Flat));
    }

    #[test]
    fn signals_share_bar_timestamps() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let signals = MovingAverageStrategy::new(1, 2).unwrap().generate_signals(&bars);
        for (b, s) in bars.iter().zip(&signals) {
            assert_eq!(b.timestamp, s.timestamp);
        }
    }
}
