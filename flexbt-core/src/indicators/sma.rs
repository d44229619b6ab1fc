//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use crate::domain::Bar;

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        let mut sum = 0.0;
        let mut nan_count = 0usize;
        for (i, bar) in bars.iter().enumerate() {
            let entering = bar.close;
            if entering.is_nan() {
                nan_count += 1;
            } else {
                sum += entering;
            }

            if i >= self.period {
                let leaving = bars[i - self.period].close;
                if leaving.is_nan() {
                    nan_count -= 1;
                } else {
                    sum -= leaving;
                }
            }

            if i + 1 >= self.period && nan_count == 0 {
                result[i] = sum / self.period as f64;
            }
        }

        result
    }
}
