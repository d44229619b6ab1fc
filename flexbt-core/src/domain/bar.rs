//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single symbol over one interval.
///
/// `timestamp` is the bar's open time. Only `open` is used for execution;
/// the remaining fields feed strategies and sanity checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Structural violations in a bar series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar {index} has timestamp {timestamp} which is not after the previous bar")]
    NotIncreasing {
        index: usize,
        timestamp: NaiveDateTime,
    },
    #[error("bar {index} at {timestamp} has a NaN price")]
    Void {
        index: usize,
        timestamp: NaiveDateTime,
    },
}

impl Bar {
    /// Returns true if any price field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Verify that no bar is void and timestamps are strictly increasing.
///
/// Duplicates count as a violation. Gaps are allowed.
pub fn validate_bars(bars: &[Bar]) -> Result<(), BarError> {
    if let Some(index) = bars.iter().position(Bar::is_void) {
        return Err(BarError::Void {
            index,
            timestamp: bars[index].timestamp,
        });
    }
    for (index, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(BarError::NotIncreasing {
                index: index + 1,
                timestamp: pair[1].timestamp,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_bar() -> Bar {
        Bar {
            timestamp: ts(2),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn validate_accepts_increasing_with_gaps() {
        let mut a = sample_bar();
        let mut b = sample_bar();
        a.timestamp = ts(2);
        b.timestamp = ts(9);
        assert!(validate_bars(&[a, b]).is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_timestamp() {
        let a = sample_bar();
        let b = sample_bar();
        let err = validate_bars(&[a, b]).unwrap_err();
        assert_eq!(
            err,
            BarError::NotIncreasing {
                index: 1,
                timestamp: ts(2)
            }
        );
    }

    #[test]
    fn validate_rejects_backwards_timestamp() {
        let mut a = sample_bar();
        let mut b = sample_bar();
        a.timestamp = ts(5);
        b.timestamp = ts(3);
        assert!(validate_bars(&[a, b]).is_err());
    }

    #[test]
    fn validate_rejects_void_bar() {
        let a = sample_bar();
        let mut b = sample_bar();
        b.timestamp = ts(3);
        b.close = f64::NAN;
        assert_eq!(
            validate_bars(&[a, b]).unwrap_err(),
            BarError::Void {
                index: 1,
                timestamp: ts(3)
            }
        );
    }

    #[test]
    fn validate_empty_and_single() {
        assert!(validate_bars(&[]).is_ok());
        assert!(validate_bars(&[sample_bar()]).is_ok());
    }
}
