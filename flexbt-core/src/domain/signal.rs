//! Signal: per-bar position target emitted by a strategy.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Discrete position target.
///
/// Numeric encoding follows the usual +1 / -1 / 0 convention so strategies
/// ported from vectorized code can use `from_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPosition {
    /// Be fully invested.
    Long,
    /// Be fully in cash.
    Flat,
    /// Keep whatever position is currently held.
    Hold,
}

impl TargetPosition {
    /// Decode a numeric target. NaN (and any non-finite value) is undefined.
    pub fn from_value(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(if value > 0.0 {
            Self::Long
        } else if value < 0.0 {
            Self::Flat
        } else {
            Self::Hold
        })
    }

    pub fn value(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Flat => -1.0,
            Self::Hold => 0.0,
        }
    }
}

/// One signal row. `target == None` means the strategy had no defined
/// instruction for this bar; such rows are dropped before simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub target: Option<TargetPosition>,
}

impl Signal {
    pub fn new(timestamp: NaiveDateTime, target: TargetPosition) -> Self {
        Self {
            timestamp,
            target: Some(target),
        }
    }

    pub fn undefined(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            target: None,
        }
    }
}
