//! Signal normalization: turns raw strategy output into executable rows.
//!
//! Three steps:
//! 1. Drop rows whose target is undefined.
//! 2. Shift the surviving targets forward by one row, so the instruction
//!    derived from bar t is only acted on at a later bar's open.
//! 3. Inner-join with bars by timestamp and drop the first joined row,
//!    which has no prior instruction to execute.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Signal, TargetPosition};

use super::EngineError;

/// One executable bar: the delayed instruction and the price it fills at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRow {
    pub timestamp: NaiveDateTime,
    /// Index of the bar this row executes on.
    pub bar_index: usize,
    /// Target taken from the previous surviving signal row.
    pub effective_signal: TargetPosition,
    /// Timestamp of the signal row the instruction came from.
    pub signal_time: NaiveDateTime,
    /// The bar's open.
    pub execution_price: f64,
}

/// Align `signals` to `bars` with a one-row execution delay.
///
/// Fails with [`EngineError::NoSignal`] when no signal is defined and with
/// [`EngineError::InsufficientData`] when nothing is left to trade.
pub fn normalize_signals(bars: &[Bar], signals: &[Signal]) -> Result<Vec<ExecutionRow>, EngineError> {
    let defined: Vec<(NaiveDateTime, TargetPosition)> = signals
        .iter()
        .filter_map(|s| s.target.map(|t| (s.timestamp, t)))
        .collect();

    if defined.is_empty() {
        return Err(EngineError::NoSignal);
    }

    for (index, pair) in defined.windows(2).enumerate() {
        if pair[1].0 <= pair[0].0 {
            return Err(EngineError::UnorderedSignals { index: index + 1 });
        }
    }

    let bar_lookup: HashMap<NaiveDateTime, usize> = bars
        .iter()
        .enumerate()
        .map(|(i, b)| (b.timestamp, i))
        .collect();

    // Shifted series: row i carries row i-1's target (row 0 carries none).
    let rows: Vec<ExecutionRow> = defined
        .iter()
        .enumerate()
        .filter_map(|(i, (ts, _))| {
            let bar_index = *bar_lookup.get(ts)?;
            Some((i, *ts, bar_index))
        })
        .skip(1)
        .filter_map(|(i, ts, bar_index)| {
            let (signal_time, effective_signal) = *defined.get(i.checked_sub(1)?)?;
            Some(ExecutionRow {
                timestamp: ts,
                bar_index,
                effective_signal,
                signal_time,
                execution_price: bars[bar_index].open,
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(EngineError::InsufficientData(
            "no tradable signal after alignment".into(),
        ));
    }

    Ok(rows)
}
