//! Drawdown and recovery analysis over an equity curve.

use serde::{Deserialize, Serialize};

/// Drawdown curve plus the worst peak-to-trough episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    /// `(equity[i] - peak[i]) / peak[i]`, each value in `[-1, 0]`.
    pub curve: Vec<f64>,
    /// Most negative value of `curve` (0.0 for an empty or rising curve).
    pub max_drawdown: f64,
    /// Index of the running peak preceding the trough.
    pub peak_index: usize,
    /// First index where `curve` reaches `max_drawdown`.
    pub trough_index: usize,
    /// Bars from the trough until equity regains the peak value.
    ///
    /// `None` when the trough is the last point or the peak is never regained.
    pub recovery_bars: Option<usize>,
}

/// Running-peak drawdown series.
pub fn drawdown_curve(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&eq| {
            if eq > peak {
                peak = eq;
            }
            if peak > 0.0 {
                (eq - peak) / peak
            } else {
                0.0
            }
        })
        .collect()
}

/// Analyze the worst drawdown and how long it took to recover.
pub fn analyze_drawdown(equity: &[f64]) -> DrawdownAnalysis {
    let curve = drawdown_curve(equity);
    if curve.is_empty() {
        return DrawdownAnalysis {
            curve,
            max_drawdown: 0.0,
            peak_index: 0,
            trough_index: 0,
            recovery_bars: None,
        };
    }

    let mut trough_index = 0;
    for (i, &dd) in curve.iter().enumerate() {
        if dd < curve[trough_index] {
            trough_index = i;
        }
    }

    let mut peak_index = 0;
    for i in 0..=trough_index {
        if equity[i] > equity[peak_index] {
            peak_index = i;
        }
    }

    let recovery_bars = recovery_time(equity, peak_index, trough_index);

    DrawdownAnalysis {
        max_drawdown: curve[trough_index],
        curve,
        peak_index,
        trough_index,
        recovery_bars,
    }
}

/// First `k >= 0` with `equity[trough + k] >= equity[peak]`.
fn recovery_time(equity: &[f64], peak: usize, trough: usize) -> Option<usize> {
    if trough + 1 >= equity.len() {
        return None;
    }
    let target = equity[peak];
    equity[trough..].iter().position(|&eq| eq >= target)
}
