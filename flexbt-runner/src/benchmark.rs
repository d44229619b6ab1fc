//! Fee-free buy-and-hold benchmark over the same bars.

use serde::{Deserialize, Serialize};

use flexbt_core::domain::Bar;
use flexbt_core::engine::EngineError;

use crate::drawdown::analyze_drawdown;
use crate::metrics::{cagr_pct, round2, total_return_pct, MetricValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub initial_balance: f64,
    pub final_balance: f64,
    /// Final minus initial balance.
    pub total_return: f64,
    pub total_return_pct: f64,
    pub cagr_pct: MetricValue,
    pub max_drawdown_pct: f64,
    /// `shares * open` for every bar.
    pub equity_curve: Vec<f64>,
}

/// Buy at the first bar's open with the whole balance and hold.
pub fn buy_and_hold(bars: &[Bar], initial_balance: f64) -> Result<BenchmarkResult, EngineError> {
    if bars.len() < 2 {
        return Err(EngineError::InsufficientData(
            "benchmark needs at least two bars".into(),
        ));
    }
    let first_open = bars[0].open;
    if !(first_open > 0.0) {
        return Err(EngineError::InsufficientData(format!(
            "benchmark entry price must be positive, got {first_open}"
        )));
    }

    let shares = initial_balance / first_open;
    let equity_curve: Vec<f64> = bars.iter().map(|b| shares * b.open).collect();
    let final_balance = equity_curve.last().copied().unwrap_or(initial_balance);
    let drawdown = analyze_drawdown(&equity_curve);

    Ok(BenchmarkResult {
        initial_balance,
        final_balance,
        total_return: round2(final_balance - initial_balance),
        total_return_pct: round2(total_return_pct(initial_balance, final_balance)),
        cagr_pct: cagr_pct(initial_balance, final_balance, bars.len()).rounded(),
        max_drawdown_pct: round2(drawdown.max_drawdown.abs() * 100.0),
        equity_curve,
    })
}
