//! Parameter sweep: grid search over strategy parameters.
//!
//! Each grid point is an independent backtest; points run in parallel with
//! rayon and share only read-only inputs.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use flexbt_core::domain::Bar;
use flexbt_core::strategy::{StrategyParams, StrategyRegistry};

use crate::config::BacktestConfig;
use crate::result::BacktestResult;
use crate::runner::run_backtest_from_data;

/// Values to try per parameter. The sweep covers the cartesian product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepGrid {
    pub params: BTreeMap<String, Vec<f64>>,
}

impl SweepGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        self.params.insert(name.into(), values.into_iter().collect());
        self
    }

    /// Moving-average crossover grid: short 5..=20 step 5, long 20..=100 step 20.
    pub fn moving_average_default() -> Self {
        Self::new()
            .with("short_window", [5.0, 10.0, 15.0, 20.0])
            .with("long_window", [20.0, 40.0, 60.0, 80.0, 100.0])
    }

    /// Total number of grid points (including ones the strategy may reject).
    pub fn size(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params.values().map(Vec::len).product()
    }

    /// All parameter combinations, in deterministic order.
    pub fn combinations(&self) -> Vec<StrategyParams> {
        if self.params.is_empty() {
            return Vec::new();
        }
        let mut combos = vec![StrategyParams::new()];
        for (name, values) in &self.params {
            combos = combos
                .into_iter()
                .flat_map(|base| {
                    values.iter().map(move |&v| {
                        let mut next = base.clone();
                        next.insert(name.clone(), v);
                        next
                    })
                })
                .collect();
        }
        combos
    }
}

/// One completed grid point.
#[derive(Debug, Clone)]
pub struct SweepEntry {
    pub params: StrategyParams,
    pub result: BacktestResult,
}

/// A grid point that could not run.
#[derive(Debug, Clone)]
pub struct SkippedPoint {
    pub params: StrategyParams,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    /// Completed runs, best Sharpe first.
    pub entries: Vec<SweepEntry>,
    pub skipped: Vec<SkippedPoint>,
}

impl SweepOutcome {
    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first()
    }
}

/// Run every grid point against the same bars.
pub fn run_sweep(
    base: &BacktestConfig,
    bars: &[Bar],
    registry: &StrategyRegistry,
    grid: &SweepGrid,
) -> SweepOutcome {
    let combos = grid.combinations();
    info!(points = combos.len(), strategy = %base.strategy.name, "starting sweep");

    let results: Vec<_> = combos
        .into_par_iter()
        .map(|params| {
            let config = base.with_params(params.clone());
            let outcome = run_backtest_from_data(&config, bars, registry);
            (params, outcome)
        })
        .collect();

    let mut outcome = SweepOutcome::default();
    for (params, result) in results {
        match result {
            Ok(result) => outcome.entries.push(SweepEntry { params, result }),
            Err(err) => {
                warn!(?params, error = %err, "sweep point skipped");
                outcome.skipped.push(SkippedPoint {
                    params,
                    reason: err.to_string(),
                });
            }
        }
    }

    outcome.entries.sort_by(|a, b| compare_sharpe(&b.result, &a.result));
    info!(
        completed = outcome.entries.len(),
        skipped = outcome.skipped.len(),
        "sweep complete"
    );
    outcome
}

/// Order by Sharpe; unavailable Sharpe sorts below every value.
fn compare_sharpe(a: &BacktestResult, b: &BacktestResult) -> Ordering {
    let key = |r: &BacktestResult| r.metrics.sharpe_ratio.as_f64().unwrap_or(f64::NEG_INFINITY);
    key(a).total_cmp(&key(b))
}
