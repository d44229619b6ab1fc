//! Backtest result: the immutable aggregate handed to presentation layers.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use flexbt_core::domain::{Interval, Trade, TradeEvent};
use flexbt_core::strategy::StrategyParams;

use crate::audit::AuditOutcome;
use crate::benchmark::BenchmarkResult;
use crate::metrics::PerformanceMetrics;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// BLAKE3 fingerprint of the config and dataset.
    pub run_id: String,
    pub dataset_hash: String,

    // ── Configuration ──
    pub symbol: String,
    pub strategy: String,
    pub strategy_params: StrategyParams,
    pub interval: Interval,
    pub fee_pct: f64,
    pub initial_balance: f64,
    pub final_balance: f64,

    // ── Data span ──
    pub bar_count: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,

    // ── Metrics ──
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<f64>,
    pub drawdown_curve: Vec<f64>,

    // ── Per-trade arrays ──
    /// Percent return per closed trade, two decimals.
    pub returns_per_trade: Vec<f64>,
    pub trade_durations: Vec<usize>,
    pub trade_pnls: Vec<f64>,
    pub entry_dates: Vec<NaiveDateTime>,
    pub exit_dates: Vec<NaiveDateTime>,
    /// "BUY"/"SELL" per event, in order.
    pub event_types: Vec<String>,

    pub trades: Vec<Trade>,
    pub events: Vec<TradeEvent>,

    // ── Benchmark ──
    pub benchmark: BenchmarkResult,
    /// Strategy return minus benchmark return, in percent.
    pub excess_return_pct: f64,

    // ── Audit ──
    pub audit: AuditOutcome,
    pub audit_message: String,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// Trades that closed on a signal, excluding the end-of-series liquidation.
    pub fn signal_exits(&self) -> impl Iterator<Item = &Trade> {
        self.trades
            .iter()
            .filter(|t| t.exit.as_ref().is_some_and(|e| !e.forced))
    }
}
