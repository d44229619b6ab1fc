//! flexbt runner: backtest orchestration, metrics, benchmark, audit.
//!
//! This crate builds on `flexbt-core` to provide:
//! - Drawdown and recovery analysis
//! - Performance metrics with explicit undefined markers
//! - Fee-free buy-and-hold benchmark
//! - Trade auditor with a typed outcome
//! - TOML configuration and single-run orchestration
//! - Parallel parameter sweeps
//! - JSON/CSV artifact export

pub mod audit;
pub mod benchmark;
pub mod config;
pub mod drawdown;
pub mod export;
pub mod metrics;
pub mod result;
pub mod runner;
pub mod sweep;

pub use audit::{audit_trades, AuditConfig, AuditError, AuditOutcome, AuditReport, AuditRow};
pub use benchmark::{buy_and_hold, BenchmarkResult};
pub use config::{BacktestConfig, ConfigError};
pub use drawdown::{analyze_drawdown, DrawdownAnalysis};
pub use export::{save_artifacts, ArtifactManager, ArtifactPaths};
pub use metrics::{MetricValue, PerformanceMetrics};
pub use result::{BacktestResult, SCHEMA_VERSION};
pub use runner::{run_backtest, run_backtest_from_data, run_backtest_with_strategy, RunError};
pub use sweep::{run_sweep, SweepEntry, SweepGrid, SweepOutcome};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_metrics_is_send_sync() {
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
        assert_send::<MetricValue>();
        assert_sync::<MetricValue>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<AuditConfig>();
        assert_sync::<AuditConfig>();
    }

    #[test]
    fn audit_types_are_send_sync() {
        assert_send::<AuditOutcome>();
        assert_sync::<AuditOutcome>();
        assert_send::<AuditReport>();
        assert_sync::<AuditReport>();
    }

    #[test]
    fn sweep_types_are_send_sync() {
        assert_send::<SweepGrid>();
        assert_sync::<SweepGrid>();
        assert_send::<SweepOutcome>();
        assert_sync::<SweepOutcome>();
    }
}
