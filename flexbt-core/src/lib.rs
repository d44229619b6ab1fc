//! flexbt core: domain types, signal normalization, trade simulation.
//!
//! This crate holds everything that runs per bar:
//! - Domain types (bars, signals, trades, intervals)
//! - Signal normalizer with a one-row execution delay
//! - Long-only, all-in simulator with proportional fees
//! - Strategy trait, registry, and built-in strategies
//! - Data providers (CSV, synthetic)
//!
//! Metrics, auditing, and orchestration live in `flexbt-runner`.

pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod indicators;
pub mod strategy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types shared across sweep threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::TradeEvent>();
        require_sync::<domain::TradeEvent>();

        require_send::<engine::ExecutionRow>();
        require_sync::<engine::ExecutionRow>();
        require_send::<engine::SimulationConfig>();
        require_sync::<engine::SimulationConfig>();
        require_send::<engine::SimulationOutput>();
        require_sync::<engine::SimulationOutput>();
        require_send::<engine::Simulator>();
        require_sync::<engine::Simulator>();

        require_send::<strategy::MovingAverageStrategy>();
        require_sync::<strategy::MovingAverageStrategy>();
        require_send::<strategy::StrategyRegistry>();
        require_sync::<strategy::StrategyRegistry>();

        require_send::<data::CsvProvider>();
        require_sync::<data::CsvProvider>();
        require_send::<data::SyntheticProvider>();
        require_sync::<data::SyntheticProvider>();
    }

    /// Strategies never see account state: `generate_signals` takes bars only.
    #[test]
    fn strategy_trait_has_no_account_parameter() {
        fn _check_trait_object_builds(
            strategy: &dyn strategy::Strategy,
            bars: &[domain::Bar],
        ) -> Vec<domain::Signal> {
            strategy.generate_signals(bars)
        }
    }
}
