//! Backtest runner: wires together data, strategy, engine, metrics, and audit.
//!
//! Three entry points:
//! - `run_backtest()`: fetches bars from a provider, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded bars. Used by the sweep.
//! - `run_backtest_with_strategy()`: takes pre-loaded bars and a built strategy.

use thiserror::Error;
use tracing::{info, warn};

use flexbt_core::data::{filter_from, preprocess, DataError, DataProvider};
use flexbt_core::domain::{validate_bars, Bar};
use flexbt_core::engine::{run_simulation, EngineError};
use flexbt_core::fingerprint;
use flexbt_core::strategy::{Strategy, StrategyError, StrategyRegistry};

use crate::audit::{audit_trades, AuditOutcome};
use crate::benchmark::buy_and_hold;
use crate::config::{BacktestConfig, ConfigError};
use crate::drawdown::analyze_drawdown;
use crate::metrics::{round2, PerformanceMetrics};
use crate::result::{BacktestResult, SCHEMA_VERSION};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("failed to fingerprint run: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Fetch, preprocess, and run a backtest for `config`.
pub fn run_backtest(
    config: &BacktestConfig,
    provider: &dyn DataProvider,
    registry: &StrategyRegistry,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let symbol = config.backtest.symbol.as_str();
    let interval = config.backtest.interval;

    let raw = provider.fetch(symbol, interval)?;
    let fetched = raw.len();
    let bars = filter_from(preprocess(raw), config.start_datetime());
    info!(
        symbol,
        %interval,
        provider = provider.name(),
        fetched,
        kept = bars.len(),
        "loaded bars"
    );

    run_backtest_from_data(config, &bars, registry)
}

/// Run a backtest on pre-loaded, preprocessed bars without I/O.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    bars: &[Bar],
    registry: &StrategyRegistry,
) -> Result<BacktestResult, RunError> {
    let strategy = registry.create(&config.strategy.name, &config.strategy.params)?;
    run_backtest_with_strategy(config, bars, strategy.as_ref())
}

/// Run a backtest with an already-constructed strategy.
///
/// Bars must already be preprocessed: a void or out-of-order bar aborts the
/// run before the strategy sees it. Audit failures are recorded on the
/// result; every other failure aborts.
pub fn run_backtest_with_strategy(
    config: &BacktestConfig,
    bars: &[Bar],
    strategy: &dyn Strategy,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    if bars.is_empty() {
        return Err(EngineError::InsufficientData("no bars after preprocessing".into()).into());
    }
    validate_bars(bars).map_err(EngineError::from)?;

    let initial_balance = config.backtest.initial_balance;
    let signals = strategy.generate_signals(bars);
    let sim = run_simulation(bars, &signals, &config.simulation_config())?;

    let drawdown = analyze_drawdown(&sim.equity_curve);
    let metrics = PerformanceMetrics::compute(
        &sim.equity_curve,
        &sim.trades,
        initial_balance,
        sim.final_balance,
        bars.len(),
        &drawdown,
    );
    let benchmark = buy_and_hold(bars, initial_balance)?;

    let audit = AuditOutcome::from(audit_trades(&sim.trades, &config.audit));
    if let AuditOutcome::Failed { reason } = &audit {
        warn!(%reason, "trade audit failed");
    }
    let audit_message = audit.message();

    let dataset_hash = fingerprint::dataset_hash(bars);
    let run_id = fingerprint::run_id(config, &dataset_hash)?;

    let returns_per_trade = sim
        .trades
        .iter()
        .filter_map(|t| t.return_pct())
        .map(|r| round2(r * 100.0))
        .collect();
    let trade_durations = sim.trades.iter().filter_map(|t| t.duration_bars()).collect();
    let trade_pnls = sim.trades.iter().filter_map(|t| t.pnl()).collect();
    let entry_dates = sim.trades.iter().map(|t| t.entry_time).collect();
    let exit_dates = sim.trades.iter().filter_map(|t| t.exit_time()).collect();
    let event_types = sim.events.iter().map(|e| e.kind.to_string()).collect();

    let excess_return_pct = round2(metrics.total_return_pct - benchmark.total_return_pct);

    info!(
        symbol = %config.backtest.symbol,
        strategy = strategy.name(),
        %run_id,
        trades = sim.trades.len(),
        final_balance = sim.final_balance,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash,
        symbol: config.backtest.symbol.clone(),
        strategy: strategy.name().to_string(),
        strategy_params: config.strategy.params.clone(),
        interval: config.backtest.interval,
        fee_pct: config.backtest.fee_pct,
        initial_balance,
        final_balance: sim.final_balance,
        bar_count: bars.len(),
        start: bars.first().map(|b| b.timestamp),
        end: bars.last().map(|b| b.timestamp),
        metrics,
        equity_curve: sim.equity_curve,
        drawdown_curve: drawdown.curve,
        returns_per_trade,
        trade_durations,
        trade_pnls,
        entry_dates,
        exit_dates,
        event_types,
        trades: sim.trades,
        events: sim.events,
        benchmark,
        excess_return_pct,
        audit,
        audit_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexbt_core::data::SyntheticProvider;
    use flexbt_core::domain::Interval;

    fn config() -> BacktestConfig {
        let mut config = BacktestConfig::new("BTCUSDT", Interval::OneHour, "moving_average");
        config.strategy.params.insert("short_window".into(), 5.0);
        config.strategy.params.insert("long_window".into(), 20.0);
        config
    }

    #[test]
    fn unknown_strategy_is_reported_verbatim() {
        let mut cfg = config();
        cfg.strategy.name = "MovingAverageStrategy".into();
        let err = run_backtest(
            &cfg,
            &SyntheticProvider::new(1, 50),
            &StrategyRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RunError::Strategy(StrategyError::NotFound(ref name)) if name == "MovingAverageStrategy"
        ));
    }

    #[test]
    fn invalid_config_fails_before_fetch() {
        let mut cfg = config();
        cfg.backtest.fee_pct = -0.1;
        let err = run_backtest(
            &cfg,
            &SyntheticProvider::new(1, 50),
            &StrategyRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
    }

    #[test]
    fn result_arrays_line_up_with_ledger() {
        let result = run_backtest(
            &config(),
            &SyntheticProvider::new(9, 400),
            &StrategyRegistry::builtin(),
        )
        .unwrap();
        let n = result.trades.len();
        assert_eq!(result.metrics.n_trades, n);
        assert_eq!(result.returns_per_trade.len(), n);
        assert_eq!(result.trade_durations.len(), n);
        assert_eq!(result.trade_pnls.len(), n);
        assert_eq!(result.entry_dates.len(), n);
        assert_eq!(result.exit_dates.len(), n);
        assert_eq!(result.event_types.len(), result.events.len());
        assert_eq!(result.drawdown_curve.len(), result.equity_curve.len());
        assert_eq!(result.benchmark.equity_curve.len(), result.bar_count);
        assert!(!result.audit.is_failed());
    }
}
