//! flexbt CLI: run, sweep, and listing commands.
//!
//! Commands:
//! - `run`: execute a single backtest from a TOML config file or flags
//! - `sweep`: grid-search strategy parameters over one dataset
//! - `strategies`: list registered strategies and their parameters
//! - `intervals`: list supported bar intervals

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use flexbt_core::data::{filter_from, preprocess, CsvProvider, DataProvider, SyntheticProvider};
use flexbt_core::domain::{Bar, Interval};
use flexbt_core::strategy::{StrategyParams, StrategyRegistry};
use flexbt_runner::{
    run_backtest, run_sweep, save_artifacts, BacktestConfig, BacktestResult, SweepGrid,
};

#[derive(Parser)]
#[command(
    name = "flexbt",
    about = "flexbt: signal-driven long-only backtester with trade auditing"
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file or from flags.
    Run {
        #[command(flatten)]
        setup: SetupArgs,

        #[command(flatten)]
        data: DataArgs,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Skip writing artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Grid-search strategy parameters over one dataset.
    Sweep {
        #[command(flatten)]
        setup: SetupArgs,

        #[command(flatten)]
        data: DataArgs,

        /// Grid axis as NAME=V1,V2,... (repeatable). Defaults to the
        /// moving-average window grid.
        #[arg(long = "grid", value_name = "NAME=VALUES")]
        grid: Vec<String>,

        /// Number of ranked results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// List registered strategies.
    Strategies,
    /// List supported bar intervals.
    Intervals,
}

/// Where the backtest configuration comes from.
#[derive(Args)]
struct SetupArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Strategy name (see `flexbt strategies`).
    #[arg(long)]
    strategy: Option<String>,

    /// Trading pair or ticker [default: BTCUSDT].
    #[arg(long)]
    symbol: Option<String>,

    /// Bar interval: 1m, 5m, 15m, 1h, 4h, 1d [default: 1h].
    #[arg(long)]
    interval: Option<String>,

    /// Drop bars before this date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// Starting cash.
    #[arg(long)]
    initial_balance: Option<f64>,

    /// Proportional fee per side, e.g. 0.001 for 0.1%.
    #[arg(long)]
    fee_pct: Option<f64>,

    /// Strategy parameter as NAME=VALUE (repeatable).
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,
}

/// Where the bars come from.
#[derive(Args)]
struct DataArgs {
    /// Use a seeded random walk instead of CSV files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Bar count for synthetic data.
    #[arg(long, default_value_t = 1000)]
    bars: usize,

    /// Seed for synthetic data.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Directory holding `{SYMBOL}_{interval}.csv` files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
}

impl DataArgs {
    fn provider(&self) -> Box<dyn DataProvider> {
        if self.synthetic {
            Box::new(SyntheticProvider::new(self.seed, self.bars))
        } else {
            Box::new(CsvProvider::new(&self.data_dir))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            setup,
            data,
            output_dir,
            no_save,
        } => run_cmd(setup, data, output_dir, no_save),
        Commands::Sweep {
            setup,
            data,
            grid,
            top,
        } => sweep_cmd(setup, data, &grid, top),
        Commands::Strategies => {
            list_strategies();
            Ok(())
        }
        Commands::Intervals => {
            list_intervals();
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn run_cmd(setup: SetupArgs, data: DataArgs, output_dir: PathBuf, no_save: bool) -> Result<()> {
    let config = build_config(&setup)?;
    let registry = StrategyRegistry::builtin();
    let provider = data.provider();

    let result = run_backtest(&config, provider.as_ref(), &registry)?;
    print_summary(&result);

    if !no_save {
        let paths = save_artifacts(&result, &output_dir)?;
        println!("Artifacts saved to: {}", paths.dir.display());
    }
    Ok(())
}

fn sweep_cmd(setup: SetupArgs, data: DataArgs, grid_args: &[String], top: usize) -> Result<()> {
    let config = build_config(&setup)?;
    let registry = StrategyRegistry::builtin();

    let grid = if grid_args.is_empty() {
        SweepGrid::moving_average_default()
    } else {
        parse_grid(grid_args)?
    };

    let bars = load_bars(&config, &data)?;
    info!(points = grid.size(), bars = bars.len(), "running sweep");
    let outcome = run_sweep(&config, &bars, &registry, &grid);

    println!();
    println!("=== Sweep: {} on {} ===", config.strategy.name, config.backtest.symbol);
    println!(
        "Points: {} completed, {} skipped",
        outcome.entries.len(),
        outcome.skipped.len()
    );
    println!();
    println!(
        "{:<4} {:<36} {:>10} {:>8} {:>10} {:>7}",
        "#", "Params", "Return %", "Sharpe", "Max DD %", "Trades"
    );
    for (rank, entry) in outcome.entries.iter().take(top).enumerate() {
        let m = &entry.result.metrics;
        println!(
            "{:<4} {:<36} {:>10.2} {:>8} {:>10.2} {:>7}",
            rank + 1,
            format_params(&entry.params),
            m.total_return_pct,
            m.sharpe_ratio.to_string(),
            m.max_drawdown_pct,
            m.n_trades
        );
    }
    for skipped in &outcome.skipped {
        println!("skipped {}: {}", format_params(&skipped.params), skipped.reason);
    }
    println!();
    Ok(())
}

fn load_bars(config: &BacktestConfig, data: &DataArgs) -> Result<Vec<Bar>> {
    let provider = data.provider();
    let bars = provider
        .fetch(&config.backtest.symbol, config.backtest.interval)
        .with_context(|| format!("failed to load bars for {}", config.backtest.symbol))?;
    Ok(filter_from(preprocess(bars), config.start_datetime()))
}

const DEFAULT_SYMBOL: &str = "BTCUSDT";
const DEFAULT_INTERVAL: Interval = Interval::OneHour;

/// Build a config from `--config` or from flags. `[backtest]` flags and
/// `--param` given alongside a config file override the file's values.
fn build_config(setup: &SetupArgs) -> Result<BacktestConfig> {
    if setup.config.is_some() && setup.strategy.is_some() {
        bail!("--config and --strategy are mutually exclusive");
    }

    let mut config = match (&setup.config, &setup.strategy) {
        (Some(path), None) => BacktestConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        (None, Some(name)) => {
            let mut config = BacktestConfig::new(DEFAULT_SYMBOL, DEFAULT_INTERVAL, name);
            if name == "moving_average" {
                config.strategy.params.insert("short_window".into(), 10.0);
                config.strategy.params.insert("long_window".into(), 30.0);
            }
            config
        }
        _ => bail!("one of --config or --strategy is required"),
    };

    if let Some(symbol) = &setup.symbol {
        config.backtest.symbol = symbol.clone();
    }
    if let Some(interval) = &setup.interval {
        config.backtest.interval = interval.parse()?;
    }
    if let Some(start) = &setup.start {
        let date = NaiveDate::parse_from_str(start, "%Y-%m-%d")
            .with_context(|| format!("invalid --start date '{start}'"))?;
        config.backtest.start_date = Some(date);
    }
    if let Some(balance) = setup.initial_balance {
        config.backtest.initial_balance = balance;
    }
    if let Some(fee) = setup.fee_pct {
        config.backtest.fee_pct = fee;
    }
    config.strategy.params.extend(parse_params(&setup.params)?);

    config.validate()?;
    Ok(config)
}

fn parse_params(raw: &[String]) -> Result<StrategyParams> {
    let mut params = StrategyParams::new();
    for item in raw {
        let Some((name, value)) = item.split_once('=') else {
            bail!("expected NAME=VALUE, got '{item}'");
        };
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("parameter '{name}' is not a number"))?;
        params.insert(name.trim().to_string(), value);
    }
    Ok(params)
}

fn parse_grid(raw: &[String]) -> Result<SweepGrid> {
    let mut grid = SweepGrid::new();
    for item in raw {
        let Some((name, values)) = item.split_once('=') else {
            bail!("expected NAME=V1,V2,..., got '{item}'");
        };
        let values = values
            .split(',')
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .with_context(|| format!("grid value '{v}' for '{name}' is not a number"))
            })
            .collect::<Result<Vec<_>>>()?;
        if values.is_empty() {
            bail!("grid axis '{name}' has no values");
        }
        grid = grid.with(name.trim(), values);
    }
    Ok(grid)
}

fn format_params(params: &StrategyParams) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn list_strategies() {
    let registry = StrategyRegistry::builtin();
    for entry in registry.entries() {
        let params = if entry.params.is_empty() {
            "-".to_string()
        } else {
            entry.params.join(", ")
        };
        println!("{:<16} {}", entry.name, entry.description);
        println!("{:<16} params: {params}", "");
    }
}

fn list_intervals() {
    for interval in Interval::ALL {
        println!("{interval}");
    }
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    let span = match (result.start, result.end) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        _ => "-".to_string(),
    };
    let recovery = m
        .recovery_time_periods
        .map(|r| r.to_string())
        .unwrap_or_else(|| "not recovered".to_string());
    let signal_exits = result.signal_exits().count();

    println!();
    println!("=== Backtest Result ===");
    println!("Run ID:         {}", result.run_id);
    println!("Symbol:         {} ({})", result.symbol, result.interval);
    println!("Strategy:       {} {}", result.strategy, format_params(&result.strategy_params));
    println!("Period:         {span}");
    println!("Bars:           {}", result.bar_count);
    println!(
        "Trades:         {} ({} on signal, {} forced at end)",
        m.n_trades,
        signal_exits,
        m.n_trades.saturating_sub(signal_exits)
    );
    println!();
    println!("--- Performance ---");
    println!(
        "Balance:        {:.2} -> {:.2}",
        result.initial_balance, result.final_balance
    );
    println!("Total Return:   {:.2}%", m.total_return_pct);
    println!("CAGR:           {}%", m.cagr_pct);
    println!("Sharpe:         {}", m.sharpe_ratio);
    println!("Volatility:     {}%", m.volatility_pct);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown_pct);
    println!("Recovery:       {recovery}");
    println!("Win Rate:       {:.2}%", m.win_rate_pct);
    println!("Profit Factor:  {}", m.profit_factor);
    println!("Avg Trade:      {:.2}%", m.avg_return_per_trade_pct);
    println!("Avg Duration:   {:.2} bars", m.mean_trade_duration);
    println!();
    println!("--- Benchmark (buy and hold) ---");
    println!("Total Return:   {:.2}%", result.benchmark.total_return_pct);
    println!("Excess Return:  {:.2}%", result.excess_return_pct);
    println!();
    println!("--- Audit ---");
    println!("{}", result.audit_message);
    if let Some(report) = result.audit.report() {
        for row in report.flagged() {
            println!(
                "  trade {:>3}: {} -> {}  pnl {:.2}  {} bars",
                row.trade_index, row.entry_time, row.exit_time, row.pnl, row.duration_bars
            );
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(strategy: Option<&str>, params: &[&str]) -> SetupArgs {
        SetupArgs {
            config: None,
            strategy: strategy.map(str::to_string),
            symbol: None,
            interval: None,
            start: None,
            initial_balance: None,
            fee_pct: None,
            params: params.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_params_reads_pairs() {
        let params = parse_params(&["short_window=5".into(), " long_window = 20 ".into()]).unwrap();
        assert_eq!(params.get("short_window"), Some(&5.0));
        assert_eq!(params.get("long_window"), Some(&20.0));
    }

    #[test]
    fn parse_params_rejects_malformed() {
        assert!(parse_params(&["short_window".into()]).is_err());
        assert!(parse_params(&["short_window=abc".into()]).is_err());
    }

    #[test]
    fn parse_grid_builds_axes() {
        let grid = parse_grid(&["short_window=5,10".into(), "long_window=20,30,40".into()]).unwrap();
        assert_eq!(grid.size(), 6);
    }

    #[test]
    fn flags_build_moving_average_defaults() {
        let config = build_config(&setup(Some("moving_average"), &[])).unwrap();
        assert_eq!(config.backtest.symbol, "BTCUSDT");
        assert_eq!(config.backtest.interval, Interval::OneHour);
        assert_eq!(config.strategy.params.get("short_window"), Some(&10.0));
        assert_eq!(config.strategy.params.get("long_window"), Some(&30.0));
    }

    #[test]
    fn param_flags_override_defaults() {
        let config = build_config(&setup(Some("moving_average"), &["long_window=50"])).unwrap();
        assert_eq!(config.strategy.params.get("long_window"), Some(&50.0));
    }

    #[test]
    fn strategy_or_config_is_required() {
        assert!(build_config(&setup(None, &[])).is_err());
    }

    #[test]
    fn unknown_interval_is_rejected() {
        let mut args = setup(Some("buy_and_hold"), &[]);
        args.interval = Some("2w".into());
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest.toml");
        std::fs::write(
            &path,
            r#"
[backtest]
symbol = "BTCUSDT"
interval = "1d"
fee_pct = 0.002

[strategy]
name = "buy_and_hold"
"#,
        )
        .unwrap();

        let mut args = setup(None, &[]);
        args.config = Some(path);
        args.symbol = Some("ETHUSDT".into());
        args.interval = Some("4h".into());

        let config = build_config(&args).unwrap();
        assert_eq!(config.backtest.symbol, "ETHUSDT");
        assert_eq!(config.backtest.interval, Interval::FourHours);
        assert_eq!(config.backtest.fee_pct, 0.002);
        assert_eq!(config.strategy.name, "buy_and_hold");
    }

    #[test]
    fn config_file_values_kept_without_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest.toml");
        std::fs::write(
            &path,
            "[backtest]\nsymbol = \"SOLUSDT\"\ninterval = \"15m\"\n\n[strategy]\nname = \"buy_and_hold\"\n",
        )
        .unwrap();

        let mut args = setup(None, &[]);
        args.config = Some(path);
        let config = build_config(&args).unwrap();
        assert_eq!(config.backtest.symbol, "SOLUSDT");
        assert_eq!(config.backtest.interval, Interval::FifteenMinutes);
    }
}
