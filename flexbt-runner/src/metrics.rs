//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar
//! out. Values that are undefined for the input (Sharpe on fewer than two
//! returns, profit factor with no losing trades) are reported as
//! [`MetricValue::NotAvailable`] or [`MetricValue::Infinite`], never as a
//! substituted number.

use std::fmt;

use serde::{Deserialize, Serialize};

use flexbt_core::domain::Trade;

use crate::drawdown::DrawdownAnalysis;

/// Annualization factor for per-bar returns.
pub const PERIODS_PER_YEAR: f64 = 252.0;

/// Guard added to the denominator of the Sharpe ratio.
const SHARPE_EPSILON: f64 = 1e-9;

/// A metric that may be undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricValue {
    Value(f64),
    NotAvailable,
    Infinite,
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::NotAvailable => None,
            Self::Infinite => Some(f64::INFINITY),
        }
    }

    /// Wrap a computed number, mapping `+inf` to `Infinite` and any other
    /// non-finite value to `NotAvailable`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Self::Value(value)
        } else if value == f64::INFINITY {
            Self::Infinite
        } else {
            Self::NotAvailable
        }
    }

    /// Round a finite value to two decimals; markers pass through.
    pub fn rounded(self) -> Self {
        match self {
            Self::Value(v) => Self::from_f64(round2(v)),
            other => other,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.2}"),
            Self::NotAvailable => f.write_str("N/A"),
            Self::Infinite => f.write_str("inf"),
        }
    }
}

/// Aggregate performance metrics for a single backtest run.
///
/// Percentage and currency fields are rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Final minus initial balance.
    pub total_return: f64,
    pub total_return_pct: f64,
    pub avg_return_per_trade_pct: f64,
    pub avg_daily_return_pct: f64,
    pub win_rate_pct: f64,
    pub profit_factor: MetricValue,
    pub sharpe_ratio: MetricValue,
    pub volatility_pct: MetricValue,
    pub cagr_pct: MetricValue,
    /// Mean holding period in bars.
    pub mean_trade_duration: f64,
    pub n_trades: usize,
    pub max_drawdown_pct: f64,
    pub max_drawdown_value: f64,
    pub recovery_time_periods: Option<usize>,
}

impl PerformanceMetrics {
    /// Compute all metrics for a finished simulation.
    ///
    /// `n_bars` is the length of the preprocessed bar series and drives CAGR.
    pub fn compute(
        equity_curve: &[f64],
        trades: &[Trade],
        initial_balance: f64,
        final_balance: f64,
        n_bars: usize,
        drawdown: &DrawdownAnalysis,
    ) -> Self {
        let returns = period_returns(equity_curve);
        let trade_returns: Vec<f64> = trades.iter().filter_map(Trade::return_pct).collect();

        Self {
            total_return: round2(final_balance - initial_balance),
            total_return_pct: round2(total_return_pct(initial_balance, final_balance)),
            avg_return_per_trade_pct: round2(mean_f64(&trade_returns) * 100.0),
            avg_daily_return_pct: round2(mean_f64(&returns) * 100.0),
            win_rate_pct: round2(win_rate(trades) * 100.0),
            profit_factor: profit_factor(trades).rounded(),
            sharpe_ratio: sharpe_ratio(&returns).rounded(),
            volatility_pct: volatility_pct(&returns).rounded(),
            cagr_pct: cagr_pct(initial_balance, final_balance, n_bars).rounded(),
            mean_trade_duration: round2(mean_trade_duration(trades)),
            n_trades: trades.len(),
            max_drawdown_pct: round2(drawdown.max_drawdown.abs() * 100.0),
            max_drawdown_value: round2(drawdown.max_drawdown.abs() * initial_balance),
            recovery_time_periods: drawdown.recovery_bars,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Return in percent from initial to final balance.
pub fn total_return_pct(initial: f64, final_balance: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_balance / initial - 1.0) * 100.0
}

/// Compound growth rate in percent, annualized over 365 bars.
///
/// Not available when there are no bars or the initial balance is not
/// positive. Short, steep series overflow to `Infinite`.
pub fn cagr_pct(initial: f64, final_balance: f64, n_bars: usize) -> MetricValue {
    if n_bars == 0 || !(initial > 0.0) {
        return MetricValue::NotAvailable;
    }
    MetricValue::from_f64(((final_balance / initial).powf(365.0 / n_bars as f64) - 1.0) * 100.0)
}

/// Annualized Sharpe ratio of per-bar returns (risk-free rate 0).
///
/// Sharpe = mean / (sample std + 1e-9) * sqrt(252).
pub fn sharpe_ratio(returns: &[f64]) -> MetricValue {
    if returns.len() < 2 {
        return MetricValue::NotAvailable;
    }
    let mean = mean_f64(returns);
    let std = std_dev(returns);
    MetricValue::Value(mean / (std + SHARPE_EPSILON) * PERIODS_PER_YEAR.sqrt())
}

/// Annualized volatility of per-bar returns, in percent.
pub fn volatility_pct(returns: &[f64]) -> MetricValue {
    if returns.len() < 2 {
        return MetricValue::NotAvailable;
    }
    MetricValue::Value(std_dev(returns) * PERIODS_PER_YEAR.sqrt() * 100.0)
}

/// Win rate: fraction of trades with positive PnL.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Infinite with winners and no losers; not available with neither.
pub fn profit_factor(trades: &[Trade]) -> MetricValue {
    let pnls: Vec<f64> = trades.iter().filter_map(Trade::pnl).collect();
    let gross_profit: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();

    if gross_loss == 0.0 {
        return if gross_profit > 0.0 {
            MetricValue::Infinite
        } else {
            MetricValue::NotAvailable
        };
    }
    MetricValue::Value(gross_profit / gross_loss)
}

/// Mean trade duration in bars (0 when there are no closed trades).
pub fn mean_trade_duration(trades: &[Trade]) -> f64 {
    let durations: Vec<f64> = trades
        .iter()
        .filter_map(Trade::duration_bars)
        .map(|d| d as f64)
        .collect();
    mean_f64(&durations)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Per-bar simple returns from an equity curve.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    if equity_curve.len() < 2 {
        return Vec::new();
    }
    equity_curve
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_trade(basis: f64, pnl: f64, duration: usize) -> Trade {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let t1 = t0 + chrono::Duration::days(duration as i64);
        Trade {
            entry_time: t0,
            entry_bar: 0,
            entry_price: 100.0,
            entry_fee: 0.0,
            quantity: basis / 100.0,
            balance_before_entry: basis,
            exit: None,
        }
        .close(t1, duration, 100.0 + pnl * 100.0 / basis, 0.0, basis + pnl, basis, false)
    }

    // ── Total return / CAGR ──

    #[test]
    fn total_return_pct_basic() {
        assert!((total_return_pct(1000.0, 1100.0) - 10.0).abs() < 1e-10);
        assert!((total_return_pct(1000.0, 900.0) + 10.0).abs() < 1e-10);
        assert_eq!(total_return_pct(0.0, 100.0), 0.0);
    }

    #[test]
    fn cagr_one_year_of_bars() {
        let c = cagr_pct(1000.0, 1100.0, 365).as_f64().unwrap();
        assert!((c - 10.0).abs() < 1e-9, "got {c}");
    }

    #[test]
    fn cagr_degenerate_inputs() {
        assert_eq!(cagr_pct(1000.0, 1100.0, 0), MetricValue::NotAvailable);
        assert_eq!(cagr_pct(0.0, 1100.0, 10), MetricValue::NotAvailable);
    }

    #[test]
    fn cagr_overflow_is_infinite() {
        // 100x over two bars, annualized to the 182.5th power.
        assert_eq!(cagr_pct(1.0, 100.0, 2), MetricValue::Infinite);
        assert_eq!(cagr_pct(1.0, 100.0, 2).rounded(), MetricValue::Infinite);
    }

    #[test]
    fn from_f64_maps_non_finite() {
        assert_eq!(MetricValue::from_f64(1.5), MetricValue::Value(1.5));
        assert_eq!(MetricValue::from_f64(f64::INFINITY), MetricValue::Infinite);
        assert_eq!(MetricValue::from_f64(f64::NAN), MetricValue::NotAvailable);
        assert_eq!(MetricValue::Value(f64::MAX).rounded(), MetricValue::Infinite);
    }

    // ── Sharpe / volatility ──

    #[test]
    fn sharpe_needs_two_returns() {
        assert_eq!(sharpe_ratio(&[]), MetricValue::NotAvailable);
        assert_eq!(sharpe_ratio(&[0.01]), MetricValue::NotAvailable);
        assert_eq!(volatility_pct(&[0.01]), MetricValue::NotAvailable);
    }

    #[test]
    fn sharpe_constant_returns_is_zero() {
        assert_eq!(sharpe_ratio(&[0.0, 0.0, 0.0]), MetricValue::Value(0.0));
    }

    #[test]
    fn sharpe_known_value() {
        let returns = [0.01, 0.03];
        // mean 0.02, sample std sqrt(0.0002)
        let expected = 0.02 / (0.0002_f64.sqrt() + 1e-9) * 252.0_f64.sqrt();
        let got = sharpe_ratio(&returns).as_f64().unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn volatility_uses_sample_std() {
        let got = volatility_pct(&[0.01, 0.03]).as_f64().unwrap();
        let expected = 0.0002_f64.sqrt() * 252.0_f64.sqrt() * 100.0;
        assert!((got - expected).abs() < 1e-9);
    }

    // ── Trade statistics ──

    #[test]
    fn profit_factor_markers() {
        assert_eq!(profit_factor(&[]), MetricValue::NotAvailable);
        assert_eq!(
            profit_factor(&[make_trade(1000.0, 50.0, 2)]),
            MetricValue::Infinite
        );
        assert_eq!(
            profit_factor(&[make_trade(1000.0, 0.0, 2)]),
            MetricValue::NotAvailable
        );
    }

    #[test]
    fn profit_factor_ratio() {
        let trades = vec![
            make_trade(1000.0, 300.0, 1),
            make_trade(1300.0, -100.0, 1),
            make_trade(1200.0, -50.0, 1),
        ];
        let pf = profit_factor(&trades).as_f64().unwrap();
        assert!((pf - 2.0).abs() < 1e-9);
    }

    #[test]
    fn win_rate_and_duration() {
        let trades = vec![
            make_trade(1000.0, 10.0, 2),
            make_trade(1010.0, -5.0, 4),
            make_trade(1005.0, 0.0, 6),
        ];
        assert!((win_rate(&trades) - 1.0 / 3.0).abs() < 1e-12);
        assert!((mean_trade_duration(&trades) - 4.0).abs() < 1e-12);
        assert_eq!(win_rate(&[]), 0.0);
        assert_eq!(mean_trade_duration(&[]), 0.0);
    }

    // ── Assembly ──

    #[test]
    fn compute_rounds_and_marks() {
        let equity = vec![1000.0, 1000.0];
        let dd = crate::drawdown::analyze_drawdown(&equity);
        let m = PerformanceMetrics::compute(&equity, &[], 1000.0, 1000.0, 2, &dd);
        assert_eq!(m.n_trades, 0);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.profit_factor, MetricValue::NotAvailable);
        // One return only.
        assert_eq!(m.sharpe_ratio, MetricValue::NotAvailable);
        assert_eq!(m.avg_return_per_trade_pct, 0.0);
        assert_eq!(m.max_drawdown_pct, 0.0);
    }

    #[test]
    fn compute_uses_drawdown_analysis() {
        let equity = vec![1000.0, 1200.0, 900.0, 1300.0];
        let dd = crate::drawdown::analyze_drawdown(&equity);
        let m = PerformanceMetrics::compute(&equity, &[], 1000.0, 1300.0, 4, &dd);
        assert_eq!(m.max_drawdown_pct, 25.0);
        assert_eq!(m.max_drawdown_value, 250.0);
        assert_eq!(m.recovery_time_periods, Some(1));
        assert_eq!(m.total_return, 300.0);
        assert_eq!(m.total_return_pct, 30.0);
    }

    #[test]
    fn round2_behaviour() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_1), 1.24);
        assert_eq!(round2(-0.004), -0.0);
    }

    #[test]
    fn metric_value_display() {
        assert_eq!(MetricValue::Value(1.5).to_string(), "1.50");
        assert_eq!(MetricValue::NotAvailable.to_string(), "N/A");
        assert_eq!(MetricValue::Infinite.to_string(), "inf");
    }
}
