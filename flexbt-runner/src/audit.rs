//! Trade auditor: flags suspicious trades in a finished ledger.
//!
//! Flags per closed trade:
//! - `high_pnl`: |pnl / balance_before_entry| above the threshold
//! - `zero_or_short_duration`: held for zero bars
//! - `long_duration`: held longer than the threshold
//! - `same_entry_exit`: entered and exited at the same timestamp
//!
//! A trade without exit data violates the auditor's contract and produces an
//! [`AuditError`]. The runner turns that into [`AuditOutcome::Failed`] instead
//! of aborting the run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use flexbt_core::domain::Trade;

/// Audit thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Largest plausible |pnl| as a fraction of the entry balance.
    pub max_pnl_fraction: f64,
    /// Longest plausible holding period in bars.
    pub max_duration_bars: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_pnl_fraction: 0.5,
            max_duration_bars: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    #[error("trade {trade_index} is missing required field '{field}'")]
    MissingField {
        trade_index: usize,
        field: &'static str,
    },
}

/// Audit flags for one trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    pub trade_index: usize,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub balance_before_entry: f64,
    pub pnl: f64,
    /// `pnl / |balance_before_entry|`; `None` when the entry balance is 0.
    pub pnl_pct: Option<f64>,
    pub duration_bars: usize,
    pub high_pnl: bool,
    pub zero_or_short_duration: bool,
    pub long_duration: bool,
    pub same_entry_exit: bool,
    pub audit_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub rows: Vec<AuditRow>,
    pub total_trades: usize,
    pub flagged_trades: usize,
    pub high_pnl_trades: usize,
    pub long_duration_trades: usize,
    /// Zero-duration count plus same-timestamp count; a trade can add to both.
    pub zero_or_samebar_trades: usize,
    pub message: String,
}

impl AuditReport {
    pub fn flagged(&self) -> impl Iterator<Item = &AuditRow> {
        self.rows.iter().filter(|r| r.audit_flag)
    }
}

/// Result of the audit pass as carried on a backtest result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditOutcome {
    Completed(AuditReport),
    Failed { reason: String },
}

impl AuditOutcome {
    pub fn report(&self) -> Option<&AuditReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Human-readable summary.
    pub fn message(&self) -> String {
        match self {
            Self::Completed(report) => report.message.clone(),
            Self::Failed { reason } => format!("Audit failed: {reason}"),
        }
    }
}

impl From<Result<AuditReport, AuditError>> for AuditOutcome {
    fn from(result: Result<AuditReport, AuditError>) -> Self {
        match result {
            Ok(report) => Self::Completed(report),
            Err(err) => Self::Failed {
                reason: err.to_string(),
            },
        }
    }
}

/// Audit every trade in the ledger.
pub fn audit_trades(ledger: &[Trade], config: &AuditConfig) -> Result<AuditReport, AuditError> {
    let mut rows = Vec::with_capacity(ledger.len());

    for (trade_index, trade) in ledger.iter().enumerate() {
        let exit = trade.exit.as_ref().ok_or(AuditError::MissingField {
            trade_index,
            field: "pnl",
        })?;

        let entry_balance = trade.balance_before_entry.abs();
        let pnl_pct = (entry_balance != 0.0).then(|| exit.pnl / entry_balance);

        let high_pnl = pnl_pct.is_some_and(|p| p.abs() > config.max_pnl_fraction);
        let zero_or_short_duration = exit.duration_bars == 0;
        let long_duration = exit.duration_bars > config.max_duration_bars;
        let same_entry_exit = trade.entry_time == exit.exit_time;

        rows.push(AuditRow {
            trade_index,
            entry_time: trade.entry_time,
            exit_time: exit.exit_time,
            balance_before_entry: trade.balance_before_entry,
            pnl: exit.pnl,
            pnl_pct,
            duration_bars: exit.duration_bars,
            high_pnl,
            zero_or_short_duration,
            long_duration,
            same_entry_exit,
            audit_flag: high_pnl || zero_or_short_duration || long_duration || same_entry_exit,
        });
    }

    let count = |f: fn(&AuditRow) -> bool| rows.iter().filter(|r| f(r)).count();
    let total_trades = rows.len();
    let flagged_trades = count(|r| r.audit_flag);
    let high_pnl_trades = count(|r| r.high_pnl);
    let long_duration_trades = count(|r| r.long_duration);
    let zero_or_samebar_trades = count(|r| r.zero_or_short_duration) + count(|r| r.same_entry_exit);

    let message = if total_trades == 0 {
        "No trades to audit".to_string()
    } else {
        format!("Audit completed: {flagged_trades} of {total_trades} trades flagged")
    };

    Ok(AuditReport {
        rows,
        total_trades,
        flagged_trades,
        high_pnl_trades,
        long_duration_trades,
        zero_or_samebar_trades,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn trade(entry: u32, exit: u32, balance: f64, pnl: f64, entry_bar: usize, exit_bar: usize) -> Trade {
        Trade {
            entry_time: t(entry),
            entry_bar,
            entry_price: 100.0,
            entry_fee: 0.0,
            quantity: balance / 100.0,
            balance_before_entry: balance,
            exit: None,
        }
        .close(t(exit), exit_bar, 100.0, 0.0, balance + pnl, balance, false)
    }

    #[test]
    fn flags_follow_thresholds() {
        let ledger = vec![
            trade(1, 2, 10_000.0, 50.0, 0, 1),
            trade(2, 2, 10_000.0, 6_000.0, 1, 1),
            trade(3, 10, 10_000.0, 6_000.0, 2, 9),
        ];
        let report = audit_trades(&ledger, &AuditConfig::default()).unwrap();

        assert!(!report.rows[0].audit_flag);

        let r1 = &report.rows[1];
        assert!(r1.high_pnl && r1.zero_or_short_duration && r1.same_entry_exit);
        assert!(r1.audit_flag);

        let r2 = &report.rows[2];
        assert!(r2.high_pnl && !r2.long_duration);
        assert_eq!(r2.pnl_pct, Some(0.6));

        assert_eq!(report.total_trades, 3);
        assert_eq!(report.flagged_trades, 2);
        assert_eq!(report.high_pnl_trades, 2);
        assert_eq!(report.long_duration_trades, 0);
        assert_eq!(report.zero_or_samebar_trades, 2);
    }

    #[test]
    fn long_duration_threshold_is_exclusive() {
        let config = AuditConfig {
            max_pnl_fraction: 0.5,
            max_duration_bars: 5,
        };
        let ledger = vec![trade(1, 6, 100.0, 1.0, 0, 5), trade(1, 7, 100.0, 1.0, 0, 6)];
        let report = audit_trades(&ledger, &config).unwrap();
        assert!(!report.rows[0].long_duration);
        assert!(report.rows[1].long_duration);
    }

    #[test]
    fn zero_entry_balance_is_not_high_pnl() {
        let mut tr = trade(1, 3, 100.0, 1_000.0, 0, 2);
        tr.balance_before_entry = 0.0;
        let report = audit_trades(&[tr], &AuditConfig::default()).unwrap();
        assert_eq!(report.rows[0].pnl_pct, None);
        assert!(!report.rows[0].high_pnl);
    }

    #[test]
    fn empty_ledger_is_an_empty_report() {
        let report = audit_trades(&[], &AuditConfig::default()).unwrap();
        assert_eq!(report.total_trades, 0);
        assert!(report.rows.is_empty());
        assert_eq!(report.message, "No trades to audit");
    }

    #[test]
    fn open_trade_is_a_contract_violation() {
        let mut open = trade(1, 2, 100.0, 1.0, 0, 1);
        open.exit = None;
        let err = audit_trades(&[trade(1, 2, 100.0, 1.0, 0, 1), open], &AuditConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            AuditError::MissingField {
                trade_index: 1,
                field: "pnl"
            }
        );

        let outcome = AuditOutcome::from(Err(err));
        assert!(outcome.is_failed());
        assert!(outcome.message().starts_with("Audit failed:"));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = AuditOutcome::Failed {
            reason: "x".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
    }
}
