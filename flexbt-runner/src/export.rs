//! Artifact export: JSON and CSV files for a finished run.
//!
//! All persisted JSON includes a `schema_version` field. Unknown versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use flexbt_core::domain::Trade;

use crate::audit::AuditRow;
use crate::result::{BacktestResult, SCHEMA_VERSION};

/// Paths written by [`ArtifactManager::save_run`].
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub result_json: PathBuf,
    pub equity_csv: PathBuf,
    pub trades_csv: PathBuf,
    pub audit_csv: PathBuf,
}

/// Writes run artifacts under `{output_dir}/{run_id}/`.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create artifact output directory")?;
        Ok(Self { output_dir })
    }

    pub fn save_run(&self, result: &BacktestResult) -> Result<ArtifactPaths> {
        let dir = self.output_dir.join(&result.run_id);
        std::fs::create_dir_all(&dir).context("Failed to create run artifact directory")?;

        let result_json = dir.join("result.json");
        write_file(&result_json, &export_json(result)?)?;

        let equity_csv = dir.join("equity.csv");
        write_file(
            &equity_csv,
            &export_equity_csv(&result.equity_curve, &result.drawdown_curve)?,
        )?;

        let trades_csv = dir.join("trades.csv");
        write_file(&trades_csv, &export_trades_csv(&result.trades)?)?;

        let audit_csv = dir.join("audit.csv");
        let rows = result.audit.report().map(|r| r.rows.as_slice()).unwrap_or(&[]);
        write_file(&audit_csv, &export_audit_csv(rows)?)?;

        Ok(ArtifactPaths {
            dir,
            result_json,
            equity_csv,
            trades_csv,
            audit_csv,
        })
    }
}

/// Save the full artifact set for `result` under `output_dir`.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<ArtifactPaths> {
    ArtifactManager::new(output_dir)?.save_run(result)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

// ─── JSON ───────────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Columns: step, equity, drawdown
pub fn export_equity_csv(equity: &[f64], drawdown: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["step", "equity", "drawdown"])?;
    for (i, eq) in equity.iter().enumerate() {
        let dd = drawdown.get(i).copied().unwrap_or(0.0);
        wtr.write_record([i.to_string(), format!("{eq:.6}"), format!("{dd:.6}")])?;
    }
    into_string(wtr)
}

/// Columns: entry_time, entry_bar, entry_price, entry_fee, quantity,
/// balance_before_entry, exit_time, exit_bar, exit_price, exit_fee, pnl,
/// return_pct, duration_bars, forced
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_time",
        "entry_bar",
        "entry_price",
        "entry_fee",
        "quantity",
        "balance_before_entry",
        "exit_time",
        "exit_bar",
        "exit_price",
        "exit_fee",
        "pnl",
        "return_pct",
        "duration_bars",
        "forced",
    ])?;

    for t in trades {
        let exit = t.exit.as_ref();
        wtr.write_record([
            t.entry_time.to_string(),
            t.entry_bar.to_string(),
            format!("{:.6}", t.entry_price),
            format!("{:.6}", t.entry_fee),
            format!("{:.8}", t.quantity),
            format!("{:.6}", t.balance_before_entry),
            exit.map(|e| e.exit_time.to_string()).unwrap_or_default(),
            exit.map(|e| e.exit_bar.to_string()).unwrap_or_default(),
            exit.map(|e| format!("{:.6}", e.exit_price)).unwrap_or_default(),
            exit.map(|e| format!("{:.6}", e.exit_fee)).unwrap_or_default(),
            exit.map(|e| format!("{:.6}", e.pnl)).unwrap_or_default(),
            exit.map(|e| format!("{:.6}", e.return_pct)).unwrap_or_default(),
            exit.map(|e| e.duration_bars.to_string()).unwrap_or_default(),
            exit.map(|e| e.forced.to_string()).unwrap_or_default(),
        ])?;
    }
    into_string(wtr)
}

/// One row per audited trade, serialized through serde.
pub fn export_audit_csv(rows: &[AuditRow]) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(vec![]);
    if rows.is_empty() {
        wtr.write_record([
            "trade_index",
            "entry_time",
            "exit_time",
            "balance_before_entry",
            "pnl",
            "pnl_pct",
            "duration_bars",
            "high_pnl",
            "zero_or_short_duration",
            "long_duration",
            "same_entry_exit",
            "audit_flag",
        ])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    into_string(wtr)
}

fn into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}
