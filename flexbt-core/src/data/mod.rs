//! Market data: provider trait, CSV and synthetic sources, preprocessing.
//!
//! Providers return raw bars in file order. The runner preprocesses them and
//! the engine validates ordering, so providers do not sort or deduplicate.

pub mod csv;
pub mod synthetic;

use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::debug;

use crate::domain::{Bar, Interval};

pub use self::csv::CsvProvider;
pub use self::synthetic::SyntheticProvider;

/// Structured errors for data loading.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data file for {symbol} {interval} at {}", .path.display())]
    NotFound {
        symbol: String,
        interval: Interval,
        path: PathBuf,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("parse error on row {row}: {reason}")]
    Parse { row: usize, reason: String },
}

/// Trait for bar sources.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch every available bar for `symbol` at `interval`.
    fn fetch(&self, symbol: &str, interval: Interval) -> Result<Vec<Bar>, DataError>;
}

/// Drop void bars (any NaN price).
pub fn preprocess(bars: Vec<Bar>) -> Vec<Bar> {
    let before = bars.len();
    let kept: Vec<Bar> = bars.into_iter().filter(|b| !b.is_void()).collect();
    if kept.len() != before {
        debug!(dropped = before - kept.len(), "dropped void bars");
    }
    kept
}

/// Keep bars at or after `start`.
pub fn filter_from(bars: Vec<Bar>, start: Option<NaiveDateTime>) -> Vec<Bar> {
    match start {
        Some(start) => bars.into_iter().filter(|b| b.timestamp >= start).collect(),
        None => bars,
    }
}
