//! CSV bar files: `{dir}/{SYMBOL}_{interval}.csv`.
//!
//! Header is `timestamp,open,high,low,close,volume`. Timestamps may be
//! `YYYY-MM-DD HH:MM:SS`, RFC 3339-style `YYYY-MM-DDTHH:MM:SS`, a bare date,
//! or integer epoch milliseconds.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::info;

use crate::domain::{Bar, Interval};

use super::{DataError, DataProvider};

#[derive(Debug, Deserialize)]
struct CsvRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Reads bars from a directory of CSV files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path for a symbol/interval pair.
    pub fn path_for(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", symbol.to_uppercase(), interval))
    }

    /// Parse bars from any reader carrying the CSV header.
    pub fn read_bars<R: std::io::Read>(reader: R) -> Result<Vec<Bar>, DataError> {
        let mut rdr = ::csv::ReaderBuilder::new().trim(::csv::Trim::All).from_reader(reader);
        let mut bars = Vec::new();
        for (row, record) in rdr.deserialize::<CsvRecord>().enumerate() {
            let record = record?;
            let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| DataError::Parse {
                row,
                reason: format!("unrecognized timestamp '{}'", record.timestamp),
            })?;
            bars.push(Bar {
                timestamp,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            });
        }
        Ok(bars)
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, symbol: &str, interval: Interval) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol, interval);
        if !path.exists() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                interval,
                path,
            });
        }
        let file = std::fs::File::open(&path)?;
        let bars = Self::read_bars(file)?;
        info!(symbol, %interval, bars = bars.len(), path = %path.display(), "loaded csv bars");
        Ok(bars)
    }
}

/// Parse the timestamp formats accepted in bar files.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let raw = raw.trim();
    for fmt in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc());
    }
    None
}
