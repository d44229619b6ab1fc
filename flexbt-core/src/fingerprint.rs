//! Run fingerprinting: deterministic identification of datasets and runs.
//!
//! - `dataset_hash`: BLAKE3 over every bar field in order.
//! - `run_id`: BLAKE3 over a canonical config serialization plus the dataset hash.
//!
//! Two runs with the same run id must produce identical results.

use serde::Serialize;

use crate::domain::Bar;

/// Content hash of a bar series (hex).
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Identity of a run: configuration plus the data it ran on.
///
/// The config is serialized with serde_json; callers should use ordered maps
/// (`BTreeMap`) so the serialization is canonical.
pub fn run_id<C: Serialize>(config: &C, dataset_hash: &str) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_string(config)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(canonical.as_bytes());
    hasher.update(dataset_hash.as_bytes());
    // 16 hex chars is plenty for a run label
    Ok(hasher.finalize().to_hex()[..16].to_string())
}
