//! Seeded random-walk bars for development and tests.
//!
//! The RNG seed is derived from the base seed, the symbol, and the interval
//! with BLAKE3, so the same request always yields the same series.

use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Bar, Interval};

use super::{DataError, DataProvider};

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
    bar_count: usize,
    start: NaiveDateTime,
    start_price: f64,
}

impl SyntheticProvider {
    pub fn new(seed: u64, bar_count: usize) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            seed,
            bar_count,
            start,
            start_price: 100.0,
        }
    }

    fn rng_for(&self, symbol: &str, interval: Interval) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(interval.as_str().as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Generate the series without going through the trait.
    pub fn generate(&self, symbol: &str, interval: Interval) -> Vec<Bar> {
        let mut rng = self.rng_for(symbol, interval);
        let step = interval.duration();

        let mut bars = Vec::with_capacity(self.bar_count);
        let mut price = self.start_price;
        let mut timestamp = self.start;

        for _ in 0..self.bar_count {
            let ret: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(1_000.0..100_000.0);

            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });

            price = close;
            timestamp += step;
        }
        bars
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, symbol: &str, interval: Interval) -> Result<Vec<Bar>, DataError> {
        Ok(self.generate(symbol, interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validate_bars;

    #[test]
    fn deterministic_per_request() {
        let p = SyntheticProvider::new(42, 100);
        assert_eq!(
            p.generate("BTCUSDT", Interval::OneHour),
            p.generate("BTCUSDT", Interval::OneHour)
        );
        assert_ne!(
            p.generate("BTCUSDT", Interval::OneHour),
            p.generate("ETHUSDT", Interval::OneHour)
        );
    }

    #[test]
    fn bars_are_ordered_and_sane() {
        let bars = SyntheticProvider::new(7, 250).generate("X", Interval::FifteenMinutes);
        assert_eq!(bars.len(), 250);
        assert!(validate_bars(&bars).is_ok());
        assert!(bars.iter().all(Bar::is_sane));
        assert_eq!(
            bars[1].timestamp - bars[0].timestamp,
            chrono::Duration::minutes(15)
        );
    }

    #[test]
    fn opens_chain_from_previous_close() {
        let bars = SyntheticProvider::new(1, 10).generate("X", Interval::OneDay);
        assert_eq!(bars[0].open, 100.0);
        for pair in bars.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
        }
    }
}
