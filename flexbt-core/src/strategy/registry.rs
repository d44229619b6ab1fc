//! Explicit strategy registry: identifier to constructor.
//!
//! Built from a static table at startup; callers may register more.

use std::collections::BTreeMap;

use super::{
    buy_and_hold, moving_average, BuyAndHoldStrategy, MovingAverageStrategy, Strategy,
    StrategyError, StrategyParams,
};

/// Builds a strategy from its parameters.
pub type StrategyConstructor = fn(&StrategyParams) -> Result<Box<dyn Strategy>, StrategyError>;

#[derive(Debug, Clone, Copy)]
pub struct StrategyEntry {
    pub name: &'static str,
    pub description: &'static str,
    /// Parameter names the constructor reads.
    pub params: &'static [&'static str],
    pub constructor: StrategyConstructor,
}

fn build_moving_average(params: &StrategyParams) -> Result<Box<dyn Strategy>, StrategyError> {
    Ok(Box::new(MovingAverageStrategy::from_params(params)?))
}

fn build_buy_and_hold(params: &StrategyParams) -> Result<Box<dyn Strategy>, StrategyError> {
    Ok(Box::new(BuyAndHoldStrategy::from_params(params)?))
}

const BUILTIN: &[StrategyEntry] = &[
    StrategyEntry {
        name: moving_average::NAME,
        description: "SMA crossover: long while the short average is above the long average",
        params: &["short_window", "long_window"],
        constructor: build_moving_average,
    },
    StrategyEntry {
        name: buy_and_hold::NAME,
        description: "Long on every bar",
        params: &[],
        constructor: build_buy_and_hold,
    },
];

#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    entries: BTreeMap<&'static str, StrategyEntry>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in strategies.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for entry in BUILTIN {
            registry.register(*entry);
        }
        registry
    }

    /// Add or replace an entry.
    pub fn register(&mut self, entry: StrategyEntry) {
        self.entries.insert(entry.name, entry);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered identifiers in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &StrategyEntry> {
        self.entries.values()
    }

    /// Resolve `name` and construct it with `params`.
    pub fn create(
        &self,
        name: &str,
        params: &StrategyParams,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| StrategyError::NotFound(name.to_string()))?;
        (entry.constructor)(params)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lists_both_strategies() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(registry.names(), vec!["buy_and_hold", "moving_average"]);
    }

    #[test]
    fn create_resolves_by_name() {
        let registry = StrategyRegistry::builtin();
        let mut params = StrategyParams::new();
        params.insert("short_window".into(), 10.0);
        params.insert("long_window".into(), 30.0);
        let s = registry.create("moving_average", &params).unwrap();
        assert_eq!(s.name(), "moving_average");
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = StrategyRegistry::builtin();
        let err = registry
            .create("MovingAverageStrategy", &StrategyParams::new())
            .err()
            .unwrap();
        assert_eq!(err, StrategyError::NotFound("MovingAverageStrategy".into()));
    }

    #[test]
    fn constructor_errors_propagate() {
        let registry = StrategyRegistry::builtin();
        let mut params = StrategyParams::new();
        params.insert("short_window".into(), 30.0);
        params.insert("long_window".into(), 10.0);
        assert!(matches!(
            registry.create("moving_average", &params),
            Err(StrategyError::InvalidParam { .. })
        ));
    }

    #[test]
    fn custom_entries_can_be_registered() {
        fn build(_: &StrategyParams) -> Result<Box<dyn Strategy>, StrategyError> {
            Ok(Box::new(BuyAndHoldStrategy))
        }
        let mut registry = StrategyRegistry::empty();
        registry.register(StrategyEntry {
            name: "always_in",
            description: "test",
            params: &[],
            constructor: build,
        });
        assert!(registry.contains("always_in"));
        assert!(registry.create("always_in", &StrategyParams::new()).is_ok());
    }
}
