//! Trade ledger entries and the BUY/SELL event log.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A long round-trip: created on BUY, closed on SELL (or forced at series end).
///
/// Open trades carry `exit == None`. Closing never mutates an open trade in
/// place; [`Trade::close`] consumes it and returns the closed value, which the
/// simulator writes back at the same ledger index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_time: NaiveDateTime,
    /// Index into the execution rows.
    pub entry_bar: usize,
    pub entry_price: f64,
    pub entry_fee: f64,
    pub quantity: f64,
    /// Cash balance immediately before the BUY (fee not yet deducted).
    pub balance_before_entry: f64,

    // ── Exit ──
    pub exit: Option<TradeExit>,
}

/// Exit side of a closed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExit {
    pub exit_time: NaiveDateTime,
    pub exit_bar: usize,
    pub exit_price: f64,
    pub exit_fee: f64,
    /// Net proceeds credited to cash.
    pub balance_after_exit: f64,
    pub pnl: f64,
    /// `pnl / balance_before_entry`, as a fraction.
    pub return_pct: f64,
    pub duration_bars: usize,
    /// True when the position was liquidated by the end-of-series rule.
    pub forced: bool,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.exit.is_some()
    }

    pub fn pnl(&self) -> Option<f64> {
        self.exit.as_ref().map(|e| e.pnl)
    }

    pub fn return_pct(&self) -> Option<f64> {
        self.exit.as_ref().map(|e| e.return_pct)
    }

    pub fn duration_bars(&self) -> Option<usize> {
        self.exit.as_ref().map(|e| e.duration_bars)
    }

    pub fn exit_time(&self) -> Option<NaiveDateTime> {
        self.exit.as_ref().map(|e| e.exit_time)
    }

    pub fn is_winner(&self) -> bool {
        self.pnl().is_some_and(|p| p > 0.0)
    }

    /// Produce the closed version of this trade.
    ///
    /// `basis` is the denominator for the percentage return; callers pass the
    /// trade's own `balance_before_entry`.
    #[allow(clippy::too_many_arguments)]
    pub fn close(
        self,
        exit_time: NaiveDateTime,
        exit_bar: usize,
        exit_price: f64,
        exit_fee: f64,
        proceeds: f64,
        basis: f64,
        forced: bool,
    ) -> Self {
        let pnl = proceeds - basis;
        let return_pct = if basis != 0.0 { pnl / basis } else { 0.0 };
        let duration_bars = exit_bar.saturating_sub(self.entry_bar);
        Self {
            exit: Some(TradeExit {
                exit_time,
                exit_bar,
                exit_price,
                exit_fee,
                balance_after_exit: proceeds,
                pnl,
                return_pct,
                duration_bars,
                forced,
            }),
            ..self
        }
    }
}

/// Kind of a simulated fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeEventKind {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// One BUY or SELL fill, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub timestamp: NaiveDateTime,
    pub kind: TradeEventKind,
    pub price: f64,
    pub fee: f64,
    /// Cash balance: before the fill for BUY, after the fill for SELL.
    pub balance: f64,
    /// Units held after the fill.
    pub position_qty: f64,
    pub forced: bool,
}
