//! Trade simulator: the FLAT/LONG state machine.
//!
//! Walks the execution rows once. A LONG instruction while in cash converts the
//! whole balance into units at the row's open; a FLAT instruction while
//! invested liquidates everything at the open. Both sides pay a proportional
//! fee. Every other combination is a no-op. A position still open after the
//! last row is force-liquidated at that row's open.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{TargetPosition, Trade, TradeEvent, TradeEventKind};

use super::normalizer::ExecutionRow;
use super::EngineError;

/// Capital and cost settings for one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub initial_balance: f64,
    /// Proportional fee per side (0.001 = 0.1%).
    pub fee_pct: f64,
}

impl SimulationConfig {
    pub fn new(initial_balance: f64, fee_pct: f64) -> Self {
        Self {
            initial_balance,
            fee_pct,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "initial_balance must be > 0, got {}",
                self.initial_balance
            )));
        }
        if !(self.fee_pct.is_finite() && (0.0..1.0).contains(&self.fee_pct)) {
            return Err(EngineError::InvalidConfig(format!(
                "fee_pct must be in [0, 1), got {}",
                self.fee_pct
            )));
        }
        Ok(())
    }
}

/// What the account holds. Cash and units are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Holding {
    Cash { balance: f64 },
    /// `trade` indexes the open entry in the ledger.
    Asset { quantity: f64, trade: usize },
}

/// Everything the simulator produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub initial_balance: f64,
    /// Cash after the end-of-series liquidation.
    pub final_balance: f64,
    /// Initial capital followed by one mark-to-market value per row.
    pub equity_curve: Vec<f64>,
    /// Append-only trade ledger; every entry is closed.
    pub trades: Vec<Trade>,
    pub events: Vec<TradeEvent>,
    pub rows_processed: usize,
}

/// Incremental simulator. Feed rows in timestamp order, then [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimulationConfig,
    holding: Holding,
    equity_curve: Vec<f64>,
    trades: Vec<Trade>,
    events: Vec<TradeEvent>,
    last_row: Option<ExecutionRow>,
    rows_processed: usize,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            holding: Holding::Cash {
                balance: config.initial_balance,
            },
            equity_curve: vec![config.initial_balance],
            trades: Vec::new(),
            events: Vec::new(),
            last_row: None,
            rows_processed: 0,
        }
    }

    pub fn balance(&self) -> f64 {
        match self.holding {
            Holding::Cash { balance } => balance,
            Holding::Asset { .. } => 0.0,
        }
    }

    pub fn position_qty(&self) -> f64 {
        match self.holding {
            Holding::Cash { .. } => 0.0,
            Holding::Asset { quantity, .. } => quantity,
        }
    }

    pub fn equity_curve(&self) -> &[f64] {
        &self.equity_curve
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Process one execution row: apply any transition, then mark to market.
    pub fn on_row(&mut self, row: &ExecutionRow) {
        let row_index = self.rows_processed;
        match (row.effective_signal, self.holding) {
            (TargetPosition::Long, Holding::Cash { balance }) => {
                self.buy(row, row_index, balance);
            }
            (TargetPosition::Flat, Holding::Asset { quantity, trade }) => {
                self.sell(row, row_index, quantity, trade, false);
            }
            _ => {}
        }

        let equity = self.balance() + self.position_qty() * row.execution_price;
        self.equity_curve.push(equity);
        self.last_row = Some(row.clone());
        self.rows_processed += 1;
    }

    /// Liquidate any open position at the last row and return the output.
    pub fn finish(mut self) -> SimulationOutput {
        if let (Holding::Asset { quantity, trade }, Some(last)) = (self.holding, self.last_row.clone())
        {
            let last_index = self.rows_processed.saturating_sub(1);
            self.sell(&last, last_index, quantity, trade, true);
        }

        SimulationOutput {
            initial_balance: self.config.initial_balance,
            final_balance: self.balance(),
            equity_curve: self.equity_curve,
            trades: self.trades,
            events: self.events,
            rows_processed: self.rows_processed,
        }
    }

    fn buy(&mut self, row: &ExecutionRow, row_index: usize, balance: f64) {
        let price = row.execution_price;
        let fee = balance * self.config.fee_pct;
        let quantity = (balance - fee) / price;

        self.trades.push(Trade {
            entry_time: row.timestamp,
            entry_bar: row_index,
            entry_price: price,
            entry_fee: fee,
            quantity,
            balance_before_entry: balance,
            exit: None,
        });
        self.events.push(TradeEvent {
            timestamp: row.timestamp,
            kind: TradeEventKind::Buy,
            price,
            fee,
            balance,
            position_qty: quantity,
            forced: false,
        });
        self.holding = Holding::Asset {
            quantity,
            trade: self.trades.len() - 1,
        };

        debug!(time = %row.timestamp, price, quantity, fee, "BUY");
    }

    fn sell(&mut self, row: &ExecutionRow, row_index: usize, quantity: f64, trade: usize, forced: bool) {
        let price = row.execution_price;
        let gross = quantity * price;
        let fee = gross * self.config.fee_pct;
        let proceeds = gross - fee;

        // `trade` always indexes the open ledger entry pushed by `buy`.
        let open = self.trades[trade].clone();
        let basis = open.balance_before_entry;
        self.trades[trade] = open.close(row.timestamp, row_index, price, fee, proceeds, basis, forced);
        self.events.push(TradeEvent {
            timestamp: row.timestamp,
            kind: TradeEventKind::Sell,
            price,
            fee,
            balance: proceeds,
            position_qty: 0.0,
            forced,
        });
        self.holding = Holding::Cash { balance: proceeds };

        debug!(
            time = %row.timestamp,
            price,
            proceeds,
            pnl = proceeds - basis,
            forced,
            "SELL"
        );
    }
}

/// Run the simulator over a full set of rows.
///
/// Rows must be strictly increasing in time; an empty slice is
/// [`EngineError::InsufficientData`].
pub fn simulate(rows: &[ExecutionRow], config: &SimulationConfig) -> Result<SimulationOutput, EngineError> {
    config.validate()?;
    if rows.is_empty() {
        return Err(EngineError::InsufficientData(
            "no execution rows to simulate".into(),
        ));
    }
    for (index, pair) in rows.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(EngineError::UnorderedBars { index: index + 1 });
        }
    }

    let mut sim = Simulator::new(*config);
    for row in rows {
        sim.on_row(row);
    }
    Ok(sim.finish())
}
