//! Domain types for flexbt

pub mod bar;
pub mod interval;
pub mod signal;
pub mod trade;

pub use bar::{validate_bars, Bar, BarError};
pub use interval::{Interval, ParseIntervalError};
pub use signal::{Signal, TargetPosition};
pub use trade::{Trade, TradeEvent, TradeEventKind, TradeExit};
