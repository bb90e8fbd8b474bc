//! Domain types: bars, positions, portfolio, trade records.

pub mod bar;
pub mod portfolio;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use portfolio::Portfolio;
pub use position::{Position, Side};
pub use trade::{ExitReason, TradeRecord};
