//! TradeRecord — an immutable snapshot written at each position close.

use super::position::{Position, Side};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    ProfitTarget,
    StopLoss,
    /// Time-of-day cutoff reached while monitoring bars.
    IntradayForce,
    /// Forced liquidation at end of the simulated day.
    DayEnd,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::ProfitTarget => "profit_target",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::IntradayForce => "intraday_force",
            ExitReason::DayEnd => "day_end",
        }
    }
}

/// A completed round-trip trade. This is the unit the performance analyzer
/// consumes; once written it is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: Side,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: u64,
    /// Gross P&L: the position's realized P&L, before commission.
    pub pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,
    /// Gross P&L as a fraction of entry notional.
    pub return_pct: f64,
    pub reason: ExitReason,
}

impl TradeRecord {
    /// Snapshot a just-closed position. Returns `None` if the position is
    /// still open (a defect in the caller, checked by the engine's tests).
    pub fn from_closed(position: &Position, commission: f64, reason: ExitReason) -> Option<Self> {
        let exit_price = position.exit_price()?;
        let exit_time = position.exit_time()?;
        let pnl = position.realized_pnl()?;
        let notional = position.notional();
        let return_pct = if notional > 0.0 { pnl / notional } else { 0.0 };
        Some(Self {
            symbol: position.symbol.clone(),
            side: position.side,
            entry_time: position.entry_time,
            exit_time,
            entry_price: position.entry_price,
            exit_price,
            quantity: position.quantity,
            pnl,
            commission,
            net_pnl: pnl - commission,
            return_pct,
            reason,
        })
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
