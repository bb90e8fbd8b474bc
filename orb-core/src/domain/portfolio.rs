//! Portfolio — cash plus open and closed positions.

use super::position::Position;
use crate::error::EngineError;
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Aggregate portfolio state for one backtest run.
///
/// Cash is debited by the full notional when a position opens and credited
/// with notional + realized P&L when it closes, so cash can never go negative
/// through position flow. Commission is debited separately by the engine.
///
/// Uniqueness of open positions per symbol is the engine's responsibility;
/// the portfolio only enforces the cash constraint.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub initial_capital: f64,
    pub cash: f64,
    pub total_commission: f64,
    open_positions: Vec<Position>,
    closed_positions: Vec<Position>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            total_commission: 0.0,
            open_positions: Vec::new(),
            closed_positions: Vec::new(),
        }
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.open_positions
    }

    /// Closed positions, ordered by close time.
    pub fn closed_positions(&self) -> &[Position] {
        &self.closed_positions
    }

    pub fn open_count(&self) -> usize {
        self.open_positions.len()
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.open_positions.iter().any(|p| p.symbol == symbol)
    }

    pub fn position_for(&self, symbol: &str) -> Option<&Position> {
        self.open_positions.iter().find(|p| p.symbol == symbol)
    }

    /// Reserve the position's notional and take ownership of it.
    pub fn add_position(&mut self, position: Position) -> Result<(), EngineError> {
        let required = position.notional();
        if required > self.cash {
            return Err(EngineError::InsufficientCash {
                required,
                available: self.cash,
            });
        }
        self.cash -= required;
        self.open_positions.push(position);
        Ok(())
    }

    /// Close the open position for `symbol`, crediting notional + realized
    /// P&L back to cash and moving it to the closed set.
    pub fn close_position(
        &mut self,
        symbol: &str,
        exit_price: f64,
        exit_time: NaiveDateTime,
    ) -> Result<&Position, EngineError> {
        let idx = self
            .open_positions
            .iter()
            .position(|p| p.symbol == symbol)
            .ok_or_else(|| EngineError::NoSuchPosition(symbol.to_string()))?;

        let mut position = self.open_positions.remove(idx);
        let pnl = position.close(exit_price, exit_time)?;
        self.cash += position.notional() + pnl;
        self.closed_positions.push(position);
        Ok(self.closed_positions.last().expect("just pushed"))
    }

    /// Debit trading costs. Tracked separately from position P&L.
    pub fn apply_commission(&mut self, amount: f64) {
        self.cash -= amount;
        self.total_commission += amount;
    }

    /// Even-split sizing: floor of `cash / num_positions / price`.
    pub fn position_size(&self, price: f64, num_positions: usize) -> u64 {
        if price <= 0.0 || !price.is_finite() || num_positions == 0 {
            return 0;
        }
        let capital_per_position = self.cash / num_positions as f64;
        (capital_per_position / price).floor() as u64
    }

    /// Cash plus the market value of open positions at `prices`.
    pub fn total_value(&self, prices: &HashMap<String, f64>) -> f64 {
        let open_value: f64 = self
            .open_positions
            .iter()
            .filter_map(|p| prices.get(&p.symbol).map(|&px| px * p.quantity as f64))
            .sum();
        self.cash + open_value
    }

    pub fn unrealized_pnl(&self, prices: &HashMap<String, f64>) -> f64 {
        self.open_positions
            .iter()
            .filter_map(|p| prices.get(&p.symbol).map(|&px| p.unrealized_pnl(px)))
            .sum()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.closed_positions
            .iter()
            .filter_map(|p| p.realized_pnl())
            .sum()
    }

    pub fn total_pnl(&self, prices: &HashMap<String, f64>) -> f64 {
        self.realized_pnl() + self.unrealized_pnl(prices)
    }

    /// Fraction of closed positions with positive realized P&L.
    pub fn win_rate(&self) -> f64 {
        if self.closed_positions.is_empty() {
            return 0.0;
        }
        let wins = self
            .closed_positions
            .iter()
            .filter(|p| p.realized_pnl().is_some_and(|pnl| pnl > 0.0))
            .count();
        wins as f64 / self.closed_positions.len() as f64
    }
}
