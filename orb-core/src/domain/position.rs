//! Position — single-trade state machine: OPEN → CLOSED, terminal.

use crate::error::EngineError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }
}

/// A single open-to-closed trade.
///
/// Exit fields and `realized_pnl` stay `None` while the position is open and
/// are set exactly once by `close()`. A second `close()` is an error — it
/// signals a defect in the loop driving this position, not a market event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub quantity: u64,
    pub entry_time: NaiveDateTime,
    /// Profit target as a ratio of entry price (0.02 = +2%).
    pub profit_target: Option<f64>,
    /// Stop loss as a ratio of entry price (0.01 = -1%).
    pub stop_loss: Option<f64>,

    is_open: bool,
    exit_price: Option<f64>,
    exit_time: Option<NaiveDateTime>,
    realized_pnl: Option<f64>,
}

impl Position {
    pub fn new(
        symbol: impl Into<String>,
        side: Side,
        entry_price: f64,
        quantity: u64,
        entry_time: NaiveDateTime,
        profit_target: Option<f64>,
        stop_loss: Option<f64>,
    ) -> Result<Self, EngineError> {
        if quantity == 0 {
            return Err(EngineError::InvalidQuantity);
        }
        if !(entry_price.is_finite() && entry_price > 0.0) {
            return Err(EngineError::InvalidPrice(entry_price));
        }
        Ok(Self {
            symbol: symbol.into(),
            side,
            entry_price,
            quantity,
            entry_time,
            profit_target,
            stop_loss,
            is_open: true,
            exit_price: None,
            exit_time: None,
            realized_pnl: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn exit_price(&self) -> Option<f64> {
        self.exit_price
    }

    pub fn exit_time(&self) -> Option<NaiveDateTime> {
        self.exit_time
    }

    /// Realized P&L; `None` while the position is open.
    pub fn realized_pnl(&self) -> Option<f64> {
        self.realized_pnl
    }

    /// Capital reserved by this position: entry price times quantity.
    pub fn notional(&self) -> f64 {
        self.entry_price * self.quantity as f64
    }

    /// Mark-to-market P&L at `price`.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.side {
            Side::Long => (price - self.entry_price) * self.quantity as f64,
            Side::Short => (self.entry_price - price) * self.quantity as f64,
        }
    }

    /// True when `price` has reached the profit target.
    ///
    /// The target is an absolute price derived from the entry, compared with
    /// `>=` / `<=` so an exact touch triggers.
    pub fn should_exit_profit(&self, price: f64) -> bool {
        let Some(target) = self.profit_target else {
            return false;
        };
        match self.side {
            Side::Long => price >= self.entry_price * (1.0 + target),
            Side::Short => price <= self.entry_price * (1.0 - target),
        }
    }

    /// True when `price` has reached the stop-loss line.
    pub fn should_exit_loss(&self, price: f64) -> bool {
        let Some(stop) = self.stop_loss else {
            return false;
        };
        match self.side {
            Side::Long => price <= self.entry_price * (1.0 - stop),
            Side::Short => price >= self.entry_price * (1.0 + stop),
        }
    }

    /// Close the position, setting exit fields and realized P&L exactly once.
    pub fn close(&mut self, exit_price: f64, exit_time: NaiveDateTime) -> Result<f64, EngineError> {
        if !self.is_open {
            return Err(EngineError::AlreadyClosed(self.symbol.clone()));
        }
        self.is_open = false;
        self.exit_price = Some(exit_price);
        self.exit_time = Some(exit_time);
        let pnl = self.unrealized_pnl(exit_price);
        self.realized_pnl = Some(pnl);
        Ok(pnl)
    }

    /// Holding time; `None` while open.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.exit_time.map(|t| t - self.entry_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn t(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn long_position(entry: f64) -> Position {
        Position::new("7203.T", Side::Long, entry, 100, t(9, 20), Some(0.02), Some(0.01)).unwrap()
    }

    #[test]
    fn construction_rejects_zero_quantity() {
        let err = Position::new("7203.T", Side::Long, 1000.0, 0, t(9, 20), None, None);
        assert!(matches!(err, Err(EngineError::InvalidQuantity)));
    }

    #[test]
    fn construction_rejects_nonpositive_price() {
        assert!(Position::new("7203.T", Side::Long, 0.0, 10, t(9, 20), None, None).is_err());
        assert!(Position::new("7203.T", Side::Long, -5.0, 10, t(9, 20), None, None).is_err());
        assert!(Position::new("7203.T", Side::Long, f64::NAN, 10, t(9, 20), None, None).is_err());
    }

    #[test]
    fn unrealized_pnl_by_side() {
        let long = long_position(1000.0);
        assert_eq!(long.unrealized_pnl(1010.0), 1000.0);
        assert_eq!(long.unrealized_pnl(990.0), -1000.0);

        let short =
            Position::new("7203.T", Side::Short, 1000.0, 100, t(9, 20), None, None).unwrap();
        assert_eq!(short.unrealized_pnl(990.0), 1000.0);
        assert_eq!(short.unrealized_pnl(1010.0), -1000.0);
    }

    #[test]
    fn profit_exit_triggers_exactly_at_target() {
        // Entry 1000, target 2% → exits at 1020, not 1019.99.
        let pos = long_position(1000.0);
        assert!(!pos.should_exit_profit(1019.99));
        assert!(pos.should_exit_profit(1020.0));
        assert!(pos.should_exit_profit(1025.0));
    }

    #[test]
    fn loss_exit_triggers_at_stop() {
        let pos = long_position(1000.0);
        assert!(!pos.should_exit_loss(990.01));
        assert!(pos.should_exit_loss(990.0));
        assert!(pos.should_exit_loss(985.0));
    }

    #[test]
    fn short_exit_checks_are_mirrored() {
        let pos = Position::new(
            "7203.T",
            Side::Short,
            1000.0,
            100,
            t(9, 20),
            Some(0.02),
            Some(0.01),
        )
        .unwrap();
        assert!(pos.should_exit_profit(980.0));
        assert!(!pos.should_exit_profit(980.01));
        assert!(pos.should_exit_loss(1010.0));
        assert!(!pos.should_exit_loss(1009.99));
    }

    #[test]
    fn missing_ratios_never_trigger() {
        let pos = Position::new("7203.T", Side::Long, 1000.0, 100, t(9, 20), None, None).unwrap();
        assert!(!pos.should_exit_profit(2000.0));
        assert!(!pos.should_exit_loss(1.0));
    }

    #[test]
    fn close_sets_exit_fields_once() {
        let mut pos = long_position(1000.0);
        assert!(pos.realized_pnl().is_none());
        assert!(pos.exit_price().is_none());

        let pnl = pos.close(1020.0, t(10, 0)).unwrap();
        assert_eq!(pnl, 2000.0);
        assert!(!pos.is_open());
        assert_eq!(pos.exit_price(), Some(1020.0));
        assert_eq!(pos.realized_pnl(), Some(2000.0));
        // Realized P&L equals the unrealized formula evaluated at exit.
        assert_eq!(pos.realized_pnl().unwrap(), pos.unrealized_pnl(1020.0));
    }

    #[test]
    fn double_close_fails() {
        let mut pos = long_position(1000.0);
        pos.close(1020.0, t(10, 0)).unwrap();
        let err = pos.close(1030.0, t(10, 5));
        assert!(matches!(err, Err(EngineError::AlreadyClosed(_))));
        // First close's fields are untouched.
        assert_eq!(pos.exit_price(), Some(1020.0));
    }

    proptest! {
        /// For any sampled entry/exit pair, a closed position's realized P&L
        /// follows the side-signed price difference times quantity.
        #[test]
        fn realized_pnl_roundtrip(
            entry in 1.0f64..10_000.0,
            exit in 1.0f64..10_000.0,
            qty in 1u64..10_000,
            long in proptest::bool::ANY,
        ) {
            let side = if long { Side::Long } else { Side::Short };
            let mut pos =
                Position::new("X", side, entry, qty, t(9, 20), None, None).unwrap();
            let pnl = pos.close(exit, t(10, 0)).unwrap();
            let expected = match side {
                Side::Long => (exit - entry) * qty as f64,
                Side::Short => (entry - exit) * qty as f64,
            };
            prop_assert!((pnl - expected).abs() < 1e-9 * entry.max(exit) * qty as f64 + 1e-12);
        }
    }
}
