//! Engine configuration.

use crate::error::EngineError;
use crate::stops::StopLossConfig;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Time-of-day windows for one trading session. All times are exchange-local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Opening-range window, inclusive on both ends.
    pub range_start: NaiveTime,
    pub range_end: NaiveTime,
    /// Entry window: `[entry_start, entry_end)`.
    pub entry_start: NaiveTime,
    pub entry_end: NaiveTime,
    /// Open positions are closed at the first bar at or after this time.
    pub force_exit: NaiveTime,
}

impl SessionConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.range_start > self.range_end {
            return Err(EngineError::InvalidConfig(format!(
                "range window inverted: {} > {}",
                self.range_start, self.range_end
            )));
        }
        if self.entry_start >= self.entry_end {
            return Err(EngineError::InvalidConfig(format!(
                "entry window inverted: {} >= {}",
                self.entry_start, self.entry_end
            )));
        }
        Ok(())
    }
}

/// Full engine configuration. Validated once at engine construction;
/// invalid parameters are fatal, never silently corrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Commission rate applied to entry + exit notional.
    pub commission_rate: f64,
    pub session: SessionConfig,
    /// Profit target as a ratio of entry price.
    pub profit_target: f64,
    pub stop_loss: StopLossConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "initial_capital must be positive (got {})",
                self.initial_capital
            )));
        }
        if !(self.commission_rate.is_finite() && self.commission_rate >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "commission_rate must be non-negative (got {})",
                self.commission_rate
            )));
        }
        if !(self.profit_target.is_finite() && self.profit_target > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "profit_target must be positive (got {})",
                self.profit_target
            )));
        }
        self.session.validate()?;
        self.stop_loss.validate()
    }
}
