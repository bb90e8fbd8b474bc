//! Structured error types for the engine.
//!
//! The taxonomy matters more than the messages: configuration errors are
//! fatal at construction, data insufficiency is recovered locally by the
//! caller, resource constraints (cash) are reported to the engine which
//! skips the entry, and invalid state transitions signal a defect in the
//! orchestrating loop.

use crate::data::DataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Fatal: raised at `Position` construction.
    #[error("quantity must be positive")]
    InvalidQuantity,

    /// Fatal: raised at `Position` construction.
    #[error("entry price must be a positive finite number (got {0})")]
    InvalidPrice(f64),

    /// Fatal: invalid stop-loss parameters detected at engine construction.
    #[error("invalid stop-loss configuration: {0}")]
    InvalidStopConfig(String),

    /// Fatal: invalid engine parameters detected at construction.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Reported to the engine, which skips the entry rather than aborting.
    #[error("insufficient cash: required {required:.2}, available {available:.2}")]
    InsufficientCash { required: f64, available: f64 },

    /// Invalid state transition — a defect in the orchestrating loop.
    #[error("position for '{0}' is already closed")]
    AlreadyClosed(String),

    /// No open position for the symbol when one was expected.
    #[error("no open position for '{0}'")]
    NoSuchPosition(String),

    /// Recovered locally: the symbol-day is skipped.
    #[error("no bar data")]
    NoData,

    /// Recovered locally: the symbol-day is skipped.
    #[error("insufficient bars in range window {window}: found {found}, need at least 2")]
    InsufficientRangeData { window: String, found: usize },

    /// Collaborator failure, caught per symbol-day.
    #[error(transparent)]
    Data(#[from] DataError),
}
