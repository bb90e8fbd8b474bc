//! ORB Core — the opening-range breakout backtesting engine.
//!
//! This crate contains the heart of the simulator:
//! - Domain types (bars, positions, portfolio, trade records)
//! - Opening-range computation and breakout detection
//! - ATR calculation and stop-loss resolution (fixed / ATR / ATR-adaptive)
//! - Market-condition filters (index trend, overnight futures)
//! - The day-by-day walk-forward loop
//! - Performance analysis over the accumulated trades

pub mod analysis;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod filters;
pub mod indicators;
pub mod range;
pub mod stops;

pub use error::EngineError;
