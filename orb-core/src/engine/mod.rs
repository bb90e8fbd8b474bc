//! Walk-forward backtest engine.

pub mod config;
pub mod walk_forward;

pub use config::{EngineConfig, SessionConfig};
pub use walk_forward::{BacktestEngine, EquityPoint, RunResult, StopFallback};
