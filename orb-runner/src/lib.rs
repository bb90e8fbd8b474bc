//! Backtest orchestration on top of `orb-core`.
//!
//! This crate provides:
//! - TOML run configuration with content-addressed run IDs
//! - CSV-backed minute-bar loading
//! - Per-symbol universe runs with isolated portfolios
//! - CSV/JSON artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{ConfigError, FilterConfig, RunConfig};
pub use data_loader::CsvBarSource;
pub use runner::{run_universe, RunnerError, SymbolRun, UniverseResult};
