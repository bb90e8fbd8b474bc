//! Universe orchestration: one isolated engine per symbol.

use crate::config::RunConfig;
use orb_core::data::BarSource;
use orb_core::engine::{BacktestEngine, RunResult};
use orb_core::filters::FilterStats;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("engine construction failed: {0}")]
    Engine(#[from] orb_core::EngineError),
}

/// One symbol's isolated backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRun {
    pub symbol: String,
    pub result: RunResult,
}

impl SymbolRun {
    pub fn pnl(&self) -> f64 {
        self.result.final_equity - self.result.initial_capital
    }

    pub fn is_winner(&self) -> bool {
        self.pnl() > 0.0
    }
}

/// Aggregate outcome across the whole symbol universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseResult {
    pub run_id: String,
    pub runs: Vec<SymbolRun>,
    pub total_pnl: f64,
    pub total_trades: usize,
    pub winning_symbols: usize,
    /// How often the market filter restricted or blocked days.
    pub filter_stats: FilterStats,
}

/// Run every symbol in the config against `source`.
///
/// Each symbol gets a fresh engine and portfolio so no cash or position
/// state bleeds between symbols. The market filter is shared: its per-date
/// verdicts apply to the whole universe and are computed once.
pub fn run_universe(
    config: &RunConfig,
    source: &dyn BarSource,
) -> Result<UniverseResult, RunnerError> {
    let run_id = config.run_id();
    let mut filter = config.build_filter();
    let mut runs = Vec::with_capacity(config.symbols.len());

    for symbol in &config.symbols {
        info!(%symbol, "starting symbol run");
        let engine = BacktestEngine::new(config.engine_config())?;
        let result = engine.run(
            std::slice::from_ref(symbol),
            config.start_date,
            config.end_date,
            source,
            filter.as_mut(),
        );
        runs.push(SymbolRun {
            symbol: symbol.clone(),
            result,
        });
    }

    let total_pnl = runs.iter().map(SymbolRun::pnl).sum();
    let total_trades = runs.iter().map(|r| r.result.trades.len()).sum();
    let winning_symbols = runs.iter().filter(|r| r.is_winner()).count();

    info!(
        run_id = %run_id,
        symbols = runs.len(),
        total_trades,
        total_pnl,
        "universe run complete"
    );

    Ok(UniverseResult {
        run_id,
        runs,
        total_pnl,
        total_trades,
        winning_symbols,
        filter_stats: filter.statistics(),
    })
}
