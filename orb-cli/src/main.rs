//! ORB CLI — run opening-range breakout backtests from a TOML config.
//!
//! Commands:
//! - `run` — execute a backtest over a CSV data directory and print the
//!   per-symbol and aggregate summary, optionally writing CSV/JSON artifacts

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orb_runner::export::write_artifacts;
use orb_runner::{run_universe, CsvBarSource, RunConfig, SymbolRun, UniverseResult};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orb", about = "Opening-range breakout backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to the TOML run configuration.
        #[arg(long)]
        config: PathBuf,

        /// Directory holding {symbol}.csv minute files.
        #[arg(long)]
        data: PathBuf,

        /// Output directory for trade/equity CSVs and result.json.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, data, out } => cmd_run(&config, &data, out.as_deref()),
    }
}

fn cmd_run(config_path: &std::path::Path, data_dir: &std::path::Path, out: Option<&std::path::Path>) -> Result<()> {
    let config = RunConfig::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let source = CsvBarSource::new(data_dir);

    let result = run_universe(&config, &source)?;
    print_summary(&config, &result);

    if let Some(out_dir) = out {
        write_artifacts(out_dir, &result)
            .with_context(|| format!("failed to write artifacts to {}", out_dir.display()))?;
        println!("\nartifacts written to {}", out_dir.display());
    }
    Ok(())
}

fn print_summary(config: &RunConfig, result: &UniverseResult) {
    println!("run id: {}", result.run_id);
    println!(
        "period: {} .. {}  ({} symbols)",
        config.start_date,
        config.end_date,
        result.runs.len()
    );
    println!();
    println!(
        "{:<12} {:>10} {:>8} {:>8} {:>12} {:>8}",
        "symbol", "pnl", "trades", "win%", "max dd", "sharpe"
    );
    for run in &result.runs {
        print_symbol_row(run);
    }
    println!();
    println!(
        "total pnl: {:+.0}  trades: {}  winning symbols: {}/{}",
        result.total_pnl,
        result.total_trades,
        result.winning_symbols,
        result.runs.len()
    );
}

fn print_symbol_row(run: &SymbolRun) {
    let summary = &run.result.summary;
    println!(
        "{:<12} {:>10.0} {:>8} {:>7.1}% {:>12.0} {:>8.2}",
        run.symbol,
        run.pnl(),
        summary.total_trades,
        summary.win_rate * 100.0,
        summary.max_drawdown,
        summary.sharpe_ratio
    );
}
