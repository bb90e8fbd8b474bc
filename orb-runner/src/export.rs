//! Artifact export — trade tape and equity curves as CSV, the full result
//! set as JSON.

use std::path::Path;

use anyhow::{Context, Result};
use orb_core::domain::TradeRecord;
use orb_core::engine::EquityPoint;

use crate::runner::UniverseResult;

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade tape as CSV.
///
/// Columns: symbol, side, entry_time, exit_time, entry_price, exit_price,
/// quantity, pnl, commission, net_pnl, return_pct, reason
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "symbol",
        "side",
        "entry_time",
        "exit_time",
        "entry_price",
        "exit_price",
        "quantity",
        "pnl",
        "commission",
        "net_pnl",
        "return_pct",
        "reason",
    ])?;

    for trade in trades {
        wtr.write_record([
            trade.symbol.clone(),
            trade.side.as_str().to_string(),
            trade.entry_time.to_string(),
            trade.exit_time.to_string(),
            trade.entry_price.to_string(),
            trade.exit_price.to_string(),
            trade.quantity.to_string(),
            trade.pnl.to_string(),
            trade.commission.to_string(),
            trade.net_pnl.to_string(),
            trade.return_pct.to_string(),
            trade.reason.as_str().to_string(),
        ])?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

/// Daily equity curve as CSV with columns date, equity, cash, open_positions.
pub fn export_equity_csv(equity: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity", "cash", "open_positions"])?;
    for point in equity {
        wtr.write_record([
            point.date.to_string(),
            point.equity.to_string(),
            point.cash.to_string(),
            point.open_positions.to_string(),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

// ─── Artifact layout ────────────────────────────────────────────────

/// Write per-symbol trade/equity CSVs and a `result.json` under `out_dir`.
pub fn write_artifacts(out_dir: &Path, result: &UniverseResult) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    for run in &result.runs {
        let trades = export_trades_csv(&run.result.trades)?;
        std::fs::write(out_dir.join(format!("{}_trades.csv", run.symbol)), trades)?;

        let equity = export_equity_csv(&run.result.equity_curve)?;
        std::fs::write(out_dir.join(format!("{}_equity.csv", run.symbol)), equity)?;
    }

    let json =
        serde_json::to_string_pretty(result).context("failed to serialize universe result")?;
    std::fs::write(out_dir.join("result.json"), json)?;
    Ok(())
}
