//! Summary statistics over a completed run.
//!
//! Pure functions over the trade list and daily equity curve; nothing here
//! mutates engine state.

use crate::domain::{ExitReason, TradeRecord};
use crate::engine::EquityPoint;
use serde::{Deserialize, Serialize};

/// Headline performance numbers for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Sum of gross trade P&L over initial capital.
    pub total_return: f64,
    pub total_trades: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub win_rate: f64,
    /// Gross profit over gross loss; infinite when there are no losers.
    pub profit_factor: f64,
    pub max_drawdown: f64,
    /// Max drawdown as a fraction of the running equity peak.
    pub max_drawdown_pct: f64,
    /// Annualized from daily equity returns (×√252).
    pub sharpe_ratio: f64,
    pub avg_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Average win over the absolute average loss.
    pub risk_reward_ratio: f64,
    pub profit_target_exits: usize,
    pub stop_loss_exits: usize,
    pub intraday_force_exits: usize,
    pub day_end_exits: usize,
}

pub fn total_return(initial_capital: f64, trades: &[TradeRecord]) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    trades.iter().map(|t| t.pnl).sum::<f64>() / initial_capital
}

pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let gross_profit: f64 = trades.iter().map(|t| t.pnl).filter(|&p| p > 0.0).sum();
    let gross_loss: f64 = trades
        .iter()
        .map(|t| t.pnl)
        .filter(|&p| p < 0.0)
        .map(f64::abs)
        .sum();
    if gross_loss == 0.0 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}

/// Max drawdown as `(absolute, fraction_of_peak)` over the equity curve.
pub fn max_drawdown(equity: &[EquityPoint]) -> (f64, f64) {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0f64;
    let mut max_dd_pct = 0.0f64;
    for point in equity {
        peak = peak.max(point.equity);
        let dd = peak - point.equity;
        max_dd = max_dd.max(dd);
        if peak > 0.0 {
            max_dd_pct = max_dd_pct.max(dd / peak);
        }
    }
    (max_dd, max_dd_pct)
}

/// Annualized Sharpe ratio from the daily equity series. Zero when fewer
/// than two returns exist or returns never vary.
pub fn sharpe_ratio(equity: &[EquityPoint]) -> f64 {
    let returns: Vec<f64> = equity
        .windows(2)
        .filter(|w| w[0].equity != 0.0)
        .map(|w| (w[1].equity - w[0].equity) / w[0].equity)
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    if std == 0.0 {
        return 0.0;
    }
    (mean / std) * 252.0_f64.sqrt()
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl PerformanceSummary {
    pub fn compute(
        initial_capital: f64,
        trades: &[TradeRecord],
        equity: &[EquityPoint],
    ) -> Self {
        let win_count = trades.iter().filter(|t| t.is_winner()).count();
        let loss_count = trades.iter().filter(|t| t.pnl < 0.0).count();
        let (max_dd, max_dd_pct) = max_drawdown(equity);

        let avg_pnl = average(trades.iter().map(|t| t.pnl));
        let avg_win = average(trades.iter().map(|t| t.pnl).filter(|&p| p > 0.0));
        let avg_loss = average(trades.iter().map(|t| t.pnl).filter(|&p| p < 0.0));
        let risk_reward_ratio = if avg_loss == 0.0 {
            0.0
        } else {
            avg_win / avg_loss.abs()
        };

        let reason_count = |reason: ExitReason| trades.iter().filter(|t| t.reason == reason).count();

        Self {
            total_return: total_return(initial_capital, trades),
            total_trades: trades.len(),
            win_count,
            loss_count,
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            max_drawdown: max_dd,
            max_drawdown_pct: max_dd_pct,
            sharpe_ratio: sharpe_ratio(equity),
            avg_pnl,
            avg_win,
            avg_loss,
            risk_reward_ratio,
            profit_target_exits: reason_count(ExitReason::ProfitTarget),
            stop_loss_exits: reason_count(ExitReason::StopLoss),
            intraday_force_exits: reason_count(ExitReason::IntradayForce),
            day_end_exits: reason_count(ExitReason::DayEnd),
        }
    }
}
