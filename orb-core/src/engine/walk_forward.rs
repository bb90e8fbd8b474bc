//! The day-by-day simulation loop.
//!
//! Days run in strict chronological order (weekends skipped); within a day,
//! symbols run in caller order; within a symbol-day, bars run in time order.
//! Per-symbol failures are logged and skip only that symbol-day — a run
//! always terminates with a best-effort result set.

use crate::analysis::PerformanceSummary;
use crate::data::{BarSource, Interval};
use crate::domain::{Bar, ExitReason, Portfolio, Position, TradeRecord};
use crate::engine::config::EngineConfig;
use crate::error::EngineError;
use crate::filters::{DayVerdict, MarketConditionFilter};
use crate::indicators::AtrCalculator;
use crate::range::RangeDetector;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// End-of-day portfolio snapshot. Positions are all closed by day-end, so
/// equity is cash.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
    pub open_positions: usize,
}

/// An entry taken with the fixed fallback stop ratio. Recorded so trades
/// with degraded ATR coverage are visible in the output, not just the logs;
/// a fallback resolution whose entry never opens is not recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopFallback {
    pub symbol: String,
    pub date: NaiveDate,
    pub reason: String,
}

/// Everything a completed run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub trading_days: usize,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub stop_fallbacks: Vec<StopFallback>,
    pub summary: PerformanceSummary,
}

/// Owns one simulation: a portfolio, the range detector, and the ATR state
/// the stop resolver needs. Engines are single-use; callers wanting isolated
/// per-symbol runs build a fresh engine per symbol.
pub struct BacktestEngine {
    config: EngineConfig,
    detector: RangeDetector,
    portfolio: Portfolio,
    atr: Option<AtrCalculator>,
    /// ATR% per symbol-day, so one day's entries share a single computation.
    atr_memo: HashMap<(String, NaiveDate), Option<f64>>,
    /// Last observed close per symbol, cleared each day.
    last_prices: HashMap<String, f64>,
    trades: Vec<TradeRecord>,
    equity_curve: Vec<EquityPoint>,
    stop_fallbacks: Vec<StopFallback>,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let detector = RangeDetector::new(config.session.range_start, config.session.range_end);
        let atr = config.stop_loss.atr_period().map(AtrCalculator::new);
        let portfolio = Portfolio::new(config.initial_capital);
        Ok(Self {
            config,
            detector,
            portfolio,
            atr,
            atr_memo: HashMap::new(),
            last_prices: HashMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            stop_fallbacks: Vec::new(),
        })
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Run the simulation over `[start, end]` inclusive.
    pub fn run(
        mut self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        source: &dyn BarSource,
        filter: &mut dyn MarketConditionFilter,
    ) -> RunResult {
        let mut trading_days = 0usize;
        let mut date = start;

        while date <= end {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                date = match date.checked_add_days(Days::new(1)) {
                    Some(next) => next,
                    None => break,
                };
                continue;
            }

            debug!(%date, "processing day");
            self.last_prices.clear();

            let verdict = filter.check(date, source);
            if !(verdict.allow_long && verdict.allow_short) {
                info!(%date, reason = %verdict.reason, "filter restricted day");
            }

            for symbol in symbols {
                if let Err(err) = self.process_symbol_day(symbol, date, &verdict, source) {
                    warn!(%symbol, %date, %err, "symbol-day skipped");
                }
            }

            self.force_close_all(date);

            self.equity_curve.push(EquityPoint {
                date,
                equity: self.portfolio.cash,
                cash: self.portfolio.cash,
                open_positions: self.portfolio.open_count(),
            });

            trading_days += 1;
            date = match date.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => break,
            };
        }

        let summary = PerformanceSummary::compute(
            self.config.initial_capital,
            &self.trades,
            &self.equity_curve,
        );
        info!(
            trading_days,
            trades = self.trades.len(),
            final_equity = self.portfolio.cash,
            "run complete"
        );

        RunResult {
            initial_capital: self.config.initial_capital,
            final_equity: self.portfolio.cash,
            trading_days,
            trades: self.trades,
            equity_curve: self.equity_curve,
            stop_fallbacks: self.stop_fallbacks,
            summary,
        }
    }

    fn process_symbol_day(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        verdict: &DayVerdict,
        source: &dyn BarSource,
    ) -> Result<(), EngineError> {
        let session = self.config.session;
        let start = date.and_time(session.range_start);
        let end = date.and_time(session.force_exit);
        let bars = source.get_bars(symbol, start, end, Interval::Minute)?;

        if bars.is_empty() {
            debug!(%symbol, %date, "no bars");
            return Ok(());
        }

        let (range_high, range_low) = match self.detector.calculate_range(&bars) {
            Ok(range) => range,
            Err(err) => {
                debug!(%symbol, %date, %err, "range unavailable");
                return Ok(());
            }
        };

        self.scan_for_entry(symbol, date, &bars, range_high, range_low, verdict, source)?;
        self.monitor_position(symbol, &bars)?;

        // Last observed close, used by the day-end forced liquidation.
        if let Some(last) = bars.iter().rev().find(|b| !b.close.is_nan()) {
            self.last_prices.insert(symbol.to_string(), last.close);
        }
        Ok(())
    }

    /// Scan the entry window for the first breakout the verdict allows.
    #[allow(clippy::too_many_arguments)]
    fn scan_for_entry(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        bars: &[Bar],
        range_high: f64,
        range_low: f64,
        verdict: &DayVerdict,
        source: &dyn BarSource,
    ) -> Result<(), EngineError> {
        let session = self.config.session;
        let mut entry_made = false;

        for bar in bars {
            let t = bar.timestamp.time();
            if !(t >= session.entry_start && t < session.entry_end) {
                continue;
            }
            if entry_made || self.portfolio.has_position(symbol) {
                continue;
            }
            let Some(side) = self.detector.detect_breakout(bar, range_high, range_low) else {
                continue;
            };
            if !verdict.allows(side) {
                debug!(%symbol, %date, side = side.as_str(), reason = %verdict.reason, "breakout blocked");
                continue;
            }

            let entry_price = self.detector.entry_price(bar, side);
            let quantity = self
                .portfolio
                .position_size(entry_price, self.portfolio.open_count() + 1);
            if quantity == 0 {
                debug!(%symbol, %date, entry_price, "zero quantity, entry skipped");
                continue;
            }

            let stop = self.resolve_stop(symbol, date, source);
            let position = match Position::new(
                symbol,
                side,
                entry_price,
                quantity,
                bar.timestamp,
                Some(self.config.profit_target),
                Some(stop.ratio),
            ) {
                Ok(position) => position,
                Err(err) => {
                    warn!(%symbol, %date, %err, "entry rejected");
                    continue;
                }
            };

            match self.portfolio.add_position(position) {
                Ok(()) => {
                    if stop.is_fallback() {
                        self.stop_fallbacks.push(StopFallback {
                            symbol: symbol.to_string(),
                            date,
                            reason: "atr unavailable".to_string(),
                        });
                    }
                    info!(
                        %symbol,
                        side = side.as_str(),
                        entry_price,
                        quantity,
                        stop_ratio = stop.ratio,
                        time = %bar.timestamp,
                        "entry"
                    );
                    entry_made = true;
                }
                Err(EngineError::InsufficientCash {
                    required,
                    available,
                }) => {
                    warn!(%symbol, %date, required, available, "insufficient cash, entry skipped");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn resolve_stop(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        source: &dyn BarSource,
    ) -> crate::stops::StopDecision {
        let atr_pct = self.atr_pct_for(symbol, date, source);
        let decision = self.config.stop_loss.resolve(symbol, atr_pct);
        if decision.is_fallback() {
            warn!(%symbol, %date, ratio = decision.ratio, "stop fell back to fixed ratio");
        }
        decision
    }

    /// ATR% from history strictly before `date`, memoized per symbol-day.
    fn atr_pct_for(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        source: &dyn BarSource,
    ) -> Option<f64> {
        let period = self.atr.as_ref()?.period();

        let key = (symbol.to_string(), date);
        if let Some(&cached) = self.atr_memo.get(&key) {
            return cached;
        }

        // Twice the period in calendar days plus slack covers weekends.
        let lookback = period as u64 * 2 + 10;
        let pct = (|| {
            let start = date.checked_sub_days(Days::new(lookback))?.and_hms_opt(0, 0, 0)?;
            let end = date.checked_sub_days(Days::new(1))?.and_hms_opt(23, 59, 59)?;
            let bars = match source.get_bars(symbol, start, end, Interval::Minute) {
                Ok(bars) => bars,
                Err(err) => {
                    warn!(%symbol, %date, %err, "atr history fetch failed");
                    return None;
                }
            };
            self.atr
                .as_mut()
                .and_then(|calc| calc.latest_pct(symbol, &bars).value())
        })();

        self.atr_memo.insert(key, pct);
        pct
    }

    /// Check the symbol's open position against bars strictly after its
    /// entry bar; the first satisfied condition wins, in the order profit
    /// target, stop loss, forced-exit time.
    fn monitor_position(&mut self, symbol: &str, bars: &[Bar]) -> Result<(), EngineError> {
        let force_exit = self.config.session.force_exit;

        let decision = self.portfolio.position_for(symbol).and_then(|position| {
            for bar in bars {
                if bar.timestamp <= position.entry_time {
                    continue;
                }
                let price = bar.close;
                if price.is_nan() {
                    continue;
                }
                if position.should_exit_profit(price) {
                    return Some((price, bar.timestamp, ExitReason::ProfitTarget));
                }
                if position.should_exit_loss(price) {
                    return Some((price, bar.timestamp, ExitReason::StopLoss));
                }
                if bar.timestamp.time() >= force_exit {
                    return Some((price, bar.timestamp, ExitReason::IntradayForce));
                }
            }
            None
        });

        if let Some((price, time, reason)) = decision {
            self.close_and_record(symbol, price, time, reason)?;
        }
        Ok(())
    }

    /// Force-close anything still open at that symbol's last observed close
    /// (entry price when no close was seen), timestamped at the forced-exit
    /// time.
    fn force_close_all(&mut self, date: NaiveDate) {
        let open: Vec<String> = self
            .portfolio
            .open_positions()
            .iter()
            .map(|p| p.symbol.clone())
            .collect();
        if open.is_empty() {
            return;
        }
        info!(%date, count = open.len(), "day end, forcing positions closed");

        let exit_time = date.and_time(self.config.session.force_exit);
        for symbol in open {
            let exit_price = self
                .last_prices
                .get(&symbol)
                .copied()
                .or_else(|| self.portfolio.position_for(&symbol).map(|p| p.entry_price));
            let Some(exit_price) = exit_price else {
                continue;
            };
            if let Err(err) = self.close_and_record(&symbol, exit_price, exit_time, ExitReason::DayEnd)
            {
                warn!(%symbol, %date, %err, "forced close failed");
            }
        }
    }

    fn close_and_record(
        &mut self,
        symbol: &str,
        exit_price: f64,
        exit_time: chrono::NaiveDateTime,
        reason: ExitReason,
    ) -> Result<(), EngineError> {
        let position = self.portfolio.close_position(symbol, exit_price, exit_time)?;

        let entry_notional = position.notional();
        let exit_notional = exit_price * position.quantity as f64;
        let commission = self.config.commission_rate * (entry_notional + exit_notional);
        let record = TradeRecord::from_closed(position, commission, reason)
            .ok_or_else(|| EngineError::NoSuchPosition(symbol.to_string()))?;

        self.portfolio.apply_commission(commission);
        info!(
            %symbol,
            side = record.side.as_str(),
            exit_price,
            pnl = record.pnl,
            reason = reason.as_str(),
            "exit"
        );
        self.trades.push(record);
        Ok(())
    }
}
