//! End-to-end runs through config → engines → aggregate result.

use chrono::{NaiveDate, NaiveTime};
use orb_core::data::InMemorySource;
use orb_core::domain::{Bar, ExitReason};
use orb_core::stops::StopLossConfig;
use orb_runner::config::{FilterConfig, RunConfig, SessionTimes};
use orb_runner::run_universe;

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn bar(day: u32, h: u32, m: u32, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: date(day).and_hms_opt(h, m, 0).unwrap(),
        open: close,
        high,
        low,
        close,
        volume: 100,
    }
}

fn config(symbols: &[&str]) -> RunConfig {
    RunConfig {
        start_date: date(9),
        end_date: date(10),
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        capital_per_symbol: 1_000_000.0,
        commission_rate: 0.0,
        session: SessionTimes {
            range_start: t(9, 0),
            range_end: t(9, 15),
            entry_start: t(9, 16),
            entry_end: t(11, 0),
            force_exit: t(14, 55),
        },
        profit_target: 0.02,
        stop_loss: StopLossConfig::Fixed { ratio: 0.01 },
        filter: None,
    }
}

/// Opening range (1010, 998) followed by the given session bars.
fn day_bars(day: u32, rest: Vec<Bar>) -> Vec<Bar> {
    let mut bars = vec![
        bar(day, 9, 0, 1008.0, 998.0, 1005.0),
        bar(day, 9, 10, 1010.0, 1002.0, 1006.0),
        bar(day, 9, 15, 1007.0, 1000.0, 1004.0),
    ];
    bars.extend(rest);
    bars
}

#[test]
fn universe_run_produces_isolated_symbol_results() {
    let mut source = InMemorySource::new();
    // Winner: breakout long at 1000, profit target at 1020.
    let mut winner = day_bars(
        9,
        vec![
            bar(9, 9, 20, 1015.0, 1005.0, 1000.0),
            bar(9, 9, 40, 1022.0, 1015.0, 1020.0),
        ],
    );
    winner.extend(day_bars(10, vec![]));
    source.insert_minute("WIN.T", winner);

    // Loser: breakout long at 1000, stopped out at 990.
    let mut loser = day_bars(
        9,
        vec![
            bar(9, 9, 20, 1015.0, 1005.0, 1000.0),
            bar(9, 9, 40, 1002.0, 988.0, 990.0),
        ],
    );
    loser.extend(day_bars(10, vec![]));
    source.insert_minute("LOSE.T", loser);

    let result = run_universe(&config(&["WIN.T", "LOSE.T"]), &source).unwrap();

    assert_eq!(result.runs.len(), 2);
    assert_eq!(result.total_trades, 2);
    assert_eq!(result.winning_symbols, 1);

    let win = &result.runs[0];
    assert_eq!(win.result.trades[0].reason, ExitReason::ProfitTarget);
    assert!(win.pnl() > 0.0);

    let lose = &result.runs[1];
    assert_eq!(lose.result.trades[0].reason, ExitReason::StopLoss);
    assert!(lose.pnl() < 0.0);

    // Isolation: each run starts from the full per-symbol capital.
    assert_eq!(win.result.initial_capital, 1_000_000.0);
    assert_eq!(lose.result.initial_capital, 1_000_000.0);
}

#[test]
fn day_end_close_uses_last_observed_price() {
    let mut source = InMemorySource::new();
    let bars = day_bars(
        9,
        vec![
            bar(9, 9, 20, 1015.0, 1005.0, 1000.0),
            bar(9, 10, 0, 1008.0, 1002.0, 1005.0),
        ],
    );
    source.insert_minute("X.T", bars);

    let mut cfg = config(&["X.T"]);
    cfg.end_date = date(9);
    let result = run_universe(&cfg, &source).unwrap();

    let trade = &result.runs[0].result.trades[0];
    assert_eq!(trade.reason, ExitReason::DayEnd);
    assert_eq!(trade.exit_price, 1005.0);
    assert_eq!(trade.exit_time, date(9).and_hms_opt(14, 55, 0).unwrap());
}

#[test]
fn overnight_filter_fail_open_still_trades() {
    // Filter configured but its reference instrument has no data at all:
    // fail-open means the breakout still becomes a trade.
    let mut source = InMemorySource::new();
    let bars = day_bars(
        9,
        vec![
            bar(9, 9, 20, 1015.0, 1005.0, 1000.0),
            bar(9, 9, 40, 1022.0, 1015.0, 1020.0),
        ],
    );
    source.insert_minute("X.T", bars);

    let mut cfg = config(&["X.T"]);
    cfg.end_date = date(9);
    cfg.filter = Some(FilterConfig::OvernightFutures {
        primary_symbol: "NKDc1".to_string(),
        fallback_symbol: None,
        threshold: -0.01,
        reference_time: t(16, 30),
        session_open: t(9, 0),
    });
    let result = run_universe(&cfg, &source).unwrap();
    assert_eq!(result.total_trades, 1);
}

#[test]
fn overnight_filter_blocks_the_whole_day() {
    let mut source = InMemorySource::new();
    let bars = day_bars(
        9,
        vec![
            bar(9, 9, 20, 1015.0, 1005.0, 1000.0),
            bar(9, 9, 40, 1022.0, 1015.0, 1020.0),
        ],
    );
    source.insert_minute("X.T", bars);
    // Reference instrument down 2% overnight: Monday 16:30 vs Tuesday pre-open.
    source.insert_minute(
        "NKDc1",
        vec![bar(8, 16, 30, 36000.0, 36000.0, 36000.0), bar(9, 8, 55, 35280.0, 35280.0, 35280.0)],
    );

    let mut cfg = config(&["X.T"]);
    cfg.end_date = date(9);
    cfg.filter = Some(FilterConfig::OvernightFutures {
        primary_symbol: "NKDc1".to_string(),
        fallback_symbol: None,
        threshold: -0.01,
        reference_time: t(16, 30),
        session_open: t(9, 0),
    });
    let result = run_universe(&cfg, &source).unwrap();
    assert_eq!(result.total_trades, 0);
    assert_eq!(result.runs[0].result.final_equity, 1_000_000.0);
    assert_eq!(result.filter_stats.total_days, 1);
    assert_eq!(result.filter_stats.long_restricted_days, 1);
    assert_eq!(result.filter_stats.short_restricted_days, 1);
}

#[test]
fn missing_symbol_data_yields_an_empty_run() {
    let source = InMemorySource::new();
    let result = run_universe(&config(&["GHOST.T"]), &source).unwrap();
    assert_eq!(result.total_trades, 0);
    assert_eq!(result.runs[0].result.trading_days, 2);
    assert_eq!(result.total_pnl, 0.0);
}

#[test]
fn summary_reflects_trades() {
    let mut source = InMemorySource::new();
    let bars = day_bars(
        9,
        vec![
            bar(9, 9, 20, 1015.0, 1005.0, 1000.0),
            bar(9, 9, 40, 1022.0, 1015.0, 1020.0),
        ],
    );
    source.insert_minute("X.T", bars);

    let mut cfg = config(&["X.T"]);
    cfg.end_date = date(9);
    let result = run_universe(&cfg, &source).unwrap();
    let summary = &result.runs[0].result.summary;
    assert_eq!(summary.total_trades, 1);
    assert_eq!(summary.win_count, 1);
    assert_eq!(summary.profit_target_exits, 1);
    assert!(summary.profit_factor.is_infinite());
    assert!(summary.total_return > 0.0);
}
