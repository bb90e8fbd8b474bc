//! Overnight-futures filter: blocks the whole day after a bad overnight
//! session in a reference instrument.

use super::{DayVerdict, FilterStats, MarketConditionFilter};
use crate::data::{BarSource, DataError, Interval};
use crate::domain::Bar;
use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Compares the reference instrument's price at a fixed prior-session
/// timestamp against its last price before the local session opens. An
/// overnight move below `threshold` (a negative fraction) blocks all entries
/// for the day. A missing primary instrument falls back to a secondary one;
/// an incomplete price series fails open.
#[derive(Debug, Clone)]
pub struct OvernightFuturesFilter {
    primary_symbol: String,
    fallback_symbol: Option<String>,
    /// Negative fraction, e.g. -0.01 blocks after a -1% overnight move.
    threshold: f64,
    /// Time-of-day on the prior session the reference price is taken at.
    reference_time: NaiveTime,
    /// Local session open; the comparison price is the last bar before it.
    session_open: NaiveTime,
    memo: HashMap<NaiveDate, DayVerdict>,
}

/// Prior weekday; holidays are invisible here, data gaps fail open instead.
fn previous_session(date: NaiveDate) -> Option<NaiveDate> {
    let mut d = date.checked_sub_days(Days::new(1))?;
    while matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
        d = d.checked_sub_days(Days::new(1))?;
    }
    Some(d)
}

impl OvernightFuturesFilter {
    pub fn new(
        primary_symbol: impl Into<String>,
        fallback_symbol: Option<String>,
        threshold: f64,
        reference_time: NaiveTime,
        session_open: NaiveTime,
    ) -> Self {
        Self {
            primary_symbol: primary_symbol.into(),
            fallback_symbol,
            threshold,
            reference_time,
            session_open,
            memo: HashMap::new(),
        }
    }

    fn fetch_window(
        &self,
        symbol: &str,
        prev: NaiveDate,
        date: NaiveDate,
        source: &dyn BarSource,
    ) -> Result<Vec<Bar>, DataError> {
        let start = prev.and_time(self.reference_time);
        let end = date.and_time(self.session_open);
        source.get_bars(symbol, start, end, Interval::Minute)
    }

    /// Overnight change for one instrument, or `None` when the series cannot
    /// support the comparison.
    fn overnight_change(&self, bars: &[Bar], prev: NaiveDate, date: NaiveDate) -> Option<f64> {
        let session_open_dt = date.and_time(self.session_open);
        let reference = bars
            .iter()
            .find(|b| b.timestamp.date() == prev && b.timestamp.time() >= self.reference_time)
            .map(|b| b.close)?;
        let pre_open = bars
            .iter()
            .rev()
            .find(|b| b.timestamp < session_open_dt)
            .map(|b| b.close)?;
        if !reference.is_finite() || !pre_open.is_finite() || reference == 0.0 {
            return None;
        }
        Some((pre_open - reference) / reference)
    }

    fn judge(&self, date: NaiveDate, source: &dyn BarSource) -> DayVerdict {
        let Some(prev) = previous_session(date) else {
            return DayVerdict::allow_all("incomplete data");
        };

        let mut change = None;
        let mut used_symbol = self.primary_symbol.as_str();
        match self.fetch_window(&self.primary_symbol, prev, date, source) {
            Ok(bars) => change = self.overnight_change(&bars, prev, date),
            Err(err) => {
                warn!(symbol = %self.primary_symbol, %date, %err, "primary instrument fetch failed");
            }
        }

        if change.is_none() {
            if let Some(fallback) = &self.fallback_symbol {
                used_symbol = fallback.as_str();
                match self.fetch_window(fallback, prev, date, source) {
                    Ok(bars) => change = self.overnight_change(&bars, prev, date),
                    Err(err) => {
                        warn!(symbol = %fallback, %date, %err, "fallback instrument fetch failed");
                    }
                }
            }
        }

        let Some(change) = change else {
            warn!(%date, "overnight series incomplete, allowing entries");
            return DayVerdict::allow_all("incomplete data");
        };

        let pct = change * 100.0;
        if change < self.threshold {
            debug!(%date, symbol = used_symbol, change = pct, "overnight drop, day blocked");
            DayVerdict {
                allow_long: false,
                allow_short: false,
                market_change: Some(change),
                reason: format!("overnight drop in {used_symbol} ({pct:+.2}%)"),
            }
        } else {
            DayVerdict {
                allow_long: true,
                allow_short: true,
                market_change: Some(change),
                reason: format!("overnight move in {used_symbol} ({pct:+.2}%)"),
            }
        }
    }
}

impl MarketConditionFilter for OvernightFuturesFilter {
    fn name(&self) -> &'static str {
        "overnight_futures"
    }

    fn check(&mut self, date: NaiveDate, source: &dyn BarSource) -> DayVerdict {
        if let Some(cached) = self.memo.get(&date) {
            return cached.clone();
        }
        let verdict = self.judge(date, source);
        self.memo.insert(date, verdict.clone());
        verdict
    }

    fn statistics(&self) -> FilterStats {
        FilterStats::from_verdicts(self.memo.values())
    }
}
