//! Data collaborator seam.
//!
//! The `BarSource` trait abstracts the market-data collaborator so the engine
//! can run against CSV files, a database-backed cache, or in-memory fixtures.
//! The engine treats fetches as idempotent and never assumes caching.

use crate::domain::Bar;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use thiserror::Error;

/// Bar granularity requested from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Minute,
    Daily,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute => "1min",
            Interval::Daily => "1d",
        }
    }
}

/// Structured errors on the data seam.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data available for symbol '{symbol}'")]
    Unavailable { symbol: String },

    #[error("fetch failed for '{symbol}': {message}")]
    FetchFailed { symbol: String, message: String },

    #[error("malformed bar data: {0}")]
    Malformed(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Market data collaborator.
///
/// Implementations return bars ordered by timestamp; an empty vector means
/// "no data in range" and is not an error.
pub trait BarSource {
    /// Fetch bars for `symbol` with timestamps in `[start, end]` inclusive.
    fn get_bars(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
    ) -> Result<Vec<Bar>, DataError>;

    /// Fetch daily bars for `[start, end]` inclusive. Used by the market and
    /// futures filters.
    fn get_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let start_dt = start.and_hms_opt(0, 0, 0).expect("midnight is valid");
        let end_dt = end.and_hms_opt(23, 59, 59).expect("valid time");
        self.get_bars(symbol, start_dt, end_dt, Interval::Daily)
    }
}

/// In-memory source backed by per-symbol bar vectors. Used by tests and by
/// callers that pre-load data themselves.
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    minute: HashMap<String, Vec<Bar>>,
    daily: HashMap<String, Vec<Bar>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_minute(&mut self, symbol: impl Into<String>, mut bars: Vec<Bar>) {
        bars.sort_by_key(|b| b.timestamp);
        self.minute.insert(symbol.into(), bars);
    }

    pub fn insert_daily(&mut self, symbol: impl Into<String>, mut bars: Vec<Bar>) {
        bars.sort_by_key(|b| b.timestamp);
        self.daily.insert(symbol.into(), bars);
    }
}

impl BarSource for InMemorySource {
    fn get_bars(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
    ) -> Result<Vec<Bar>, DataError> {
        let store = match interval {
            Interval::Minute => &self.minute,
            Interval::Daily => &self.daily,
        };
        let bars = store.get(symbol).ok_or_else(|| DataError::Unavailable {
            symbol: symbol.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(h: u32, m: u32, close: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 9)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100,
        }
    }

    #[test]
    fn in_memory_filters_inclusive_range() {
        let mut source = InMemorySource::new();
        source.insert_minute("7203.T", vec![bar(9, 0, 100.0), bar(9, 5, 101.0), bar(9, 10, 102.0)]);

        let start = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap().and_hms_opt(9, 5, 0).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap().and_hms_opt(9, 10, 0).unwrap();
        let bars = source.get_bars("7203.T", start, end, Interval::Minute).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 101.0);
    }

    #[test]
    fn unknown_symbol_is_unavailable() {
        let source = InMemorySource::new();
        let start = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let err = source.get_bars("MISSING", start, start, Interval::Minute);
        assert!(matches!(err, Err(DataError::Unavailable { .. })));
    }

    #[test]
    fn unsorted_inserts_come_back_ordered() {
        let mut source = InMemorySource::new();
        source.insert_minute("X", vec![bar(9, 10, 102.0), bar(9, 0, 100.0)]);
        let start = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap().and_hms_opt(23, 0, 0).unwrap();
        let bars = source.get_bars("X", start, end, Interval::Minute).unwrap();
        assert!(bars[0].timestamp < bars[1].timestamp);
    }
}
