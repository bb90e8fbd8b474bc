//! CSV-backed bar source.
//!
//! One `{symbol}.csv` minute file per symbol under a data directory, with
//! columns `timestamp,open,high,low,close,volume`. Empty price fields read
//! as NaN (a void bar, which the engine skips), empty volume as zero. Daily
//! bars are served by resampling the minute file.

use chrono::{NaiveDateTime, ParseError};
use orb_core::data::{BarSource, DataError, Interval};
use orb_core::domain::Bar;
use orb_core::indicators::atr::resample_to_daily;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<u64>,
}

impl CsvRow {
    fn into_bar(self) -> Result<Bar, ParseError> {
        let timestamp = NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)?;
        Ok(Bar {
            timestamp,
            open: self.open.unwrap_or(f64::NAN),
            high: self.high.unwrap_or(f64::NAN),
            low: self.low.unwrap_or(f64::NAN),
            close: self.close.unwrap_or(f64::NAN),
            volume: self.volume.unwrap_or(0),
        })
    }
}

/// Minute-bar files under one directory.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    dir: PathBuf,
}

impl CsvBarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load_symbol(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let path = self.dir.join(format!("{symbol}.csv"));
        if !path.exists() {
            return Err(DataError::Unavailable {
                symbol: symbol.to_string(),
            });
        }

        let mut reader =
            csv::Reader::from_path(&path).map_err(|err| DataError::FetchFailed {
                symbol: symbol.to_string(),
                message: err.to_string(),
            })?;

        let mut bars = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(|err| DataError::Malformed(err.to_string()))?;
            let bar = row
                .into_bar()
                .map_err(|err| DataError::Malformed(format!("bad timestamp: {err}")))?;
            bars.push(bar);
        }
        bars.sort_by_key(|b| b.timestamp);
        debug!(symbol, rows = bars.len(), path = %path.display(), "loaded csv");
        Ok(bars)
    }
}

impl BarSource for CsvBarSource {
    fn get_bars(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
    ) -> Result<Vec<Bar>, DataError> {
        let minute = self.load_symbol(symbol)?;
        let bars = match interval {
            Interval::Minute => minute,
            Interval::Daily => resample_to_daily(&minute),
        };
        Ok(bars
            .into_iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .collect())
    }
}
