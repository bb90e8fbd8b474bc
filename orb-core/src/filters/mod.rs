//! Pre-entry market-condition filters.
//!
//! A filter is consulted once per calendar day and returns a `DayVerdict`
//! that says which entry directions are allowed. Filters are fail-open: when
//! reference data is missing or broken the day is allowed, with the reason
//! recorded on the verdict.

pub mod index_trend;
pub mod overnight_futures;

pub use index_trend::IndexTrendFilter;
pub use overnight_futures::OvernightFuturesFilter;

use crate::data::BarSource;
use crate::domain::Side;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-day entry permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayVerdict {
    pub allow_long: bool,
    pub allow_short: bool,
    /// Reference move that drove the verdict, when one was computed.
    pub market_change: Option<f64>,
    pub reason: String,
}

impl DayVerdict {
    pub fn allow_all(reason: impl Into<String>) -> Self {
        Self {
            allow_long: true,
            allow_short: true,
            market_change: None,
            reason: reason.into(),
        }
    }

    pub fn allows(&self, side: Side) -> bool {
        match side {
            Side::Long => self.allow_long,
            Side::Short => self.allow_short,
        }
    }
}

/// Decides whether entries are allowed on a given day.
///
/// `check` takes `&mut self` so implementations can memoize per date; the
/// engine calls it once per day but makes no promise beyond that.
pub trait MarketConditionFilter {
    fn name(&self) -> &'static str;

    fn check(&mut self, date: NaiveDate, source: &dyn BarSource) -> DayVerdict;

    /// Counts over all days this filter has judged.
    fn statistics(&self) -> FilterStats {
        FilterStats::default()
    }
}

/// Aggregate filter behavior over a run, for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub total_days: usize,
    pub long_restricted_days: usize,
    pub short_restricted_days: usize,
    pub both_allowed_days: usize,
}

impl FilterStats {
    pub(crate) fn from_verdicts<'a>(verdicts: impl Iterator<Item = &'a DayVerdict>) -> Self {
        let mut stats = FilterStats::default();
        for v in verdicts {
            stats.total_days += 1;
            if !v.allow_long {
                stats.long_restricted_days += 1;
            }
            if !v.allow_short {
                stats.short_restricted_days += 1;
            }
            if v.allow_long && v.allow_short {
                stats.both_allowed_days += 1;
            }
        }
        stats
    }
}

/// Pass-through filter: every day, both directions.
#[derive(Debug, Default, Clone)]
pub struct NoFilter {
    days_seen: usize,
}

impl MarketConditionFilter for NoFilter {
    fn name(&self) -> &'static str {
        "none"
    }

    fn check(&mut self, _date: NaiveDate, _source: &dyn BarSource) -> DayVerdict {
        self.days_seen += 1;
        DayVerdict::allow_all("filter disabled")
    }

    fn statistics(&self) -> FilterStats {
        FilterStats {
            total_days: self.days_seen,
            both_allowed_days: self.days_seen,
            ..FilterStats::default()
        }
    }
}
