//! Index-trend filter: restricts counter-trend entries on one-sided days.

use super::{DayVerdict, FilterStats, MarketConditionFilter};
use crate::data::BarSource;
use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Compares the index's latest close against the prior session's close.
/// A move beyond `+threshold` forbids shorts; beyond `-threshold` forbids
/// longs. Data trouble fails open.
#[derive(Debug, Clone)]
pub struct IndexTrendFilter {
    index_symbol: String,
    /// Trend threshold as a fraction (0.015 = 1.5%).
    threshold: f64,
    memo: HashMap<NaiveDate, DayVerdict>,
}

impl IndexTrendFilter {
    pub fn new(index_symbol: impl Into<String>, threshold: f64) -> Self {
        Self {
            index_symbol: index_symbol.into(),
            threshold,
            memo: HashMap::new(),
        }
    }

    /// Latest-vs-previous close change for the index, or `None` when the
    /// data cannot support the comparison.
    fn market_change(&self, date: NaiveDate, source: &dyn BarSource) -> Option<f64> {
        // A week back covers weekends and short holiday gaps.
        let start = date.checked_sub_days(Days::new(7))?;
        let bars = match source.get_daily_bars(&self.index_symbol, start, date) {
            Ok(bars) => bars,
            Err(err) => {
                warn!(index = %self.index_symbol, %date, %err, "index fetch failed");
                return None;
            }
        };
        if bars.len() < 2 {
            warn!(index = %self.index_symbol, %date, rows = bars.len(), "index history too short");
            return None;
        }
        let recent = bars[bars.len() - 1].close;
        let prev = bars[bars.len() - 2].close;
        if !recent.is_finite() || !prev.is_finite() || prev == 0.0 {
            return None;
        }
        Some((recent - prev) / prev)
    }

    fn judge(&self, date: NaiveDate, source: &dyn BarSource) -> DayVerdict {
        let Some(change) = self.market_change(date, source) else {
            return DayVerdict::allow_all("index data unavailable");
        };

        let pct = change * 100.0;
        if change > self.threshold {
            debug!(%date, change = pct, "strong uptrend, shorts blocked");
            DayVerdict {
                allow_long: true,
                allow_short: false,
                market_change: Some(change),
                reason: format!("strong uptrend ({pct:+.2}%)"),
            }
        } else if change < -self.threshold {
            debug!(%date, change = pct, "strong downtrend, longs blocked");
            DayVerdict {
                allow_long: false,
                allow_short: true,
                market_change: Some(change),
                reason: format!("strong downtrend ({pct:+.2}%)"),
            }
        } else {
            DayVerdict {
                allow_long: true,
                allow_short: true,
                market_change: Some(change),
                reason: format!("normal market ({pct:+.2}%)"),
            }
        }
    }
}

impl MarketConditionFilter for IndexTrendFilter {
    fn name(&self) -> &'static str {
        "index_trend"
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
