//! Average True Range from resampled daily bars.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR uses Wilder smoothing: the seed is the simple mean of the first
//! `period` true ranges, then `atr = (prev * (period - 1) + tr) / period`.
//! The result is reported as a percentage of that day's close, which is the
//! unit the stop-loss resolver works in.

use crate::domain::Bar;
use std::collections::HashMap;
use tracing::debug;

/// Outcome of an ATR computation.
///
/// Insufficient history is an expected condition, not an error, so it is a
/// tagged variant the caller can assert on rather than a silently substituted
/// sentinel. The engine falls back to its fixed stop ratio on `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AtrOutcome {
    /// Latest ATR as a percentage of that day's close.
    Available(f64),
    Unavailable { have: usize, need: usize },
}

impl AtrOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            AtrOutcome::Available(pct) => Some(*pct),
            AtrOutcome::Unavailable { .. } => None,
        }
    }
}

/// Volatility bucket derived from ATR%.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl VolatilityLevel {
    /// Bucket thresholds: low < 1.5%, medium < 2.5%, high < 4.0%, else extreme.
    pub fn from_atr_pct(atr_pct: f64) -> Self {
        if atr_pct < 1.5 {
            VolatilityLevel::Low
        } else if atr_pct < 2.5 {
            VolatilityLevel::Medium
        } else if atr_pct < 4.0 {
            VolatilityLevel::High
        } else {
            VolatilityLevel::Extreme
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolatilityLevel::Low => "low",
            VolatilityLevel::Medium => "medium",
            VolatilityLevel::High => "high",
            VolatilityLevel::Extreme => "extreme",
        }
    }
}

/// Resample minute bars into daily bars: open = first, high = max,
/// low = min, close = last, volume = sum. Void bars are skipped; days with
/// no valid bar are dropped.
pub fn resample_to_daily(bars: &[Bar]) -> Vec<Bar> {
    let mut daily: Vec<Bar> = Vec::new();

    for bar in bars {
        if bar.is_void() {
            continue;
        }
        let date = bar.timestamp.date();
        match daily.last_mut() {
            Some(last) if last.timestamp.date() == date => {
                last.high = last.high.max(bar.high);
                last.low = last.low.min(bar.low);
                last.close = bar.close;
                last.volume += bar.volume;
            }
            _ => {
                let mut day_bar = bar.clone();
                day_bar.timestamp = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
                daily.push(day_bar);
            }
        }
    }

    daily
}

/// True Range series over daily bars. TR[0] has no previous close, so it is
/// the plain high-low range of the first day.
pub fn true_range(daily: &[Bar]) -> Vec<f64> {
    let n = daily.len();
    let mut tr = vec![f64::NAN; n];
    if n > 0 {
        tr[0] = daily[0].high - daily[0].low;
    }
    for i in 1..n {
        let h = daily[i].high;
        let l = daily[i].low;
        let pc = daily[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            tr[i] = f64::NAN;
        } else {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }
    tr
}

/// Wilder-smoothed ATR series aligned with `daily`. Entries before the seed
/// are NaN.
pub fn wilder_atr(daily: &[Bar], period: usize) -> Vec<f64> {
    let tr = true_range(daily);
    let n = tr.len();
    let mut atr = vec![f64::NAN; n];

    // Seed window: the first `period` true ranges.
    if period == 0 || n < period {
        return atr;
    }
    let seed_window = &tr[..period];
    if seed_window.iter().any(|v| v.is_nan()) {
        return atr;
    }
    let seed = seed_window.iter().sum::<f64>() / period as f64;
    atr[period - 1] = seed;

    let mut prev = seed;
    for i in period..n {
        if tr[i].is_nan() {
            break;
        }
        prev = (prev * (period as f64 - 1.0) + tr[i]) / period as f64;
        atr[i] = prev;
    }
    atr
}

/// ATR calculator with a per-symbol cache of the last good value.
///
/// The cache covers gaps: when a later fetch comes back with too little
/// history the previous good reading is reused instead of dropping to the
/// fallback stop.
#[derive(Debug, Clone)]
pub struct AtrCalculator {
    period: usize,
    cache: HashMap<String, f64>,
}

impl AtrCalculator {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            cache: HashMap::new(),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Latest ATR% for `symbol`, computed from minute bars resampled to
    /// daily. Requires `period` daily bars.
    pub fn latest_pct(&mut self, symbol: &str, minute_bars: &[Bar]) -> AtrOutcome {
        let daily = resample_to_daily(minute_bars);
        let need = self.period;
        if daily.len() < need {
            if let Some(&cached) = self.cache.get(symbol) {
                debug!(symbol, cached, "ATR history short, reusing cached value");
                return AtrOutcome::Available(cached);
            }
            return AtrOutcome::Unavailable {
                have: daily.len(),
                need,
            };
        }

        let atr = wilder_atr(&daily, self.period);
        let latest = atr
            .iter()
            .zip(daily.iter())
            .rev()
            .find(|(a, d)| a.is_finite() && d.close.is_finite() && d.close > 0.0)
            .map(|(a, d)| (a / d.close) * 100.0);

        match latest {
            Some(pct) => {
                self.cache.insert(symbol.to_string(), pct);
                AtrOutcome::Available(pct)
            }
            None => match self.cache.get(symbol) {
                Some(&cached) => AtrOutcome::Available(cached),
                None => AtrOutcome::Unavailable {
                    have: daily.len(),
                    need,
                },
            },
        }
    }
}
