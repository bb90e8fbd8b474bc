//! Opening-range computation and breakout detection.

use crate::domain::{Bar, Side};
use crate::error::EngineError;
use chrono::NaiveTime;

/// Detects breakouts from the opening range.
///
/// The range is the high/low band over bars whose time-of-day falls within
/// `[range_start, range_end]` inclusive. A later bar breaking above the range
/// high is a long signal; below the range low, a short signal.
#[derive(Debug, Clone)]
pub struct RangeDetector {
    pub range_start: NaiveTime,
    pub range_end: NaiveTime,
}

impl RangeDetector {
    pub fn new(range_start: NaiveTime, range_end: NaiveTime) -> Self {
        Self {
            range_start,
            range_end,
        }
    }

    /// Compute `(range_high, range_low)` over the range window.
    ///
    /// Errors: `NoData` for an empty input; `InsufficientRangeData` when the
    /// window holds fewer than two bars or no finite high/low at all.
    pub fn calculate_range(&self, bars: &[Bar]) -> Result<(f64, f64), EngineError> {
        if bars.is_empty() {
            return Err(EngineError::NoData);
        }

        let window: Vec<&Bar> = bars
            .iter()
            .filter(|b| {
                let t = b.timestamp.time();
                t >= self.range_start && t <= self.range_end
            })
            .collect();

        if window.len() < 2 {
            return Err(EngineError::InsufficientRangeData {
                window: format!("{}-{}", self.range_start, self.range_end),
                found: window.len(),
            });
        }

        // NaN highs/lows are gaps, not signals; fold over the finite values.
        let range_high = window
            .iter()
            .map(|b| b.high)
            .filter(|h| h.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        let range_low = window
            .iter()
            .map(|b| b.low)
            .filter(|l| l.is_finite())
            .fold(f64::INFINITY, f64::min);

        if !range_high.is_finite() || !range_low.is_finite() {
            return Err(EngineError::InsufficientRangeData {
                window: format!("{}-{}", self.range_start, self.range_end),
                found: 0,
            });
        }

        Ok((range_high, range_low))
    }

    /// Classify a bar against the range.
    ///
    /// Long is checked first, so a bar that pierces both bounds reads as
    /// long. NaN high/low means no signal, never an error.
    pub fn detect_breakout(&self, bar: &Bar, range_high: f64, range_low: f64) -> Option<Side> {
        if bar.high.is_nan() || bar.low.is_nan() {
            return None;
        }
        if bar.high > range_high {
            return Some(Side::Long);
        }
        if bar.low < range_low {
            return Some(Side::Short);
        }
        None
    }

    /// Fill price for an entry: the confirming bar's close. Models a market
    /// order placed once the breakout bar completes, not the exact breakout
    /// price.
    pub fn entry_price(&self, bar: &Bar, _breakout: Side) -> f64 {
        bar.close
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn detector() -> RangeDetector {
        RangeDetector::new(
            NaiveTime::from_hms_opt(9, 5, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
        )
    }

    fn bar_at(h: u32, m: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 9)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 100,
        }
    }

    #[test]
    fn range_from_window_bars() {
        // Window highs 1008, 1010, 1007 / lows 998, 1002, 1000, plus bars
        // outside the window that must not count.
        let bars = vec![
            bar_at(9, 0, 1050.0, 990.0, 1000.0), // before window
            bar_at(9, 5, 1008.0, 998.0, 1005.0),
            bar_at(9, 10, 1010.0, 1002.0, 1006.0),
            bar_at(9, 15, 1007.0, 1000.0, 1004.0),
            bar_at(9, 20, 1060.0, 995.0, 1010.0), // after window
        ];
        let (high, low) = detector().calculate_range(&bars).unwrap();
        assert_eq!(high, 1010.0);
        assert_eq!(low, 998.0);
        assert!(low <= high);
    }

    #[test]
    fn window_boundaries_are_inclusive() {
        let bars = vec![
            bar_at(9, 5, 1008.0, 998.0, 1005.0),
            bar_at(9, 15, 1010.0, 1002.0, 1006.0),
        ];
        let (high, low) = detector().calculate_range(&bars).unwrap();
        assert_eq!((high, low), (1010.0, 998.0));
    }

    #[test]
    fn empty_input_is_no_data() {
        assert!(matches!(
            detector().calculate_range(&[]),
            Err(EngineError::NoData)
        ));
    }

    #[test]
    fn single_window_bar_is_insufficient() {
        let bars = vec![
            bar_at(9, 0, 1000.0, 990.0, 995.0),
            bar_at(9, 10, 1008.0, 998.0, 1005.0),
        ];
        assert!(matches!(
            detector().calculate_range(&bars),
            Err(EngineError::InsufficientRangeData { found: 1, .. })
        ));
    }

    #[test]
    fn all_nan_window_is_insufficient() {
        let bars = vec![
            bar_at(9, 5, f64::NAN, f64::NAN, f64::NAN),
            bar_at(9, 10, f64::NAN, f64::NAN, f64::NAN),
        ];
        assert!(detector().calculate_range(&bars).is_err());
    }

    #[test]
    fn breakout_long_at_confirming_close() {
        // Concrete scenario: range (1010, 998); a bar with high 1015 breaks
        // long and fills at its close, 1012.
        let d = detector();
        let bar = bar_at(9, 20, 1015.0, 1005.0, 1012.0);
        let side = d.detect_breakout(&bar, 1010.0, 998.0).unwrap();
        assert_eq!(side, Side::Long);
        assert_eq!(d.entry_price(&bar, side), 1012.0);
    }

    #[test]
    fn breakout_short_below_low() {
        let d = detector();
        let bar = bar_at(9, 20, 1005.0, 995.0, 996.0);
        assert_eq!(d.detect_breakout(&bar, 1010.0, 998.0), Some(Side::Short));
    }

    #[test]
    fn long_wins_when_both_bounds_pierced() {
        let d = detector();
        let bar = bar_at(9, 20, 1015.0, 995.0, 1000.0);
        assert_eq!(d.detect_breakout(&bar, 1010.0, 998.0), Some(Side::Long));
    }

    #[test]
    fn inside_bar_is_no_signal() {
        let d = detector();
        let bar = bar_at(9, 20, 1009.0, 999.0, 1004.0);
        assert_eq!(d.detect_breakout(&bar, 1010.0, 998.0), None);
    }

    #[test]
    fn nan_bar_is_no_signal() {
        let d = detector();
        let bar = bar_at(9, 20, f64::NAN, 999.0, 1004.0);
        assert_eq!(d.detect_breakout(&bar, 1010.0, 998.0), None);
    }

    #[test]
    fn touching_bounds_is_no_signal() {
        // Strict inequalities: equal to the bound is not a breakout.
        let d = detector();
        let bar = bar_at(9, 20, 1010.0, 998.0, 1004.0);
        assert_eq!(d.detect_breakout(&bar, 1010.0, 998.0), None);
    }
}
