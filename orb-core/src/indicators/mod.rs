//! Indicators used by the engine and filters.

pub mod atr;

pub use atr::{AtrCalculator, AtrOutcome, VolatilityLevel};

#[cfg(test)]
pub(crate) const DEFAULT_EPSILON: f64 = 1e-9;

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "expected {expected}, got {actual}"
    );
}
