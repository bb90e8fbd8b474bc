//! Stop-loss resolution.
//!
//! The stop mode is a closed, serde-tagged enum resolved once at engine
//! construction and again per entry into a concrete ratio. Every resolution
//! carries its provenance in `StopSource` so ATR fallbacks are observable in
//! the run result rather than silently absorbed.

use crate::error::EngineError;
use crate::indicators::VolatilityLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ratios per volatility bucket for the adaptive mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdaptiveTable {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub extreme: f64,
}

impl AdaptiveTable {
    pub fn ratio_for(&self, level: VolatilityLevel) -> f64 {
        match level {
            VolatilityLevel::Low => self.low,
            VolatilityLevel::Medium => self.medium,
            VolatilityLevel::High => self.high,
            VolatilityLevel::Extreme => self.extreme,
        }
    }
}

/// Stop-loss configuration, tagged by mode.
///
/// `ratio` values are fractions of entry price (0.01 = 1%). ATR modes work
/// from ATR expressed as a percentage of close.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StopLossConfig {
    Fixed {
        ratio: f64,
    },
    Atr {
        period: usize,
        multiplier: f64,
        min_ratio: f64,
        max_ratio: f64,
        /// Used when ATR cannot be computed for the entry.
        fallback_ratio: f64,
        #[serde(default)]
        symbol_multipliers: HashMap<String, f64>,
    },
    AtrAdaptive {
        period: usize,
        table: AdaptiveTable,
        min_ratio: f64,
        max_ratio: f64,
        fallback_ratio: f64,
        #[serde(default)]
        symbol_multipliers: HashMap<String, f64>,
    },
}

/// Where a resolved ratio came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopSource {
    Fixed,
    Atr { atr_pct: f64 },
    Adaptive { atr_pct: f64, level: String },
    /// ATR was unavailable; the fallback ratio was used.
    Fallback { reason: String },
}

/// A concrete per-entry stop decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopDecision {
    pub ratio: f64,
    pub source: StopSource,
}

impl StopDecision {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, StopSource::Fallback { .. })
    }
}

fn check_ratio(name: &str, value: f64) -> Result<(), EngineError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(EngineError::InvalidStopConfig(format!(
            "{name} must be a positive finite ratio (got {value})"
        )));
    }
    Ok(())
}

fn check_clamps(min_ratio: f64, max_ratio: f64) -> Result<(), EngineError> {
    check_ratio("min_ratio", min_ratio)?;
    check_ratio("max_ratio", max_ratio)?;
    if min_ratio > max_ratio {
        return Err(EngineError::InvalidStopConfig(format!(
            "min_ratio {min_ratio} exceeds max_ratio {max_ratio}"
        )));
    }
    Ok(())
}

impl StopLossConfig {
    /// Validate parameters. Called at engine construction; failures are
    /// fatal configuration errors.
    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            StopLossConfig::Fixed { ratio } => check_ratio("ratio", *ratio),
            StopLossConfig::Atr {
                period,
                multiplier,
                min_ratio,
                max_ratio,
                fallback_ratio,
                symbol_multipliers,
            } => {
                if *period == 0 {
                    return Err(EngineError::InvalidStopConfig(
                        "atr period must be positive".to_string(),
                    ));
                }
                check_ratio("multiplier", *multiplier)?;
                check_clamps(*min_ratio, *max_ratio)?;
                check_ratio("fallback_ratio", *fallback_ratio)?;
                for (symbol, m) in symbol_multipliers {
                    check_ratio(&format!("symbol multiplier for '{symbol}'"), *m)?;
                }
                Ok(())
            }
            StopLossConfig::AtrAdaptive {
                period,
                table,
                min_ratio,
                max_ratio,
                fallback_ratio,
                symbol_multipliers,
            } => {
                if *period == 0 {
                    return Err(EngineError::InvalidStopConfig(
                        "atr period must be positive".to_string(),
                    ));
                }
                check_ratio("table.low", table.low)?;
                check_ratio("table.medium", table.medium)?;
                check_ratio("table.high", table.high)?;
                check_ratio("table.extreme", table.extreme)?;
                check_clamps(*min_ratio, *max_ratio)?;
                check_ratio("fallback_ratio", *fallback_ratio)?;
                for (symbol, m) in symbol_multipliers {
                    check_ratio(&format!("symbol multiplier for '{symbol}'"), *m)?;
                }
                Ok(())
            }
        }
    }

    /// ATR period required by this mode, if any.
    pub fn atr_period(&self) -> Option<usize> {
        match self {
            StopLossConfig::Fixed { .. } => None,
            StopLossConfig::Atr { period, .. } | StopLossConfig::AtrAdaptive { period, .. } => {
                Some(*period)
            }
        }
    }

    /// Resolve the stop ratio for one entry.
    ///
    /// `atr_pct` is the symbol's latest ATR as a percentage of close, or
    /// `None` when unavailable. The resolved ratio is clamped, then scaled
    /// by the per-symbol multiplier override.
    pub fn resolve(&self, symbol: &str, atr_pct: Option<f64>) -> StopDecision {
        match self {
            StopLossConfig::Fixed { ratio } => StopDecision {
                ratio: *ratio,
                source: StopSource::Fixed,
            },
            StopLossConfig::Atr {
                multiplier,
                min_ratio,
                max_ratio,
                fallback_ratio,
                symbol_multipliers,
                ..
            } => match atr_pct {
                Some(pct) if pct.is_finite() && pct > 0.0 => {
                    let raw = (pct / 100.0) * multiplier;
                    let clamped = raw.clamp(*min_ratio, *max_ratio);
                    let scaled = clamped * symbol_multipliers.get(symbol).copied().unwrap_or(1.0);
                    StopDecision {
                        ratio: scaled,
                        source: StopSource::Atr { atr_pct: pct },
                    }
                }
                _ => StopDecision {
                    ratio: *fallback_ratio,
                    source: StopSource::Fallback {
                        reason: "atr unavailable".to_string(),
                    },
                },
            },
            StopLossConfig::AtrAdaptive {
                table,
                min_ratio,
                max_ratio,
                fallback_ratio,
                symbol_multipliers,
                ..
            } => match atr_pct {
                Some(pct) if pct.is_finite() && pct > 0.0 => {
                    let level = VolatilityLevel::from_atr_pct(pct);
                    let clamped = table.ratio_for(level).clamp(*min_ratio, *max_ratio);
                    let scaled = clamped * symbol_multipliers.get(symbol).copied().unwrap_or(1.0);
                    StopDecision {
                        ratio: scaled,
                        source: StopSource::Adaptive {
                            atr_pct: pct,
                            level: level.as_str().to_string(),
                        },
                    }
                }
                _ => StopDecision {
                    ratio: *fallback_ratio,
                    source: StopSource::Fallback {
                        reason: "atr unavailable".to_string(),
                    },
                },
            },
        }
    }
}
