//! Serializable run configuration.

use chrono::{NaiveDate, NaiveTime};
use orb_core::engine::{EngineConfig, SessionConfig};
use orb_core::filters::{
    IndexTrendFilter, MarketConditionFilter, NoFilter, OvernightFuturesFilter,
};
use orb_core::stops::StopLossConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Session time windows as they appear in the TOML file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTimes {
    pub range_start: NaiveTime,
    pub range_end: NaiveTime,
    pub entry_start: NaiveTime,
    pub entry_end: NaiveTime,
    pub force_exit: NaiveTime,
}

/// Optional pre-entry market filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterConfig {
    IndexTrend {
        index_symbol: String,
        threshold: f64,
    },
    OvernightFutures {
        primary_symbol: String,
        #[serde(default)]
        fallback_symbol: Option<String>,
        /// Negative fraction; an overnight move below it blocks the day.
        threshold: f64,
        reference_time: NaiveTime,
        session_open: NaiveTime,
    },
}

impl FilterConfig {
    pub fn build(&self) -> Box<dyn MarketConditionFilter> {
        match self {
            FilterConfig::IndexTrend {
                index_symbol,
                threshold,
            } => Box::new(IndexTrendFilter::new(index_symbol.clone(), *threshold)),
            FilterConfig::OvernightFutures {
                primary_symbol,
                fallback_symbol,
                threshold,
                reference_time,
                session_open,
            } => Box::new(OvernightFuturesFilter::new(
                primary_symbol.clone(),
                fallback_symbol.clone(),
                *threshold,
                *reference_time,
                *session_open,
            )),
        }
    }
}

/// Everything needed to reproduce a run. Two identical configs hash to the
/// same `RunId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub symbols: Vec<String>,
    /// Capital allocated to each symbol's isolated portfolio.
    pub capital_per_symbol: f64,
    #[serde(default)]
    pub commission_rate: f64,
    pub session: SessionTimes,
    pub profit_target: f64,
    pub stop_loss: StopLossConfig,
    #[serde(default)]
    pub filter: Option<FilterConfig>,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("symbol list is empty".to_string()));
        }
        if self.start_date > self.end_date {
            return Err(ConfigError::Invalid(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        self.engine_config()
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Per-symbol engine configuration derived from this run config.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            initial_capital: self.capital_per_symbol,
            commission_rate: self.commission_rate,
            session: SessionConfig {
                range_start: self.session.range_start,
                range_end: self.session.range_end,
                entry_start: self.session.entry_start,
                entry_end: self.session.entry_end,
                force_exit: self.session.force_exit,
            },
            profit_target: self.profit_target,
            stop_loss: self.stop_loss.clone(),
        }
    }

    pub fn build_filter(&self) -> Box<dyn MarketConditionFilter> {
        match &self.filter {
            Some(filter) => filter.build(),
            None => Box::new(NoFilter::default()),
        }
    }

    /// Deterministic hash of the config for artifact naming and dedup.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
start_date = "2024-01-09"
end_date = "2024-03-29"
symbols = ["7203.T", "9984.T"]
capital_per_symbol = 1000000.0
commission_rate = 0.0003
profit_target = 0.02

[session]
range_start = "09:00:00"
range_end = "09:15:00"
entry_start = "09:16:00"
entry_end = "11:00:00"
force_exit = "14:55:00"

[stop_loss]
mode = "fixed"
ratio = 0.01
"#;

    #[test]
    fn sample_toml_parses() {
        let config: RunConfig = toml::from_str(SAMPLE).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.symbols.len(), 2);
        assert_eq!(config.stop_loss, StopLossConfig::Fixed { ratio: 0.01 });
        assert!(config.filter.is_none());
        assert_eq!(
            config.session.force_exit,
            NaiveTime::from_hms_opt(14, 55, 0).unwrap()
        );
    }

    #[test]
    fn filter_section_parses() {
        let toml_text = format!(
            "{SAMPLE}\n[filter]\nkind = \"overnight_futures\"\nprimary_symbol = \"NKDc1\"\nfallback_symbol = \".N225\"\nthreshold = -0.01\nreference_time = \"16:30:00\"\nsession_open = \"09:00:00\"\n"
        );
        let config: RunConfig = toml::from_str(&toml_text).unwrap();
        assert!(matches!(
            config.filter,
            Some(FilterConfig::OvernightFutures { .. })
        ));
        let filter = config.build_filter();
        assert_eq!(filter.name(), "overnight_futures");
    }

    #[test]
    fn run_id_is_stable_and_config_sensitive() {
        let a: RunConfig = toml::from_str(SAMPLE).unwrap();
        let b: RunConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(a.run_id(), b.run_id());

        let mut c = a.clone();
        c.profit_target = 0.03;
        assert_ne!(a.run_id(), c.run_id());
    }

    #[test]
    fn empty_symbols_rejected() {
        let mut config: RunConfig = toml::from_str(SAMPLE).unwrap();
        config.symbols.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn inverted_dates_rejected() {
        let mut config: RunConfig = toml::from_str(SAMPLE).unwrap();
        std::mem::swap(&mut config.start_date, &mut config.end_date);
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_stop_config_rejected_at_load_semantics() {
        let mut config: RunConfig = toml::from_str(SAMPLE).unwrap();
        config.stop_loss = StopLossConfig::Fixed { ratio: 0.0 };
        assert!(config.validate().is_err());
    }
}
