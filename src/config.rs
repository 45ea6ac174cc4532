//! Configuration file support for the forecast pipeline.
//!
//! Allows loading pipeline settings from TOML files for reproducibility.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Pipeline settings, loadable from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fraction of the series withheld for the holdout evaluation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Trial budget of the hyperparameter search.
    #[serde(default = "default_max_evals")]
    pub max_evals: usize,
    /// Forward forecast horizon in days.
    #[serde(default = "default_horizon")]
    pub forecast_periods: usize,
    /// Tail comparison window of the optimization objective.
    #[serde(default = "default_tail_window")]
    pub tail_window: usize,
    /// Venue suffix appended on the single symbol-resolution retry.
    #[serde(default = "default_venue_suffix")]
    pub venue_suffix: String,
    /// Seed for the hyperparameter search; `None` draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_test_fraction() -> f64 {
    crate::holdout::DEFAULT_TEST_FRACTION
}

fn default_max_evals() -> usize {
    crate::forecaster::DEFAULT_MAX_EVALS
}

fn default_horizon() -> usize {
    crate::forecaster::DEFAULT_HORIZON
}

fn default_tail_window() -> usize {
    crate::forecaster::DEFAULT_TAIL_WINDOW
}

fn default_venue_suffix() -> String {
    crate::store::DEFAULT_VENUE_SUFFIX.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            max_evals: default_max_evals(),
            forecast_periods: default_horizon(),
            tail_window: default_tail_window(),
            venue_suffix: default_venue_suffix(),
            seed: None,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        info!("loaded pipeline config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate field ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ForecastError::ConfigError(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.max_evals == 0 {
            return Err(ForecastError::ConfigError(
                "max_evals must be at least 1".to_string(),
            ));
        }
        if self.forecast_periods == 0 {
            return Err(ForecastError::ConfigError(
                "forecast_periods must be at least 1".to_string(),
            ));
        }
        if self.tail_window == 0 {
            return Err(ForecastError::ConfigError(
                "tail_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!((config.test_fraction - 0.2).abs() < 1e-12);
        assert_eq!(config.max_evals, 10);
        assert_eq!(config.forecast_periods, 365);
        assert_eq!(config.tail_window, 30);
        assert_eq!(config.venue_suffix, ".NS");
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "max_evals = 50").unwrap();
        writeln!(file, "seed = 42").unwrap();
        drop(file);

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.max_evals, 50);
        assert_eq!(config.seed, Some(42));
        assert!((config.test_fraction - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        let config = PipelineConfig {
            test_fraction: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ForecastError::ConfigError(_)
        ));
    }
}
