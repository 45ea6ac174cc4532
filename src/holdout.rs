//! Holdout evaluation of the baseline regression model.

use crate::error::Result;
use crate::model::{FittedModel, RegressionModel};
use crate::types::{Forecast, Hyperparams, Metrics, Series};
use tracing::{debug, info};

/// Default fraction of the series withheld for testing.
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Splits a series chronologically, fits a baseline model on the training
/// prefix, and scores it against the held-out suffix.
///
/// The fitted model and its holdout forecast are retained on the evaluator
/// for later visualization.
pub struct HoldoutEvaluator {
    params: Hyperparams,
    fitted: Option<FittedModel>,
    forecast: Option<Forecast>,
}

impl Default for HoldoutEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl HoldoutEvaluator {
    /// Evaluator with the baseline (default) hyperparameters.
    pub fn new() -> Self {
        Self {
            params: Hyperparams::default(),
            fitted: None,
            forecast: None,
        }
    }

    /// Evaluator with explicit hyperparameters.
    pub fn with_params(params: Hyperparams) -> Self {
        Self {
            params,
            fitted: None,
            forecast: None,
        }
    }

    /// Split, fit on the training prefix, predict exactly at the test
    /// dates, and compare by date alignment.
    ///
    /// Fails with `InsufficientData` unless both partitions keep at least
    /// 2 points.
    pub fn evaluate(&mut self, series: &Series, test_fraction: f64) -> Result<Metrics> {
        let split = series.split(test_fraction)?;
        debug!(
            "holdout split: {} train / {} test",
            split.train.len(),
            split.test.len()
        );

        let fitted = RegressionModel::new(self.params).fit(&split.train)?;
        // Prediction is pinned to the test dates; no extrapolation beyond
        // the holdout horizon.
        let forecast = fitted.predict_at(&split.test.dates());
        let metrics = Metrics::between(&split.test, &forecast)?;
        info!("holdout evaluation: {}", metrics);

        self.fitted = Some(fitted);
        self.forecast = Some(forecast);
        Ok(metrics)
    }

    /// The holdout forecast from the last `evaluate` call, or `None`
    /// before any evaluation has run.
    pub fn last_forecast(&self) -> Option<&Forecast> {
        self.forecast.as_ref()
    }

    /// The fitted baseline model from the last `evaluate` call.
    pub fn fitted_model(&self) -> Option<&FittedModel> {
        self.fitted.as_ref()
    }
}
