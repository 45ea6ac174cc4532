//! Hyperparameter-tuned long-horizon forecasting.

use crate::error::{ForecastError, Result};
use crate::model::{FittedModel, RegressionModel};
use crate::optimize::{SearchSpace, TpeSampler, Trial, TrialLog, TrialStatus};
use crate::types::{Forecast, Hyperparams, Metrics, Series};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

/// Default number of optimization trials for interactive use.
pub const DEFAULT_MAX_EVALS: usize = 10;
/// Default forward horizon in days.
pub const DEFAULT_HORIZON: usize = 365;
/// Tail comparison window of the optimization objective.
pub const DEFAULT_TAIL_WINDOW: usize = 30;

/// Finds regression hyperparameters minimizing held-out error on a series,
/// then produces a forward forecast with the winning configuration.
///
/// The objective deliberately reuses the tail of the training data: each
/// trial fits on the entire series and scores RMSE between the last
/// `tail_window` observed closes and the model's fitted values at those
/// same dates. This approximates generalization error more cheaply than a
/// true holdout; changing it would change the optimization landscape.
pub struct HyperparameterForecaster {
    series: Series,
    label: String,
    sampler: TpeSampler,
    rng: StdRng,
    tail_window: usize,
    trials: TrialLog,
    best: Option<Hyperparams>,
    fitted: Option<FittedModel>,
}

impl HyperparameterForecaster {
    pub fn new(series: Series) -> Self {
        Self {
            series,
            label: "series".to_string(),
            sampler: TpeSampler::default(),
            rng: StdRng::from_entropy(),
            tail_window: DEFAULT_TAIL_WINDOW,
            trials: TrialLog::new(),
            best: None,
            fitted: None,
        }
    }

    /// Label used in error and log messages (typically the symbol).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Seed the search for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.sampler = TpeSampler::new(space);
        self
    }

    pub fn with_tail_window(mut self, window: usize) -> Self {
        self.tail_window = window.max(1);
        self
    }

    /// The full trial history of the last `run`.
    pub fn trials(&self) -> &TrialLog {
        &self.trials
    }

    /// The winning configuration, once `run` has completed.
    pub fn best_params(&self) -> Option<&Hyperparams> {
        self.best.as_ref()
    }

    /// Run the fixed-budget TPE search and refit the winner on the full
    /// series.
    ///
    /// Fails with `NoData` when the series is empty before the search
    /// begins. A `FitFailure` inside a trial marks that trial infeasible
    /// and the search continues; only a search with zero feasible trials
    /// fails overall.
    pub fn run(&mut self, max_evals: usize) -> Result<Hyperparams> {
        if self.series.is_empty() {
            return Err(ForecastError::no_data(self.label.clone()));
        }
        info!(
            "starting hyperparameter search for '{}': {} trials over {} points",
            self.label,
            max_evals,
            self.series.len()
        );

        self.trials = TrialLog::new();
        self.best = None;
        self.fitted = None;

        for id in 0..max_evals {
            let params = self.sampler.suggest(&self.trials, &mut self.rng);
            match self.objective(&params) {
                Ok(loss) => {
                    debug!("trial {}: loss={:.6} [{}]", id, loss, params);
                    self.trials.push(Trial {
                        id,
                        params,
                        loss,
                        status: TrialStatus::Ok,
                    });
                }
                Err(ForecastError::FitFailure(reason)) => {
                    warn!("trial {} infeasible: {}", id, reason);
                    self.trials.push(Trial {
                        id,
                        params,
                        loss: f64::INFINITY,
                        status: TrialStatus::Failed,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let best = self
            .trials
            .best()
            .ok_or_else(|| {
                ForecastError::FitFailure(format!(
                    "all {} trials failed for '{}'",
                    max_evals, self.label
                ))
            })?
            .clone();
        info!(
            "search for '{}' done: best loss {:.6} at trial {} [{}]",
            self.label, best.loss, best.id, best.params
        );

        let fitted = RegressionModel::new(best.params).fit(&self.series)?;
        self.best = Some(best.params);
        self.fitted = Some(fitted);
        Ok(best.params)
    }

    /// Tail-window RMSE of one configuration.
    fn objective(&self, params: &Hyperparams) -> Result<f64> {
        let fitted = RegressionModel::new(*params).fit(&self.series)?;

        let window = self.tail_window.min(self.series.len());
        if window < self.tail_window {
            warn!(
                "'{}' has only {} points; shrinking comparison window from {}",
                self.label,
                self.series.len(),
                self.tail_window
            );
        }
        let tail = Series::new(self.series.tail(window).to_vec());
        let predicted = fitted.predict_at(&tail.dates());
        let metrics = Metrics::between(&tail, &predicted)?;
        Ok(metrics.rmse)
    }

    /// Forecast `periods` daily steps beyond the last observed date.
    ///
    /// Fails with `NotFitted` before a successful `run`.
    pub fn forecast_next(&self, periods: usize) -> Result<Forecast> {
        let fitted = self.fitted.as_ref().ok_or(ForecastError::NotFitted)?;
        Ok(fitted.forecast_horizon(periods))
    }
}
