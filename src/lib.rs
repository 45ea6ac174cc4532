//! Augur - a financial-instrument forecasting core.
//!
//! # Overview
//!
//! Augur takes a resolved ticker symbol and a date range, retrieves the
//! historical closing-price series, validates a baseline forecasting model
//! against held-out history, tunes a second model with sequential Bayesian
//! (TPE) hyperparameter search, and produces a forward-looking forecast
//! with uncertainty bands:
//!
//! - **Series handling**: date-ascending deduplicated price series with
//!   cached derived returns
//! - **Holdout evaluation**: chronological train/test split with
//!   date-aligned MAE/MSE/RMSE/R² scoring
//! - **Trend + seasonality regression**: piecewise-linear trend, Fourier
//!   seasonality, holiday effects, additive or multiplicative
//! - **Bayesian hyperparameter search**: failure-tolerant TPE loop over
//!   log-uniform prior scales
//! - **Pipeline orchestration**: strictly sequential state machine with
//!   partial-result reporting on failure
//!
//! The conversational layer, web API, and chart rendering are external
//! collaborators: they hand this core a symbol and two ISO dates and
//! consume back metrics, winning parameters, and renderable chart
//! payloads.
//!
//! # Quick Start
//!
//! ```no_run
//! use augur::{
//!     config::PipelineConfig,
//!     data::CsvSource,
//!     pipeline::ForecastPipeline,
//! };
//!
//! let source = CsvSource::new("data/");
//! let pipeline = ForecastPipeline::new(PipelineConfig::default());
//! let state = pipeline.run(&source, "TATAMOTORS", "2020-01-01", "2023-12-31");
//!
//! println!("{}", state.summary());
//! ```
//!
//! # Using the components directly
//!
//! ```no_run
//! use augur::{
//!     data::InMemorySource,
//!     forecaster::HyperparameterForecaster,
//!     holdout::HoldoutEvaluator,
//!     store::SeriesStore,
//! };
//!
//! let source = InMemorySource::new();
//! let mut store = SeriesStore::new(&source);
//! let series = store.fetch("ACME", "2020-01-01", "2023-12-31")?.clone();
//!
//! let mut evaluator = HoldoutEvaluator::new();
//! let metrics = evaluator.evaluate(&series, 0.2)?;
//!
//! let mut forecaster = HyperparameterForecaster::new(series).with_seed(42);
//! let best = forecaster.run(10)?;
//! let forecast = forecaster.forecast_next(365)?;
//! # Ok::<(), augur::error::ForecastError>(())
//! ```
//!
//! # Modules
//!
//! - [`types`]: core data types (Series, Metrics, Forecast, Hyperparams)
//! - [`data`]: price sources and CSV ingestion
//! - [`store`]: per-request series ownership and symbol resolution
//! - [`model`]: the trend + seasonality regression model
//! - [`holdout`]: holdout evaluation protocol
//! - [`optimize`]: search space, trial log, and TPE sampler
//! - [`forecaster`]: hyperparameter search plus forward forecasting
//! - [`pipeline`]: the sequential orchestration state machine
//! - [`config`]: TOML pipeline configuration

pub mod config;
pub mod data;
pub mod error;
pub mod forecaster;
pub mod holdout;
pub mod model;
pub mod optimize;
pub mod pipeline;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use data::{CsvOptions, CsvSource, InMemorySource, PriceSource};
pub use error::{ForecastError, Result};
pub use forecaster::HyperparameterForecaster;
pub use holdout::HoldoutEvaluator;
pub use model::{FittedModel, RegressionModel};
pub use optimize::{SearchSpace, TpeSampler, Trial, TrialLog, TrialStatus};
pub use pipeline::{ForecastPipeline, PipelineStage, PipelineState};
pub use store::SeriesStore;
pub use types::{
    ChartPoint, ChartSeries, Forecast, ForecastPoint, Hyperparams, Metrics, PricePoint,
    ReturnSeries, SeasonalityMode, Series, Split,
};
