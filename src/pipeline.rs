//! Sequential forecast pipeline and its per-request state.
//!
//! Stages run strictly in order; a failure at any stage transitions to the
//! absorbing `Failed` state and the remaining stages are skipped. Whatever
//! charts and metrics were produced before the failure stay in the state
//! so the consuming collaborator can render a partial report.

use crate::config::PipelineConfig;
use crate::data::PriceSource;
use crate::error::{ForecastError, Result};
use crate::forecaster::HyperparameterForecaster;
use crate::holdout::HoldoutEvaluator;
use crate::store::SeriesStore;
use crate::types::{ChartSeries, Hyperparams, Metrics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Pipeline progress. `Summarized` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Idle,
    InstrumentResolved,
    HistoricalComputed,
    HoldoutComputed,
    ForecastComputed,
    Summarized,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::InstrumentResolved => "instrument_resolved",
            PipelineStage::HistoricalComputed => "historical_computed",
            PipelineStage::HoldoutComputed => "holdout_computed",
            PipelineStage::ForecastComputed => "forecast_computed",
            PipelineStage::Summarized => "summarized",
            PipelineStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Mutable record threaded through one pipeline run.
///
/// Created once per request, mutated in place by each stage, and handed to
/// the external summarization collaborator as the result bundle. Nothing
/// persists across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// The symbol as requested, normalized.
    pub requested_symbol: String,
    /// The symbol history was actually resolved under.
    pub symbol: Option<String>,
    pub stage: PipelineStage,
    /// Holdout goodness-of-fit metrics.
    pub metrics: Option<Metrics>,
    /// Winning hyperparameters of the search.
    pub best_params: Option<Hyperparams>,
    /// Free-form progress/status line.
    pub status: String,
    /// Terminal error, present only in the `Failed` state.
    pub error: Option<String>,
    /// Named chart payloads accumulated so far.
    pub charts: BTreeMap<String, ChartSeries>,
}

impl PipelineState {
    fn new(requested_symbol: impl Into<String>) -> Self {
        Self {
            requested_symbol: requested_symbol.into(),
            symbol: None,
            stage: PipelineStage::Idle,
            metrics: None,
            best_params: None,
            status: "idle".to_string(),
            error: None,
            charts: BTreeMap::new(),
        }
    }

    /// Human-readable report of the run, covering a failure in place of a
    /// forecast when one occurred.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Forecast pipeline for {} [{}]\n",
            self.symbol.as_deref().unwrap_or(&self.requested_symbol),
            self.stage
        );
        if let Some(metrics) = &self.metrics {
            out.push_str(&format!("Holdout: {}\n", metrics));
        }
        if let Some(params) = &self.best_params {
            out.push_str(&format!("Best params: {}\n", params));
        }
        if !self.charts.is_empty() {
            let names: Vec<&str> = self.charts.keys().map(String::as_str).collect();
            out.push_str(&format!("Charts: {}\n", names.join(", ")));
        }
        match &self.error {
            Some(e) => out.push_str(&format!("Error: {}\n", e)),
            None => out.push_str(&format!("Status: {}\n", self.status)),
        }
        out
    }
}

/// Strictly sequential orchestrator:
/// resolve -> fetch -> holdout -> search + forecast -> summarize.
pub struct ForecastPipeline {
    config: PipelineConfig,
}

impl Default for ForecastPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl ForecastPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for one request.
    ///
    /// Never returns an error: stage failures are recorded as the terminal
    /// error string in the returned state, and everything computed before
    /// the failure is preserved for partial reporting.
    pub fn run(
        &self,
        source: &dyn PriceSource,
        symbol: &str,
        start: &str,
        end: &str,
    ) -> PipelineState {
        let mut state = PipelineState::new(symbol.trim().to_uppercase());
        if let Err(e) = self.advance(source, symbol, start, end, &mut state) {
            warn!("pipeline for '{}' failed at {}: {}", symbol, state.stage, e);
            state.error = Some(e.to_string());
            state.status = format!("failed during {}: {}", state.stage, e);
            state.stage = PipelineStage::Failed;
        }
        state
    }

    fn advance(
        &self,
        source: &dyn PriceSource,
        symbol: &str,
        start: &str,
        end: &str,
        state: &mut PipelineState,
    ) -> Result<()> {
        self.config.validate()?;

        // Resolve the instrument.
        let normalized = symbol.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(ForecastError::DataError("empty symbol".to_string()));
        }
        state.symbol = Some(normalized.clone());
        state.stage = PipelineStage::InstrumentResolved;
        state.status = format!("resolved instrument {}", normalized);

        // Fetch history.
        let mut store =
            SeriesStore::new(source).with_venue_suffix(self.config.venue_suffix.clone());
        let series = store.fetch(&normalized, start, end)?.clone();
        let effective = store
            .effective_symbol()
            .unwrap_or(normalized.as_str())
            .to_string();
        state.symbol = Some(effective.clone());
        state
            .charts
            .insert("history".to_string(), ChartSeries::from_series("history", &series));
        state.stage = PipelineStage::HistoricalComputed;
        state.status = format!("fetched {} observations for {}", series.len(), effective);

        // Holdout evaluation.
        let mut evaluator = HoldoutEvaluator::new();
        let metrics = evaluator.evaluate(&series, self.config.test_fraction)?;
        state.metrics = Some(metrics);
        if let Some(forecast) = evaluator.last_forecast() {
            state
                .charts
                .insert("holdout".to_string(), ChartSeries::from_forecast("holdout", forecast));
        }
        state.stage = PipelineStage::HoldoutComputed;
        state.status = format!("holdout {}", metrics);

        // Hyperparameter search and forward forecast.
        let mut forecaster = HyperparameterForecaster::new(series)
            .with_label(effective.clone())
            .with_tail_window(self.config.tail_window);
        if let Some(seed) = self.config.seed {
            forecaster = forecaster.with_seed(seed);
        }
        let best = forecaster.run(self.config.max_evals)?;
        let forecast = forecaster.forecast_next(self.config.forecast_periods)?;
        state.best_params = Some(best);
        state
            .charts
            .insert("forecast".to_string(), ChartSeries::from_forecast("forecast", &forecast));
        state.stage = PipelineStage::ForecastComputed;
        state.status = format!("forecast of {} periods computed", forecast.len());

        // Summarize.
        state.stage = PipelineStage::Summarized;
        state.status = format!(
            "{}: {}-day forecast ready (holdout {})",
            effective,
            self.config.forecast_periods,
            metrics
        );
        info!("{}", state.status);
        Ok(())
    }
}
