//! Integration tests for the forecasting core.

use augur::config::PipelineConfig;
use augur::data::{CsvSource, InMemorySource};
use augur::forecaster::HyperparameterForecaster;
use augur::holdout::HoldoutEvaluator;
use augur::pipeline::{ForecastPipeline, PipelineStage};
use augur::store::SeriesStore;
use augur::types::{PricePoint, Series};
use chrono::{Duration, NaiveDate};
use std::io::Write;

const TRUE_BASE: f64 = 100.0;
const TRUE_SLOPE: f64 = 0.25;
const WEEKLY_AMP: f64 = 1.0;

/// Synthetic daily series: known linear trend plus weekly seasonality.
fn synthetic_points(days: usize) -> Vec<PricePoint> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    (0..days)
        .map(|i| {
            let weekly = WEEKLY_AMP * (2.0 * std::f64::consts::PI * (i % 7) as f64 / 7.0).sin();
            PricePoint::new(
                start + Duration::days(i as i64),
                TRUE_BASE + TRUE_SLOPE * i as f64 + weekly,
            )
        })
        .collect()
}

fn synthetic_series(days: usize) -> Series {
    Series::new(synthetic_points(days))
}

/// True trend value `i` days after the series start (seasonality averaged
/// out).
fn true_trend(i: usize) -> f64 {
    TRUE_BASE + TRUE_SLOPE * i as f64
}

#[test]
fn test_holdout_explains_trending_series() {
    let series = synthetic_series(500);
    let mut evaluator = HoldoutEvaluator::new();
    let metrics = evaluator.evaluate(&series, 0.2).unwrap();
    assert!(
        metrics.r2 > 0.8,
        "R2 {} below 0.8 on a clean trend + weekly seasonality",
        metrics.r2
    );
    assert!(evaluator.last_forecast().is_some());
}

#[test]
fn test_tuned_forecast_tracks_true_trend() {
    let series = synthetic_series(500);
    let mut forecaster = HyperparameterForecaster::new(series).with_seed(42);
    forecaster.run(10).unwrap();

    let forecast = forecaster.forecast_next(30).unwrap();
    assert_eq!(forecast.len(), 30);
    for (j, point) in forecast.points.iter().enumerate() {
        let expected = true_trend(500 + j);
        let rel = (point.yhat - expected).abs() / expected;
        assert!(
            rel < 0.10,
            "day +{}: forecast {:.2} deviates {:.1}% from trend {:.2}",
            j + 1,
            point.yhat,
            rel * 100.0,
            expected
        );
    }
}

#[test]
fn test_forecast_bands_widen_over_horizon() {
    let series = synthetic_series(400);
    let mut forecaster = HyperparameterForecaster::new(series).with_seed(11);
    forecaster.run(6).unwrap();
    let forecast = forecaster.forecast_next(90).unwrap();

    let widths: Vec<f64> = forecast.points.iter().map(|p| p.upper - p.lower).collect();
    for pair in widths.windows(2) {
        assert!(
            pair[1] > pair[0],
            "interval width must grow with horizon ({} then {})",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_store_resolution_and_cached_returns() {
    let source = InMemorySource::new()
        .with_history("TATAMOTORS.NS", synthetic_points(60))
        .with_history("PLAIN", synthetic_points(60));

    // Suffix retry promotes the effective symbol.
    let mut store = SeriesStore::new(&source);
    let series = store.fetch("TATAMOTORS", "2022-01-01", "2022-12-31").unwrap();
    assert!(!series.is_empty());
    assert_eq!(store.effective_symbol(), Some("TATAMOTORS.NS"));

    // Neither form known: NoData.
    let mut store = SeriesStore::new(&source);
    assert!(store.fetch("GHOST", "2022-01-01", "2022-12-31").is_err());

    // Bit-identical cached returns.
    let mut store = SeriesStore::new(&source);
    store.fetch("PLAIN", "2022-01-01", "2022-12-31").unwrap();
    let first = store.returns().unwrap().clone();
    let second = store.returns().unwrap().clone();
    assert_eq!(first, second);
}

#[test]
fn test_pipeline_end_to_end_over_synthetic_data() {
    let source = InMemorySource::new().with_history("ACME", synthetic_points(500));
    let config = PipelineConfig {
        max_evals: 10,
        forecast_periods: 30,
        seed: Some(42),
        ..Default::default()
    };
    let pipeline = ForecastPipeline::new(config);
    let state = pipeline.run(&source, "ACME", "2022-01-01", "2023-12-31");

    assert_eq!(state.stage, PipelineStage::Summarized);
    assert!(state.error.is_none());
    let metrics = state.metrics.unwrap();
    assert!(metrics.r2 > 0.8);
    assert!(state.best_params.is_some());

    let forecast_chart = &state.charts["forecast"];
    assert_eq!(forecast_chart.points.len(), 30);
    for point in &forecast_chart.points {
        let lower = point.lower.unwrap();
        let upper = point.upper.unwrap();
        assert!(lower <= point.value && point.value <= upper);
    }
}

#[test]
fn test_pipeline_from_csv_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("ACME.csv")).unwrap();
    writeln!(file, "Date,Close").unwrap();
    for p in synthetic_points(250) {
        writeln!(file, "{},{}", p.date.format("%Y-%m-%d"), p.close).unwrap();
    }
    drop(file);

    let source = CsvSource::new(dir.path());
    let config = PipelineConfig {
        max_evals: 5,
        forecast_periods: 15,
        seed: Some(3),
        ..Default::default()
    };
    let state = ForecastPipeline::new(config).run(&source, "acme", "2022-01-01", "2023-12-31");
    assert_eq!(state.stage, PipelineStage::Summarized);
    assert_eq!(state.symbol.as_deref(), Some("ACME"));
}

#[test]
fn test_pipeline_failure_is_data_not_panic() {
    let source = InMemorySource::new();
    let pipeline = ForecastPipeline::default();

    // Unknown symbol.
    let state = pipeline.run(&source, "NOPE", "2022-01-01", "2022-12-31");
    assert_eq!(state.stage, PipelineStage::Failed);
    assert!(state.error.is_some());

    // Inverted range.
    let state = pipeline.run(&source, "NOPE", "2022-12-31", "2022-01-01");
    assert_eq!(state.stage, PipelineStage::Failed);
    assert!(state.error.as_deref().unwrap().contains("precedes"));

    // The bundle still serializes for the report collaborator.
    assert!(serde_json::to_string(&state).is_ok());
}
