//! Core data types for the forecasting core.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single (date, closing price) observation.
///
/// Dates are `NaiveDate` throughout the core: any source timezone is
/// stripped at ingestion and never carried downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// An ordered, date-ascending, deduplicated closing-price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    points: Vec<PricePoint>,
}

impl Series {
    /// Build a series from raw observations.
    ///
    /// Points are sorted by date; on duplicate dates the last observation
    /// wins (matching the behavior of re-downloaded daily data).
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by(|next, prev| {
            if next.date == prev.date {
                prev.close = next.close;
                true
            } else {
                false
            }
        });
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// All dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// All closing prices, date order.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// The last `n` observations (or all of them when the series is shorter).
    pub fn tail(&self, n: usize) -> &[PricePoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    /// Split chronologically at `floor(len * (1 - test_fraction))`.
    ///
    /// Requires at least 2 points on each side of the boundary.
    pub fn split(&self, test_fraction: f64) -> Result<Split> {
        if !(0.0..1.0).contains(&test_fraction) || test_fraction <= 0.0 {
            return Err(ForecastError::ConfigError(format!(
                "test_fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }
        let boundary = ((self.points.len() as f64) * (1.0 - test_fraction)).floor() as usize;
        let test_len = self.points.len() - boundary;
        if boundary < 2 || test_len < 2 {
            return Err(ForecastError::InsufficientData(format!(
                "split of {} points at fraction {} leaves {} train / {} test (need >= 2 each)",
                self.points.len(),
                test_fraction,
                boundary,
                test_len
            )));
        }
        Ok(Split {
            train: Series {
                points: self.points[..boundary].to_vec(),
            },
            test: Series {
                points: self.points[boundary..].to_vec(),
            },
        })
    }
}

/// A chronological train/test partition of a [`Series`].
///
/// Invariant: `max(train.dates) <= min(test.dates)` and the partition is a
/// cut, never a shuffle.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Series,
    pub test: Series,
}

/// Fractional change between consecutive closes.
///
/// The first observation has no predecessor and is dropped; ordering
/// follows the owning series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub points: Vec<(NaiveDate, f64)>,
}

impl ReturnSeries {
    /// Derive returns from a price series.
    pub fn from_series(series: &Series) -> Self {
        let points = series
            .points()
            .windows(2)
            .map(|w| (w[1].date, w[1].close / w[0].close - 1.0))
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, r)| *r).collect()
    }
}

/// How seasonal effects combine with the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    /// Seasonal effects are added to the trend.
    Additive,
    /// Seasonal effects scale with the trend level.
    Multiplicative,
}

impl SeasonalityMode {
    pub const ALL: [SeasonalityMode; 2] = [SeasonalityMode::Additive, SeasonalityMode::Multiplicative];
}

impl fmt::Display for SeasonalityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonalityMode::Additive => write!(f, "additive"),
            SeasonalityMode::Multiplicative => write!(f, "multiplicative"),
        }
    }
}

/// Hyperparameters of the trend + seasonality regression model.
///
/// The three scales control how strongly the corresponding component is
/// regularized: larger scale, more flexible component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparams {
    /// Flexibility of the piecewise-linear trend at changepoints.
    pub changepoint_scale: f64,
    /// Strength of the Fourier seasonality terms.
    pub seasonality_scale: f64,
    /// Strength of the holiday indicator effects.
    pub holiday_scale: f64,
    /// Additive or multiplicative seasonality.
    pub mode: SeasonalityMode,
}

impl Default for Hyperparams {
    fn default() -> Self {
        Self {
            changepoint_scale: 0.05,
            seasonality_scale: 10.0,
            holiday_scale: 10.0,
            mode: SeasonalityMode::Additive,
        }
    }
}

impl fmt::Display for Hyperparams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "changepoint={:.4} seasonality={:.4} holiday={:.4} mode={}",
            self.changepoint_scale, self.seasonality_scale, self.holiday_scale, self.mode
        )
    }
}

/// A single forecast observation: point estimate plus uncertainty bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// Central estimate.
    pub yhat: f64,
    /// Lower uncertainty bound.
    pub lower: f64,
    /// Upper uncertainty bound.
    pub upper: f64,
}

/// An ordered sequence of forecast points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point estimates in date order.
    pub fn estimates(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.yhat).collect()
    }

    /// Look up the forecast at an exact date.
    pub fn at(&self, date: NaiveDate) -> Option<&ForecastPoint> {
        self.points.iter().find(|p| p.date == date)
    }
}

/// Goodness-of-fit metrics between actual and predicted values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl Metrics {
    /// Compute metrics between a series and a forecast.
    ///
    /// Pairs are joined by date, never by position: the fitting layer may
    /// emit predictions in a different order than the actuals. Only dates
    /// present on both sides participate.
    pub fn between(actual: &Series, forecast: &Forecast) -> Result<Self> {
        let predicted: BTreeMap<NaiveDate, f64> =
            forecast.points.iter().map(|p| (p.date, p.yhat)).collect();

        let pairs: Vec<(f64, f64)> = actual
            .points()
            .iter()
            .filter_map(|p| predicted.get(&p.date).map(|&yhat| (p.close, yhat)))
            .collect();

        if pairs.is_empty() {
            return Err(ForecastError::InsufficientData(
                "no overlapping dates between actual and predicted values".to_string(),
            ));
        }

        let n = pairs.len() as f64;
        let mae = pairs.iter().map(|(a, p)| (a - p).abs()).sum::<f64>() / n;
        let mse = pairs.iter().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n;
        let rmse = mse.sqrt();

        let mean_actual = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
        let ss_res: f64 = pairs.iter().map(|(a, p)| (a - p).powi(2)).sum();
        let ss_tot: f64 = pairs.iter().map(|(a, _)| (a - mean_actual).powi(2)).sum();
        // A zero-variance test window degenerates: R^2 is 1 when the
        // residuals also vanish, 0 otherwise.
        let r2 = if ss_tot > f64::EPSILON {
            1.0 - ss_res / ss_tot
        } else if ss_res < 1e-12 {
            1.0
        } else {
            0.0
        };

        Ok(Self { mae, mse, rmse, r2 })
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAE={:.4} MSE={:.4} RMSE={:.4} R2={:.4}",
            self.mae, self.mse, self.rmse, self.r2
        )
    }
}

/// One point of a renderable chart payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

/// A named chart payload for the external rendering collaborator.
///
/// The core never renders images; it hands over (date, value) points with
/// optional confidence bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    /// Chart payload from a price series (no bands).
    pub fn from_series(name: impl Into<String>, series: &Series) -> Self {
        Self {
            name: name.into(),
            points: series
                .points()
                .iter()
                .map(|p| ChartPoint {
                    date: p.date,
                    value: p.close,
                    lower: None,
                    upper: None,
                })
                .collect(),
        }
    }

    /// Chart payload from a forecast, bands included.
    pub fn from_forecast(name: impl Into<String>, forecast: &Forecast) -> Self {
        Self {
            name: name.into(),
            points: forecast
                .points
                .iter()
                .map(|p| ChartPoint {
                    date: p.date,
                    value: p.yhat,
                    lower: Some(p.lower),
                    upper: Some(p.upper),
                })
                .collect(),
        }
    }
}
