//! Additive trend + seasonality regression model.
//!
//! The model decomposes a daily closing-price series into a piecewise-linear
//! trend (hinge basis at evenly spaced changepoints), weekly and yearly
//! Fourier seasonality, and fixed-date holiday effects. Hyperparameter
//! scales map to per-block ridge penalties: a larger scale weakens the
//! penalty and lets the corresponding component flex more.
//!
//! Multiplicative seasonality fits the log-transformed series and
//! exponentiates predictions, which makes the uncertainty bands asymmetric.

use crate::error::{ForecastError, Result};
use crate::types::{Forecast, ForecastPoint, Hyperparams, SeasonalityMode, Series};
use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

/// Maximum number of trend changepoints.
const MAX_CHANGEPOINTS: usize = 25;
/// Changepoints are placed over this leading fraction of the observed span.
const CHANGEPOINT_RANGE: f64 = 0.8;
/// Fourier order of the weekly component.
const WEEKLY_ORDER: usize = 3;
/// Fourier order of the yearly component.
const YEARLY_ORDER: usize = 10;
/// Minimum span (days) before a yearly component is included.
const YEARLY_MIN_SPAN_DAYS: f64 = 730.0;
/// z-score of the 80% central interval.
const INTERVAL_Z: f64 = 1.2816;
/// Baseline ridge applied to every coefficient to keep the system positive
/// definite even when a column is all zero.
const BASE_RIDGE: f64 = 1e-8;

/// Fixed annual holiday dates (month, day) covered by the holiday
/// regressors.
const HOLIDAY_RULES: [(u32, u32); 3] = [(1, 1), (5, 1), (12, 25)];

/// An unfitted model: hyperparameters only.
#[derive(Debug, Clone, Copy)]
pub struct RegressionModel {
    params: Hyperparams,
}

impl RegressionModel {
    pub fn new(params: Hyperparams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Hyperparams {
        &self.params
    }

    /// Fit the model to a series. The fitted model is immutable.
    pub fn fit(&self, series: &Series) -> Result<FittedModel> {
        let n = series.len();
        if n < 2 {
            return Err(ForecastError::InsufficientData(format!(
                "cannot fit a trend model to {} point(s)",
                n
            )));
        }

        let origin = series.first().map(|p| p.date).ok_or_else(|| {
            ForecastError::InsufficientData("empty series".to_string())
        })?;
        let train_end = series.last().map(|p| p.date).unwrap_or(origin);
        let span_days = day_number(train_end) - day_number(origin);
        if span_days <= 0.0 {
            return Err(ForecastError::InsufficientData(
                "series spans a single calendar date".to_string(),
            ));
        }

        // Target in fit space.
        let closes = series.closes();
        let (targets, y_scale) = match self.params.mode {
            SeasonalityMode::Additive => {
                let y_scale = closes.iter().fold(0.0f64, |m, c| m.max(c.abs())).max(1e-12);
                (closes.iter().map(|c| c / y_scale).collect::<Vec<_>>(), y_scale)
            }
            SeasonalityMode::Multiplicative => {
                if closes.iter().any(|&c| c <= 0.0) {
                    return Err(ForecastError::FitFailure(
                        "multiplicative seasonality requires strictly positive prices".to_string(),
                    ));
                }
                (closes.iter().map(|c| c.ln()).collect::<Vec<_>>(), 1.0)
            }
        };

        let n_changepoints = MAX_CHANGEPOINTS.min(n / 3);
        let changepoints: Vec<f64> = (0..n_changepoints)
            .map(|j| CHANGEPOINT_RANGE * (j + 1) as f64 / (n_changepoints + 1) as f64)
            .collect();

        let basis = BasisSpec {
            origin,
            span_days,
            changepoints,
            yearly: span_days >= YEARLY_MIN_SPAN_DAYS,
        };

        // Penalized normal equations: (X'X + diag(lambda)) b = X'y.
        let penalties = basis.penalties(&self.params);
        let p = penalties.len();
        let mut xtx = vec![vec![0.0f64; p]; p];
        let mut xty = vec![0.0f64; p];
        for (point, &y) in series.points().iter().zip(targets.iter()) {
            let row = basis.features(point.date);
            for i in 0..p {
                xty[i] += row[i] * y;
                for j in i..p {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }
        for i in 0..p {
            for j in 0..i {
                xtx[i][j] = xtx[j][i];
            }
            xtx[i][i] += penalties[i];
        }

        let coeffs = cholesky_solve(xtx, &xty).ok_or_else(|| {
            ForecastError::FitFailure("penalized normal equations are singular".to_string())
        })?;

        // Residual spread in fit space drives the uncertainty bands.
        let mut ss = 0.0;
        for (point, &y) in series.points().iter().zip(targets.iter()) {
            let fitted: f64 = basis
                .features(point.date)
                .iter()
                .zip(coeffs.iter())
                .map(|(x, b)| x * b)
                .sum();
            ss += (y - fitted).powi(2);
        }
        let sigma = (ss / (n.max(2) - 1) as f64).sqrt();

        debug!(
            "fitted {} coefficients over {} points (sigma={:.6}, mode={})",
            p, n, sigma, self.params.mode
        );

        Ok(FittedModel {
            params: self.params,
            basis,
            coeffs,
            y_scale,
            sigma,
            train_end,
            train_span_days: span_days,
        })
    }
}

/// A fitted trend + seasonality model. Immutable once fit.
#[derive(Debug, Clone)]
pub struct FittedModel {
    params: Hyperparams,
    basis: BasisSpec,
    coeffs: Vec<f64>,
    y_scale: f64,
    sigma: f64,
    train_end: NaiveDate,
    train_span_days: f64,
}

impl FittedModel {
    pub fn params(&self) -> &Hyperparams {
        &self.params
    }

    /// Predict at exactly the given dates (in-sample or beyond).
    pub fn predict_at(&self, dates: &[NaiveDate]) -> Forecast {
        Forecast {
            points: dates.iter().map(|&d| self.point(d)).collect(),
        }
    }

    /// Forecast `periods` daily steps beyond the last trained date.
    pub fn forecast_horizon(&self, periods: usize) -> Forecast {
        let dates: Vec<NaiveDate> = (1..=periods as i64)
            .map(|i| self.train_end + Duration::days(i))
            .collect();
        self.predict_at(&dates)
    }

    fn point(&self, date: NaiveDate) -> ForecastPoint {
        let estimate: f64 = self
            .basis
            .features(date)
            .iter()
            .zip(self.coeffs.iter())
            .map(|(x, b)| x * b)
            .sum();

        // Bands widen with the distance past the training window.
        let h = (day_number(date) - day_number(self.train_end)).max(0.0);
        let width = INTERVAL_Z * self.sigma * (1.0 + h / self.train_span_days).sqrt();
        let (lo, hi) = (estimate - width, estimate + width);

        match self.params.mode {
            SeasonalityMode::Additive => ForecastPoint {
                date,
                yhat: estimate * self.y_scale,
                lower: lo * self.y_scale,
                upper: hi * self.y_scale,
            },
            SeasonalityMode::Multiplicative => ForecastPoint {
                date,
                yhat: estimate.exp(),
                lower: lo.exp(),
                upper: hi.exp(),
            },
        }
    }
}

/// The feature basis shared between fitting and prediction.
#[derive(Debug, Clone)]
struct BasisSpec {
    origin: NaiveDate,
    span_days: f64,
    /// Changepoint locations in scaled time (0, CHANGEPOINT_RANGE).
    changepoints: Vec<f64>,
    yearly: bool,
}

impl BasisSpec {
    fn features(&self, date: NaiveDate) -> Vec<f64> {
        let day = day_number(date);
        let t = (day - day_number(self.origin)) / self.span_days;

        let mut row = Vec::with_capacity(self.width());
        row.push(1.0);
        row.push(t);
        for &s in &self.changepoints {
            row.push((t - s).max(0.0));
        }
        for k in 1..=WEEKLY_ORDER {
            let phase = 2.0 * std::f64::consts::PI * k as f64 * day / 7.0;
            row.push(phase.sin());
            row.push(phase.cos());
        }
        if self.yearly {
            for k in 1..=YEARLY_ORDER {
                let phase = 2.0 * std::f64::consts::PI * k as f64 * day / 365.25;
                row.push(phase.sin());
                row.push(phase.cos());
            }
        }
        for &(month, dom) in HOLIDAY_RULES.iter() {
            row.push(if date.month() == month && date.day() == dom {
                1.0
            } else {
                0.0
            });
        }
        row
    }

    fn width(&self) -> usize {
        2 + self.changepoints.len()
            + 2 * WEEKLY_ORDER
            + if self.yearly { 2 * YEARLY_ORDER } else { 0 }
            + HOLIDAY_RULES.len()
    }

    /// Per-coefficient ridge penalties: 1 / scale^2 per component block.
    fn penalties(&self, params: &Hyperparams) -> Vec<f64> {
        let mut lambda = Vec::with_capacity(self.width());
        lambda.push(BASE_RIDGE); // intercept
        lambda.push(BASE_RIDGE); // base slope
        let cp = BASE_RIDGE + params.changepoint_scale.powi(-2);
        lambda.extend(std::iter::repeat(cp).take(self.changepoints.len()));
        let seas = BASE_RIDGE + params.seasonality_scale.powi(-2);
        let n_seasonal = 2 * WEEKLY_ORDER + if self.yearly { 2 * YEARLY_ORDER } else { 0 };
        lambda.extend(std::iter::repeat(seas).take(n_seasonal));
        let hol = BASE_RIDGE + params.holiday_scale.powi(-2);
        lambda.extend(std::iter::repeat(hol).take(HOLIDAY_RULES.len()));
        lambda
    }
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// Solve `A x = b` for symmetric positive-definite `A` by Cholesky
/// decomposition. Returns `None` when a pivot collapses.
fn cholesky_solve(mut a: Vec<Vec<f64>>, b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    // Decompose in place: lower triangle of `a` becomes L.
    for j in 0..n {
        let mut diag = a[j][j];
        for k in 0..j {
            diag -= a[j][k] * a[j][k];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return None;
        }
        let ljj = diag.sqrt();
        a[j][j] = ljj;
        for i in (j + 1)..n {
            let mut v = a[i][j];
            for k in 0..j {
                v -= a[i][k] * a[j][k];
            }
            a[i][j] = v / ljj;
        }
    }
    // Forward substitution: L y = b.
    let mut y = vec![0.0f64; n];
    for i in 0..n {
        let mut v = b[i];
        for k in 0..i {
            v -= a[i][k] * y[k];
        }
        y[i] = v / a[i][i];
    }
    // Back substitution: L' x = y.
    let mut x = vec![0.0f64; n];
    for i in (0..n).rev() {
        let mut v = y[i];
        for k in (i + 1)..n {
            v -= a[k][i] * x[k];
        }
        x[i] = v / a[i][i];
    }
    Some(x)
}
