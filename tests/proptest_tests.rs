//! Property-based tests for series, split, and metric invariants.

use augur::types::{Forecast, ForecastPoint, Metrics, PricePoint, ReturnSeries, Series};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 3).unwrap()
}

fn series_from(closes: &[f64]) -> Series {
    Series::new(
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(start_date() + Duration::days(i as i64), c))
            .collect(),
    )
}

proptest! {
    /// For any series and any fraction leaving >= 2 points per side, the
    /// split is a chronological cut and a partition.
    #[test]
    fn split_is_chronological_partition(
        closes in prop::collection::vec(1.0f64..1000.0, 4..200),
        test_fraction in 0.05f64..0.95,
    ) {
        let series = series_from(&closes);
        let n = series.len();
        if let Ok(split) = series.split(test_fraction) {
            prop_assert_eq!(split.train.len() + split.test.len(), n);
            prop_assert!(split.train.len() >= 2);
            prop_assert!(split.test.len() >= 2);
            let train_max = split.train.last().unwrap().date;
            let test_min = split.test.first().unwrap().date;
            prop_assert!(train_max <= test_min);
            // The boundary sits exactly at floor(n * (1 - f)).
            let expected_train = ((n as f64) * (1.0 - test_fraction)).floor() as usize;
            prop_assert_eq!(split.train.len(), expected_train);
        }
    }

    /// A forecast equal to the actuals scores MAE=MSE=RMSE=0 and R²=1.
    #[test]
    fn perfect_fit_metrics_are_exact(
        closes in prop::collection::vec(1.0f64..1000.0, 2..100),
    ) {
        let series = series_from(&closes);
        let forecast = Forecast {
            points: series
                .points()
                .iter()
                .map(|p| ForecastPoint {
                    date: p.date,
                    yhat: p.close,
                    lower: p.close,
                    upper: p.close,
                })
                .collect(),
        };
        let m = Metrics::between(&series, &forecast).unwrap();
        prop_assert!(m.mae.abs() < 1e-9);
        prop_assert!(m.mse.abs() < 1e-9);
        prop_assert!(m.rmse.abs() < 1e-9);
        prop_assert!((m.r2 - 1.0).abs() < 1e-9);
    }

    /// Derived returns drop the first element and reproduce each ratio.
    #[test]
    fn returns_have_expected_length_and_values(
        closes in prop::collection::vec(1.0f64..1000.0, 2..100),
    ) {
        let series = series_from(&closes);
        let returns = ReturnSeries::from_series(&series);
        prop_assert_eq!(returns.len(), series.len() - 1);
        for (i, (date, r)) in returns.points.iter().enumerate() {
            let expected = closes[i + 1] / closes[i] - 1.0;
            prop_assert!((r - expected).abs() < 1e-9);
            prop_assert_eq!(*date, start_date() + Duration::days(i as i64 + 1));
        }
    }

    /// Metrics are invariant under shuffling of the forecast order, since
    /// pairing is by date.
    #[test]
    fn metrics_ignore_forecast_ordering(
        closes in prop::collection::vec(1.0f64..1000.0, 3..50),
    ) {
        let series = series_from(&closes);
        let mut points: Vec<ForecastPoint> = series
            .points()
            .iter()
            .map(|p| ForecastPoint {
                date: p.date,
                yhat: p.close * 1.01,
                lower: p.close,
                upper: p.close * 1.02,
            })
            .collect();
        let ordered = Metrics::between(&series, &Forecast { points: points.clone() }).unwrap();
        points.reverse();
        let reversed = Metrics::between(&series, &Forecast { points }).unwrap();
        prop_assert!((ordered.rmse - reversed.rmse).abs() < 1e-12);
        prop_assert!((ordered.r2 - reversed.r2).abs() < 1e-12);
    }
}
