//! Price history sources and ingestion.
//!
//! The core does not own a network protocol; the orchestration layer hands
//! it a symbol and a date range and a [`PriceSource`] supplies history.
//! `CsvSource` reads per-symbol CSV files (the usual export format of daily
//! OHLCV downloads), `InMemorySource` serves pre-fetched observations and
//! is the workhorse of the test suite.

use crate::error::{ForecastError, Result};
use crate::types::PricePoint;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Supplies historical closing prices for a symbol.
///
/// Implementations must return observations restricted to `[start, end]`
/// (inclusive) and an empty vector when the symbol is unknown, so the
/// store's suffix-retry policy can distinguish "no data" from hard errors.
pub trait PriceSource {
    fn history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>>;
}

/// Raw CSV row with flexible column naming.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(
        alias = "Date",
        alias = "date",
        alias = "DATE",
        alias = "Timestamp",
        alias = "timestamp",
        alias = "Datetime",
        alias = "datetime"
    )]
    date: String,
    #[serde(alias = "Close", alias = "close", alias = "c", alias = "Adj Close")]
    close: f64,
}

/// Ingestion options for CSV files.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Explicit date format; when `None`, common formats are tried.
    pub date_format: Option<String>,
    /// Skip malformed rows instead of failing the whole file.
    pub skip_invalid: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            date_format: None,
            skip_invalid: true,
        }
    }
}

/// Parse a date cell, stripping any timezone the source attached.
///
/// Daily history exports vary between plain dates, naive datetimes, and
/// RFC 3339 timestamps with an exchange-local offset. Whatever the input,
/// only the naive calendar date survives into the core.
fn parse_date(raw: &str, format: Option<&str>) -> Result<NaiveDate> {
    if let Some(fmt) = format {
        if fmt.contains("%H") {
            return Ok(NaiveDateTime::parse_from_str(raw, fmt)?.date());
        }
        return Ok(NaiveDate::parse_from_str(raw, fmt)?);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.date());
    }
    Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?)
}

/// Price source backed by a directory of `SYMBOL.csv` files.
pub struct CsvSource {
    dir: PathBuf,
    options: CsvOptions,
}

impl CsvSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            options: CsvOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }

    fn load_file(&self, path: &Path) -> Result<Vec<PricePoint>> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
        let mut points = Vec::new();
        for (row_idx, record) in reader.deserialize::<CsvRow>().enumerate() {
            let row = match record {
                Ok(row) => row,
                Err(e) => {
                    if self.options.skip_invalid {
                        warn!("skipping malformed row {} in {}: {}", row_idx + 1, path.display(), e);
                        continue;
                    }
                    return Err(e.into());
                }
            };
            let date = match parse_date(&row.date, self.options.date_format.as_deref()) {
                Ok(date) => date,
                Err(e) => {
                    if self.options.skip_invalid {
                        warn!("skipping unparseable date '{}' in {}: {}", row.date, path.display(), e);
                        continue;
                    }
                    return Err(e);
                }
            };
            if !row.close.is_finite() || row.close <= 0.0 {
                if self.options.skip_invalid {
                    warn!("skipping non-positive close {} at {} in {}", row.close, date, path.display());
                    continue;
                }
                return Err(ForecastError::DataError(format!(
                    "non-positive close {} at {}",
                    row.close, date
                )));
            }
            points.push(PricePoint::new(date, row.close));
        }
        Ok(points)
    }
}

impl PriceSource for CsvSource {
    fn history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>> {
        let path = self.dir.join(format!("{}.csv", symbol));
        if !path.exists() {
            debug!("no history file for '{}' at {}", symbol, path.display());
            return Ok(Vec::new());
        }
        let points = self.load_file(&path)?;
        Ok(points
            .into_iter()
            .filter(|p| p.date >= start && p.date <= end)
            .collect())
    }
}

/// Price source serving observations held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    data: HashMap<String, Vec<PricePoint>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register history for a symbol.
    pub fn with_history(mut self, symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        self.data.insert(symbol.into(), points);
        self
    }

    pub fn insert(&mut self, symbol: impl Into<String>, points: Vec<PricePoint>) {
        self.data.insert(symbol.into(), points);
    }
}

impl PriceSource for InMemorySource {
    fn history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>> {
        Ok(self
            .data
            .get(symbol)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= start && p.date <= end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}
