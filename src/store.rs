//! Per-request ownership of one instrument's historical series.

use crate::data::PriceSource;
use crate::error::{ForecastError, Result};
use crate::types::{ReturnSeries, Series};
use chrono::NaiveDate;
use tracing::{debug, info};

/// Default venue suffix tried when an unsuffixed symbol resolves to nothing.
pub const DEFAULT_VENUE_SUFFIX: &str = ".NS";

/// Owns a single instrument's closing-price series for one request.
///
/// Resolution policy: the literal symbol is tried first; if it yields no
/// observations and carries no venue suffix, exactly one retry is made with
/// the default suffix appended. There is no further fallback chain. On a
/// successful retry the store's effective symbol becomes the suffixed form
/// for all subsequent reporting.
pub struct SeriesStore<'a> {
    source: &'a dyn PriceSource,
    venue_suffix: String,
    symbol: Option<String>,
    series: Option<Series>,
    returns: Option<ReturnSeries>,
}

impl<'a> SeriesStore<'a> {
    pub fn new(source: &'a dyn PriceSource) -> Self {
        Self {
            source,
            venue_suffix: DEFAULT_VENUE_SUFFIX.to_string(),
            symbol: None,
            series: None,
            returns: None,
        }
    }

    /// Override the venue suffix used for the single resolution retry.
    pub fn with_venue_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.venue_suffix = suffix.into();
        self
    }

    /// The symbol the series was actually resolved under.
    pub fn effective_symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// The fetched series, if any.
    pub fn series(&self) -> Option<&Series> {
        self.series.as_ref()
    }

    /// Fetch history for `symbol` over `[start, end]` (ISO calendar dates).
    ///
    /// Fails with `InvalidRange` when either date fails to parse or the
    /// range is inverted, and with `NoData` when neither the literal symbol
    /// nor the single suffixed retry yields observations.
    pub fn fetch(&mut self, symbol: &str, start: &str, end: &str) -> Result<&Series> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ForecastError::DataError("empty symbol".to_string()));
        }
        let start = parse_iso_date(start)?;
        let end = parse_iso_date(end)?;
        if end < start {
            return Err(ForecastError::InvalidRange(format!(
                "end date {} precedes start date {}",
                end, start
            )));
        }

        let mut effective = symbol.clone();
        let mut points = self.source.history(&effective, start, end)?;
        if points.is_empty() && !symbol.contains('.') {
            let suffixed = format!("{}{}", symbol, self.venue_suffix);
            debug!("'{}' yielded no data, retrying as '{}'", symbol, suffixed);
            points = self.source.history(&suffixed, start, end)?;
            if !points.is_empty() {
                info!("resolved '{}' to '{}'", symbol, suffixed);
                effective = suffixed;
            }
        }
        if points.is_empty() {
            return Err(ForecastError::no_data(symbol));
        }

        let series = Series::new(points);
        debug!(
            "fetched {} observations for '{}' ({} to {})",
            series.len(),
            effective,
            start,
            end
        );
        self.symbol = Some(effective);
        self.series = Some(series);
        self.returns = None;
        Ok(self.series.as_ref().unwrap())
    }

    /// The derived return series, computed once per fetched series and
    /// cached so repeated plot/metric requests see the identical values.
    pub fn returns(&mut self) -> Result<&ReturnSeries> {
        let series = self.series.as_ref().ok_or_else(|| {
            ForecastError::DataError("returns requested before fetch".to_string())
        })?;
        if self.returns.is_none() {
            self.returns = Some(ReturnSeries::from_series(series));
        }
        Ok(self.returns.as_ref().unwrap())
    }
}

fn parse_iso_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
        ForecastError::InvalidRange(format!("'{}' is not a calendar date: {}", raw, e))
    })
}
