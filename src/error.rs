//! Error types for the forecasting core.

use thiserror::Error;

/// Main error type for forecasting operations.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("No data available for symbol '{symbol}' in the requested range")]
    NoData { symbol: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Model fit failed: {0}")]
    FitFailure(String),

    #[error("Forecast requested before a model was fitted")]
    NotFitted,

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParseError(#[from] chrono::ParseError),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ForecastError {
    /// Build a `NoData` error for a symbol.
    pub fn no_data(symbol: impl Into<String>) -> Self {
        Self::NoData {
            symbol: symbol.into(),
        }
    }
}

/// Result type alias for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;
