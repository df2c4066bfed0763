//! Error types for the ration_forecast crate

use crate::data::MealCategory;
use chrono::NaiveDate;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the ration_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// History source empty or unreachable; fatal to the current run
    #[error("Demand history unavailable for [{from}, {until}): {reason}")]
    DataUnavailable {
        from: NaiveDate,
        until: NaiveDate,
        reason: String,
    },

    /// Too few training samples for one meal; that meal is skipped this run
    #[error("Insufficient history for {meal}: {available} training rows, need {required}")]
    InsufficientHistory {
        meal: MealCategory,
        available: usize,
        required: usize,
    },

    /// Connectivity blip against the store, eligible for retry
    #[error("Transient store error: {0}")]
    TransientStore(String),

    /// Key mismatch on an upsert; never retried
    #[error("Write conflict: {0}")]
    WriteConflict(String),

    /// Any other store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error while loading configuration
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from CSV output
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl ForecastError {
    /// Stable label for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::DataUnavailable { .. } => "data_unavailable",
            ForecastError::InsufficientHistory { .. } => "insufficient_history",
            ForecastError::TransientStore(_) => "transient_store",
            ForecastError::WriteConflict(_) => "write_conflict",
            ForecastError::Store(_) => "store",
            ForecastError::DataError(_) => "data",
            ForecastError::InvalidParameter(_) => "invalid_parameter",
            ForecastError::ConfigError(_) => "config",
            ForecastError::IoError(_) => "io",
            ForecastError::PolarsError(_) => "polars",
            ForecastError::CsvError(_) => "csv",
        }
    }

    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, ForecastError::TransientStore(_))
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<meal_math::MathError> for ForecastError {
    fn from(err: meal_math::MathError) -> Self {
        ForecastError::InvalidParameter(err.to_string())
    }
}

impl From<sqlx::Error> for ForecastError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::WorkerCrashed => ForecastError::TransientStore(err.to_string()),
            sqlx::Error::Database(db) => {
                if db.is_unique_violation() {
                    return ForecastError::WriteConflict(db.message().to_string());
                }
                // SQLITE_BUSY and SQLITE_LOCKED, including their extended codes
                let primary = db
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);
                match primary {
                    Some(5) | Some(6) => ForecastError::TransientStore(err.to_string()),
                    _ => ForecastError::Store(err.to_string()),
                }
            }
            _ => ForecastError::Store(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
