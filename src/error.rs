//! Error types for the wellness analytics core

use thiserror::Error;

/// Errors that can occur while ingesting, aggregating, or scoring wellness data
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Insufficient history: {available} of {required} weeks available")]
    InsufficientData { available: usize, required: usize },

    #[error("Threshold not met: {0}")]
    ThresholdNotMet(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for AnalyticsError {
    fn from(e: rusqlite::Error) -> Self {
        AnalyticsError::Storage(e.to_string())
    }
}

impl From<figment::Error> for AnalyticsError {
    fn from(e: figment::Error) -> Self {
        AnalyticsError::Configuration(e.to_string())
    }
}

impl AnalyticsError {
    /// Shorthand for validation failures on a named numeric field
    pub(crate) fn out_of_range(field: &str, value: f64, min: f64, max: f64) -> Self {
        AnalyticsError::Validation(format!(
            "{field} must be a finite number in [{min}, {max}], got {value}"
        ))
    }
}
