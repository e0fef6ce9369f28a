//! Application error types

use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Fetch failed for {instrument}: {reason}")]
    Fetch { instrument: String, reason: String },

    #[error("Unreadable response for {instrument}: {reason}")]
    Parse { instrument: String, reason: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build a fetch failure for one instrument
    pub fn fetch(instrument: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Fetch {
            instrument: instrument.into(),
            reason: reason.into(),
        }
    }

    /// Build a failure to read a response body for one instrument
    pub fn parse(instrument: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Parse {
            instrument: instrument.into(),
            reason: reason.into(),
        }
    }

    /// Per-instrument failures that a refresh cycle skips over.
    ///
    /// Anything else coming out of the record store is fatal to the cycle.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            AppError::Fetch { .. }
                | AppError::Parse { .. }
                | AppError::Http(_)
                | AppError::Serialization(_)
        )
    }

    /// Stable code for hosts that surface errors
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Http(_) => "HTTP_ERROR",
            AppError::Url(_) => "URL_ERROR",
            AppError::Fetch { .. } => "FETCH_ERROR",
            AppError::Parse { .. } => "PARSE_ERROR",
            AppError::Store(_) => "STORE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Serializable error response for hosts
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
