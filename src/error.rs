//! Error types for vidgrab
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (job state machine, SQLite store)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for vidgrab operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vidgrab
///
/// Every failure degrades to one of these variants; nothing in the library is
/// fatal to the process.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "simulation.tick_interval")
        key: Option<String>,
    },

    /// Input did not look like a supported video link
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Format id is not part of the catalog
    #[error("unknown format: {0}")]
    UnknownFormat(String),

    /// No signed-in user while one is required
    #[error("not authenticated: sign-in has not completed yet")]
    NotAuthenticated,

    /// Job state machine violation
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Machine has been shut down
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,
}

/// Job state machine errors
#[derive(Debug, Error)]
pub enum JobError {
    /// Operation is not allowed in the current status
    #[error("cannot {operation} while job is {current_state}")]
    InvalidState {
        /// The operation that was attempted (e.g., "analyze", "reset")
        operation: String,
        /// The status that prevents the operation (e.g., "downloading")
        current_state: String,
    },

    /// The job a timer or notification refers to is no longer current
    #[error("job {id} is no longer active")]
    Stale {
        /// The stale job id
        id: i64,
    },
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "invalid_state",
///     "message": "job error: cannot reset while job is downloading",
///     "details": {
///       "operation": "reset",
///       "current_state": "downloading"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "invalid_url", "unknown_format")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidUrl(_) => 400,
            Error::UnknownFormat(_) => 400,

            // 401 Unauthorized - identity not ready
            Error::NotAuthenticated => 401,

            // 409 Conflict - operation not valid in the current status
            Error::Job(JobError::InvalidState { .. }) => 409,
            Error::Job(JobError::Stale { .. }) => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidUrl(_) => "invalid_url",
            Error::UnknownFormat(_) => "unknown_format",
            Error::NotAuthenticated => "not_authenticated",
            Error::Job(e) => match e {
                JobError::InvalidState { .. } => "invalid_state",
                JobError::Stale { .. } => "stale_job",
            },
            Error::Database(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Job(JobError::InvalidState {
                operation,
                current_state,
            }) => Some(serde_json::json!({
                "operation": operation,
                "current_state": current_state,
            })),
            Error::Job(JobError::Stale { id }) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::UnknownFormat(format) => Some(serde_json::json!({
                "format": format,
            })),
            Error::Config {
                key: Some(key), ..
            } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
