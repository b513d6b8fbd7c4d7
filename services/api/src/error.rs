//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service and the single place where
//! core errors are turned into HTTP status codes.

use axum::http::StatusCode;
use silogia_core::{AnalysisError, PortError};
use tracing::{error, warn};

use crate::config::ConfigError;

/// The primary error type for the `api` service (startup and binary level).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The error half of every handler's return type.
pub type HandlerError = (StatusCode, String);

/// Maps a port error onto the response a client sees. Internal details of
/// unexpected failures are logged, not returned.
pub fn port_error(e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::Timeout(msg) => {
            warn!("Upstream timeout: {}", msg);
            (StatusCode::GATEWAY_TIMEOUT, "Upstream service timed out".to_string())
        }
        PortError::Unavailable(msg) => {
            warn!("Upstream unavailable: {}", msg);
            (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable".to_string())
        }
        PortError::Unexpected(msg) => {
            error!("Unexpected port error: {}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
        }
    }
}

pub fn analysis_error(e: AnalysisError) -> HandlerError {
    match e {
        AnalysisError::EmptyText | AnalysisError::TextTooLong { .. } => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        AnalysisError::ConversationNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        AnalysisError::TaggerUnavailable => {
            error!("Analysis requested but the tagging model is not loaded");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        AnalysisError::Port(inner) => port_error(inner),
    }
}
