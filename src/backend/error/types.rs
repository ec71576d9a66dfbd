/**
 * Backend Error Types
 *
 * This module defines error types specific to the backend server.
 * These errors are used in HTTP handlers and can be converted to HTTP responses.
 *
 * # Error Categories
 *
 * ## Handler Errors
 *
 * Handler errors occur when processing HTTP requests:
 * - Missing or malformed principal header
 * - Invalid request format
 *
 * ## Feed Errors
 *
 * Failures of the feed store (database, missing class, invalid input).
 * These propagate to the caller as a failed request.
 *
 * ## Live Update Errors
 *
 * Only the SSE endpoints surface broker errors (a shut down broker cannot
 * take new listeners). Write handlers publish best-effort and never return
 * these.
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::feed::FeedError;
use crate::backend::realtime::BrokerError;
use crate::shared::SharedError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use axum::http::StatusCode;
/// use classboard::backend::error::BackendError;
///
/// let err = BackendError::handler(StatusCode::BAD_REQUEST, "Invalid request");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
///
/// let err = BackendError::unauthorized("Missing x-user-id header");
/// assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g., missing headers, invalid request)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Feed store error
    #[error(transparent)]
    FeedError(#[from] FeedError),

    /// Live update broker error
    #[error(transparent)]
    LiveUpdateError(#[from] BrokerError),

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Create a 401 handler error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::UNAUTHORIZED, message)
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `FeedError` - 404 for missing records, 403 for class writes by
    ///   non-members, 400 for invalid input, 500 otherwise
    /// - `LiveUpdateError` - 503 Service Unavailable
    /// - `SharedError` - 400 for validation, 500 for serialization
    /// - `SerializationError` - 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::FeedError(err) => match err {
                FeedError::NotFound(_) => StatusCode::NOT_FOUND,
                FeedError::Forbidden(_) => StatusCode::FORBIDDEN,
                FeedError::Invalid(_) => StatusCode::BAD_REQUEST,
                FeedError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::LiveUpdateError(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            },
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    ///
    /// Database details are not exposed to clients.
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::FeedError(FeedError::Database(_)) => "Feed store unavailable".to_string(),
            Self::FeedError(err) => err.to_string(),
            Self::LiveUpdateError(err) => err.to_string(),
            Self::SharedError(err) => err.to_string(),
            Self::SerializationError(err) => err.to_string(),
        }
    }
}
