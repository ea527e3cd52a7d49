//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the caching layer.
///
/// Cache misses are never errors; `get`/`has` report absence through their
/// return types. This enum covers the genuine failure paths: bad input,
/// loader failures, a tripped circuit breaker, and internal faults.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found (admin HTTP surface only; the library API returns `None`)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request or configuration data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Circuit breaker is open; the underlying operation was never attempted
    #[error("circuit breaker is open: {0}")]
    CircuitOpen(String),

    /// A loader factory failed during get-or-fetch; message preserved verbatim
    #[error("Loader failed: {0}")]
    Loader(String),

    /// Unknown invalidation strategy name
    #[error("Unknown invalidation strategy: {0}")]
    UnknownStrategy(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CacheError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CacheError::CircuitOpen(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            CacheError::Loader(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            CacheError::UnknownStrategy(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CacheError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, CacheError>;
