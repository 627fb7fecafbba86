//! Error types for the ISR cache
//!
//! Provides unified error handling using thiserror.
//!
//! A missing key is not an error anywhere in this crate: storage lookups
//! return `Ok(None)` for absence.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the ISR cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Storage backend could not complete an operation
    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The render operation failed for the claiming caller
    #[error("Render failed for '{key}': {message}")]
    RenderFailure { key: String, message: String },

    /// An LRU table was constructed with a capacity below one
    #[error("Invalid cache capacity {0}: capacity must be at least 1")]
    CapacityMisconfiguration(usize),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Builds a `RenderFailure` from a render operation's error.
    pub fn render_failure(key: &str, err: &anyhow::Error) -> Self {
        CacheError::RenderFailure {
            key: key.to_string(),
            message: format!("{err:#}"),
        }
    }

    /// Returns true for storage backend errors.
    pub fn is_backend_error(&self) -> bool {
        matches!(self, CacheError::BackendUnavailable(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::RenderFailure { .. } => StatusCode::BAD_GATEWAY,
            CacheError::CapacityMisconfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the ISR cache.
pub type Result<T> = std::result::Result<T, CacheError>;
