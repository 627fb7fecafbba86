//! Response DTOs
//!
//! Bodies received from the remote key-value store and bodies returned by the
//! page server's JSON endpoints.

use serde::{Deserialize, Serialize};

use crate::cache::IsrStats;

/// Response body of the remote store's GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored JSON-encoded value
    pub value: String,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response body for page invalidation (DELETE /pages/*path)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    /// The key that was invalidated
    pub key: String,
}

impl InvalidateResponse {
    /// Creates a new InvalidateResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Page '{}' invalidated", key),
            key,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub fresh_hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    pub regenerations: u64,
    pub render_failures: u64,
    pub storage_errors: u64,
    /// (fresh_hits + stale_hits) / (fresh_hits + stale_hits + misses)
    pub hit_rate: f64,
    /// Name of the active storage backend
    pub backend: String,
}

impl StatsResponse {
    /// Creates a new StatsResponse from ISR statistics
    pub fn new(stats: &IsrStats, backend: impl Into<String>) -> Self {
        Self {
            fresh_hits: stats.fresh_hits,
            stale_hits: stats.stale_hits,
            misses: stats.misses,
            regenerations: stats.regenerations,
            render_failures: stats.render_failures,
            storage_errors: stats.storage_errors,
            hit_rate: stats.hit_rate(),
            backend: backend.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
