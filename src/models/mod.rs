//! Request and Response models
//!
//! DTOs exchanged with the remote key-value store and returned by the page
//! server's JSON endpoints.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{SetRequest, MAX_REMOTE_KEY_LENGTH};
pub use responses::{GetResponse, HealthResponse, InvalidateResponse, StatsResponse};
