//! Request DTOs
//!
//! Bodies sent to the remote key-value store.

use serde::{Deserialize, Serialize};

/// Maximum key length accepted by the remote store, in bytes
pub const MAX_REMOTE_KEY_LENGTH: usize = 256;

/// Request body for the remote SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The JSON-encoded value
/// - `ttl`: Optional TTL in seconds (the store's default applies if omitted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_REMOTE_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_REMOTE_KEY_LENGTH
            ));
        }
        None
    }
}
