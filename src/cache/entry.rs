//! Cache Entry Module
//!
//! Defines the regeneration entry stored for each rendered page.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::cache::CacheValue;
use crate::error::{CacheError, Result};

/// Response headers stored alongside a page.
pub type Headers = BTreeMap<String, String>;

// == Cache Entry ==
/// One rendered page snapshot.
///
/// Content and headers are never edited in place; a regeneration replaces the
/// whole entry. Only the regeneration fields are rewritten on an existing
/// entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Rendered body
    pub content: String,
    /// Completion time of the render (Unix milliseconds)
    pub created_at: u64,
    /// Headers served verbatim with the content
    pub headers: Headers,
    /// Set while some caller is regenerating this entry
    #[serde(default)]
    pub regeneration_in_progress: bool,
    /// When the flag was set (Unix milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regeneration_started_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a fresh entry stamped with the current time.
    pub fn new(content: String, headers: Headers) -> Self {
        Self::stamped(content, headers, current_timestamp_ms())
    }

    /// Creates an entry with an explicit creation time.
    pub fn stamped(content: String, headers: Headers, created_at: u64) -> Self {
        Self {
            content,
            created_at,
            headers,
            regeneration_in_progress: false,
            regeneration_started_at: None,
        }
    }

    // == Age ==
    /// Milliseconds since creation. A clock that stepped backwards yields zero.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// An entry is fresh while its age is strictly below `max_age_ms`.
    pub fn is_fresh(&self, max_age_ms: u64, now: u64) -> bool {
        self.age_ms(now) < max_age_ms
    }

    // == Regeneration Flag ==
    /// Copy of this entry with the regeneration flag set at `now`.
    pub fn with_regeneration_claimed(&self, now: u64) -> Self {
        Self {
            regeneration_in_progress: true,
            regeneration_started_at: Some(now),
            ..self.clone()
        }
    }

    /// Copy of this entry with the regeneration flag cleared.
    pub fn with_regeneration_cleared(&self) -> Self {
        Self {
            regeneration_in_progress: false,
            regeneration_started_at: None,
            ..self.clone()
        }
    }

    /// True when the flag has been held longer than `timeout`.
    ///
    /// A flag without a start time (written by an older writer) counts as
    /// overdue once the timeout has elapsed since creation.
    pub fn regeneration_overdue(&self, timeout: Duration, now: u64) -> bool {
        if !self.regeneration_in_progress {
            return false;
        }
        let started = self.regeneration_started_at.unwrap_or(self.created_at);
        now.saturating_sub(started) >= duration_ms(timeout)
    }
}

// == Value Conversion ==
impl From<&CacheEntry> for CacheValue {
    fn from(entry: &CacheEntry) -> Self {
        match serde_json::to_value(entry) {
            Ok(serde_json::Value::Object(record)) => CacheValue::Record(record),
            _ => CacheValue::Null,
        }
    }
}

impl TryFrom<CacheValue> for CacheEntry {
    type Error = CacheError;

    fn try_from(value: CacheValue) -> Result<Self> {
        match value {
            CacheValue::Record(record) => {
                serde_json::from_value(serde_json::Value::Object(record)).map_err(|e| {
                    CacheError::BackendUnavailable(format!("malformed cache entry: {e}"))
                })
            }
            other => Err(CacheError::BackendUnavailable(format!(
                "expected a cache entry record, found {other:?}"
            ))),
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
