//! Configuration Module
//!
//! Handles loading server and cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheEntry, DEFAULT_MAX_ENTRIES};
use crate::error::{CacheError, Result};
use crate::isr::{RegenerationPolicy, DEFAULT_FLAG_CLEAR_ATTEMPTS};
use crate::storage::{CacheStorage, InMemoryCache, RemoteCache};

/// Which storage backend holds the pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Bounded in-process LRU table
    Memory,
    /// mini-redis style HTTP key-value store
    Remote { base_url: String, ttl: Option<u64> },
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the in-memory backend can hold
    pub max_entries: usize,
    /// Max age in milliseconds applied to pages served by the HTTP adapter
    pub default_max_age_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Storage backend selection
    pub backend: StorageBackend,
    /// Milliseconds after which a regeneration flag may be overridden, 0 = never
    pub regeneration_timeout_ms: u64,
    /// Attempts to clear a regeneration flag before force-clearing
    pub flag_clear_attempts: u32,
    /// Simulated latency of the demo renderer in milliseconds
    pub render_delay_ms: u64,
}

pub const DEFAULT_MAX_AGE_MS: u64 = 60_000;
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_REMOTE_CACHE_URL: &str = "http://127.0.0.1:6380";
pub const DEFAULT_REGENERATION_TIMEOUT_MS: u64 = 30_000;

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - In-memory capacity (default: 2000)
    /// - `DEFAULT_MAX_AGE_MS` - Page max age (default: 60000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_BACKEND` - `memory` or `remote` (default: memory)
    /// - `REMOTE_CACHE_URL` - Remote store URL (default: http://127.0.0.1:6380)
    /// - `REMOTE_CACHE_TTL` - TTL seconds sent to the remote store (default: unset)
    /// - `REGENERATION_TIMEOUT_MS` - Stuck flag override, 0 disables (default: 30000)
    /// - `FLAG_CLEAR_ATTEMPTS` - Flag clear retries (default: 3)
    /// - `RENDER_DELAY_MS` - Demo renderer latency (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let backend = match env::var("CACHE_BACKEND").ok().as_deref() {
            Some("remote") => StorageBackend::Remote {
                base_url: env::var("REMOTE_CACHE_URL")
                    .unwrap_or_else(|_| DEFAULT_REMOTE_CACHE_URL.to_string()),
                ttl: parse_var("REMOTE_CACHE_TTL"),
            },
            _ => StorageBackend::Memory,
        };

        Self {
            max_entries: parse_var("MAX_ENTRIES")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_entries),
            default_max_age_ms: parse_var("DEFAULT_MAX_AGE_MS")
                .unwrap_or(defaults.default_max_age_ms),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            backend,
            regeneration_timeout_ms: parse_var("REGENERATION_TIMEOUT_MS")
                .unwrap_or(defaults.regeneration_timeout_ms),
            flag_clear_attempts: parse_var("FLAG_CLEAR_ATTEMPTS")
                .unwrap_or(defaults.flag_clear_attempts),
            render_delay_ms: parse_var("RENDER_DELAY_MS").unwrap_or(defaults.render_delay_ms),
        }
    }

    /// Regeneration policy derived from this configuration.
    pub fn regeneration_policy(&self) -> RegenerationPolicy {
        RegenerationPolicy {
            regeneration_timeout: (self.regeneration_timeout_ms > 0)
                .then(|| Duration::from_millis(self.regeneration_timeout_ms)),
            flag_clear_attempts: self.flag_clear_attempts,
            ..RegenerationPolicy::default()
        }
    }

    /// Builds the configured storage backend.
    pub fn build_storage(&self) -> Result<Arc<dyn CacheStorage<CacheEntry>>> {
        match &self.backend {
            StorageBackend::Memory => {
                Ok(Arc::new(InMemoryCache::<CacheEntry>::new(self.max_entries)?))
            }
            StorageBackend::Remote { base_url, ttl } => {
                if base_url.is_empty() {
                    return Err(CacheError::InvalidRequest(
                        "REMOTE_CACHE_URL cannot be empty".to_string(),
                    ));
                }
                Ok(Arc::new(RemoteCache::<CacheEntry>::new(base_url, *ttl)?))
            }
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            default_max_age_ms: DEFAULT_MAX_AGE_MS,
            server_port: DEFAULT_SERVER_PORT,
            backend: StorageBackend::Memory,
            regeneration_timeout_ms: DEFAULT_REGENERATION_TIMEOUT_MS,
            flag_clear_attempts: DEFAULT_FLAG_CLEAR_ATTEMPTS,
            render_delay_ms: 0,
        }
    }
}
