//! Storage Module
//!
//! The key-value contract the ISR coordinator reads and writes through, and
//! its backends.
//!
//! # Backends
//! - `InMemoryCache`: bounded LRU table, the default
//! - `RemoteCache`: JSON values in a mini-redis style HTTP key-value server

pub mod memory;
pub mod remote;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::InMemoryCache;
pub use remote::RemoteCache;

// == Cache Storage Contract ==
/// Async key-value storage for cached values.
///
/// A missing key is `Ok(None)`. Backend failures are errors and must never be
/// reported as absence.
#[async_trait]
pub trait CacheStorage<V>: Send + Sync {
    /// Retrieves the value stored under `key`.
    async fn get_item(&self, key: &str) -> Result<Option<V>>;

    /// Creates or replaces the value stored under `key`.
    async fn set_item(&self, key: &str, value: V) -> Result<()>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}
