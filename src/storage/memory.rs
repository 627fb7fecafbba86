//! In-memory storage backend
//!
//! Adapts the LRU table to the storage contract.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::{LruTable, DEFAULT_MAX_ENTRIES};
use crate::error::Result;
use crate::storage::CacheStorage;

/// In-memory storage backend bounded by entry count.
///
/// Volatile: contents are lost when the process exits. Lookups promote the
/// key, so the table sits behind a mutex rather than a read-write lock.
#[derive(Debug)]
pub struct InMemoryCache<V> {
    lru: Mutex<LruTable<String, V>>,
}

impl<V> InMemoryCache<V> {
    /// Creates a backend holding at most `max_entries` values.
    pub fn new(max_entries: usize) -> Result<Self> {
        Ok(Self {
            lru: Mutex::new(LruTable::new(max_entries)?),
        })
    }

    /// Creates a backend with the default capacity of 2000 entries.
    pub fn with_default_capacity() -> Result<Self> {
        Self::new(DEFAULT_MAX_ENTRIES)
    }

    /// Current number of stored values.
    pub async fn len(&self) -> usize {
        self.lru.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lru.lock().await.is_empty()
    }

    /// Values evicted to make room since construction.
    pub async fn evictions(&self) -> u64 {
        self.lru.lock().await.evictions()
    }

    /// Stored keys from most to least recently used.
    pub async fn keys(&self) -> Vec<String> {
        self.lru.lock().await.keys_by_recency()
    }
}

#[async_trait]
impl<V> CacheStorage<V> for InMemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get_item(&self, key: &str) -> Result<Option<V>> {
        let mut lru = self.lru.lock().await;
        Ok(lru.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: V) -> Result<()> {
        let mut lru = self.lru.lock().await;
        if let Some((evicted, _)) = lru.put(key.to_string(), value) {
            debug!(key = %evicted, "evicted least recently used entry");
        }
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut lru = self.lru.lock().await;
        lru.delete(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
