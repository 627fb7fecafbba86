//! ISR Cache - server-rendering output cache
//!
//! Bounded LRU storage behind an async storage contract, and an incremental
//! static regeneration coordinator that serves stale pages while a single
//! caller re-renders them.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod isr;
pub mod models;
pub mod storage;

pub use api::{create_router, AppState};
pub use cache::{CacheEntry, CacheValue, LruTable};
pub use config::Config;
pub use error::{CacheError, Result};
pub use isr::{IsrCoordinator, IsrResponse, RegenerationPolicy, RenderedPage, ServedFrom};
pub use storage::{CacheStorage, InMemoryCache, RemoteCache};
