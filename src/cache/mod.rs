//! Cache Module
//!
//! Data types for the ISR cache: the bounded LRU table, the storable value
//! set, the per-page regeneration entry, and lookup statistics.

mod entry;
mod lru;
mod stats;
mod value;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, Headers};
pub use lru::LruTable;
pub use stats::IsrStats;
pub use value::CacheValue;

// == Public Constants ==
/// Default capacity of the in-memory backend
pub const DEFAULT_MAX_ENTRIES: usize = 2000;
