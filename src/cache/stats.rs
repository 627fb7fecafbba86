//! ISR Statistics Module
//!
//! Tracks how lookups were served and how regenerations went.

use serde::Serialize;

// == ISR Stats ==
/// Counters for ISR lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IsrStats {
    /// Lookups answered from a fresh entry
    pub fresh_hits: u64,
    /// Lookups answered from a stale entry while another caller regenerates
    pub stale_hits: u64,
    /// Lookups that found no entry
    pub misses: u64,
    /// Successful regenerations
    pub regenerations: u64,
    /// Render operations that failed
    pub render_failures: u64,
    /// Storage backend errors observed by the coordinator
    pub storage_errors: u64,
}

impl IsrStats {
    // == Constructor ==
    /// Creates a new IsrStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Share of lookups served from cache, fresh or stale.
    ///
    /// Returns 0.0 if no lookups have been recorded.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.fresh_hits + self.stale_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn record_fresh_hit(&mut self) {
        self.fresh_hits += 1;
    }

    pub fn record_stale_hit(&mut self) {
        self.stale_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_regeneration(&mut self) {
        self.regenerations += 1;
    }

    pub fn record_render_failure(&mut self) {
        self.render_failures += 1;
    }

    pub fn record_storage_error(&mut self) {
        self.storage_errors += 1;
    }
}
