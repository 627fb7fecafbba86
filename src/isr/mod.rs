//! ISR Module
//!
//! Incremental static regeneration: serve cached pages, regenerate stale
//! ones, and collapse concurrent regenerations of one key into a single
//! render.
//!
//! # Per-key states
//! - Absent: no entry, the first caller renders
//! - Fresh: age below the max age, served directly
//! - Stale: past the max age, the next caller claims a regeneration
//! - Regenerating: flagged, other callers get the stale entry
//! - Failed: render error, flag cleared so a later caller can retry

mod claims;
mod coordinator;
mod policy;

pub use coordinator::{IsrCoordinator, IsrResponse, RenderedPage, ServedFrom};
pub use policy::{
    RegenerationPolicy, DEFAULT_FLAG_CLEAR_ATTEMPTS, DEFAULT_FLAG_CLEAR_BACKOFF,
    DEFAULT_REGENERATION_TIMEOUT,
};
