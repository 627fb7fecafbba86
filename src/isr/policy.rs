//! Regeneration policy knobs.

use std::time::Duration;

use crate::cache::CacheEntry;

/// Default time after which a set regeneration flag may be overridden
pub const DEFAULT_REGENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of attempts to clear a flag before force-clearing
pub const DEFAULT_FLAG_CLEAR_ATTEMPTS: u32 = 3;

/// Default pause between flag clear attempts
pub const DEFAULT_FLAG_CLEAR_BACKOFF: Duration = Duration::from_millis(50);

/// How the coordinator treats stuck or failed regenerations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegenerationPolicy {
    /// A flag older than this no longer blocks a new regeneration.
    /// `None` trusts the flag indefinitely.
    pub regeneration_timeout: Option<Duration>,
    /// Writes attempted when clearing a flag after a failure
    pub flag_clear_attempts: u32,
    pub flag_clear_backoff: Duration,
}

impl RegenerationPolicy {
    /// True when `entry` carries a flag that still blocks regeneration.
    pub fn flag_is_live(&self, entry: &CacheEntry, now: u64) -> bool {
        entry.regeneration_in_progress
            && !self
                .regeneration_timeout
                .is_some_and(|timeout| entry.regeneration_overdue(timeout, now))
    }
}

impl Default for RegenerationPolicy {
    fn default() -> Self {
        Self {
            regeneration_timeout: Some(DEFAULT_REGENERATION_TIMEOUT),
            flag_clear_attempts: DEFAULT_FLAG_CLEAR_ATTEMPTS,
            flag_clear_backoff: DEFAULT_FLAG_CLEAR_BACKOFF,
        }
    }
}
