//! Regeneration Claims
//!
//! Process-wide registry handing out at most one regeneration claim per key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// Keys with a regeneration in flight.
///
/// Each in-flight key maps to a receiver whose channel closes when the
/// claim is released, so callers with nothing to serve can wait on it.
#[derive(Debug, Default)]
pub(crate) struct ClaimRegistry {
    inflight: Mutex<HashMap<String, watch::Receiver<()>>>,
}

/// Outcome of a claim attempt.
pub(crate) enum Claim {
    /// The caller owns the regeneration for this key
    Acquired(ClaimGuard),
    /// Another caller owns it; the receiver closes on release
    Busy(watch::Receiver<()>),
}

impl ClaimRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claims `key` unless a claim is already held.
    pub(crate) fn try_claim(self: &Arc<Self>, key: &str) -> Claim {
        let mut inflight = self.lock();
        if let Some(done) = inflight.get(key) {
            return Claim::Busy(done.clone());
        }

        let (sender, receiver) = watch::channel(());
        inflight.insert(key.to_string(), receiver);

        Claim::Acquired(ClaimGuard {
            key: key.to_string(),
            registry: Arc::clone(self),
            _done: sender,
        })
    }

    pub(crate) fn is_claimed(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    // Critical sections never panic, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, watch::Receiver<()>>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the claim when dropped, including during a panic unwind.
pub(crate) struct ClaimGuard {
    key: String,
    registry: Arc<ClaimRegistry>,
    /// Dropped after the key is unregistered, waking waiters
    _done: watch::Sender<()>,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}
