//! ISR coordinator - decides between serving, waiting and regenerating

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::cache::{current_timestamp_ms, CacheEntry, Headers, IsrStats};
use crate::error::{CacheError, Result};
use crate::isr::claims::{Claim, ClaimGuard, ClaimRegistry};
use crate::isr::RegenerationPolicy;
use crate::storage::CacheStorage;

/// Output of one render operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub content: String,
    pub headers: Headers,
}

impl RenderedPage {
    pub fn new(content: impl Into<String>, headers: Headers) -> Self {
        Self {
            content: content.into(),
            headers,
        }
    }

    /// An HTML page with a `content-type` header.
    pub fn html(content: impl Into<String>) -> Self {
        let headers = Headers::from([(
            "content-type".to_string(),
            "text/html; charset=utf-8".to_string(),
        )]);
        Self::new(content, headers)
    }
}

/// Where a lookup's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServedFrom {
    /// Cached entry younger than the max age
    Fresh,
    /// Cached entry past its max age, served while another caller regenerates
    Stale,
    /// Rendered by this lookup
    Regenerated,
}

impl ServedFrom {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServedFrom::Fresh => "fresh",
            ServedFrom::Stale => "stale",
            ServedFrom::Regenerated => "regenerated",
        }
    }
}

/// Content and headers answered by a lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct IsrResponse {
    pub content: String,
    pub headers: Headers,
    pub served_from: ServedFrom,
}

impl IsrResponse {
    fn from_entry(entry: CacheEntry, served_from: ServedFrom) -> Self {
        Self {
            content: entry.content,
            headers: entry.headers,
            served_from,
        }
    }
}

/// Incremental static regeneration over a pluggable storage backend.
///
/// Cloning is cheap; clones share storage, claims and stats.
#[derive(Clone)]
pub struct IsrCoordinator {
    storage: Arc<dyn CacheStorage<CacheEntry>>,
    claims: Arc<ClaimRegistry>,
    stats: Arc<RwLock<IsrStats>>,
    policy: RegenerationPolicy,
}

impl IsrCoordinator {
    /// Creates a coordinator with the default regeneration policy.
    pub fn new(storage: Arc<dyn CacheStorage<CacheEntry>>) -> Self {
        Self::with_policy(storage, RegenerationPolicy::default())
    }

    pub fn with_policy(
        storage: Arc<dyn CacheStorage<CacheEntry>>,
        policy: RegenerationPolicy,
    ) -> Self {
        Self {
            storage,
            claims: Arc::new(ClaimRegistry::new()),
            stats: Arc::new(RwLock::new(IsrStats::default())),
            policy,
        }
    }

    pub fn policy(&self) -> &RegenerationPolicy {
        &self.policy
    }

    /// Name of the storage backend in use.
    pub fn storage_name(&self) -> &'static str {
        self.storage.name()
    }

    /// Serves `key` from cache or renders it.
    ///
    /// - Fresh entry: returned as is, `render` is not called.
    /// - Stale entry with a regeneration already running: the stale entry is
    ///   returned.
    /// - Stale entry otherwise: this caller claims the key, flags the entry,
    ///   renders, and stores the result.
    /// - No entry: this caller renders, or waits for the caller that already
    ///   is and then serves its result.
    ///
    /// Only the claiming caller sees a render failure. Storage errors are
    /// returned to whichever caller hit them. The render runs in its own
    /// task, so dropping this future does not abandon a claimed regeneration.
    ///
    /// Callers waiting on an absent key retry one at a time once a render
    /// fails: each claims the key and renders itself. With N such waiters
    /// and a render that keeps failing, the last one answers after roughly
    /// N render durations.
    pub async fn lookup<F, Fut>(
        &self,
        key: &str,
        max_age_ms: u64,
        render: F,
    ) -> Result<IsrResponse>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<RenderedPage>> + Send + 'static,
    {
        let mut render = Some(render);
        let mut miss_recorded = false;

        loop {
            let entry = self.read(key).await?;
            let now = current_timestamp_ms();

            if let Some(entry) = &entry {
                if entry.is_fresh(max_age_ms, now) {
                    debug!(key, age_ms = entry.age_ms(now), "fresh hit");
                    self.stats.write().await.record_fresh_hit();
                    return Ok(IsrResponse::from_entry(entry.clone(), ServedFrom::Fresh));
                }
                if self.policy.flag_is_live(entry, now) {
                    return Ok(self.serve_stale(key, entry.clone()).await);
                }
                if entry.regeneration_in_progress {
                    warn!(key, "regeneration flag is overdue, overriding it");
                }
            } else if !miss_recorded {
                miss_recorded = true;
                self.stats.write().await.record_miss();
            }

            match self.claims.try_claim(key) {
                Claim::Busy(mut done) => {
                    if let Some(entry) = entry {
                        return Ok(self.serve_stale(key, entry).await);
                    }
                    debug!(key, "waiting for in-flight render");
                    let _ = done.changed().await;
                }
                Claim::Acquired(guard) => {
                    // The key may have been refreshed between the read and the claim
                    let current = self.read(key).await?;
                    let now = current_timestamp_ms();
                    if let Some(current) = &current {
                        if current.is_fresh(max_age_ms, now) {
                            self.stats.write().await.record_fresh_hit();
                            let entry = current.clone();
                            return Ok(IsrResponse::from_entry(entry, ServedFrom::Fresh));
                        }
                        if self.policy.flag_is_live(current, now) {
                            return Ok(self.serve_stale(key, current.clone()).await);
                        }
                    }

                    let render = render.take().ok_or_else(|| {
                        CacheError::Internal(format!("render for '{key}' already consumed"))
                    })?;
                    return self.regenerate(key, current, guard, render).await;
                }
            }
        }
    }

    /// Removes the cached entry for `key`, forcing the next lookup to render.
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        match self.storage.remove_item(key).await {
            Ok(()) => {
                info!(key, "invalidated");
                Ok(())
            }
            Err(err) => {
                self.note_storage_error(key, "remove", &err).await;
                Err(err)
            }
        }
    }

    /// Reads the raw entry for `key` without any ISR decision.
    pub async fn entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.read(key).await
    }

    /// Snapshot of the lookup counters.
    pub async fn stats(&self) -> IsrStats {
        self.stats.read().await.clone()
    }

    /// True while a regeneration for `key` is running in this process.
    pub fn is_regenerating(&self, key: &str) -> bool {
        self.claims.is_claimed(key)
    }

    async fn serve_stale(&self, key: &str, entry: CacheEntry) -> IsrResponse {
        debug!(key, "serving stale entry while regenerating");
        self.stats.write().await.record_stale_hit();
        IsrResponse::from_entry(entry, ServedFrom::Stale)
    }

    /// Runs the claimed regeneration in a spawned task and waits for it.
    async fn regenerate<F, Fut>(
        &self,
        key: &str,
        previous: Option<CacheEntry>,
        guard: ClaimGuard,
        render: F,
    ) -> Result<IsrResponse>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<RenderedPage>> + Send + 'static,
    {
        let coordinator = self.clone();
        let owned_key = key.to_string();

        let task = tokio::spawn(async move {
            let _guard = guard;
            coordinator.run_regeneration(&owned_key, previous, render).await
        });

        match task.await {
            Ok(result) => result,
            Err(err) => {
                error!(key, error = %err, "regeneration task aborted");
                self.stats.write().await.record_render_failure();
                Err(CacheError::Internal(format!(
                    "regeneration task for '{key}' failed: {err}"
                )))
            }
        }
    }

    async fn run_regeneration<F, Fut>(
        &self,
        key: &str,
        previous: Option<CacheEntry>,
        render: F,
    ) -> Result<IsrResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<RenderedPage>>,
    {
        if let Some(entry) = &previous {
            let claimed = entry.with_regeneration_claimed(current_timestamp_ms());
            self.write(key, claimed).await?;
        }

        info!(key, stale = previous.is_some(), "regenerating");
        let started = Instant::now();

        match render().await {
            Ok(page) => {
                let entry = CacheEntry::new(page.content, page.headers);
                if let Err(err) = self.write(key, entry.clone()).await {
                    if let Some(previous) = &previous {
                        self.clear_flag(key, previous).await;
                    }
                    return Err(err);
                }

                self.stats.write().await.record_regeneration();
                info!(
                    key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "regenerated"
                );
                Ok(IsrResponse::from_entry(entry, ServedFrom::Regenerated))
            }
            Err(err) => {
                self.stats.write().await.record_render_failure();
                let message = format!("{err:#}");
                warn!(key, error = %message, "render failed");
                if let Some(previous) = &previous {
                    self.clear_flag(key, previous).await;
                }
                Err(CacheError::render_failure(key, &err))
            }
        }
    }

    /// Restores `previous` without its flag.
    ///
    /// Retries up to `flag_clear_attempts` times, then removes the entry so
    /// the key cannot stay flagged.
    async fn clear_flag(&self, key: &str, previous: &CacheEntry) {
        let attempts = self.policy.flag_clear_attempts;

        for attempt in 1..=attempts {
            match self.restore_unflagged(key, previous).await {
                Ok(()) => return,
                Err(err) => {
                    self.note_storage_error(key, "clear flag", &err).await;
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.flag_clear_backoff).await;
                    }
                }
            }
        }

        match self.storage.remove_item(key).await {
            Ok(()) => warn!(key, attempts, "flag clear failed, removed entry instead"),
            Err(err) => {
                self.note_storage_error(key, "force clear", &err).await;
                error!(
                    key,
                    error = %err,
                    "could not clear regeneration flag; key stays flagged until the timeout"
                );
            }
        }
    }

    /// Writes `previous` back unflagged, unless the stored entry is no longer
    /// the snapshot this regeneration flagged.
    async fn restore_unflagged(&self, key: &str, previous: &CacheEntry) -> Result<()> {
        match self.storage.get_item(key).await? {
            Some(current)
                if current.regeneration_in_progress
                    && current.created_at == previous.created_at =>
            {
                self.storage
                    .set_item(key, previous.with_regeneration_cleared())
                    .await
            }
            Some(_) => {
                debug!(key, "entry replaced during regeneration, leaving it");
                Ok(())
            }
            None => {
                debug!(key, "entry removed during regeneration, not restoring it");
                Ok(())
            }
        }
    }

    async fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        match self.storage.get_item(key).await {
            Ok(entry) => Ok(entry),
            Err(err) => {
                self.note_storage_error(key, "read", &err).await;
                Err(err)
            }
        }
    }

    async fn write(&self, key: &str, entry: CacheEntry) -> Result<()> {
        match self.storage.set_item(key, entry).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.note_storage_error(key, "write", &err).await;
                Err(err)
            }
        }
    }

    async fn note_storage_error(&self, key: &str, op: &str, err: &CacheError) {
        if err.is_backend_error() {
            self.stats.write().await.record_storage_error();
        }
        warn!(
            key,
            op,
            backend = self.storage.name(),
            error = %err,
            "storage operation failed"
        );
    }
}
