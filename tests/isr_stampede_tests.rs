//! Stampede Tests
//!
//! Concurrent lookups on a multi-threaded runtime must collapse onto one
//! render per key.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use isr_cache::cache::Headers;
use isr_cache::{
    CacheEntry, CacheStorage, InMemoryCache, IsrCoordinator, IsrResponse, RenderedPage, ServedFrom,
};
use tokio::task::JoinSet;

const CALLERS: usize = 32;

async fn slow_render(renders: Arc<AtomicUsize>, key: String) -> anyhow::Result<RenderedPage> {
    renders.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(RenderedPage::html(format!("<h1>{key}</h1>")))
}

async fn stampede(isr: &IsrCoordinator, renders: &Arc<AtomicUsize>, key: &str) -> Vec<IsrResponse> {
    let mut callers = JoinSet::new();
    for _ in 0..CALLERS {
        let isr = isr.clone();
        let renders = Arc::clone(renders);
        let key = key.to_string();
        callers.spawn(async move {
            let render_key = key.clone();
            isr.lookup(&key, 60_000, move || slow_render(renders, render_key))
                .await
        });
    }

    let mut responses = Vec::with_capacity(CALLERS);
    while let Some(joined) = callers.join_next().await {
        responses.push(joined.unwrap().unwrap());
    }
    responses
}

fn count(responses: &[IsrResponse], served_from: ServedFrom) -> usize {
    responses
        .iter()
        .filter(|r| r.served_from == served_from)
        .count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cold_stampede_renders_once() {
    let storage = Arc::new(InMemoryCache::<CacheEntry>::new(16).unwrap());
    let isr = IsrCoordinator::new(storage.clone());
    let renders = Arc::new(AtomicUsize::new(0));

    let responses = stampede(&isr, &renders, "/cold").await;

    assert_eq!(renders.load(Ordering::SeqCst), 1);
    assert_eq!(count(&responses, ServedFrom::Regenerated), 1);
    assert_eq!(count(&responses, ServedFrom::Fresh), CALLERS - 1);
    assert!(responses.iter().all(|r| r.content == "<h1>/cold</h1>"));
    assert!(!isr.is_regenerating("/cold"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stale_stampede_renders_once() {
    let storage = Arc::new(InMemoryCache::<CacheEntry>::new(16).unwrap());
    let stale = CacheEntry::stamped("<h1>old</h1>".to_string(), Headers::new(), 0);
    storage.set_item("/stale", stale).await.unwrap();

    let isr = IsrCoordinator::new(storage.clone());
    let renders = Arc::new(AtomicUsize::new(0));

    let responses = stampede(&isr, &renders, "/stale").await;

    assert_eq!(renders.load(Ordering::SeqCst), 1);
    assert_eq!(count(&responses, ServedFrom::Regenerated), 1);
    assert_eq!(
        count(&responses, ServedFrom::Stale) + count(&responses, ServedFrom::Fresh),
        CALLERS - 1
    );

    let stored = storage.get_item("/stale").await.unwrap().unwrap();
    assert_eq!(stored.content, "<h1>/stale</h1>");
    assert!(!stored.regeneration_in_progress);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_render_independently() {
    let storage = Arc::new(InMemoryCache::<CacheEntry>::new(64).unwrap());
    let isr = IsrCoordinator::new(storage);
    let renders = Arc::new(AtomicUsize::new(0));

    let mut keys = JoinSet::new();
    for i in 0..8 {
        let isr = isr.clone();
        let renders = Arc::clone(&renders);
        keys.spawn(async move { stampede(&isr, &renders, &format!("/page/{i}")).await });
    }
    while let Some(joined) = keys.join_next().await {
        let responses = joined.unwrap();
        assert_eq!(count(&responses, ServedFrom::Regenerated), 1);
    }

    assert_eq!(renders.load(Ordering::SeqCst), 8);
    assert_eq!(isr.stats().await.regenerations, 8);
}
