//! API Handlers
//!
//! HTTP request handlers for the demo page server.

use std::time::Duration;

use anyhow::{bail, Context};
use askama::Template;
use axum::{
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::isr::{IsrCoordinator, IsrResponse, RenderedPage};
use crate::models::{HealthResponse, InvalidateResponse, StatsResponse};

/// Header naming where a page response came from
pub const ISR_CACHE_HEADER: &str = "x-isr-cache";

/// Paths under this prefix make the demo renderer fail
pub const FAILING_PAGE_PREFIX: &str = "/error";

#[derive(Template)]
#[template(path = "page.html")]
struct DemoPageTemplate<'a> {
    path: &'a str,
    rendered_at: String,
}

/// Stand-in for a real server renderer.
///
/// Produces a small HTML page stamped with the render time.
#[derive(Debug, Clone, Default)]
pub struct DemoRenderer {
    delay: Duration,
}

impl DemoRenderer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn render(&self, path: &str) -> anyhow::Result<RenderedPage> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if path.starts_with(FAILING_PAGE_PREFIX) {
            bail!("demo renderer refuses to render '{path}'");
        }

        let page = DemoPageTemplate {
            path,
            rendered_at: Utc::now().to_rfc3339(),
        };
        let html = page
            .render()
            .with_context(|| format!("page template failed for '{path}'"))?;
        Ok(RenderedPage::html(html))
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub isr: IsrCoordinator,
    pub renderer: DemoRenderer,
    /// Max age applied to every page route
    pub max_age_ms: u64,
}

impl AppState {
    pub fn new(isr: IsrCoordinator, renderer: DemoRenderer, max_age_ms: u64) -> Self {
        Self {
            isr,
            renderer,
            max_age_ms,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the configured storage backend and regeneration policy.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = config.build_storage()?;
        let isr = IsrCoordinator::with_policy(storage, config.regeneration_policy());
        let renderer = DemoRenderer::new(Duration::from_millis(config.render_delay_ms));
        Ok(Self::new(isr, renderer, config.default_max_age_ms))
    }
}

/// Handler for GET /pages/*path
///
/// Serves the page through the ISR coordinator.
pub async fn page_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response> {
    let key = page_key(&path);
    let renderer = state.renderer.clone();
    let render_key = key.clone();

    let page = state
        .isr
        .lookup(&key, state.max_age_ms, move || async move {
            renderer.render(&render_key).await
        })
        .await?;

    Ok(page_response(&key, page))
}

/// Handler for DELETE /pages/*path
///
/// Drops the cached page so the next request renders it.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let key = page_key(&path);
    state.isr.invalidate(&key).await?;

    Ok(Json(InvalidateResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.isr.stats().await;
    Json(StatsResponse::new(&stats, state.isr.storage_name()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

fn page_key(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

fn page_response(key: &str, page: IsrResponse) -> Response {
    let served_from = page.served_from;
    let mut response = (StatusCode::OK, page.content).into_response();
    let headers = response.headers_mut();

    for (name, value) in &page.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(key, header = %name, "dropping invalid stored header"),
        }
    }
    headers.insert(
        HeaderName::from_static(ISR_CACHE_HEADER),
        HeaderValue::from_static(served_from.as_str()),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, Headers};
    use crate::error::CacheError;
    use crate::storage::{CacheStorage, InMemoryCache};
    use std::sync::Arc;

    fn test_state() -> (AppState, Arc<InMemoryCache<CacheEntry>>) {
        let storage = Arc::new(InMemoryCache::<CacheEntry>::new(100).unwrap());
        let isr = IsrCoordinator::new(storage.clone());
        (AppState::new(isr, DemoRenderer::default(), 60_000), storage)
    }

    fn served_from(response: &Response) -> &str {
        response.headers()[ISR_CACHE_HEADER].to_str().unwrap()
    }

    #[test]
    fn test_page_key() {
        assert_eq!(page_key("blog/post"), "/blog/post");
        assert_eq!(page_key("/already"), "/already");
    }

    #[tokio::test]
    async fn test_demo_renderer_escapes_path() {
        let page = DemoRenderer::default()
            .render("/a<script>&b")
            .await
            .unwrap();

        assert!(page.content.contains("<h1>/a&lt;script&gt;&amp;b</h1>"));
        assert!(!page.content.contains("<script>"));
    }

    #[tokio::test]
    async fn test_demo_renderer() {
        let page = DemoRenderer::default().render("/about").await.unwrap();
        assert!(page.content.contains("<h1>/about</h1>"));
        assert_eq!(page.headers["content-type"], "text/html; charset=utf-8");

        assert!(DemoRenderer::default().render("/error/500").await.is_err());
    }

    #[tokio::test]
    async fn test_page_handler_renders_then_hits() {
        let (state, storage) = test_state();

        let first = page_handler(State(state.clone()), Path("home".to_string()))
            .await
            .unwrap();
        assert_eq!(served_from(&first), "regenerated");
        assert_eq!(
            first.headers()["content-type"],
            "text/html; charset=utf-8"
        );
        assert!(storage.get_item("/home").await.unwrap().is_some());

        let second = page_handler(State(state), Path("home".to_string()))
            .await
            .unwrap();
        assert_eq!(served_from(&second), "fresh");
    }

    #[tokio::test]
    async fn test_page_handler_skips_invalid_stored_headers() {
        let (state, storage) = test_state();
        let headers = Headers::from([
            ("x-page".to_string(), "kept".to_string()),
            ("bad header".to_string(), "dropped".to_string()),
        ]);
        storage
            .set_item("/custom", CacheEntry::new("<p>hi</p>".to_string(), headers))
            .await
            .unwrap();

        let response = page_handler(State(state), Path("custom".to_string()))
            .await
            .unwrap();
        assert_eq!(served_from(&response), "fresh");
        assert_eq!(response.headers()["x-page"], "kept");
        assert!(response.headers().iter().all(|(_, v)| v != "dropped"));
    }

    #[tokio::test]
    async fn test_page_handler_render_failure() {
        let (state, _) = test_state();

        let result = page_handler(State(state), Path("error/boom".to_string())).await;
        assert!(matches!(result, Err(CacheError::RenderFailure { .. })));
    }

    #[tokio::test]
    async fn test_invalidate_handler() {
        let (state, storage) = test_state();
        page_handler(State(state.clone()), Path("gone".to_string()))
            .await
            .unwrap();

        let response = invalidate_handler(State(state.clone()), Path("gone".to_string()))
            .await
            .unwrap();
        assert_eq!(response.key, "/gone");
        assert!(storage.get_item("/gone").await.unwrap().is_none());

        // Invalidating an absent page succeeds
        assert!(invalidate_handler(State(state), Path("never".to_string()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let (state, _) = test_state();
        page_handler(State(state.clone()), Path("a".to_string()))
            .await
            .unwrap();
        page_handler(State(state.clone()), Path("a".to_string()))
            .await
            .unwrap();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.misses, 1);
        assert_eq!(response.fresh_hits, 1);
        assert_eq!(response.regenerations, 1);
        assert_eq!(response.backend, "memory");
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
