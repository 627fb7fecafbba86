//! Remote storage backend
//!
//! Stores JSON-encoded values in a mini-redis style HTTP key-value server:
//! - `PUT /set` with `{"key", "value", "ttl"}`
//! - `GET /get/:key` returning `{"key", "value"}`, 404 when absent
//! - `DELETE /del/:key`, 404 when absent

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CacheError, Result};
use crate::models::{GetResponse, SetRequest, MAX_REMOTE_KEY_LENGTH};
use crate::storage::CacheStorage;

/// Request timeout applied to every call to the store
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client backend for an external key-value store.
#[derive(Debug, Clone)]
pub struct RemoteCache<V> {
    client: Client,
    base_url: Url,
    /// TTL in seconds sent with every write
    ttl: Option<u64>,
    _value: PhantomData<fn() -> V>,
}

impl<V> RemoteCache<V> {
    /// Creates a backend for the store at `base_url`.
    pub fn new(base_url: &str, ttl: Option<u64>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(client, base_url, ttl)
    }

    /// Creates a backend sharing an existing HTTP client.
    pub fn with_client(client: Client, base_url: &str, ttl: Option<u64>) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            CacheError::InvalidRequest(format!("invalid remote cache URL '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CacheError::InvalidRequest(format!(
                "remote cache URL '{base_url}' cannot be a base"
            )));
        }

        Ok(Self {
            client,
            base_url,
            ttl,
            _value: PhantomData,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                CacheError::InvalidRequest(format!("cannot extend URL '{}'", self.base_url))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }
}

/// Rejects keys the store would refuse, before any request is made.
///
/// Checked on reads too, so an unstorable page fails before it is rendered.
fn check_key(key: &str) -> Result<()> {
    if key.len() > MAX_REMOTE_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "key of {} bytes exceeds the remote store limit of {} bytes",
            key.len(),
            MAX_REMOTE_KEY_LENGTH
        )));
    }
    Ok(())
}

fn unavailable(op: &str, key: &str, err: impl std::fmt::Display) -> CacheError {
    CacheError::BackendUnavailable(format!("remote {op} '{key}' failed: {err}"))
}

#[async_trait]
impl<V> CacheStorage<V> for RemoteCache<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get_item(&self, key: &str) -> Result<Option<V>> {
        check_key(key)?;
        let url = self.endpoint(&["get", key])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable("get", key, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: GetResponse = response
                    .json()
                    .await
                    .map_err(|e| unavailable("get", key, e))?;
                let value = serde_json::from_str(&body.value)
                    .map_err(|e| unavailable("get", key, format!("undecodable value: {e}")))?;
                Ok(Some(value))
            }
            status => Err(unavailable("get", key, format!("status {status}"))),
        }
    }

    async fn set_item(&self, key: &str, value: V) -> Result<()> {
        let request = SetRequest {
            key: key.to_string(),
            value: serde_json::to_string(&value)
                .map_err(|e| unavailable("set", key, format!("unencodable value: {e}")))?,
            ttl: self.ttl,
        };
        if let Some(error_msg) = request.validate() {
            return Err(CacheError::InvalidRequest(error_msg));
        }

        let url = self.endpoint(&["set"])?;
        let response = self
            .client
            .put(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| unavailable("set", key, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(unavailable("set", key, format!("status {status}")))
        }
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        check_key(key)?;
        let url = self.endpoint(&["del", key])?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| unavailable("remove", key, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => Err(unavailable("remove", key, format!("status {status}"))),
        }
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
