//! WordPress bulk manager API client.
//!
//! Provides one client per site with response caching, retry with
//! exponential backoff, request pacing and typed helpers for the
//! content, media and plugin endpoints.
//!
//! ### Wire contract
//!
//! - **Endpoint root**: `{site}/wp-json/wpbm/v1/`
//! - **Authentication**: `X-API-Key` header on every API request.
//! - **Caching**: only GET responses, keyed by site, endpoint and sorted params.
//!   POST, PUT and DELETE never read or write the cache.
//! - **Retries**: connection failures, timeouts and 5xx responses are retried
//!   with delays of `base`, `2·base`, `4·base`...; 4xx responses are returned at once.

pub mod archive;
pub mod base_url;
pub mod content;
pub mod error;
pub mod media;
pub mod plugins;
pub mod retry;

pub use archive::{ArchiveSummary, validate_plugin_archive};
pub use content::{ContentItem, ContentQuery, ContentUpdate, RemoteSearchReplace, Revision};
pub use error::ApiError;
pub use media::{MediaItem, MediaQuery, MediaUpdate};
pub use plugins::{PluginAction, PluginInfo, PluginResponse, PluginState};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Method, header};
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use wpbm_core::cache::compute_cache_key;
use wpbm_core::{AppConfig, CacheStore, Site};

/// Header carrying the site API key.
const API_KEY_HEADER: &str = "X-API-Key";

/// Longest server message kept in an [`ApiError::Http`].
const MAX_ERROR_MESSAGE: usize = 500;

/// Immutable per-client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub cache_enabled: bool,
    pub cache_ttl_seconds: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub timeout_ms: u64,
    pub user_agent: String,
    pub request_interval_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ClientOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            cache_enabled: config.cache_enabled,
            cache_ttl_seconds: config.cache_ttl_seconds,
            max_retries: config.max_retries,
            retry_base_delay_ms: config.retry_base_delay_ms,
            timeout_ms: config.timeout_ms,
            user_agent: config.user_agent.clone(),
            request_interval_ms: config.request_interval_ms,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_base_delay_ms))
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self { last_request: Mutex::new(None), min_interval }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// API client bound to one site.
#[derive(Clone)]
pub struct WpClient {
    http: reqwest::Client,
    site: Site,
    base: url::Url,
    api_root: url::Url,
    options: ClientOptions,
    cache: Option<CacheStore>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    rate_limiter: Arc<RateLimiter>,
}

impl fmt::Debug for WpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WpClient")
            .field("site", &self.site)
            .field("api_root", &self.api_root.as_str())
            .field("cache", &self.cache.is_some())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl WpClient {
    /// Create a client for `site`. No request is made.
    pub fn new(site: Site, options: ClientOptions) -> Result<Self, ApiError> {
        if site.api_key.trim().is_empty() {
            return Err(ApiError::MissingApiKey(site.name.clone()));
        }

        let base = base_url::canonicalize_base(&site.base_url)?;
        let api_root = base_url::api_root(&base)?;

        let http = reqwest::Client::builder()
            .timeout(options.timeout())
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Network(Arc::new(e)))?;

        Ok(Self {
            http,
            site,
            base,
            api_root,
            retry: options.retry_policy(),
            rate_limiter: Arc::new(RateLimiter::new(Duration::from_millis(options.request_interval_ms))),
            options,
            cache: None,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Attach a shared cache store. Ignored when caching is disabled in the options.
    pub fn with_cache(mut self, cache: &CacheStore) -> Self {
        self.cache = self.options.cache_enabled.then(|| cache.with_ttl(self.options.cache_ttl()));
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Canonical base URL of the site, without trailing slash.
    pub fn site_url(&self) -> String {
        base_url::base_key(&self.base)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<url::Url, ApiError> {
        self.api_root
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidInput(format!("bad endpoint {endpoint:?}: {e}")))
    }

    /// GET `endpoint` with query `params`.
    ///
    /// With caching enabled and `use_cache` set, a fresh cached response is
    /// returned without touching the network and a network response is stored.
    /// Cache failures are logged and treated as misses.
    pub async fn get(&self, endpoint: &str, params: &[(&str, String)], use_cache: bool) -> Result<Value, ApiError> {
        let cache = if use_cache { self.cache.as_ref() } else { None };
        let key = cache.map(|_| compute_cache_key(&self.site_url(), endpoint, params));

        if let (Some(cache), Some(key)) = (cache, key.as_deref()) {
            match cache.get(key).await {
                Ok(Some(value)) => {
                    tracing::debug!(site = %self.site.name, endpoint, "cache hit");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(site = %self.site.name, endpoint, error = %e, "cache read failed"),
            }
        }

        let value = self.send(Method::GET, endpoint, params, None::<&()>).await?;

        if let (Some(cache), Some(key)) = (cache, key.as_deref()) {
            if let Err(e) = cache.set(key, endpoint, &value).await {
                tracing::warn!(site = %self.site.name, endpoint, error = %e, "cache write failed");
            }
        }

        Ok(value)
    }

    pub async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value, ApiError> {
        self.send(Method::POST, endpoint, &[], Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value, ApiError> {
        self.send(Method::PUT, endpoint, &[], Some(body)).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.send(Method::DELETE, endpoint, &[], None::<&()>).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self, method: Method, endpoint: &str, params: &[(&str, String)], body: Option<&B>,
    ) -> Result<Value, ApiError> {
        let url = &self.endpoint_url(endpoint)?;
        let method = &method;
        let what = &format!("{method} {endpoint}");

        self.retry
            .run(self.sleeper.as_ref(), what, || async move {
                self.rate_limiter.acquire().await;
                tracing::debug!(site = %self.site.name, request = %what, "sending request");

                let mut request = self
                    .http
                    .request(method.clone(), url.clone())
                    .header(API_KEY_HEADER, &self.site.api_key)
                    .header(header::ACCEPT, "application/json");
                if !params.is_empty() {
                    request = request.query(params);
                }
                if let Some(body) = body {
                    request = request.json(body);
                }

                let response = request.send().await?;
                read_json(response).await
            })
            .await
    }

    /// Multipart POST. The form is rebuilt for each attempt.
    pub(crate) async fn post_multipart<F>(&self, endpoint: &str, timeout: Duration, build: F) -> Result<Value, ApiError>
    where
        F: Fn() -> Result<reqwest::multipart::Form, ApiError>,
    {
        let url = &self.endpoint_url(endpoint)?;
        let build = &build;
        let what = &format!("POST {endpoint} (multipart)");

        self.retry
            .run(self.sleeper.as_ref(), what, || async move {
                let form = build()?;
                self.rate_limiter.acquire().await;
                tracing::debug!(site = %self.site.name, request = %what, "sending request");

                let response = self
                    .http
                    .post(url.clone())
                    .header(API_KEY_HEADER, &self.site.api_key)
                    .header(header::ACCEPT, "application/json")
                    .timeout(timeout)
                    .multipart(form)
                    .send()
                    .await?;
                read_json(response).await
            })
            .await
    }

    /// Stream `file_url` to `dest`, returning the number of bytes written.
    ///
    /// The API key is not sent: media files are usually served from the
    /// uploads directory or a CDN. A failed attempt truncates the file on the
    /// next try; after the last failure the partial file is removed.
    pub async fn download(&self, file_url: &str, dest: &Path) -> Result<u64, ApiError> {
        let parsed = &url::Url::parse(file_url).map_err(|e| ApiError::InvalidInput(format!("{file_url}: {e}")))?;
        let what = &format!("GET {file_url}");

        let result = self
            .retry
            .run(self.sleeper.as_ref(), what, || async move {
                self.rate_limiter.acquire().await;
                tracing::debug!(site = %self.site.name, url = %parsed, "downloading");

                let mut response = self.http.get(parsed.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ApiError::Http { status: status.as_u16(), message: String::new() });
                }

                let mut file = tokio::fs::File::create(dest).await?;
                let mut written = 0u64;
                while let Some(chunk) = response.chunk().await? {
                    file.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                file.flush().await?;
                Ok(written)
            })
            .await;

        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    /// Server health endpoint.
    pub async fn health(&self) -> Result<Value, ApiError> {
        self.get("health", &[], false).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(ApiError::Http { status: status.as_u16(), message: error_message(&bytes) });
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Pull a human readable message out of an error body. WordPress errors look
/// like `{"code": "...", "message": "...", "data": {"status": 400}}`.
fn error_message(body: &[u8]) -> String {
    let text = match serde_json::from_slice::<Value>(body) {
        Ok(json) => match json.get("message").or_else(|| json.get("error")).and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => String::from_utf8_lossy(body).into_owned(),
        },
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    };
    let text = text.trim();
    match text.char_indices().nth(MAX_ERROR_MESSAGE) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Accept either a bare JSON array or an object wrapping one under `field`.
pub(crate) fn unwrap_list(value: Value, field: &str) -> Result<Vec<Value>, ApiError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(field) {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(ApiError::Parse(format!("expected array under {field:?}, got {other}"))),
        },
        Value::Null => Ok(Vec::new()),
        other => Err(ApiError::Parse(format!("expected list response, got {other}"))),
    }
}

/// Accept either the object itself or the object wrapped under `field`.
pub(crate) fn unwrap_object(value: Value, field: &str) -> Value {
    match value {
        Value::Object(mut map) if map.get(field).is_some_and(Value::is_object) && !map.contains_key("id") => {
            map.remove(field).unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn site(server: &wiremock::MockServer) -> Site {
        Site::new("acme", server.uri(), "test-key")
    }

    pub fn options() -> ClientOptions {
        ClientOptions { retry_base_delay_ms: 1_000, ..Default::default() }
    }

    pub fn client(server: &wiremock::MockServer) -> WpClient {
        WpClient::new(site(server), options())
            .unwrap()
            .with_sleeper(Arc::new(retry::testing::RecordingSleeper::default()))
    }
}
