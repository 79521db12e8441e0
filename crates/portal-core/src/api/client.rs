//! API client for the portal's serverless functions.
//!
//! `PortalClient` owns the three moving parts of every call: the transport,
//! the TTL cache and the in-flight request map. Resource wrappers (see
//! `collection`, `members`, `evaluations`, `resources`) build requests and
//! pick cache keys; this module decides when the network is touched.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{
    CachePolicy, CacheStore, FetchOptions, FileStorage, MemoryStorage, SingleFlight, Storage,
};
use crate::mock::MockData;

use super::retry::{retry, RetryPolicy};
use super::transport::{ApiRequest, HttpTransport, Transport};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Where the functions are served by `netlify dev`.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8888/api";

/// HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a `PortalClient` needs to know about its environment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub cache_policy: CachePolicy,
    pub retry: RetryPolicy,
    /// Serve member fixtures when the functions are unreachable.
    pub use_mock_data: bool,
    pub request_timeout: Duration,
    /// Directory for cache files; `None` keeps the cache in memory.
    pub cache_dir: Option<PathBuf>,
    pub cache_quota_bytes: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_policy: CachePolicy::default(),
            retry: RetryPolicy::default(),
            use_mock_data: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache_dir: None,
            cache_quota_bytes: None,
        }
    }
}

/// Suffix on the in-flight key of reads that carry a bearer token, so a
/// signed-in read never joins an anonymous one for the same cache key.
const AUTHED_FLIGHT_SUFFIX: &str = "#authed";

fn flight_key(key: &str, authed: bool) -> String {
    if authed {
        format!("{}{}", key, AUTHED_FLIGHT_SUFFIX)
    } else {
        key.to_string()
    }
}

/// Portal API client.
/// Clone is cheap - transport, cache and in-flight map are shared.
#[derive(Clone)]
pub struct PortalClient {
    transport: Arc<dyn Transport>,
    cache: Arc<CacheStore>,
    flights: Arc<SingleFlight<Result<Value, ApiError>>>,
    retry: RetryPolicy,
    use_mock_data: bool,
    mock: Arc<MockData>,
    token: Option<String>,
}

impl PortalClient {
    /// Build a client with an HTTP transport and the configured cache backend.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::with_timeout(config.base_url.clone(), config.request_timeout)?;

        let storage: Arc<dyn Storage> = match &config.cache_dir {
            Some(dir) => {
                let mut storage = FileStorage::new(dir.clone())
                    .with_context(|| format!("Failed to open cache directory {}", dir.display()))?;
                if let Some(quota) = config.cache_quota_bytes {
                    storage = storage.with_quota(quota);
                }
                Arc::new(storage)
            }
            None => {
                let mut storage = MemoryStorage::new();
                if let Some(quota) = config.cache_quota_bytes {
                    storage = storage.with_quota(quota);
                }
                Arc::new(storage)
            }
        };
        let cache = Arc::new(CacheStore::new(storage, config.cache_policy.clone()));

        Ok(Self::with_parts(config, Arc::new(transport), cache))
    }

    /// Assemble a client from existing parts. The cache keeps its own policy;
    /// `config.cache_policy` and `config.cache_dir` are not consulted.
    pub fn with_parts(config: ClientConfig, transport: Arc<dyn Transport>, cache: Arc<CacheStore>) -> Self {
        Self {
            transport,
            cache,
            flights: Arc::new(SingleFlight::new()),
            retry: config.retry,
            use_mock_data: config.use_mock_data,
            mock: Arc::new(MockData::new()),
            token: None,
        }
    }

    /// A client sharing this one's transport and cache, sending `token` where
    /// an endpoint wants one.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub(crate) fn require_token(&self) -> Result<&str, ApiError> {
        self.token.as_deref().ok_or(ApiError::NotAuthenticated)
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// The fixture store, if `error` means the functions are unreachable and
    /// mock data is enabled.
    pub(crate) fn mock_fallback(&self, error: &ApiError, what: &str) -> Option<&MockData> {
        if self.use_mock_data && error.is_network() {
            warn!(error = %error, "Using mock data for {} (functions not available)", what);
            Some(&self.mock)
        } else {
            None
        }
    }

    fn decode<T: DeserializeOwned>(context: &str, value: Value) -> Result<T, ApiError> {
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", context, e)))
    }

    // ===== Read path =====

    /// Cached read: serve `key` from the cache, otherwise fetch with retry
    /// (one network call per key no matter how many callers are waiting) and
    /// cache the response.
    pub async fn fetch_cached<T: DeserializeOwned>(
        &self,
        key: &str,
        request: ApiRequest,
        options: FetchOptions,
    ) -> Result<T, ApiError> {
        if !options.force_refresh {
            if let Some(cached) = self.cache.get::<T>(key) {
                return Ok(cached);
            }
        }

        debug!(key = key, path = %request.path, "Fetching from network");
        let flight_key = flight_key(key, request.bearer.is_some());
        let transport = Arc::clone(&self.transport);
        let policy = self.retry.clone();
        let cache = &self.cache;
        let mut committed: Option<Result<T, ApiError>> = None;
        let outcome = self
            .flights
            .run_and_commit(
                &flight_key,
                move || {
                    async move { retry(&policy, || transport.send(request.clone())).await }.boxed()
                },
                |result| {
                    if let Ok(value) = result {
                        let decoded = Self::decode(key, value.clone());
                        if decoded.is_ok() {
                            cache.save_with_ttl(key, value, options.ttl);
                        }
                        committed = Some(decoded);
                    }
                },
            )
            .await;

        match committed {
            Some(decoded) => decoded,
            None => {
                if outcome.leader && outcome.value.is_ok() {
                    debug!(key = key, "Not caching response from invalidated request");
                }
                Self::decode(key, outcome.value?)
            }
        }
    }

    /// Read that bypasses the cache entirely; still retried.
    pub async fn fetch_uncached<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let value = retry(&self.retry, || self.transport.send(request.clone())).await?;
        Self::decode(&path, value)
    }

    // ===== Write path =====

    /// Send a mutation once (never retried), then invalidate `keys` before
    /// returning the server's copy of the record.
    pub async fn mutate<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        keys: &[String],
    ) -> Result<T, ApiError> {
        let path = request.path.clone();
        let value = self.mutate_value(request, keys).await?;
        Self::decode(&path, value)
    }

    /// Like `mutate`, ignoring the response body.
    pub async fn mutate_discard(&self, request: ApiRequest, keys: &[String]) -> Result<(), ApiError> {
        self.mutate_value(request, keys).await.map(|_| ())
    }

    async fn mutate_value(&self, request: ApiRequest, keys: &[String]) -> Result<Value, ApiError> {
        let method = request.method.clone();
        let path = request.path.clone();
        let value = self.transport.send(request).await?;

        self.invalidate_keys(keys).await;
        debug!(method = %method, path = %path, invalidated = ?keys, "Mutation complete");
        Ok(value)
    }

    // ===== Invalidation =====

    /// Drop `key` from the cache and detach any read in flight for it, so a
    /// response that predates the mutation is never cached.
    pub async fn invalidate(&self, key: &str) {
        self.flights.forget(key).await;
        self.flights.forget(&flight_key(key, true)).await;
        self.cache.invalidate(key);
    }

    pub async fn invalidate_keys(&self, keys: &[String]) {
        for key in keys {
            self.invalidate(key).await;
        }
    }

    pub async fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        self.flights.forget_prefix(prefix).await;
        self.cache.invalidate_by_prefix(prefix)
    }

    /// Full reset, as on logout.
    pub async fn clear_all(&self) -> usize {
        self.flights.forget_prefix("").await;
        self.cache.clear_all()
    }
}
