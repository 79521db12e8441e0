//! HTTP transport seam.
//!
//! `PortalClient` talks to the portal functions through the `Transport`
//! trait so the caching and invalidation logic can be exercised without a
//! server. `HttpTransport` is the reqwest-backed implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde_json::Value;
use tracing::debug;

use super::ApiError;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A single call against the portal API, relative to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).body(body)
    }

    /// PUT carrying only `changes` plus the record id.
    ///
    /// Fields absent from `changes` are left untouched by the server, so the
    /// body never contains anything the caller did not supply.
    pub fn update(path: impl Into<String>, id: &str, changes: &Value) -> Result<Self, ApiError> {
        let Value::Object(fields) = changes else {
            return Err(ApiError::InvalidRequest("update must be a JSON object".to_string()));
        };
        if id.trim().is_empty() {
            return Err(ApiError::InvalidRequest("update needs a record id".to_string()));
        }
        let mut body = fields.clone();
        body.insert("id".to_string(), Value::String(id.to_string()));
        Ok(Self::put(path, Value::Object(body)))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.bearer = token.map(str::to_string);
        self
    }

    /// Value of the first query parameter named `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Sends requests and returns the decoded JSON body.
///
/// Non-2xx responses come back as the matching `ApiError`; an empty 2xx body
/// decodes as `Value::Null`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.url_for(&request.path);
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("{} {}: {}", request.method, request.path, e))
        })
    }
}

/// Scripted transport for tests: every request is recorded and answered by a
/// handler closure, optionally after a delay.
#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    type Handler = Box<dyn Fn(&ApiRequest) -> Result<Value, ApiError> + Send + Sync>;

    pub(crate) struct FakeTransport {
        handler: Handler,
        delay: Option<Duration>,
        method_delays: HashMap<Method, Duration>,
        calls: Mutex<Vec<ApiRequest>>,
    }

    impl FakeTransport {
        pub(crate) fn new(
            handler: impl Fn(&ApiRequest) -> Result<Value, ApiError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                handler: Box::new(handler),
                delay: None,
                method_delays: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Answer every request with a clone of `value`.
        pub(crate) fn ok(value: Value) -> Self {
            Self::new(move |_| Ok(value.clone()))
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Delay only requests with `method`; overrides `with_delay`.
        pub(crate) fn with_delay_for(mut self, method: Method, delay: Duration) -> Self {
            self.method_delays.insert(method, delay);
            self
        }

        pub(crate) fn calls(&self) -> Vec<ApiRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Number of recorded calls with this method and path.
        pub(crate) fn count(&self, method: Method, path: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.method == method && r.path == path)
                .count()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
            self.calls.lock().unwrap().push(request.clone());
            let delay = self.method_delays.get(&request.method).copied().or(self.delay);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            (self.handler)(&request)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::delete("/members")
            .query("id", "42")
            .bearer(Some("tok"));
        assert_eq!(req.method, Method::DELETE);
        assert_eq!(req.query_value("id"), Some("42"));
        assert_eq!(req.bearer.as_deref(), Some("tok"));
        assert!(req.body.is_none());

        let req = ApiRequest::post("/announcements", json!({ "title": "Clinic" }));
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body, Some(json!({ "title": "Clinic" })));
    }

    #[test]
    fn test_update_body_is_exactly_the_changes_plus_id() {
        let req = ApiRequest::update("/members", "m1", &json!({ "rank": 4 })).unwrap();
        assert_eq!(req.method, Method::PUT);
        assert_eq!(req.body, Some(json!({ "id": "m1", "rank": 4 })));

        // An explicit null clears a field; it is sent as given.
        let req = ApiRequest::update("/members", "m1", &json!({ "phone": null })).unwrap();
        assert_eq!(req.body, Some(json!({ "id": "m1", "phone": null })));
    }

    #[test]
    fn test_update_rejects_non_objects_and_blank_ids() {
        let err = ApiRequest::update("/members", "m1", &json!([1, 2])).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(ApiRequest::update("/members", " ", &json!({ "rank": 4 })).is_err());
    }

    #[test]
    fn test_url_join() {
        let transport = HttpTransport::new("http://localhost:8888/api/").unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8888/api");
        assert_eq!(transport.url_for("/members"), "http://localhost:8888/api/members");
        assert_eq!(transport.url_for("members"), "http://localhost:8888/api/members");
    }
}
