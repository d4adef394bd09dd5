//! Authenticated REST client for the Docstore API.
//!
//! Every call is a single attempt. Non-2xx responses become
//! [`ApiError::Upstream`], connection and timeout problems become
//! [`ApiError::Transport`], and a 204 resolves to [`no_content`].

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value as JsonValue};
use url::Url;

use crate::config::Config;

/// A non-2xx response from the Docstore API.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamFailure {
    /// HTTP status code.
    pub status: u16,
    /// Upstream error string, or the status text when none was given.
    pub message: String,
    /// Parsed error body (`{}` when the body was not JSON).
    pub body: JsonValue,
}

/// Failure of a single REST call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The API answered with a non-2xx status.
    #[error("Docstore API returned HTTP {}: {}", .0.status, .0.message)]
    Upstream(UpstreamFailure),

    /// The API could not be reached or its response could not be read.
    #[error("{0}")]
    Transport(String),
}

impl ApiError {
    /// HTTP status for upstream failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Upstream(failure) => Some(failure.status),
            ApiError::Transport(_) => None,
        }
    }

    /// The most specific message available.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Upstream(failure) => &failure.message,
            ApiError::Transport(message) => message,
        }
    }
}

/// Value returned for responses without a body.
pub fn no_content() -> JsonValue {
    json!({ "success": true })
}

/// One outbound call: method, path below the project namespace, query and body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<JsonValue>,
}

impl ApiRequest {
    /// Create a request for the given path segments (relative to the project).
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    /// `GET` request.
    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::GET, segments)
    }

    /// `POST` request.
    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::POST, segments)
    }

    /// `PUT` request.
    pub fn put<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::PUT, segments)
    }

    /// `PATCH` request.
    pub fn patch<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::PATCH, segments)
    }

    /// `DELETE` request.
    pub fn delete<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::DELETE, segments)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a query parameter when a value is present.
    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v.to_string()),
            None => self,
        }
    }

    /// Attach a JSON body. Only sent for mutating methods.
    pub fn body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Query parameters in insertion order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Body that will be sent, if any.
    pub fn json_body(&self) -> Option<&JsonValue> {
        if is_mutating(&self.method) {
            self.body.as_ref()
        } else {
            None
        }
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Build the shared HTTP client used for every outbound call.
pub fn http_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(concat!("docstore-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// REST client bound to one configuration.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    config: Arc<Config>,
}

impl RestClient {
    /// Create a client from a shared HTTP client and configuration.
    pub fn new(http: reqwest::Client, config: Arc<Config>) -> Self {
        Self { http, config }
    }

    /// The configuration this client authenticates with.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Same HTTP connection pool, different configuration.
    pub fn with_config(&self, config: Arc<Config>) -> Self {
        Self {
            http: self.http.clone(),
            config,
        }
    }

    /// Full URL for a request: base URL, project, then each path segment.
    pub fn url(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = self.config.base_url().clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::Transport(format!(
                    "base URL '{}' cannot carry a path",
                    self.config.base_url()
                ))
            })?
            .pop_if_empty()
            .push(self.config.project())
            .extend(request.segments.iter());

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Perform one authenticated call.
    pub async fn call(&self, request: ApiRequest) -> Result<JsonValue, ApiError> {
        let url = self.url(&request)?;
        tracing::debug!(method = %request.method, url = %url, "docstore request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .bearer_auth(self.config.api_key())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(body) = request.json_body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            ApiError::Transport(format!(
                "Failed to reach Docstore API at {}: {}",
                self.config.base_url(),
                e
            ))
        })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(no_content());
        }

        let bytes = response.bytes().await.map_err(|e| {
            ApiError::Transport(format!("Failed to read Docstore API response body: {}", e))
        })?;

        if !status.is_success() {
            let body: JsonValue = serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({}));
            let message = upstream_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
            return Err(ApiError::Upstream(UpstreamFailure {
                status: status.as_u16(),
                message,
                body,
            }));
        }

        if bytes.is_empty() {
            return Ok(no_content());
        }
        Ok(serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(&bytes).into_owned())))
    }
}

/// Pull an error string out of the shapes the API uses for error bodies.
fn upstream_message(body: &JsonValue) -> Option<String> {
    let candidate = match body.get("error") {
        Some(JsonValue::String(s)) => Some(s.as_str()),
        Some(JsonValue::Object(obj)) => obj.get("message").and_then(JsonValue::as_str),
        _ => None,
    }
    .or_else(|| body.get("message").and_then(JsonValue::as_str))?;

    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
