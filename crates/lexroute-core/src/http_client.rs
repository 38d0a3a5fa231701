//! Transport seam between research adapters and the network.
//!
//! Adapters describe a call as an [`HttpRequest`] and hand it to an
//! [`HttpClient`]. Production wiring uses [`ReqwestHttpClient`]; `--offline`
//! runs use [`NoopHttpClient`]; tests plug in a recording client.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::data_source::SourceError;

/// Boxed future returned by [`HttpClient::execute`].
pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Credential scheme a research service expects on the `Authorization` header.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum HttpAuth {
    #[default]
    Anonymous,
    /// `Authorization: Bearer <session>`, issued by a token exchange.
    Bearer(String),
    /// `Authorization: Token <key>`, a static API token.
    Token(String),
}

impl HttpAuth {
    fn header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Bearer(session) => Some(format!("Bearer {session}")),
            Self::Token(key) => Some(format!("Token {key}")),
        }
    }

    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = match self {
            Self::Anonymous => "anonymous",
            Self::Bearer(_) => "bearer(<redacted>)",
            Self::Token(_) => "token(<redacted>)",
        };
        f.write_str(scheme)
    }
}

/// One outbound call, as built by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Lower-cased header names.
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Appends `name=value`, percent-encoding the value.
    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        self.url
            .push_str(&format!("{separator}{name}={}", urlencoding::encode(value)));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// JSON body plus the matching content type.
    pub fn with_json(self, body: &serde_json::Value) -> Self {
        let mut request = self.with_header("content-type", "application/json");
        request.body = Some(body.to_string());
        request
    }

    pub fn with_auth(self, auth: &HttpAuth) -> Self {
        match auth.header_value() {
            Some(value) => self.with_header("authorization", value),
            None => self,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// Classifies a non-2xx status for the circuit breaker and the caller.
    pub fn status_error(&self, source: &str) -> SourceError {
        let message = format!("{source} answered HTTP {}", self.status);
        match self.status {
            401 | 403 => SourceError::unauthorized(message),
            404 => SourceError::not_found(message),
            429 => SourceError::rate_limited(message),
            400..=499 => SourceError::invalid_request(message),
            _ => SourceError::unavailable(message),
        }
    }
}

/// Failure below the HTTP status line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request could not be built: {0}")]
    Build(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl HttpError {
    pub const fn retryable(&self) -> bool {
        !matches!(self, Self::Build(_))
    }

    /// Network trouble reads as unavailability so dispatch moves on to the
    /// next candidate; a malformed request is a bug in the adapter.
    pub fn into_source_error(self, source: &str) -> SourceError {
        let message = format!("{source}: {self}");
        if self.retryable() {
            SourceError::unavailable(message)
        } else {
            SourceError::internal(message)
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(error: reqwest::Error) -> Self {
        let message = error.to_string();
        if error.is_timeout() {
            Self::Timeout(message)
        } else if error.is_connect() {
            Self::Connect(message)
        } else if error.is_builder() {
            Self::Build(message)
        } else {
            Self::Transport(message)
        }
    }
}

pub trait HttpClient: Send + Sync {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a>;
}

/// Answers every call with an empty JSON object and never touches the network.
#[derive(Debug, Default)]
pub struct NoopHttpClient;

impl HttpClient for NoopHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        tracing::trace!(method = request.method.as_str(), url = %request.url, "offline request");
        Box::pin(async { Ok(HttpResponse::ok_json("{}")) })
    }
}

/// `reqwest`-backed transport shared by every adapter in a process.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lexroute/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "falling back to default http client");
                reqwest::Client::new()
            });
        Self::with_client(client)
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            timeout_ms,
        } = request;

        let mut builder = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        }
        .timeout(Duration::from_millis(timeout_ms));
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(method = method.as_str(), %url, status, "upstream responded");
        Ok(HttpResponse { status, body })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        Box::pin(self.send(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;

    #[test]
    fn auth_schemes_render_authorization_header() {
        let bearer = HttpRequest::get("https://example.test/search")
            .with_auth(&HttpAuth::Bearer(String::from("session-1")));
        let token = HttpRequest::get("https://example.test/search")
            .with_auth(&HttpAuth::Token(String::from("cl-key")));
        let anonymous = HttpRequest::get("https://example.test/search").with_auth(&HttpAuth::Anonymous);

        assert_eq!(
            bearer.headers.get("authorization").map(String::as_str),
            Some("Bearer session-1")
        );
        assert_eq!(
            token.headers.get("authorization").map(String::as_str),
            Some("Token cl-key")
        );
        assert!(anonymous.headers.is_empty());
    }

    #[test]
    fn auth_debug_hides_secrets() {
        let rendered = format!("{:?}", HttpAuth::Token(String::from("cl-key")));
        assert!(!rendered.contains("cl-key"));
    }

    #[test]
    fn query_parameters_are_encoded_and_chained() {
        let request = HttpRequest::get("https://example.test/search")
            .with_query("q", "fair use & parody")
            .with_query("type", "o");

        assert_eq!(
            request.url,
            "https://example.test/search?q=fair%20use%20%26%20parody&type=o"
        );
    }

    #[test]
    fn json_body_sets_content_type() {
        let request =
            HttpRequest::post("https://example.test/search").with_json(&serde_json::json!({"q": 1}));

        assert_eq!(request.body.as_deref(), Some(r#"{"q":1}"#));
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn status_errors_follow_taxonomy() {
        let response = |status| HttpResponse {
            status,
            body: String::new(),
        };

        assert_eq!(response(401).status_error("x").kind(), SourceErrorKind::Unauthorized);
        assert_eq!(response(404).status_error("x").kind(), SourceErrorKind::NotFound);
        assert_eq!(response(429).status_error("x").kind(), SourceErrorKind::RateLimited);
        assert_eq!(response(503).status_error("x").kind(), SourceErrorKind::Unavailable);
    }

    #[test]
    fn transport_errors_map_by_retryability() {
        let outage = HttpError::Connect(String::from("refused")).into_source_error("westlaw");
        let bug = HttpError::Build(String::from("bad header")).into_source_error("westlaw");

        assert_eq!(outage.kind(), SourceErrorKind::Unavailable);
        assert_eq!(bug.kind(), SourceErrorKind::Internal);
    }
}
