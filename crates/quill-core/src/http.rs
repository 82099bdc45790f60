//! Thin JSON-over-HTTP client for the blog API.
//!
//! Every request carries `Content-Type: application/json`, an optional bearer
//! token and caller headers (which win on conflicts). Responses are normalized
//! into a [`Payload`] on success or an [`ApiError`] on failure.

use std::fmt;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::context::ClientContext;

/// Standard User-Agent header for quill API requests.
pub const USER_AGENT: &str = concat!("quill/", env!("CARGO_PKG_VERSION"));

/// Categories of API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The request never completed (DNS, connect, reset, body read)
    Transport,
    /// The API answered with a non-2xx status
    HttpStatus,
    /// A successful body did not match the expected shape
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Transport => write!(f, "transport"),
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Response body, parsed according to its declared content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    /// Converts the payload to JSON; text bodies become JSON strings.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
        }
    }

    /// Deserializes a JSON payload into `T`.
    ///
    /// # Errors
    /// Returns a parse error if the payload is text or has the wrong shape.
    pub fn decode<T: DeserializeOwned>(self) -> ApiResult<T> {
        match self {
            Payload::Json(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::parse(format!("Unexpected response shape: {e}"))),
            Payload::Text(_) => Err(ApiError::parse("Expected a JSON response")),
        }
    }
}

/// Structured failure of an API call.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// HTTP status, when the API answered
    pub status: Option<u16>,
    /// Raw parsed body of a failed response
    pub body: Option<Payload>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Creates a transport error from a failed request.
    pub fn transport(err: &reqwest::Error) -> Self {
        Self::new(ApiErrorKind::Transport, format!("Network error: {err}"))
    }

    /// Creates an HTTP status error.
    ///
    /// The message prefers a non-empty string `error` field of a JSON body,
    /// then the canonical reason phrase of the status.
    pub fn http_status(status: StatusCode, body: Payload) -> Self {
        let message = body
            .as_json()
            .and_then(|json| json.get("error"))
            .and_then(Value::as_str)
            .filter(|msg| !msg.is_empty())
            .map(ToString::to_string)
            .or_else(|| status.canonical_reason().map(ToString::to_string))
            .unwrap_or_else(|| "Request failed".to_string());

        Self {
            kind: ApiErrorKind::HttpStatus,
            message,
            status: Some(status.as_u16()),
            body: Some(body),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    pub fn is_status(&self, status: u16) -> bool {
        self.status == Some(status)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Per-request token and header overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions<'a> {
    pub token: Option<&'a str>,
    pub headers: HeaderMap,
}

impl<'a> RequestOptions<'a> {
    /// Options carrying only a bearer token (if any).
    pub fn bearer(token: Option<&'a str>) -> Self {
        Self {
            token,
            headers: HeaderMap::new(),
        }
    }

    /// Adds a caller header; it replaces any default header of the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }
}

/// Builds the request headers: JSON content type, bearer token, then caller
/// headers replacing defaults with the same name.
pub fn build_headers(token: Option<&str>, extra: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("access token is not a valid header value; sending without it"),
        }
    }

    for name in extra.keys() {
        headers.remove(name);
    }
    for (name, value) in extra {
        headers.append(name.clone(), value.clone());
    }

    headers
}

/// Blog API HTTP client bound to one base address.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client; the base address is resolved once from the context.
    ///
    /// # Errors
    /// Returns a transport error if the TLS backend cannot be initialized.
    pub fn new(context: &ClientContext) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ApiError::new(
                    ApiErrorKind::Transport,
                    format!("Failed to build HTTP client: {e}"),
                )
            })?;

        Ok(Self {
            base_url: context.base_url().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Full URL for an API path (plain concatenation).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// # Errors
    /// Returns an [`ApiError`] on transport failure or non-2xx status.
    pub async fn get(&self, path: &str, options: &RequestOptions<'_>) -> ApiResult<Payload> {
        self.send(Method::GET, path, None, options).await
    }

    /// Sends `body` as JSON (`{}` when absent).
    ///
    /// # Errors
    /// Returns an [`ApiError`] on transport failure or non-2xx status.
    pub async fn post(
        &self,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions<'_>,
    ) -> ApiResult<Payload> {
        let body = body.cloned().unwrap_or_else(empty_object);
        self.send(Method::POST, path, Some(body), options).await
    }

    /// Sends `body` as JSON (`{}` when absent).
    ///
    /// # Errors
    /// Returns an [`ApiError`] on transport failure or non-2xx status.
    pub async fn put(
        &self,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions<'_>,
    ) -> ApiResult<Payload> {
        let body = body.cloned().unwrap_or_else(empty_object);
        self.send(Method::PUT, path, Some(body), options).await
    }

    /// # Errors
    /// Returns an [`ApiError`] on transport failure or non-2xx status.
    pub async fn delete(&self, path: &str, options: &RequestOptions<'_>) -> ApiResult<Payload> {
        self.send(Method::DELETE, path, None, options).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: &RequestOptions<'_>,
    ) -> ApiResult<Payload> {
        let url = self.url(path);
        tracing::debug!(%method, %url, authorized = options.token.is_some(), "api request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .headers(build_headers(options.token, &options.headers));
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!(%method, %url, error = %e, "api request failed");
            ApiError::transport(&e)
        })?;

        handle_response(response).await
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

async fn handle_response(response: reqwest::Response) -> ApiResult<Payload> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let payload = if is_json {
        let bytes = response.bytes().await.map_err(|e| ApiError::transport(&e))?;
        Payload::Json(serde_json::from_slice(&bytes).unwrap_or_else(|_| empty_object()))
    } else {
        Payload::Text(response.text().await.map_err(|e| ApiError::transport(&e))?)
    };

    tracing::debug!(status = status.as_u16(), "api response");

    if status.is_success() {
        Ok(payload)
    } else {
        Err(ApiError::http_status(status, payload))
    }
}
