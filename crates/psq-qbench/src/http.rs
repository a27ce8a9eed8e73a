//! HTTP transport seam for the QBench client.
//!
//! The client speaks to QBench through [`Transport`] so the retry and token
//! logic can be exercised against scripted responses. [`ReqwestTransport`] is
//! the production implementation.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use thiserror::Error;

use crate::error::QBenchError;

/// Throttle header QBench sends alongside 429 responses.
const THROTTLE_TTL_HEADER: &str = "X-QBAPI-Throttle-TTL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request as the client builds it, before it touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub bearer: Option<String>,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            form: Vec::new(),
            bearer: None,
        }
    }

    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    #[must_use]
    pub fn query(mut self, pairs: &[(&str, &str)]) -> Self {
        self.query
            .extend(pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));
        self
    }

    #[must_use]
    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        self.form
            .extend(pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));
        self
    }

    #[must_use]
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Status, throttle hint, and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Seconds the server asked us to wait, if it said so.
    pub retry_after_secs: Option<u64>,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after_secs: None,
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}

/// Failure to complete an exchange at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Timeouts and connection failures are worth another attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Sends one HTTP exchange. Implementations must not retry on their own.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`QBenchError::Http`] if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, QBenchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("psq/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QBenchError::Http(e.to_string()))?;
        Ok(Self { http })
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let retry_after_secs = parse_throttle_hint(resp.headers());
        let body = resp.text().await?;
        Ok(HttpResponse {
            status,
            retry_after_secs,
            body,
        })
    }
}

/// Read the wait hint from `X-QBAPI-Throttle-TTL`, falling back to `Retry-After`.
///
/// QBench reports the remaining throttle window, so one extra second is added
/// to land after it closes.
fn parse_throttle_hint(headers: &HeaderMap) -> Option<u64> {
    let secs = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };
    secs(THROTTLE_TTL_HEADER)
        .or_else(|| secs(RETRY_AFTER.as_str()))
        .map(|s| s + 1)
}

/// What the client should do with a completed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    Success,
    Unauthorized,
    NotFound,
    /// 429 or 5xx.
    Retryable,
    Rejected,
}

pub(crate) const fn classify(status: u16) -> Disposition {
    match status {
        200..=299 => Disposition::Success,
        401 => Disposition::Unauthorized,
        404 => Disposition::NotFound,
        429 | 500..=599 => Disposition::Retryable,
        _ => Disposition::Rejected,
    }
}

/// Short excerpt of a response body for error messages.
pub(crate) fn excerpt(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
