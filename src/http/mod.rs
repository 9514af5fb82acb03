/// HTTP plumbing shared by every upstream client.
///
/// ```text
/// http
/// ├── (mod)     — request/response types and the `HttpTransport` seam
/// ├── fetch     — resilient fetch: direct attempt, proxy fallback, retries, cancellation
/// └── normalize — proxy envelope unwrapping and response shape checks
/// ```
///
/// Clients never talk to `reqwest` directly. They hand an `HttpRequest` to a
/// `Fetcher`, which drives an `HttpTransport`. Production uses
/// `ReqwestTransport`; tests script their own transport.

pub mod fetch;
pub mod normalize;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::error::TransportError;

pub use fetch::{CancelHandle, CancelSignal, FetchOptions, Fetcher, RequestInit, cancel_pair, preview};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        HttpRequest {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Builds a request for `url` carrying the method, headers and body of `init`.
    pub fn with_init(url: impl Into<String>, init: &RequestInit) -> Self {
        HttpRequest {
            method: init.method,
            url: url.into(),
            headers: init.headers.clone(),
            body: init.body.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One request, one response. Timeouts, retries and cancellation are layered
/// on top by `Fetcher`; a transport only reports what happened on the wire.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// reqwest transport
// ---------------------------------------------------------------------------

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(ReqwestTransport { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}
