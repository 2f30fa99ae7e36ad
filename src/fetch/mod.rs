//! Transport layer
//!
//! The crawl orchestrator never talks to the network directly; it consumes
//! the [`Transport`] contract defined here. [`HttpTransport`] is the default
//! reqwest-backed implementation. Retries, TLS and timeouts are transport
//! concerns and stay out of the crawl loop.

use crate::graph::Validators;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// HTTP method issued by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

/// Response surface the orchestrator consumes
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,

    /// Response headers with lowercased names
    pub headers: HashMap<String, String>,

    /// Present for successful GET responses; absent for HEAD and 304
    pub body: Option<String>,
}

impl TransportResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Whether this response answered a conditional check with 304
    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }

    /// Revalidation tokens carried by this response, if any
    pub fn validators(&self) -> Option<Validators> {
        let etag = self.header("etag").map(str::to_string);
        let last_modified = self.header("last-modified").map(str::to_string);
        if etag.is_none() && last_modified.is_none() {
            None
        } else {
            Some(Validators {
                etag,
                last_modified,
            })
        }
    }
}

/// Errors reported by a transport
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Non-2xx, non-304 status
    #[error("HTTP {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("request timeout")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("network error: {0}")]
    Network(String),
}

/// Contract for the component performing the actual network request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches a resource
    ///
    /// A non-2xx, non-304 status is a failure carrying the status code and
    /// status text; 304 is an expected success answer to conditional checks.
    async fn fetch(
        &self,
        id: &str,
        method: Method,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, TransportError>;
}

/// Conditional request headers for revalidating against prior validators
pub fn conditional_headers(validators: &Validators) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    if let Some(etag) = &validators.etag {
        headers.push(("If-None-Match".to_string(), etag.clone()));
    }
    if let Some(last_modified) = &validators.last_modified {
        headers.push(("If-Modified-Since".to_string(), last_modified.clone()));
    }
    headers
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client()?,
        })
    }

    /// Wraps an already-configured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// Builds the HTTP client used by [`HttpTransport`]
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("weft/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        id: &str,
        method: Method,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, TransportError> {
        let mut request = match method {
            Method::Get => self.client.get(id),
            Method::Head => self.client.head(id),
        };
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(classify_error)?;
        let status = response.status();

        if !status.is_success() && status.as_u16() != 304 {
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let mut header_map = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                header_map.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }

        let body = match method {
            Method::Get if status.is_success() => {
                Some(response.text().await.map_err(classify_error)?)
            }
            _ => None,
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            headers: header_map,
            body,
        })
    }
}

fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}
