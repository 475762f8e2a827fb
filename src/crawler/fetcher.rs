//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building the HTTP client with a fixed request timeout
//! - GET requests for page content
//! - Classifying failures into a reason code
//!
//! Failures are returned as values rather than errors. The crawl loop records
//! them and moves on; nothing is retried.

use reqwest::Client;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Why a fetch produced no usable response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The request did not finish within the fetch timeout
    Timeout,
    /// No connection could be established (DNS, refused, TLS)
    Connect,
    /// The response body could not be read or decoded
    Body,
    /// Any other request error
    Request,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Body => "body",
            Self::Request => "request",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A response was received; any status code counts
    Fetched {
        /// HTTP status code
        status_code: u16,
        /// URL the content was served from, after redirects
        final_url: String,
        /// Page body
        body: String,
    },

    /// No usable response
    Failed {
        reason: FailureReason,
        /// Error description for logging
        error: String,
    },
}

impl FetchOutcome {
    pub fn failed(reason: FailureReason, error: impl Into<String>) -> Self {
        Self::Failed {
            reason,
            error: error.into(),
        }
    }
}

/// Something that can fetch a page
pub trait PageFetcher {
    /// Fetches `url`, never panicking and never returning an error
    fn fetch(&self, url: &str) -> impl Future<Output = FetchOutcome> + Send;
}

/// Builds an HTTP client with the given request timeout
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("tidepool/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `PageFetcher` backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(timeout)?,
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        fetch_url(&self.client, url).await
    }
}

/// Fetches a URL and classifies the result
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | Any HTTP response with a readable body | `Fetched` with its status |
/// | Timeout | `Failed(Timeout)` |
/// | Connection refused / DNS / TLS | `Failed(Connect)` |
/// | Body read or decode error | `Failed(Body)` |
/// | Anything else | `Failed(Request)` |
pub async fn fetch_url(client: &Client, url: &str) -> FetchOutcome {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status_code = response.status().as_u16();
    let final_url = response.url().to_string();

    match response.text().await {
        Ok(body) => FetchOutcome::Fetched {
            status_code,
            final_url,
            body,
        },
        Err(e) if e.is_timeout() => FetchOutcome::failed(FailureReason::Timeout, e.to_string()),
        Err(e) => FetchOutcome::failed(FailureReason::Body, e.to_string()),
    }
}

fn classify_error(e: &reqwest::Error) -> FetchOutcome {
    let reason = if e.is_timeout() {
        FailureReason::Timeout
    } else if e.is_connect() {
        FailureReason::Connect
    } else if e.is_body() || e.is_decode() {
        FailureReason::Body
    } else {
        FailureReason::Request
    };

    FetchOutcome::failed(reason, e.to_string())
}
