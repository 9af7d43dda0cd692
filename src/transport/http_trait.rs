//! Trait abstraction for HTTP calls to enable testing

use async_trait::async_trait;
use thiserror::Error;

/// Header carrying the static API key on every request
pub const API_KEY_HEADER: &str = "x-api-key";

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    /// True for any 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure (no usable response)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Request never completed: connect, DNS, timeout
    #[error("{0}")]
    Request(String),

    /// Response arrived but its body could not be read
    #[error("{0}")]
    Body(String),
}

/// Trait for the two HTTP calls the client makes
///
/// Implementations send `Content-Type: application/json` and
/// [`API_KEY_HEADER`] with every request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST a JSON body
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, TransportError>;

    /// GET a resource
    async fn get(&self, url: &str, api_key: &str) -> Result<HttpResponse, TransportError>;
}
