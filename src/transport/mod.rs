//! # HTTP Transport Module
//!
//! Handles HTTP communication with the vehicle controller and the telemetry
//! reporting service.
//!
//! This module handles:
//! - Building the async `reqwest` client with a request timeout
//! - Attaching the JSON content type and the `x-api-key` header
//! - Turning transport failures into [`TransportError`]

pub mod http_trait;

pub use http_trait::{HttpResponse, HttpTransport, TransportError, API_KEY_HEADER};

use crate::error::{Result, RoverRemoteError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// `reqwest`-backed [`HttpTransport`]
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Build a transport whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend or client cannot be initialized
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rover_remote::transport::ReqwestTransport;
    /// use std::time::Duration;
    ///
    /// let transport = ReqwestTransport::new(Duration::from_secs(5))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RoverRemoteError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn finish(
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        debug!("HTTP {} ({} bytes)", status, body.len());
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<HttpResponse, TransportError> {
        debug!("POST {}", url);
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, api_key)
            .json(body);

        Self::finish(request).await
    }

    async fn get(&self, url: &str, api_key: &str) -> std::result::Result<HttpResponse, TransportError> {
        debug!("GET {}", url);
        let request = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, api_key);

        Self::finish(request).await
    }
}
