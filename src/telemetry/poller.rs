//! # Telemetry Poller
//!
//! One GET against the readings endpoint per call.

use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{parse_readings, TelemetryReading};
use crate::error::PollError;
use crate::transport::HttpTransport;

/// Fetches telemetry batches from the reporting service
pub struct Poller {
    transport: Arc<dyn HttpTransport>,
    url: String,
    api_key: String,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl Poller {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Fetch and decode the latest batch
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The request fails or the body cannot be read
    /// - The service answers with a non-2xx status
    /// - The body is not a valid readings batch
    pub async fn poll(&self) -> Result<Vec<TelemetryReading>, PollError> {
        let result = self.fetch().await;
        match &result {
            Ok(readings) => debug!("Fetched {} telemetry readings", readings.len()),
            Err(e) => warn!("Failed to fetch telemetry: {}", e),
        }
        result
    }

    async fn fetch(&self) -> Result<Vec<TelemetryReading>, PollError> {
        let response = self
            .transport
            .get(&self.url, &self.api_key)
            .await
            .map_err(|e| PollError::Network(e.to_string()))?;

        if !response.is_success() {
            return Err(PollError::Status(response.status));
        }

        parse_readings(&response.body)
    }
}
