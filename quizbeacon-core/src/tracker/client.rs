//! HTTP client for the event ingestion endpoint
//!
//! Delivery is at-most-once: one POST per envelope, no retry. The outcome is
//! surfaced as a `Result` so callers can see the best-effort contract in the
//! signature, even though the fire-and-forget path only logs it.

use crate::config::TrackerConfig;
use crate::error::{Error, Result};

use super::envelope::EventEnvelope;

/// Client for POSTing event envelopes to `/api/track`
#[derive(Clone)]
pub struct TrackClient {
    http: reqwest::Client,
    ingest_url: String,
}

impl TrackClient {
    /// Create a client from tracker configuration.
    ///
    /// No request timeout is set: deliveries run as detached tasks, and a
    /// hung request costs nothing the process isn't already spending.
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            ingest_url: config.ingest_url.clone(),
        })
    }

    /// Deliver a single envelope.
    ///
    /// A non-2xx status is an error; a 2xx response whose body is not JSON
    /// is still a success (the body is parsed best-effort and ignored).
    pub async fn send(&self, envelope: &EventEnvelope) -> Result<()> {
        let response = self
            .http
            .post(&self.ingest_url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Delivery(format!(
                "ingest endpoint returned {}",
                status
            )));
        }

        if let Err(e) = response.json::<serde_json::Value>().await {
            tracing::debug!(error = %e, "Ignoring unparseable ingest response body");
        }

        Ok(())
    }
}
