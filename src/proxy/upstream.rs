//! Client for the upstream chat-completion API.

use axum::http::{header, StatusCode};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::types::UpstreamRequest;
use crate::config::{ApiKey, UpstreamConfig};

/// Failure to obtain a usable upstream response.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Connection error, timeout or other transport-level failure.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream answered with a body that is not JSON.
    #[error("invalid JSON from upstream: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A parsed upstream response, successful or not.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Value,
    /// Raw body text, kept for error reporting.
    pub raw: String,
}

impl UpstreamReply {
    /// Whether the upstream reported success (any status below 400).
    pub fn is_ok(&self) -> bool {
        self.status.as_u16() < 400
    }
}

/// Sends single-turn chat requests to the configured endpoint.
#[derive(Clone)]
pub struct UpstreamClient {
    http: Client,
    url: String,
}

impl UpstreamClient {
    /// Build a client whose every call is bounded by `timeout_secs`.
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
        })
    }

    /// POST `message` as a user turn for `model` and parse the JSON reply.
    ///
    /// Non-2xx statuses are not errors here; the caller classifies them.
    pub async fn complete(
        &self,
        api_key: &ApiKey,
        model: &str,
        message: &Value,
    ) -> Result<UpstreamReply, UpstreamError> {
        tracing::debug!(url = %self.url, model = %model, "Sending upstream request");

        let response = self
            .http
            .post(&self.url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", api_key.expose_secret()),
            )
            .json(&UpstreamRequest::user(model, message))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, model = %model, "Failed to reach upstream");
                e
            })?;

        let status = response.status();
        let raw = response.text().await?;
        let body = serde_json::from_str(&raw).map_err(|e| {
            tracing::error!(error = %e, status = %status, "Upstream returned invalid JSON");
            e
        })?;

        Ok(UpstreamReply { status, body, raw })
    }
}
