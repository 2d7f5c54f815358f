//! Client for the remote no-swim compliance service.
//!
//! The service answers `GET <base>?latitude=<f64>&longitude=<f64>` with a JSON
//! [`ComplianceResult`]. This module only issues the request and classifies
//! what comes back; it never retries. A failed cycle is simply followed by
//! the next one.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::types::ComplianceResult;

/// Default request timeout for compliance queries.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors returned by a compliance query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Connection failure or non-2xx response.
    #[error("API request failed (code {}): {message}", code_label(.code))]
    Transport {
        /// HTTP status code, `None` when no response was received.
        code: Option<u16>,
        /// Human-readable reason.
        message: String,
    },

    /// The response body could not be decoded into a [`ComplianceResult`].
    #[error("Failed to parse API response: {message}")]
    Parse {
        /// Decoder error text.
        message: String,
        /// The body that failed to decode.
        body: String,
    },
}

#[allow(clippy::ref_option)]
fn code_label(code: &Option<u16>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// A successful compliance query: the parsed result plus the raw body it
/// was decoded from, kept for the session log.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceResponse {
    /// Decoded determination.
    pub result: ComplianceResult,
    /// Body exactly as received.
    pub raw_body: String,
}

/// Anything that can answer "is this coordinate in a no-swim zone?".
pub trait ComplianceService: Send + Sync {
    /// The request URL that [`evaluate`](Self::evaluate) will issue.
    fn request_url(&self, latitude: f64, longitude: f64) -> String;

    /// Queries the service for one coordinate.
    fn evaluate(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<ComplianceResponse, ClientError>> + Send;
}

/// HTTP implementation backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpComplianceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpComplianceClient {
    /// Creates a client for `base_url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport {
                code: None,
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self { http, base_url })
    }

    /// Base URL this client queries.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Coordinates are passed through with their full `f64` precision.
    fn build_url(&self, latitude: f64, longitude: f64) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string());
        url
    }
}

impl ComplianceService for HttpComplianceClient {
    fn request_url(&self, latitude: f64, longitude: f64) -> String {
        self.build_url(latitude, longitude).to_string()
    }

    async fn evaluate(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ComplianceResponse, ClientError> {
        let url = self.build_url(latitude, longitude);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Transport {
                code: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport {
                code: Some(status.as_u16()),
                message: format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown Status")
                ),
            });
        }

        let raw_body = response.text().await.map_err(|e| ClientError::Transport {
            code: Some(status.as_u16()),
            message: format!("Failed to read response body: {e}"),
        })?;

        let result = serde_json::from_str::<ComplianceResult>(&raw_body).map_err(|e| {
            ClientError::Parse {
                message: e.to_string(),
                body: raw_body.clone(),
            }
        })?;

        tracing::debug!(
            in_zone = result.in_restricted_zone,
            status = %result.compliance_status,
            "Compliance query answered"
        );

        Ok(ComplianceResponse { result, raw_body })
    }
}
