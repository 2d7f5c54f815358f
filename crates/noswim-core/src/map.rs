//! Static map snapshots centred on the current fix.
//!
//! Map display is cosmetic. A failed fetch is logged by the caller and the
//! monitoring loop carries on; nothing here retries.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default static map endpoint.
pub const DEFAULT_MAP_BASE_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";

/// Timeout for a single snapshot request.
const MAP_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors returned by a map snapshot fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection failure, timeout, or non-2xx response.
    #[error("Map request failed: {0}")]
    Request(String),

    /// The provider answered with an empty body.
    #[error("Map provider returned an empty image")]
    EmptyImage,

    /// No provider API key is configured.
    #[error("Map provider API key is not configured")]
    MissingApiKey,
}

/// Raw image bytes of a rendered snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSnapshot {
    /// Encoded image as returned by the provider.
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the provider, if any.
    pub content_type: Option<String>,
}

/// Rendering parameters that stay fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapView {
    /// Provider zoom level.
    pub zoom_level: u8,
    /// Width and height of the square image in pixels.
    pub size_px: u16,
}

/// Anything that can render a map image around a coordinate.
pub trait MapSnapshotSource: Send + Sync {
    /// Fetches one snapshot centred on `(latitude, longitude)`.
    fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        view: MapView,
    ) -> impl Future<Output = Result<MapSnapshot, FetchError>> + Send;
}

/// Google-style static map client.
#[derive(Debug, Clone)]
pub struct StaticMapFetcher {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    scale: u8,
    map_type: String,
}

impl StaticMapFetcher {
    /// Creates a fetcher for `base_url` authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Request`] if the HTTP client cannot be built.
    pub fn new(
        base_url: Url,
        api_key: impl Into<String>,
        scale: u8,
        map_type: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(MAP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            scale,
            map_type: map_type.into(),
        })
    }

    /// Builds the snapshot URL with a red marker at the centre.
    #[must_use]
    pub fn snapshot_url(&self, latitude: f64, longitude: f64, view: MapView) -> Url {
        let center = format!("{latitude},{longitude}");
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("center", &center)
            .append_pair("zoom", &view.zoom_level.to_string())
            .append_pair("size", &format!("{0}x{0}", view.size_px))
            .append_pair("scale", &self.scale.to_string())
            .append_pair("maptype", &self.map_type)
            .append_pair("markers", &format!("color:red|{center}"))
            .append_pair("key", &self.api_key);
        url
    }
}

impl MapSnapshotSource for StaticMapFetcher {
    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        view: MapView,
    ) -> Result<MapSnapshot, FetchError> {
        if self.api_key.trim().is_empty() {
            return Err(FetchError::MissingApiKey);
        }

        let url = self.snapshot_url(latitude, longitude, view);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Request(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(format!("Failed to read image: {e}")))?;

        if bytes.is_empty() {
            return Err(FetchError::EmptyImage);
        }

        Ok(MapSnapshot {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
