//! Location sources.
//!
//! The monitor only needs four things from a positioning backend: whether it
//! is enabled, a way to start it, its current status, and the latest fix.
//! Each backend implements [`LocationSource`]; [`AnyLocationSource`] picks one
//! at runtime from configuration so the scheduler never branches on platform.
//!
//! - [`FixedLocationSource`] - a static coordinate from configuration
//! - [`ReplayLocationSource`] - replays a recorded track from a JSON file
//! - [`GpsdLocationSource`] - live fixes from a gpsd daemon over TCP

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::{LocationConfig, LocationProvider};
use crate::types::LocationFix;

mod fixed;
mod gpsd;
#[cfg(any(test, feature = "mock-location"))]
mod mock;
mod replay;

pub use fixed::FixedLocationSource;
pub use gpsd::{GpsdLocationSource, DEFAULT_GPSD_ADDRESS};
#[cfg(any(test, feature = "mock-location"))]
pub use mock::MockLocationSource;
pub use replay::{ReplayLocationSource, ReplayPoint};

/// Lifecycle status of a location source after [`LocationSource::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationStatus {
    /// Started but no usable fix yet.
    Initializing,
    /// Producing fixes.
    Running,
    /// Gave up; no fixes will follow.
    Failed,
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Running => write!(f, "running"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Errors raised while preparing a location source.
#[derive(Debug, Error)]
pub enum LocationError {
    /// A replay track could not be read.
    #[error("Failed to read replay track {path}: {source}")]
    ReplayRead {
        /// Track file path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A replay track is not a JSON array of points.
    #[error("Failed to parse replay track {path}: {source}")]
    ReplayParse {
        /// Track file path.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A replay track contains no points.
    #[error("Replay track {0} contains no points")]
    ReplayEmpty(String),

    /// The source configuration is incomplete.
    #[error("Location source misconfigured: {0}")]
    Misconfigured(String),
}

/// Platform positioning backend as seen by the monitor.
pub trait LocationSource: Send {
    /// Whether the user/device allows location access at all.
    fn is_enabled(&self) -> bool;

    /// Begins producing fixes. Called once per session.
    fn start(&mut self, desired_accuracy_m: f64, update_distance_m: f64);

    /// Current lifecycle status.
    fn status(&self) -> LocationStatus;

    /// Most recent fix, or `None` if none is available.
    fn latest_fix(&mut self) -> Option<LocationFix>;
}

/// Runtime-selected location source.
#[derive(Debug)]
pub enum AnyLocationSource {
    /// Static coordinate.
    Fixed(FixedLocationSource),
    /// Recorded track.
    Replay(ReplayLocationSource),
    /// gpsd daemon.
    Gpsd(GpsdLocationSource),
}

impl AnyLocationSource {
    /// Builds the source named by `config.provider`.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Misconfigured`] if the provider's required
    /// settings are missing.
    pub fn from_config(config: &LocationConfig) -> Result<Self, LocationError> {
        match config.provider {
            LocationProvider::Fixed => {
                let (Some(latitude), Some(longitude)) = (config.latitude, config.longitude) else {
                    return Err(LocationError::Misconfigured(
                        "fixed provider requires location.latitude and location.longitude".into(),
                    ));
                };
                Ok(Self::Fixed(FixedLocationSource::new(
                    config.enabled,
                    latitude,
                    longitude,
                    config.fixed_accuracy_m,
                )))
            }
            LocationProvider::Replay => {
                let path = config.replay_path.clone().ok_or_else(|| {
                    LocationError::Misconfigured("replay provider requires location.replay_path".into())
                })?;
                Ok(Self::Replay(ReplayLocationSource::new(config.enabled, path)))
            }
            LocationProvider::Gpsd => Ok(Self::Gpsd(GpsdLocationSource::new(
                config.enabled,
                config.gpsd_address.clone(),
            ))),
        }
    }

    /// Short provider name for logs.
    #[must_use]
    pub const fn provider_name(&self) -> &'static str {
        match self {
            Self::Fixed(_) => "fixed",
            Self::Replay(_) => "replay",
            Self::Gpsd(_) => "gpsd",
        }
    }
}

impl LocationSource for AnyLocationSource {
    fn is_enabled(&self) -> bool {
        match self {
            Self::Fixed(s) => s.is_enabled(),
            Self::Replay(s) => s.is_enabled(),
            Self::Gpsd(s) => s.is_enabled(),
        }
    }

    fn start(&mut self, desired_accuracy_m: f64, update_distance_m: f64) {
        match self {
            Self::Fixed(s) => s.start(desired_accuracy_m, update_distance_m),
            Self::Replay(s) => s.start(desired_accuracy_m, update_distance_m),
            Self::Gpsd(s) => s.start(desired_accuracy_m, update_distance_m),
        }
    }

    fn status(&self) -> LocationStatus {
        match self {
            Self::Fixed(s) => s.status(),
            Self::Replay(s) => s.status(),
            Self::Gpsd(s) => s.status(),
        }
    }

    fn latest_fix(&mut self) -> Option<LocationFix> {
        match self {
            Self::Fixed(s) => s.latest_fix(),
            Self::Replay(s) => s.latest_fix(),
            Self::Gpsd(s) => s.latest_fix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_fixed_requires_coordinates() {
        let config = LocationConfig {
            provider: LocationProvider::Fixed,
            latitude: None,
            longitude: Some(23.7),
            ..LocationConfig::default()
        };
        assert!(matches!(
            AnyLocationSource::from_config(&config),
            Err(LocationError::Misconfigured(_))
        ));
    }

    #[test]
    fn test_from_config_fixed() {
        let config = LocationConfig {
            provider: LocationProvider::Fixed,
            latitude: Some(37.9),
            longitude: Some(23.7),
            ..LocationConfig::default()
        };
        let source = AnyLocationSource::from_config(&config).unwrap();
        assert_eq!(source.provider_name(), "fixed");
        assert!(source.is_enabled());
    }

    #[test]
    fn test_from_config_replay_requires_path() {
        let config = LocationConfig {
            provider: LocationProvider::Replay,
            replay_path: None,
            ..LocationConfig::default()
        };
        assert!(AnyLocationSource::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_gpsd() {
        let config = LocationConfig {
            provider: LocationProvider::Gpsd,
            ..LocationConfig::default()
        };
        let source = AnyLocationSource::from_config(&config).unwrap();
        assert_eq!(source.provider_name(), "gpsd");
        assert_eq!(source.status(), LocationStatus::Initializing);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(LocationStatus::Running.to_string(), "running");
        assert_eq!(
            serde_json::to_string(&LocationStatus::Initializing).unwrap(),
            "\"INITIALIZING\""
        );
    }
}
