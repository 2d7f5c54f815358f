//! # noswim-core
//!
//! Core logic for the no-swim zone monitor: periodically take a position fix,
//! ask a remote compliance service whether it lies in a restricted bathing
//! zone, and drive an alert while it does.
//!
//! ## Architecture
//!
//! - [`scheduler`] - startup sequence and the sequential polling loop
//! - [`alert`] - alert state machine and presenter intents
//! - [`compliance`] - compliance service client
//! - [`map`] - static map snapshot fetcher
//! - [`location`] - location source abstraction and backends
//! - [`log_sink`] - timestamped session log with a bounded view
//! - [`share`] - exporting the session log
//! - [`presenter`] - presentation seam (status lines, map updates)
//! - [`session`] - session state published to readers
//! - [`config`] - layered configuration loading and validation
//! - [`error`] - unified error types for the crate
//! - [`types`] - shared data model and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod alert;
pub mod compliance;
pub mod config;
pub mod error;
pub mod location;
pub mod log_sink;
pub mod map;
pub mod presenter;
pub mod scheduler;
pub mod session;
pub mod share;
pub mod types;

// Re-export primary types for convenience
pub use alert::{AlertState, AlertStateMachine, Intent, Overlay, Transition};
pub use compliance::{ClientError, ComplianceResponse, ComplianceService, HttpComplianceClient};
pub use config::{
    ComplianceConfig, ConfigError, ConfigResult, LocationConfig, LocationProvider, LogConfig,
    MapConfig, MonitorConfig, NoSwimConfig, ServerConfig,
};
pub use error::{NoSwimError, Result};
#[cfg(any(test, feature = "mock-location"))]
pub use location::MockLocationSource;
pub use location::{AnyLocationSource, LocationError, LocationSource, LocationStatus};
pub use log_sink::LogSink;
pub use map::{FetchError, MapSnapshot, MapSnapshotSource, MapView, StaticMapFetcher};
pub use presenter::{MapUpdate, Presenter, StatusKind, StatusLine};
pub use scheduler::{MonitorSettings, PollingScheduler};
pub use session::{PollingSession, SessionPhase, SessionSnapshot};
pub use share::{DesktopShare, ShareError, ShareSink};
pub use types::{ComplianceResult, Coordinates, LocationFix, ZoneDetails};
