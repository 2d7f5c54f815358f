//! Unified error types for the no-swim core library.
//!
//! [`NoSwimError`] covers every failure mode of a monitoring session. Each
//! module keeps its own narrower error type ([`ClientError`], [`FetchError`],
//! [`LocationError`], [`ConfigError`], [`ShareError`]) and converts into this
//! one at the boundary.
//!
//! # Severity
//!
//! - **Startup-fatal**: [`NoSwimError::LocationDisabled`] and
//!   [`NoSwimError::LocationUnavailable`] stop the session before polling.
//! - **Recoverable**: transport and parse failures degrade the alert state for
//!   one cycle; the next cycle starts fresh.
//! - **Cosmetic**: map fetch failures only affect the picture.
//! - **Contained**: log persistence failures never leave the log sink.
//!
//! [`ClientError`]: crate::compliance::ClientError
//! [`FetchError`]: crate::map::FetchError
//! [`LocationError`]: crate::location::LocationError
//! [`ConfigError`]: crate::config::ConfigError
//! [`ShareError`]: crate::share::ShareError

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for no-swim operations.
#[derive(Debug, Error)]
pub enum NoSwimError {
    // =========================================================================
    // LOCATION ERRORS
    // =========================================================================
    /// The user or device has location access switched off.
    #[error("Location services are not enabled.")]
    LocationDisabled,

    /// The location source failed or timed out while starting.
    #[error("Failed to start location service: {0}")]
    LocationUnavailable(String),

    /// Monitoring was stopped before it got going.
    #[error("Monitoring cancelled")]
    Cancelled,

    // =========================================================================
    // PER-CYCLE ERRORS
    // =========================================================================
    /// The compliance request failed at the transport or HTTP level.
    #[error("Network transport error (code {}): {message}", code_label(.code))]
    NetworkTransport {
        /// HTTP status, `None` when no response arrived.
        code: Option<u16>,
        /// Reason text.
        message: String,
    },

    /// The compliance response body could not be decoded.
    #[error("Response parse error: {0}")]
    ResponseParse(String),

    /// The map snapshot could not be fetched.
    #[error("Map fetch error: {0}")]
    MapFetch(String),

    // =========================================================================
    // LOG ERRORS
    // =========================================================================
    /// Writing to the durable session log failed.
    #[error("Log persistence error: {0}")]
    LogPersistence(String),

    /// The session log file to share does not exist.
    #[error("Log file does not exist: {}", .0.display())]
    LogFileMissing(PathBuf),

    /// Handing the log to a share target failed.
    #[error("Failed to share log: {0}")]
    ShareFailed(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// Reading or writing local data failed.
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

#[allow(clippy::ref_option)]
fn code_label(code: &Option<u16>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// A specialized [`Result`] type for no-swim operations.
pub type Result<T> = std::result::Result<T, NoSwimError>;

impl NoSwimError {
    /// Returns `true` if this error comes from the location source.
    #[inline]
    #[must_use]
    pub const fn is_location_error(&self) -> bool {
        matches!(self, Self::LocationDisabled | Self::LocationUnavailable(_))
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if this error ends the session before polling begins.
    #[inline]
    #[must_use]
    pub const fn is_startup_fatal(&self) -> bool {
        self.is_location_error()
    }

    /// Returns `true` if the next cycle can proceed normally.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NetworkTransport { .. }
                | Self::ResponseParse(_)
                | Self::MapFetch(_)
                | Self::LogPersistence(_)
        )
    }

    /// Short label for the DEGRADED line of a failed cycle.
    #[must_use]
    pub const fn cycle_label(&self) -> &'static str {
        match self {
            Self::LocationDisabled | Self::LocationUnavailable(_) => "location fix unavailable",
            Self::NetworkTransport { .. } => "network transport error",
            Self::ResponseParse(_) => "response parse error",
            Self::MapFetch(_) => "map fetch error",
            _ => "internal error",
        }
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 404 Not Found
            Self::ConfigNotFound(_) | Self::LogFileMissing(_) => 404,

            // 422 Unprocessable Entity
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,

            // 502 Bad Gateway - upstream answered badly or not at all
            Self::NetworkTransport { .. } | Self::ResponseParse(_) | Self::MapFetch(_) => 502,

            // 503 Service Unavailable - no position to work with
            Self::LocationDisabled | Self::LocationUnavailable(_) | Self::Cancelled => 503,

            // 500 Internal Server Error
            Self::LogPersistence(_) | Self::ShareFailed(_) | Self::PersistenceError(_) => 500,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::LocationDisabled => "LOCATION_DISABLED",
            Self::LocationUnavailable(_) => "LOCATION_UNAVAILABLE",
            Self::Cancelled => "CANCELLED",
            Self::NetworkTransport { .. } => "NETWORK_TRANSPORT_ERROR",
            Self::ResponseParse(_) => "RESPONSE_PARSE_ERROR",
            Self::MapFetch(_) => "MAP_FETCH_ERROR",
            Self::LogPersistence(_) => "LOG_PERSISTENCE_ERROR",
            Self::LogFileMissing(_) => "LOG_FILE_MISSING",
            Self::ShareFailed(_) => "SHARE_FAILED",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::compliance::ClientError> for NoSwimError {
    fn from(err: crate::compliance::ClientError) -> Self {
        use crate::compliance::ClientError;
        match err {
            ClientError::Transport { code, message } => Self::NetworkTransport { code, message },
            ClientError::Parse { message, .. } => Self::ResponseParse(message),
        }
    }
}

impl From<crate::map::FetchError> for NoSwimError {
    fn from(err: crate::map::FetchError) -> Self {
        Self::MapFetch(err.to_string())
    }
}

impl From<crate::location::LocationError> for NoSwimError {
    fn from(err: crate::location::LocationError) -> Self {
        use crate::location::LocationError;
        match err {
            LocationError::Misconfigured(message) => Self::ConfigValidationError(message),
            other => Self::LocationUnavailable(other.to_string()),
        }
    }
}

impl From<crate::config::ConfigError> for NoSwimError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::Load(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::Serialize(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::Write { path, source } => {
                Self::PersistenceError(format!("Failed to write {}: {source}", path.display()))
            }
            e @ (ConfigError::Validation { .. } | ConfigError::MultipleValidationErrors(_)) => {
                Self::ConfigValidationError(e.to_string())
            }
        }
    }
}

impl From<crate::share::ShareError> for NoSwimError {
    fn from(err: crate::share::ShareError) -> Self {
        use crate::share::ShareError;
        match err {
            ShareError::Missing(path) => Self::LogFileMissing(path),
            other => Self::ShareFailed(other.to_string()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
