//! Application configuration management.
//!
//! Configuration is layered with the `config` crate:
//!
//! 1. Built-in defaults ([`NoSwimConfig::default`])
//! 2. A TOML file (explicit path, else the platform default location)
//! 3. Environment variables prefixed `NOSWIM__`, with `__` between keys,
//!    e.g. `NOSWIM__MONITOR__CHECK_INTERVAL_SECS=30`
//!
//! All values are fixed for the lifetime of a monitoring session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::location::DEFAULT_GPSD_ADDRESS;
use crate::map::{MapView, DEFAULT_MAP_BASE_URL};

/// Default compliance service endpoint.
pub const DEFAULT_COMPLIANCE_URL: &str =
    "https://mpelas-wastewater-203451079784.europe-west1.run.app";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "NOSWIM";

/// Largest image edge accepted by static map providers.
pub const MAX_MAP_IMAGE_SIZE_PX: u16 = 640;

/// Highest zoom level accepted by static map providers.
pub const MAX_MAP_ZOOM_LEVEL: u8 = 21;

/// Smallest in-memory log view that still fits a timestamped line.
pub const MIN_VIEW_CEILING_CHARS: usize = 64;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading, validating or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Layered loading or deserialization failed.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The configuration file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A single field holds an invalid value.
    #[error("{field}: {message}")]
    Validation {
        /// Dotted field name, e.g. `map.zoom_level`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("{} configuration errors: {}", .0.len(), join_errors(.0))]
    MultipleValidationErrors(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoSwimConfig {
    /// Polling cadence and startup behaviour.
    pub monitor: MonitorConfig,
    /// Compliance service endpoint.
    pub compliance: ComplianceConfig,
    /// Map snapshot provider.
    pub map: MapConfig,
    /// Location source selection.
    pub location: LocationConfig,
    /// Session log settings.
    pub log: LogConfig,
    /// Local status API.
    pub server: ServerConfig,
}

/// Polling cadence and startup behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds to sleep between cycles.
    pub check_interval_secs: u64,
    /// Status checks while waiting for the location source to start.
    pub startup_wait_attempts: u32,
    /// Delay between startup status checks.
    pub startup_poll_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 10,
            startup_wait_attempts: 20,
            startup_poll_interval_ms: 1000,
        }
    }
}

/// Compliance service endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Base URL; coordinates are appended as query parameters.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_COMPLIANCE_URL.to_string(),
            request_timeout_secs: 15,
        }
    }
}

/// Map snapshot provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Whether snapshots are fetched at all.
    pub enabled: bool,
    /// Static map endpoint.
    pub base_url: String,
    /// Provider API key.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    /// Provider zoom level.
    pub zoom_level: u8,
    /// Edge of the square image in pixels.
    pub image_size_px: u16,
    /// Pixel density multiplier.
    pub scale: u8,
    /// Provider map type.
    pub map_type: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_MAP_BASE_URL.to_string(),
            api_key: String::new(),
            zoom_level: 15,
            image_size_px: MAX_MAP_IMAGE_SIZE_PX,
            scale: 2,
            map_type: "roadmap".to_string(),
        }
    }
}

/// Which location backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationProvider {
    /// Static coordinate.
    Fixed,
    /// Recorded track file.
    Replay,
    /// gpsd daemon.
    Gpsd,
}

/// Location source selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Backend to use.
    pub provider: LocationProvider,
    /// Whether location access is allowed.
    pub enabled: bool,
    /// Requested accuracy passed to the source on start.
    pub desired_accuracy_m: f64,
    /// Requested update distance passed to the source on start.
    pub update_distance_m: f64,
    /// Latitude for the `fixed` provider.
    pub latitude: Option<f64>,
    /// Longitude for the `fixed` provider.
    pub longitude: Option<f64>,
    /// Reported accuracy for the `fixed` provider.
    pub fixed_accuracy_m: f64,
    /// Track file for the `replay` provider.
    pub replay_path: Option<PathBuf>,
    /// `host:port` of the gpsd daemon.
    pub gpsd_address: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            provider: LocationProvider::Gpsd,
            enabled: true,
            desired_accuracy_m: 10.0,
            update_distance_m: 10.0,
            latitude: None,
            longitude: None,
            fixed_accuracy_m: 5.0,
            replay_path: None,
            gpsd_address: DEFAULT_GPSD_ADDRESS.to_string(),
        }
    }
}

/// Session log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory for session log files; platform data dir when unset.
    pub directory: Option<PathBuf>,
    /// Character ceiling of the in-memory log view.
    pub view_ceiling_chars: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: None,
            view_ceiling_chars: 8000,
        }
    }
}

/// Local status API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_address: String,
    /// Use production logging (JSON files + compact stdout).
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            production: false,
        }
    }
}

impl NoSwimConfig {
    /// Loads layered configuration.
    ///
    /// With `path` set the file must exist; otherwise the platform default
    /// path is used when present.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, a layer fails to
    /// parse, or the result does not deserialize.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let (file, required) = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                (Some(p.to_path_buf()), true)
            }
            None => (Self::default_path(), false),
        };

        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "Reading configuration file");
            builder = builder.add_source(
                config::File::from(file)
                    .format(config::FileFormat::Toml)
                    .required(required),
            );
        }

        let loaded: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(loaded)
    }

    /// Platform default config file location.
    ///
    /// On Linux: `/etc/noswim/config.toml`
    /// Elsewhere: the per-user config directory
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            Some(PathBuf::from("/etc/noswim/config.toml"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            directories::ProjectDirs::from("", "", "noswim")
                .map(|dirs| dirs.config_dir().join("config.toml"))
        }
    }

    /// Checks every field and reports all violations at once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a single problem or
    /// [`ConfigError::MultipleValidationErrors`] for several.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.monitor.check_interval_secs == 0 {
            errors.push(ConfigError::validation(
                "monitor.check_interval_secs",
                "must be greater than 0",
            ));
        }
        if self.monitor.startup_wait_attempts == 0 {
            errors.push(ConfigError::validation(
                "monitor.startup_wait_attempts",
                "must be at least 1",
            ));
        }
        if let Err(message) = parse_http_url(&self.compliance.base_url) {
            errors.push(ConfigError::validation("compliance.base_url", message));
        }
        if self.compliance.request_timeout_secs == 0 {
            errors.push(ConfigError::validation(
                "compliance.request_timeout_secs",
                "must be greater than 0",
            ));
        }
        if let Err(message) = parse_http_url(&self.map.base_url) {
            errors.push(ConfigError::validation("map.base_url", message));
        }
        if self.map.zoom_level > MAX_MAP_ZOOM_LEVEL {
            errors.push(ConfigError::validation(
                "map.zoom_level",
                format!("must be between 0 and {MAX_MAP_ZOOM_LEVEL}"),
            ));
        }
        if self.map.image_size_px == 0 || self.map.image_size_px > MAX_MAP_IMAGE_SIZE_PX {
            errors.push(ConfigError::validation(
                "map.image_size_px",
                format!("must be between 1 and {MAX_MAP_IMAGE_SIZE_PX}"),
            ));
        }
        if !(1..=2).contains(&self.map.scale) {
            errors.push(ConfigError::validation("map.scale", "must be 1 or 2"));
        }
        match self.location.provider {
            LocationProvider::Fixed => {
                match self.location.latitude {
                    Some(lat) if (-90.0..=90.0).contains(&lat) => {}
                    Some(_) => errors.push(ConfigError::validation(
                        "location.latitude",
                        "must be between -90 and 90",
                    )),
                    None => errors.push(ConfigError::validation(
                        "location.latitude",
                        "required by the fixed provider",
                    )),
                }
                match self.location.longitude {
                    Some(lon) if (-180.0..=180.0).contains(&lon) => {}
                    Some(_) => errors.push(ConfigError::validation(
                        "location.longitude",
                        "must be between -180 and 180",
                    )),
                    None => errors.push(ConfigError::validation(
                        "location.longitude",
                        "required by the fixed provider",
                    )),
                }
            }
            LocationProvider::Replay => {
                if self.location.replay_path.is_none() {
                    errors.push(ConfigError::validation(
                        "location.replay_path",
                        "required by the replay provider",
                    ));
                }
            }
            LocationProvider::Gpsd => {
                if self.location.gpsd_address.trim().is_empty() {
                    errors.push(ConfigError::validation(
                        "location.gpsd_address",
                        "must not be empty",
                    ));
                }
            }
        }
        if self.log.view_ceiling_chars < MIN_VIEW_CEILING_CHARS {
            errors.push(ConfigError::validation(
                "log.view_ceiling_chars",
                format!("must be at least {MIN_VIEW_CEILING_CHARS}"),
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Renders the configuration as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml_string()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parsed compliance base URL.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the URL is not http(s).
    pub fn compliance_url(&self) -> ConfigResult<Url> {
        parse_http_url(&self.compliance.base_url)
            .map_err(|message| ConfigError::validation("compliance.base_url", message))
    }

    /// Parsed map base URL.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the URL is not http(s).
    pub fn map_url(&self) -> ConfigResult<Url> {
        parse_http_url(&self.map.base_url)
            .map_err(|message| ConfigError::validation("map.base_url", message))
    }

    /// Sleep between polling cycles.
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.check_interval_secs)
    }

    /// Delay between startup status checks.
    #[must_use]
    pub const fn startup_poll_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.startup_poll_interval_ms)
    }

    /// Compliance request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.compliance.request_timeout_secs)
    }

    /// Map rendering parameters.
    #[must_use]
    pub const fn map_view(&self) -> MapView {
        MapView {
            zoom_level: self.map.zoom_level,
            size_px: self.map.image_size_px,
        }
    }

    /// Directory for session log files.
    #[must_use]
    pub fn log_directory(&self) -> PathBuf {
        self.log.directory.clone().unwrap_or_else(default_log_directory)
    }
}

/// Platform default directory for session logs.
///
/// On Linux: `/var/lib/noswim/logs`
/// Elsewhere: the per-user data directory
#[must_use]
pub fn default_log_directory() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/lib/noswim/logs")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "noswim")
            .map_or_else(|| PathBuf::from("./logs"), |dirs| dirs.data_dir().join("logs"))
    }
}

fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL '{raw}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}', expected http or https")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn fixed_config() -> NoSwimConfig {
        let mut config = NoSwimConfig::default();
        config.location.provider = LocationProvider::Fixed;
        config.location.latitude = Some(37.9);
        config.location.longitude = Some(23.7);
        config
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = NoSwimConfig::default();
        assert_eq!(config.monitor.check_interval_secs, 10);
        assert_eq!(config.monitor.startup_wait_attempts, 20);
        assert_eq!(config.map.zoom_level, 15);
        assert_eq!(config.map.image_size_px, 640);
        assert_eq!(config.log.view_ceiling_chars, 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_every_error() {
        let mut config = NoSwimConfig::default();
        config.monitor.check_interval_secs = 0;
        config.map.zoom_level = 30;
        config.compliance.base_url = "ftp://example.com".into();

        match config.validate() {
            Err(ConfigError::MultipleValidationErrors(errors)) => {
                assert_eq!(errors.len(), 3);
                let text = ConfigError::MultipleValidationErrors(errors).to_string();
                assert!(text.contains("monitor.check_interval_secs"));
                assert!(text.contains("map.zoom_level"));
                assert!(text.contains("compliance.base_url"));
            }
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_single_error() {
        let mut config = NoSwimConfig::default();
        config.map.image_size_px = 1024;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { field, .. }) if field == "map.image_size_px"
        ));
    }

    #[test]
    fn test_validate_fixed_provider_needs_coordinates() {
        let mut config = fixed_config();
        assert!(config.validate().is_ok());

        config.location.latitude = None;
        config.location.longitude = Some(200.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MultipleValidationErrors(errors)) if errors.len() == 2
        ));
    }

    #[test]
    fn test_map_url_checked_even_when_disabled() {
        let mut config = NoSwimConfig::default();
        config.map.enabled = false;
        config.map.base_url = "not a url".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { field, .. }) if field == "map.base_url"
        ));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[monitor]
check_interval_secs = 30

[map]
api_key = "abc"
zoom_level = 17

[location]
provider = "fixed"
latitude = 37.9
longitude = 23.7
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = NoSwimConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.monitor.check_interval_secs, 30);
        assert_eq!(config.monitor.startup_wait_attempts, 20);
        assert_eq!(config.map.api_key, "abc");
        assert_eq!(config.map.zoom_level, 17);
        assert_eq!(config.location.provider, LocationProvider::Fixed);
        assert_eq!(config.location.latitude, Some(37.9));
        assert_eq!(config.compliance.base_url, DEFAULT_COMPLIANCE_URL);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = NoSwimConfig::load(Some(Path::new("/nonexistent/noswim.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind_address = \"127.0.0.1:4000\"").unwrap();
        file.flush().unwrap();

        std::env::set_var("NOSWIM__SERVER__BIND_ADDRESS", "127.0.0.1:5000");
        let config = NoSwimConfig::load(Some(file.path()));
        std::env::remove_var("NOSWIM__SERVER__BIND_ADDRESS");

        assert_eq!(config.unwrap().server.bind_address, "127.0.0.1:5000");
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = fixed_config();
        config.monitor.check_interval_secs = 45;
        config.save(&path).unwrap();

        let reloaded = NoSwimConfig::load(Some(&path)).unwrap();
        assert_eq!(reloaded.monitor.check_interval_secs, 45);
        assert_eq!(reloaded.location.latitude, Some(37.9));
    }

    #[test]
    fn test_api_key_not_written_when_empty() {
        let text = NoSwimConfig::default().to_toml_string().unwrap();
        assert!(!text.contains("api_key"));
        assert!(text.contains("check_interval_secs = 10"));
    }

    #[test]
    fn test_derived_values() {
        let mut config = NoSwimConfig::default();
        config.log.directory = Some(PathBuf::from("/tmp/noswim-logs"));
        assert_eq!(config.check_interval(), Duration::from_secs(10));
        assert_eq!(config.startup_poll_interval(), Duration::from_secs(1));
        assert_eq!(config.map_view().size_px, 640);
        assert_eq!(config.log_directory(), PathBuf::from("/tmp/noswim-logs"));
        assert_eq!(config.compliance_url().unwrap().as_str(), "https://mpelas-wastewater-203451079784.europe-west1.run.app/");
    }
}
