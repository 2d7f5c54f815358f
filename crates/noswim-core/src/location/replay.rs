//! Recorded-track source.
//!
//! Reads a JSON array of points once at start and hands out one point per
//! [`LocationSource::latest_fix`] call, holding the final point once the
//! track is exhausted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{LocationError, LocationSource, LocationStatus};
use crate::types::LocationFix;

const fn default_accuracy_m() -> f64 {
    5.0
}

/// One point of a recorded track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayPoint {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Accuracy in meters (defaults to 5 m).
    #[serde(default = "default_accuracy_m")]
    pub accuracy_m: f64,
}

/// Replays a track file.
#[derive(Debug)]
pub struct ReplayLocationSource {
    enabled: bool,
    path: PathBuf,
    points: Vec<ReplayPoint>,
    cursor: usize,
    status: LocationStatus,
}

impl ReplayLocationSource {
    /// Creates a source for the track at `path`. Nothing is read until start.
    pub fn new(enabled: bool, path: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            path: path.into(),
            points: Vec::new(),
            cursor: 0,
            status: LocationStatus::Initializing,
        }
    }

    /// Loads and validates a track file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a JSON array of
    /// points, or is empty.
    pub fn load_track(path: &Path) -> Result<Vec<ReplayPoint>, LocationError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| LocationError::ReplayRead {
            path: display.clone(),
            source,
        })?;
        let points: Vec<ReplayPoint> =
            serde_json::from_str(&content).map_err(|source| LocationError::ReplayParse {
                path: display.clone(),
                source,
            })?;
        if points.is_empty() {
            return Err(LocationError::ReplayEmpty(display));
        }
        Ok(points)
    }
}

impl LocationSource for ReplayLocationSource {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn start(&mut self, _desired_accuracy_m: f64, _update_distance_m: f64) {
        match Self::load_track(&self.path) {
            Ok(points) => {
                tracing::info!(
                    path = %self.path.display(),
                    points = points.len(),
                    "Replay track loaded"
                );
                self.points = points;
                self.cursor = 0;
                self.status = LocationStatus::Running;
            }
            Err(e) => {
                tracing::error!(error = %e, "Replay track unavailable");
                self.status = LocationStatus::Failed;
            }
        }
    }

    fn status(&self) -> LocationStatus {
        self.status
    }

    fn latest_fix(&mut self) -> Option<LocationFix> {
        if self.status != LocationStatus::Running {
            return None;
        }
        let point = self.points.get(self.cursor).or_else(|| self.points.last())?;
        let fix = LocationFix::now(point.latitude, point.longitude, point.accuracy_m);
        if self.cursor < self.points.len() {
            self.cursor += 1;
        }
        Some(fix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn track_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_replay_advances_and_holds_last_point() {
        let file = track_file(
            r#"[{"latitude": 1.0, "longitude": 2.0},
                {"latitude": 3.0, "longitude": 4.0, "accuracy_m": 12.5}]"#,
        );
        let mut source = ReplayLocationSource::new(true, file.path());
        source.start(10.0, 10.0);
        assert_eq!(source.status(), LocationStatus::Running);

        let first = source.latest_fix().unwrap();
        assert!((first.latitude - 1.0).abs() < f64::EPSILON);
        assert!((first.accuracy_m - 5.0).abs() < f64::EPSILON);

        let second = source.latest_fix().unwrap();
        assert!((second.latitude - 3.0).abs() < f64::EPSILON);
        assert!((second.accuracy_m - 12.5).abs() < f64::EPSILON);

        let held = source.latest_fix().unwrap();
        assert!((held.latitude - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_file_fails_source() {
        let mut source = ReplayLocationSource::new(true, "/nonexistent/track.json");
        source.start(10.0, 10.0);
        assert_eq!(source.status(), LocationStatus::Failed);
        assert!(source.latest_fix().is_none());
    }

    #[test]
    fn test_empty_track_is_rejected() {
        let file = track_file("[]");
        assert!(matches!(
            ReplayLocationSource::load_track(file.path()),
            Err(LocationError::ReplayEmpty(_))
        ));
    }

    #[test]
    fn test_malformed_track_is_rejected() {
        let file = track_file(r#"{"latitude": 1.0}"#);
        assert!(matches!(
            ReplayLocationSource::load_track(file.path()),
            Err(LocationError::ReplayParse { .. })
        ));
    }
}
