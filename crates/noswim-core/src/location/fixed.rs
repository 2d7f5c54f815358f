//! Static coordinate source.

use super::{LocationSource, LocationStatus};
use crate::types::LocationFix;

/// Reports the same configured coordinate on every cycle.
///
/// Useful on machines without positioning hardware, e.g. to watch a known
/// beach from a desktop.
#[derive(Debug, Clone)]
pub struct FixedLocationSource {
    enabled: bool,
    started: bool,
    latitude: f64,
    longitude: f64,
    accuracy_m: f64,
}

impl FixedLocationSource {
    /// Creates a source pinned to `(latitude, longitude)`.
    #[must_use]
    pub const fn new(enabled: bool, latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        Self {
            enabled,
            started: false,
            latitude,
            longitude,
            accuracy_m,
        }
    }
}

impl LocationSource for FixedLocationSource {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn start(&mut self, _desired_accuracy_m: f64, _update_distance_m: f64) {
        self.started = true;
    }

    fn status(&self) -> LocationStatus {
        if self.started {
            LocationStatus::Running
        } else {
            LocationStatus::Initializing
        }
    }

    fn latest_fix(&mut self) -> Option<LocationFix> {
        self.started
            .then(|| LocationFix::now(self.latitude, self.longitude, self.accuracy_m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fix_before_start() {
        let mut source = FixedLocationSource::new(true, 37.9, 23.7, 5.0);
        assert_eq!(source.status(), LocationStatus::Initializing);
        assert!(source.latest_fix().is_none());
    }

    #[test]
    fn test_fix_after_start() {
        let mut source = FixedLocationSource::new(true, 37.9, 23.7, 5.0);
        source.start(10.0, 10.0);
        assert_eq!(source.status(), LocationStatus::Running);

        let fix = source.latest_fix().unwrap();
        assert!((fix.latitude - 37.9).abs() < f64::EPSILON);
        assert!((fix.longitude - 23.7).abs() < f64::EPSILON);
        assert!((fix.accuracy_m - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_disabled_source_reports_disabled() {
        let source = FixedLocationSource::new(false, 0.0, 0.0, 5.0);
        assert!(!source.is_enabled());
    }
}
