//! Scriptable location source for tests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use super::{LocationSource, LocationStatus};
use crate::types::LocationFix;

/// Location source whose status sequence and fixes are scripted up front.
///
/// Each [`status`](LocationSource::status) call consumes one scripted status;
/// the last one repeats forever. Each [`latest_fix`](LocationSource::latest_fix)
/// call consumes one scripted fix (`None` entries model "no fix"); the last
/// one repeats.
#[derive(Debug)]
pub struct MockLocationSource {
    enabled: bool,
    statuses: Mutex<VecDeque<LocationStatus>>,
    fixes: VecDeque<Option<LocationFix>>,
    start_calls: usize,
}

impl MockLocationSource {
    /// A source that is immediately running and always returns `fix`.
    #[must_use]
    pub fn running(fix: LocationFix) -> Self {
        Self::scripted(true, vec![LocationStatus::Running], vec![Some(fix)])
    }

    /// A source with explicit status and fix scripts.
    #[must_use]
    pub fn scripted(
        enabled: bool,
        statuses: Vec<LocationStatus>,
        fixes: Vec<Option<LocationFix>>,
    ) -> Self {
        Self {
            enabled,
            statuses: Mutex::new(statuses.into()),
            fixes: fixes.into(),
            start_calls: 0,
        }
    }

    /// How many times `start` was called.
    #[must_use]
    pub const fn start_calls(&self) -> usize {
        self.start_calls
    }
}

impl LocationSource for MockLocationSource {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn start(&mut self, _desired_accuracy_m: f64, _update_distance_m: f64) {
        self.start_calls += 1;
    }

    fn status(&self) -> LocationStatus {
        let mut statuses = self.statuses.lock().unwrap_or_else(PoisonError::into_inner);
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or(LocationStatus::Failed)
        } else {
            statuses.front().copied().unwrap_or(LocationStatus::Failed)
        }
    }

    fn latest_fix(&mut self) -> Option<LocationFix> {
        if self.fixes.len() > 1 {
            self.fixes.pop_front().flatten()
        } else {
            self.fixes.front().copied().flatten()
        }
    }
}
