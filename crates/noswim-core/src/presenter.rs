//! Presentation seam.
//!
//! The monitor never touches a screen or a speaker. It hands a [`Presenter`]
//! three kinds of updates: alert [`Intent`]s, a user-visible [`StatusLine`],
//! and a [`MapUpdate`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::alert::Intent;
use crate::map::MapSnapshot;

/// Tone of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Progress or neutral information.
    Info,
    /// Outside every restricted zone.
    Safe,
    /// Inside a restricted zone.
    Danger,
    /// Something failed.
    Error,
}

/// Text shown to the user, with its tone and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusLine {
    /// Tone.
    pub kind: StatusKind,
    /// Possibly multi-line text.
    pub text: String,
    /// When it was produced.
    pub at: DateTime<Utc>,
}

impl StatusLine {
    /// A line stamped now.
    pub fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// Neutral line.
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(StatusKind::Info, text)
    }

    /// Failure line. The failure kind leads the text and the time closes it.
    pub fn error(text: impl Into<String>) -> Self {
        let mut line = Self::new(StatusKind::Error, text);
        line.text = format!("{}\nAt: {}", line.text, line.at.format("%H:%M:%S UTC"));
        line
    }
}

/// Map picture change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapUpdate {
    /// A fresh snapshot.
    Image(MapSnapshot),
    /// The fetch failed; show a neutral placeholder or keep the last image.
    Placeholder,
}

/// Consumer of everything the monitor wants shown or played.
///
/// Calls arrive from the monitoring task in cycle order.
pub trait Presenter: Send + Sync {
    /// Carries out one alert intent.
    fn dispatch(&self, intent: Intent);

    /// Replaces the status line.
    fn show_status(&self, status: &StatusLine);

    /// Updates the map picture.
    fn show_map(&self, update: MapUpdate);
}

impl<T: Presenter + ?Sized> Presenter for Arc<T> {
    fn dispatch(&self, intent: Intent) {
        (**self).dispatch(intent);
    }

    fn show_status(&self, status: &StatusLine) {
        (**self).show_status(status);
    }

    fn show_map(&self, update: MapUpdate) {
        (**self).show_map(update);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{Intent, MapUpdate, Presenter, StatusLine};

    /// Presenter that remembers every call.
    #[derive(Debug, Default)]
    pub struct RecordingPresenter {
        pub intents: Mutex<Vec<Intent>>,
        pub statuses: Mutex<Vec<StatusLine>>,
        pub maps: Mutex<Vec<MapUpdate>>,
    }

    impl RecordingPresenter {
        pub fn intents(&self) -> Vec<Intent> {
            self.intents.lock().unwrap().clone()
        }

        pub fn statuses(&self) -> Vec<StatusLine> {
            self.statuses.lock().unwrap().clone()
        }

        pub fn maps(&self) -> Vec<MapUpdate> {
            self.maps.lock().unwrap().clone()
        }
    }

    impl Presenter for RecordingPresenter {
        fn dispatch(&self, intent: Intent) {
            self.intents.lock().unwrap().push(intent);
        }

        fn show_status(&self, status: &StatusLine) {
            self.statuses.lock().unwrap().push(status.clone());
        }

        fn show_map(&self, update: MapUpdate) {
            self.maps.lock().unwrap().push(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_constructors() {
        let line = StatusLine::error("API Error (500): Internal Server Error");
        assert_eq!(line.kind, StatusKind::Error);
        assert!(line.at <= Utc::now());
        assert!(line.text.starts_with("API Error (500): Internal Server Error\nAt: "));
        assert!(line.text.ends_with(" UTC"));

        let json = serde_json::to_value(StatusLine::info("Initializing GPS...")).unwrap();
        assert_eq!(json["kind"], "info");
        assert_eq!(json["text"], "Initializing GPS...");
    }
}
