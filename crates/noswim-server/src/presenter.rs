//! Headless presenter.
//!
//! The daemon has no screen or speaker of its own. [`ConsolePresenter`] turns
//! intents into tracing lines and keeps the resulting presentation state so
//! the status API can report what a front end should be showing.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use noswim_core::{Intent, MapSnapshot, MapUpdate, Overlay, Presenter, StatusKind, StatusLine};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

/// What a front end should currently be showing or playing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PresentationState {
    /// Looping alarm tone is playing.
    pub alarm_playing: bool,
    /// Screen flash is running.
    pub flashing: bool,
    /// Current overlay colour, `None` before the first determination.
    pub overlay: Option<Overlay>,
    /// Latest status line.
    pub status: Option<StatusLine>,
    /// Map picture state.
    pub map: MapState,
}

/// Map picture summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct MapState {
    /// An image is available at `/api/map`.
    pub available: bool,
    /// The last fetch failed and the previous image (if any) is being kept.
    pub stale: bool,
    /// When the current image arrived.
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Inner {
    state: PresentationState,
    image: Option<MapSnapshot>,
}

/// Presenter that records presentation state and logs every change.
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    inner: RwLock<Inner>,
}

impl ConsolePresenter {
    /// Creates a presenter with nothing playing or shown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current presentation state.
    pub fn state(&self) -> PresentationState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .clone()
    }

    /// Most recent map image, if one has arrived.
    pub fn map_image(&self) -> Option<MapSnapshot> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .image
            .clone()
    }
}

impl Presenter for ConsolePresenter {
    fn dispatch(&self, intent: Intent) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let state = &mut inner.state;
        match intent {
            Intent::StartAlarm => {
                state.alarm_playing = true;
                warn!("Alarm playing");
            }
            Intent::StopAlarm => {
                state.alarm_playing = false;
                info!("Alarm stopped");
            }
            Intent::StartFlash => {
                state.flashing = true;
                warn!("Screen flash started");
            }
            Intent::StopFlash => {
                state.flashing = false;
                info!("Screen flash stopped");
            }
            Intent::SetOverlay(overlay) => {
                state.overlay = Some(overlay);
                info!(?overlay, "Overlay set");
            }
        }
    }

    fn show_status(&self, status: &StatusLine) {
        match status.kind {
            StatusKind::Info | StatusKind::Safe => info!(kind = ?status.kind, "{}", status.text),
            StatusKind::Danger => warn!(kind = ?status.kind, "{}", status.text),
            StatusKind::Error => error!(kind = ?status.kind, "{}", status.text),
        }
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .status = Some(status.clone());
    }

    fn show_map(&self, update: MapUpdate) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match update {
            MapUpdate::Image(snapshot) => {
                debug!(bytes = snapshot.bytes.len(), "Map image updated");
                inner.state.map = MapState {
                    available: true,
                    stale: false,
                    updated_at: Some(Utc::now()),
                };
                inner.image = Some(snapshot);
            }
            MapUpdate::Placeholder => {
                debug!("Map placeholder shown, keeping previous image");
                inner.state.map.stale = true;
            }
        }
    }
}
