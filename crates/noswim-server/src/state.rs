//! Application state shared across handlers.

use std::sync::Arc;

use noswim_core::{LogSink, SessionSnapshot, ShareSink};
use tokio::sync::watch;

use crate::presenter::ConsolePresenter;

/// Handle passed to every axum handler.
pub type SharedState = AppState;

/// Shared application state.
///
/// Handlers only read from the monitor: the session arrives over a watch
/// channel and the presenter is behind its own lock. The log sink is the one
/// thing both sides write to.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    log: LogSink,
    session: watch::Receiver<SessionSnapshot>,
    presenter: Arc<ConsolePresenter>,
    share: Arc<dyn ShareSink>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        log: LogSink,
        session: watch::Receiver<SessionSnapshot>,
        presenter: Arc<ConsolePresenter>,
        share: Arc<dyn ShareSink>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                log,
                session,
                presenter,
                share,
            }),
        }
    }

    /// Latest published session snapshot.
    pub fn session(&self) -> SessionSnapshot {
        self.inner.session.borrow().clone()
    }

    /// The session log.
    pub fn log(&self) -> &LogSink {
        &self.inner.log
    }

    /// The presenter the monitor drives.
    pub fn presenter(&self) -> &ConsolePresenter {
        &self.inner.presenter
    }

    /// Where shared logs go.
    pub fn share_sink(&self) -> Arc<dyn ShareSink> {
        Arc::clone(&self.inner.share)
    }
}
