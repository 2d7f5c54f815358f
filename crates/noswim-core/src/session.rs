//! Monitoring session state.
//!
//! A [`PollingSession`] lives as long as one monitoring run. The scheduler
//! owns it and is the only writer; every change is published as a
//! [`SessionSnapshot`] on a `tokio::sync::watch` channel so readers (the
//! status API) never touch the scheduler itself.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::alert::AlertState;
use crate::presenter::StatusLine;
use crate::types::{ComplianceResult, LocationFix};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for the location source.
    Starting,
    /// Polling loop running.
    Monitoring,
    /// Startup failed; polling never began.
    StartupFailed,
    /// Polling loop ended.
    Stopped,
}

/// Point-in-time copy of the session.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SessionSnapshot {
    /// Unique id of this run.
    pub session_id: Uuid,
    /// When the session was created.
    pub started_at: DateTime<Utc>,
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// Current alert state.
    pub alert_state: AlertState,
    /// Cycles begun so far.
    pub cycle: u64,
    /// Most recent fix.
    pub last_fix: Option<LocationFix>,
    /// Most recent successful determination.
    pub last_result: Option<ComplianceResult>,
    /// Most recent status line.
    pub last_status: Option<StatusLine>,
    /// Why startup failed, if it did.
    pub startup_error: Option<String>,
}

/// Writer side of the session.
#[derive(Debug)]
pub struct PollingSession {
    snapshot: SessionSnapshot,
    tx: watch::Sender<SessionSnapshot>,
}

impl Default for PollingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PollingSession {
    /// Starts a new session in [`SessionPhase::Starting`].
    #[must_use]
    pub fn new() -> Self {
        let snapshot = SessionSnapshot {
            session_id: Uuid::now_v7(),
            started_at: Utc::now(),
            phase: SessionPhase::Starting,
            alert_state: AlertState::Uninitialized,
            cycle: 0,
            last_fix: None,
            last_result: None,
            last_status: None,
            startup_error: None,
        };
        let (tx, _) = watch::channel(snapshot.clone());
        Self { snapshot, tx }
    }

    /// A receiver that always sees the latest snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    /// Current snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    /// Increments and returns the cycle counter.
    pub fn begin_cycle(&mut self) -> u64 {
        self.snapshot.cycle += 1;
        self.publish();
        self.snapshot.cycle
    }

    /// Moves to `phase`.
    pub fn set_phase(&mut self, phase: SessionPhase) {
        self.snapshot.phase = phase;
        self.publish();
    }

    /// Records a startup failure.
    pub fn fail_startup(&mut self, reason: impl Into<String>) {
        self.snapshot.phase = SessionPhase::StartupFailed;
        self.snapshot.startup_error = Some(reason.into());
        self.publish();
    }

    /// Records the fix used by the current cycle.
    pub fn record_fix(&mut self, fix: LocationFix) {
        self.snapshot.last_fix = Some(fix);
        self.publish();
    }

    /// Records a successful determination.
    pub fn record_result(&mut self, result: ComplianceResult) {
        self.snapshot.last_result = Some(result);
        self.publish();
    }

    /// Records the alert state after a transition.
    pub fn record_alert_state(&mut self, state: AlertState) {
        self.snapshot.alert_state = state;
        self.publish();
    }

    /// Records the latest status line.
    pub fn record_status(&mut self, status: StatusLine) {
        self.snapshot.last_status = Some(status);
        self.publish();
    }

    fn publish(&self) {
        self.tx.send_replace(self.snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = PollingSession::new();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Starting);
        assert_eq!(snapshot.alert_state, AlertState::Uninitialized);
        assert_eq!(snapshot.cycle, 0);
        assert_eq!(snapshot.session_id.get_version_num(), 7);
    }

    #[test]
    fn test_receivers_see_updates() {
        let mut session = PollingSession::new();
        let rx = session.subscribe();

        session.set_phase(SessionPhase::Monitoring);
        assert_eq!(session.begin_cycle(), 1);
        session.record_fix(LocationFix::now(1.0, 2.0, 5.0));
        session.record_alert_state(AlertState::Safe);

        let seen = rx.borrow().clone();
        assert_eq!(seen.phase, SessionPhase::Monitoring);
        assert_eq!(seen.cycle, 1);
        assert_eq!(seen.alert_state, AlertState::Safe);
        assert!(seen.last_fix.is_some());
    }

    #[test]
    fn test_startup_failure_is_recorded() {
        let mut session = PollingSession::new();
        let rx = session.subscribe();
        session.fail_startup("Location services are not enabled.");

        let seen = rx.borrow();
        assert_eq!(seen.phase, SessionPhase::StartupFailed);
        assert_eq!(
            seen.startup_error.as_deref(),
            Some("Location services are not enabled.")
        );
    }

    #[test]
    fn test_snapshot_serializes_for_api() {
        let session = PollingSession::new();
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["phase"], "starting");
        assert_eq!(json["alert_state"], "UNINITIALIZED");
        assert!(json["last_result"].is_null());
    }
}
