//! The monitoring loop.
//!
//! [`PollingScheduler`] runs the one-time startup sequence and then repeats
//! the cycle `fix -> map -> compliance -> transition -> log -> sleep` until
//! cancelled. Cycles are strictly sequential and the scheduler is the only
//! owner of the alert state. A failed cycle degrades the alert state and is
//! logged; it never ends the loop.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::alert::{AlertState, AlertStateMachine, Intent, Transition};
use crate::compliance::{ClientError, ComplianceService};
use crate::config::NoSwimConfig;
use crate::error::{NoSwimError, Result};
use crate::location::{LocationSource, LocationStatus};
use crate::log_sink::LogSink;
use crate::map::{MapSnapshotSource, MapView};
use crate::presenter::{MapUpdate, Presenter, StatusKind, StatusLine};
use crate::session::{PollingSession, SessionPhase, SessionSnapshot};
use crate::types::ComplianceResult;

const CYCLE_SEPARATOR: &str = "========================================";

/// Timing and request parameters fixed for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    /// Sleep between cycles.
    pub check_interval: Duration,
    /// Status checks while the location source initializes.
    pub startup_wait_attempts: u32,
    /// Delay between those checks.
    pub startup_poll_interval: Duration,
    /// Accuracy requested from the location source.
    pub desired_accuracy_m: f64,
    /// Update distance requested from the location source.
    pub update_distance_m: f64,
    /// Map rendering parameters.
    pub map_view: MapView,
    /// When set, map fetches are skipped for this reason.
    pub map_skip_reason: Option<String>,
}

impl MonitorSettings {
    /// Derives settings from loaded configuration.
    #[must_use]
    pub fn from_config(config: &NoSwimConfig) -> Self {
        let map_skip_reason = if !config.map.enabled {
            Some("disabled in configuration".to_string())
        } else if config.map.api_key.trim().is_empty() {
            Some("no API key configured".to_string())
        } else {
            None
        };

        Self {
            check_interval: config.check_interval(),
            startup_wait_attempts: config.monitor.startup_wait_attempts,
            startup_poll_interval: config.startup_poll_interval(),
            desired_accuracy_m: config.location.desired_accuracy_m,
            update_distance_m: config.location.update_distance_m,
            map_view: config.map_view(),
            map_skip_reason,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from_config(&NoSwimConfig::default())
    }
}

/// Drives one monitoring session.
pub struct PollingScheduler<L, C, M, P> {
    location: L,
    compliance: C,
    map: M,
    presenter: P,
    log: LogSink,
    settings: MonitorSettings,
    machine: AlertStateMachine,
    session: PollingSession,
}

impl<L, C, M, P> PollingScheduler<L, C, M, P>
where
    L: LocationSource,
    C: ComplianceService,
    M: MapSnapshotSource,
    P: Presenter,
{
    /// Wires the collaborators into a scheduler with a fresh session.
    pub fn new(
        location: L,
        compliance: C,
        map: M,
        presenter: P,
        log: LogSink,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            location,
            compliance,
            map,
            presenter,
            log,
            settings,
            machine: AlertStateMachine::new(),
            session: PollingSession::new(),
        }
    }

    /// Receiver for session snapshots.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    /// Current alert state.
    #[must_use]
    pub const fn alert_state(&self) -> AlertState {
        self.machine.state()
    }

    /// Runs startup, then cycles until `cancel` fires.
    ///
    /// Returns the number of completed cycles.
    ///
    /// # Errors
    ///
    /// Returns [`NoSwimError::LocationDisabled`] or
    /// [`NoSwimError::LocationUnavailable`] if startup fails, and
    /// [`NoSwimError::Cancelled`] if cancelled during startup. Nothing after
    /// startup is an error.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<u64> {
        self.startup(&cancel).await?;
        self.session.set_phase(SessionPhase::Monitoring);

        let mut cycles = 0u64;
        while !cancel.is_cancelled() {
            self.run_cycle().await;
            cycles += 1;

            tokio::select! {
                () = tokio::time::sleep(self.settings.check_interval) => {}
                () = cancel.cancelled() => break,
            }
        }

        self.log
            .append(format!("Monitoring stopped after {cycles} cycles"));
        self.session.set_phase(SessionPhase::Stopped);
        Ok(cycles)
    }

    /// Enables the location source and waits a bounded time for it to run.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn startup(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.publish_status(StatusLine::info("Initializing GPS..."));

        if !self.location.is_enabled() {
            self.log.append("ERROR: Location services disabled by user.");
            let err = NoSwimError::LocationDisabled;
            self.publish_status(StatusLine::error("Location services are not enabled."));
            self.session.fail_startup(err.to_string());
            return Err(err);
        }

        self.log.append("Requesting location service start...");
        self.location
            .start(self.settings.desired_accuracy_m, self.settings.update_distance_m);

        let mut remaining = self.settings.startup_wait_attempts;
        while self.location.status() == LocationStatus::Initializing && remaining > 0 {
            self.log.append(format!(
                "Waiting for GPS initialization ({remaining}s remaining)..."
            ));
            tokio::select! {
                () = tokio::time::sleep(self.settings.startup_poll_interval) => {}
                () = cancel.cancelled() => {
                    self.session.fail_startup(NoSwimError::Cancelled.to_string());
                    return Err(NoSwimError::Cancelled);
                }
            }
            remaining -= 1;
        }

        let status = self.location.status();
        if status != LocationStatus::Running {
            self.log
                .append("ERROR: Failed to start location service/Timed out.");
            let reason = if status == LocationStatus::Failed {
                "location source failed".to_string()
            } else {
                format!(
                    "still initializing after {} attempts",
                    self.settings.startup_wait_attempts
                )
            };
            tracing::error!(status = %status, reason = %reason, "Location startup failed");
            self.publish_status(StatusLine::error(
                "Failed to start location service. Check device settings.",
            ));
            let err = NoSwimError::LocationUnavailable(reason);
            self.session.fail_startup(err.to_string());
            return Err(err);
        }

        self.log.append("Location services started successfully.");
        Ok(())
    }

    /// Runs one cycle. Every failure is contained here.
    pub async fn run_cycle(&mut self) {
        let cycle = self.session.begin_cycle();
        tracing::debug!(cycle, state = %self.machine.state(), "Starting cycle");
        self.log.append(CYCLE_SEPARATOR);

        let Some(fix) = self.location.latest_fix() else {
            self.log.append("ERROR: Location fix unavailable");
            self.publish_status(StatusLine::error("Location fix unavailable."));
            let transition = self.machine.degrade();
            let failure = NoSwimError::LocationUnavailable("no fix available".into());
            self.finish(&transition, Some(&failure));
            return;
        };

        self.session.record_fix(fix);
        let summary = fix.summary();
        self.log.append(&summary);
        self.publish_status(StatusLine::info(format!("{summary}\nChecking compliance...")));

        self.update_map(fix.latitude, fix.longitude).await;

        let url = self.compliance.request_url(fix.latitude, fix.longitude);
        self.log.append(format!("API REQUEST: {url}"));

        match self.compliance.evaluate(fix.latitude, fix.longitude).await {
            Ok(response) => {
                self.log.append("RAW API RESPONSE:");
                self.log.append(&response.raw_body);
                self.log_parsed(&response.result);

                let transition = self.machine.apply(Ok(&response.result));
                self.announce(&response.result, &transition);
                self.session.record_result(response.result);
                self.finish(&transition, None);
            }
            Err(err) => {
                self.log_failure(&err);
                let transition = self.machine.apply(Err(&err));
                self.finish(&transition, Some(&NoSwimError::from(err)));
            }
        }
    }

    async fn update_map(&self, latitude: f64, longitude: f64) {
        if let Some(reason) = &self.settings.map_skip_reason {
            self.log.append(format!("Map snapshot skipped: {reason}"));
            return;
        }

        match self
            .map
            .fetch(latitude, longitude, self.settings.map_view)
            .await
        {
            Ok(snapshot) => {
                self.log.append("Map snapshot updated successfully");
                self.presenter.show_map(MapUpdate::Image(snapshot));
            }
            Err(e) => {
                self.log.append(format!("Map snapshot error: {e}"));
                let e = NoSwimError::from(e);
                tracing::warn!(error_code = e.error_code(), error = %e, "Map snapshot failed");
                self.presenter.show_map(MapUpdate::Placeholder);
            }
        }
    }

    fn log_parsed(&self, result: &ComplianceResult) {
        self.log.append("--- PARSED DATA ---");
        self.log
            .append(format!("In No-Swim Zone: {}", result.in_restricted_zone));
        self.log
            .append(format!("Compliance Status: {}", result.compliance_status));
        if let Some(coords) = result.confirmed_coordinates {
            self.log.append(format!(
                "Confirmed Coordinates: {:.6}, {:.6}",
                coords.latitude, coords.longitude
            ));
        }
        if result.in_restricted_zone {
            if let Some(details) = &result.zone_details {
                self.log.append("--- ZONE DETAILS ---");
                for line in details.log_lines() {
                    self.log.append(line);
                }
            }
        }
    }

    fn log_failure(&mut self, err: &ClientError) {
        match err {
            ClientError::Transport { code, message } => {
                let code = code.map_or_else(|| "none".to_string(), |c| c.to_string());
                tracing::warn!(code = %code, message = %message, "Compliance request failed");
                self.log.append(format!(
                    "ERROR: API Request Failed. Code: {code}, Reason: {message}"
                ));
                self.publish_status(StatusLine::error(format!("API Error ({code}): {message}")));
            }
            ClientError::Parse { message, body } => {
                tracing::warn!(error = %message, "Compliance response did not parse");
                self.log.append("RAW API RESPONSE:");
                self.log.append(body);
                self.log.append(format!("JSON PARSING ERROR: {message}"));
                self.publish_status(StatusLine::error("Error parsing API response."));
            }
        }
    }

    fn announce(&mut self, result: &ComplianceResult, transition: &Transition) {
        if result.in_restricted_zone {
            self.log.append("ALERT: ENTERING NO-SWIM ZONE!");
            self.log
                .append(format!("Compliance: {}", result.compliance_status));
            if transition.intents.contains(&Intent::StartAlarm) {
                self.log.append("ALARM ACTIVATED");
            }
            self.publish_status(StatusLine::new(
                StatusKind::Danger,
                format!(
                    "DANGER! NO SWIMMING ZONE\nFacility: {}\nStatus: {}",
                    result.facility_name(),
                    result.compliance_status
                ),
            ));
        } else {
            self.log.append(format!(
                "SAFE ZONE - Compliance: {}",
                result.compliance_status
            ));
            self.publish_status(StatusLine::new(
                StatusKind::Safe,
                format!("ALL CLEAR - SAFE TO SWIM\nStatus: {}", result.compliance_status),
            ));
        }
    }

    /// Dispatches intents and records the state change.
    fn finish(&mut self, transition: &Transition, failure: Option<&NoSwimError>) {
        for intent in &transition.intents {
            self.presenter.dispatch(*intent);
        }
        if transition.changed() {
            tracing::info!(from = %transition.from, to = %transition.to, "Alert state changed");
            self.log.append(format!(
                "Alert state: {} -> {}",
                transition.from, transition.to
            ));
        }
        if let (AlertState::Degraded, Some(failure)) = (transition.to, failure) {
            tracing::warn!(
                error_code = failure.error_code(),
                error = %failure,
                "Zone state unconfirmed"
            );
            self.log.append(format!(
                "DEGRADED: {} - zone state unconfirmed",
                failure.cycle_label()
            ));
        }
        self.session.record_alert_state(transition.to);
    }

    fn publish_status(&mut self, status: StatusLine) {
        self.presenter.show_status(&status);
        self.session.record_status(status);
    }
}
