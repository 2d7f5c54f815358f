//! Alert state machine.
//!
//! Holds the session's single [`AlertState`] and turns each compliance
//! outcome into the next state plus the [`Intent`]s a presenter must carry
//! out. Intents are derived from the current *and* next state, so a repeated
//! determination never re-issues a start or stop: the alarm and flashing are
//! started exactly when entering `UNSAFE` and stopped exactly when leaving it.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::compliance::ClientError;
use crate::types::ComplianceResult;

/// Alert classification of the monitoring session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertState {
    /// No cycle has completed yet.
    #[default]
    Uninitialized,
    /// Last determination: outside any restricted zone.
    Safe,
    /// Last determination: inside a restricted zone.
    Unsafe,
    /// Last cycle failed; zone membership is unconfirmed.
    Degraded,
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Safe => "SAFE",
            Self::Unsafe => "UNSAFE",
            Self::Degraded => "DEGRADED",
        };
        f.write_str(label)
    }
}

/// Overlay indicator a presenter can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    /// Calm indicator after a SAFE determination.
    Safe,
    /// Danger indicator while inside a restricted zone.
    Danger,
    /// Uncertainty indicator after a failed cycle.
    Error,
}

/// Side effect requested from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "intent", content = "overlay", rename_all = "snake_case")]
pub enum Intent {
    /// Begin looped alarm playback.
    StartAlarm,
    /// Stop alarm playback.
    StopAlarm,
    /// Begin flashing the danger indicator.
    StartFlash,
    /// Stop flashing.
    StopFlash,
    /// Switch the overlay indicator.
    SetOverlay(Overlay),
}

/// What a cycle established about the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Determination {
    /// Inside a restricted zone.
    InZone,
    /// Outside every restricted zone.
    Clear,
    /// The cycle failed; nothing is known.
    Unconfirmed,
}

impl From<Result<&ComplianceResult, &ClientError>> for Determination {
    fn from(outcome: Result<&ComplianceResult, &ClientError>) -> Self {
        match outcome {
            Ok(result) if result.in_restricted_zone => Self::InZone,
            Ok(_) => Self::Clear,
            Err(_) => Self::Unconfirmed,
        }
    }
}

/// Computes the next state and the intents that move the presenter there.
#[must_use]
pub fn transition(current: AlertState, determination: Determination) -> (AlertState, Vec<Intent>) {
    let was_unsafe = current == AlertState::Unsafe;
    let mut intents = Vec::new();

    let next = match determination {
        Determination::InZone => {
            if !was_unsafe {
                intents.push(Intent::StartFlash);
                intents.push(Intent::StartAlarm);
                intents.push(Intent::SetOverlay(Overlay::Danger));
            }
            AlertState::Unsafe
        }
        Determination::Clear => {
            if was_unsafe {
                intents.push(Intent::StopFlash);
                intents.push(Intent::StopAlarm);
            }
            if current != AlertState::Safe {
                intents.push(Intent::SetOverlay(Overlay::Safe));
            }
            AlertState::Safe
        }
        Determination::Unconfirmed => {
            if was_unsafe {
                intents.push(Intent::StopAlarm);
                intents.push(Intent::StopFlash);
            }
            if current != AlertState::Degraded {
                intents.push(Intent::SetOverlay(Overlay::Error));
            }
            AlertState::Degraded
        }
    };

    (next, intents)
}

/// Result of applying one outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State before.
    pub from: AlertState,
    /// State after.
    pub to: AlertState,
    /// Presenter commands, in order.
    pub intents: Vec<Intent>,
}

impl Transition {
    /// Whether the state actually changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Sole owner of the session's alert state.
#[derive(Debug, Default)]
pub struct AlertStateMachine {
    state: AlertState,
}

impl AlertStateMachine {
    /// A machine in [`AlertState::Uninitialized`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AlertState {
        self.state
    }

    /// Applies a compliance outcome.
    pub fn apply(&mut self, outcome: Result<&ComplianceResult, &ClientError>) -> Transition {
        self.step(Determination::from(outcome))
    }

    /// Marks the zone state unconfirmed without a compliance outcome, e.g.
    /// when no fix was available.
    pub fn degrade(&mut self) -> Transition {
        self.step(Determination::Unconfirmed)
    }

    fn step(&mut self, determination: Determination) -> Transition {
        let from = self.state;
        let (to, intents) = transition(from, determination);
        self.state = to;
        Transition { from, to, intents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(in_zone: bool) -> ComplianceResult {
        ComplianceResult {
            in_restricted_zone: in_zone,
            compliance_status: if in_zone { "VIOLATION" } else { "OK" }.into(),
            confirmed_coordinates: None,
            zone_details: None,
        }
    }

    fn server_error() -> ClientError {
        ClientError::Transport {
            code: Some(500),
            message: "Internal Server Error".into(),
        }
    }

    /// Presenter model used to check that intents never double up.
    #[derive(Default)]
    struct Effects {
        alarm: bool,
        flashing: bool,
        overlay: Option<Overlay>,
    }

    impl Effects {
        fn run(&mut self, intents: &[Intent]) {
            for intent in intents {
                match intent {
                    Intent::StartAlarm => {
                        assert!(!self.alarm, "alarm started twice");
                        self.alarm = true;
                    }
                    Intent::StopAlarm => {
                        assert!(self.alarm, "alarm stopped while silent");
                        self.alarm = false;
                    }
                    Intent::StartFlash => {
                        assert!(!self.flashing, "flashing started twice");
                        self.flashing = true;
                    }
                    Intent::StopFlash => {
                        assert!(self.flashing, "flashing stopped while idle");
                        self.flashing = false;
                    }
                    Intent::SetOverlay(overlay) => {
                        assert_ne!(self.overlay, Some(*overlay), "overlay set twice");
                        self.overlay = Some(*overlay);
                    }
                }
            }
        }
    }

    #[test]
    fn test_starts_uninitialized() {
        assert_eq!(AlertStateMachine::new().state(), AlertState::Uninitialized);
    }

    #[test]
    fn test_in_zone_starts_alarm_once() {
        let mut machine = AlertStateMachine::new();
        let unsafe_result = result(true);

        let first = machine.apply(Ok(&unsafe_result));
        assert_eq!(first.to, AlertState::Unsafe);
        assert_eq!(
            first.intents,
            vec![
                Intent::StartFlash,
                Intent::StartAlarm,
                Intent::SetOverlay(Overlay::Danger)
            ]
        );

        let second = machine.apply(Ok(&unsafe_result));
        assert_eq!(second.to, AlertState::Unsafe);
        assert!(second.intents.is_empty());
        assert!(!second.changed());
    }

    #[test]
    fn test_safe_after_unsafe_stops_everything_once() {
        let mut machine = AlertStateMachine::new();
        machine.apply(Ok(&result(true)));

        let safe = result(false);
        let first = machine.apply(Ok(&safe));
        assert_eq!(first.to, AlertState::Safe);
        assert_eq!(
            first.intents,
            vec![
                Intent::StopFlash,
                Intent::StopAlarm,
                Intent::SetOverlay(Overlay::Safe)
            ]
        );

        let second = machine.apply(Ok(&safe));
        assert!(second.intents.is_empty());
    }

    #[test]
    fn test_first_safe_only_sets_overlay() {
        let mut machine = AlertStateMachine::new();
        let t = machine.apply(Ok(&result(false)));
        assert_eq!(t.intents, vec![Intent::SetOverlay(Overlay::Safe)]);
    }

    #[test]
    fn test_error_while_unsafe_stops_alarm() {
        let mut machine = AlertStateMachine::new();
        machine.apply(Ok(&result(true)));

        let t = machine.apply(Err(&server_error()));
        assert_eq!(t.to, AlertState::Degraded);
        assert_eq!(
            t.intents,
            vec![
                Intent::StopAlarm,
                Intent::StopFlash,
                Intent::SetOverlay(Overlay::Error)
            ]
        );
        assert!(!t.intents.contains(&Intent::StartAlarm));
    }

    #[test]
    fn test_error_without_prior_alarm_has_no_alarm_intents() {
        let mut machine = AlertStateMachine::new();
        let t = machine.apply(Err(&server_error()));
        assert_eq!(t.to, AlertState::Degraded);
        assert_eq!(t.intents, vec![Intent::SetOverlay(Overlay::Error)]);

        let again = machine.apply(Err(&server_error()));
        assert!(again.intents.is_empty());
    }

    #[test]
    fn test_error_then_safe_recovers() {
        let mut machine = AlertStateMachine::new();
        machine.apply(Err(&server_error()));
        let t = machine.apply(Ok(&result(false)));
        assert_eq!(t.from, AlertState::Degraded);
        assert_eq!(t.to, AlertState::Safe);
        assert_eq!(machine.state(), AlertState::Safe);
    }

    #[test]
    fn test_in_zone_after_error_replaces_error_overlay() {
        let mut machine = AlertStateMachine::new();
        machine.apply(Err(&server_error()));

        let t = machine.apply(Ok(&result(true)));
        assert_eq!(t.from, AlertState::Degraded);
        assert_eq!(t.to, AlertState::Unsafe);
        assert_eq!(t.intents.last(), Some(&Intent::SetOverlay(Overlay::Danger)));
    }

    #[test]
    fn test_degrade_without_outcome() {
        let mut machine = AlertStateMachine::new();
        machine.apply(Ok(&result(true)));
        let t = machine.degrade();
        assert_eq!(t.to, AlertState::Degraded);
        assert!(t.intents.contains(&Intent::StopAlarm));
    }

    #[test]
    fn test_every_sequence_keeps_effects_consistent() {
        let steps = [
            Determination::InZone,
            Determination::Clear,
            Determination::Unconfirmed,
        ];

        // Every sequence of length 6 over the three determinations.
        for code in 0..3usize.pow(6) {
            let mut state = AlertState::Uninitialized;
            let mut effects = Effects::default();
            let mut n = code;
            for _ in 0..6 {
                let determination = steps[n % 3];
                n /= 3;

                let (next, intents) = transition(state, determination);
                effects.run(&intents);
                state = next;

                assert_ne!(state, AlertState::Uninitialized);
                let alarmed = state == AlertState::Unsafe;
                assert_eq!(effects.alarm, alarmed, "alarm out of sync in {state}");
                assert_eq!(effects.flashing, alarmed, "flashing out of sync in {state}");
                let overlay = match state {
                    AlertState::Unsafe => Overlay::Danger,
                    AlertState::Safe => Overlay::Safe,
                    _ => Overlay::Error,
                };
                assert_eq!(effects.overlay, Some(overlay), "overlay out of sync in {state}");
            }
        }
    }

    #[test]
    fn test_repeated_determination_is_silent() {
        for determination in [
            Determination::InZone,
            Determination::Clear,
            Determination::Unconfirmed,
        ] {
            let (state, _) = transition(AlertState::Uninitialized, determination);
            let (again, intents) = transition(state, determination);
            assert_eq!(state, again);
            assert!(intents.is_empty(), "{determination:?} repeated emitted {intents:?}");
        }
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&AlertState::Degraded).unwrap(),
            "\"DEGRADED\""
        );
        assert_eq!(
            serde_json::to_string(&Intent::SetOverlay(Overlay::Error)).unwrap(),
            r#"{"intent":"set_overlay","overlay":"error"}"#
        );
        assert_eq!(
            serde_json::to_string(&Intent::StartAlarm).unwrap(),
            r#"{"intent":"start_alarm"}"#
        );
    }
}
