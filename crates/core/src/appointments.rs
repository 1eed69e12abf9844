use std::collections::HashMap;

use parking_lot::RwLock;
use telepay_types::AppointmentPaymentState;
use tracing::{debug, warn};

/// Seam to the booking subsystem, which owns the appointment record.
///
/// `apply_outcome` is the check-before-apply guard the reconciler relies on:
/// a terminal state is written at most once, and never overwritten.
pub trait AppointmentDirectory: Send + Sync {
    fn payment_state(&self, appointment_id: &str) -> Option<AppointmentPaymentState>;

    /// Move the appointment to `awaiting_verification` after a successful
    /// initiation. Never called before the backend has accepted the intent.
    fn mark_awaiting(&self, appointment_id: &str);

    /// Apply a terminal payment outcome (`confirmed` or `payment_failed`).
    ///
    /// Returns `true` if the transition was applied, `false` if the
    /// appointment was already in a terminal state (the caller must then
    /// suppress downstream side effects). Terminal states are monotonic.
    fn apply_outcome(&self, appointment_id: &str, outcome: AppointmentPaymentState) -> bool;
}

/// In-memory directory used by tests and the CLI sandbox. The production
/// mobile app projects the same contract onto the booking API.
#[derive(Debug, Default)]
pub struct InMemoryAppointments {
    states: RwLock<HashMap<String, AppointmentPaymentState>>,
}

impl InMemoryAppointments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, appointment_id: &str, state: AppointmentPaymentState) {
        self.states.write().insert(appointment_id.to_string(), state);
    }

    /// All tracked appointments and their states, for persistence.
    pub fn snapshot(&self) -> Vec<(String, AppointmentPaymentState)> {
        self.states
            .read()
            .iter()
            .map(|(id, state)| (id.clone(), *state))
            .collect()
    }
}

impl AppointmentDirectory for InMemoryAppointments {
    fn payment_state(&self, appointment_id: &str) -> Option<AppointmentPaymentState> {
        self.states.read().get(appointment_id).copied()
    }

    fn mark_awaiting(&self, appointment_id: &str) {
        let mut states = self.states.write();
        let state = states
            .entry(appointment_id.to_string())
            .or_insert(AppointmentPaymentState::Unpaid);
        if state.is_terminal() {
            warn!(appointment_id, ?state, "refusing to move terminal appointment to awaiting");
            return;
        }
        *state = AppointmentPaymentState::AwaitingVerification;
    }

    fn apply_outcome(&self, appointment_id: &str, outcome: AppointmentPaymentState) -> bool {
        debug_assert!(outcome.is_terminal());
        let mut states = self.states.write();
        let state = states
            .entry(appointment_id.to_string())
            .or_insert(AppointmentPaymentState::Unpaid);
        if state.is_terminal() {
            debug!(appointment_id, ?state, "outcome already applied, skipping");
            return false;
        }
        *state = outcome;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_applies_once() {
        let directory = InMemoryAppointments::new();
        directory.insert("A1", AppointmentPaymentState::AwaitingVerification);

        assert!(directory.apply_outcome("A1", AppointmentPaymentState::Confirmed));
        assert!(!directory.apply_outcome("A1", AppointmentPaymentState::Confirmed));
        assert_eq!(
            directory.payment_state("A1"),
            Some(AppointmentPaymentState::Confirmed)
        );
    }

    #[test]
    fn test_terminal_states_never_flip() {
        let directory = InMemoryAppointments::new();
        directory.insert("A2", AppointmentPaymentState::AwaitingVerification);

        assert!(directory.apply_outcome("A2", AppointmentPaymentState::PaymentFailed));
        assert!(!directory.apply_outcome("A2", AppointmentPaymentState::Confirmed));
        assert_eq!(
            directory.payment_state("A2"),
            Some(AppointmentPaymentState::PaymentFailed)
        );
    }

    #[test]
    fn test_mark_awaiting_ignores_terminal() {
        let directory = InMemoryAppointments::new();
        directory.insert("A3", AppointmentPaymentState::Confirmed);
        directory.mark_awaiting("A3");
        assert_eq!(
            directory.payment_state("A3"),
            Some(AppointmentPaymentState::Confirmed)
        );
    }
}
