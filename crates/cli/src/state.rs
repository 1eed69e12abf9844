//! YAML persistence for checkout attempts between CLI invocations.
//!
//! The mobile app keeps this state in memory for one session; the CLI has to
//! survive across processes, so intents, verification states and appointment
//! states round-trip through a small YAML file.

use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use telepay_core::{InMemoryAppointments, PaymentSession, VerificationState};
use telepay_types::{AppointmentPaymentState, PaymentIntent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub intent: PaymentIntent,
    #[serde(flatten)]
    pub state: VerificationState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub attempts: Vec<Attempt>,
    #[serde(default)]
    pub appointments: IndexMap<String, AppointmentPaymentState>,
}

impl StateFile {
    /// Load the state file; a missing file is an empty state.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_yml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let yaml = serde_yml::to_string(self).context("failed to serialize payment state")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Restore persisted attempts into a fresh session and directory.
    pub fn restore_into(&self, session: &PaymentSession, appointments: &InMemoryAppointments) {
        for attempt in &self.attempts {
            session.restore(attempt.intent.clone(), attempt.state.clone());
        }
        for (appointment_id, state) in &self.appointments {
            appointments.insert(appointment_id, *state);
        }
    }

    /// Capture the live session and directory back into a persistable state.
    pub fn capture(session: &PaymentSession, appointments: &InMemoryAppointments) -> Self {
        let mut attempts = Vec::new();
        for reference in session.references() {
            let (Some(intent), Some(state)) =
                (session.intent(&reference), session.state(&reference))
            else {
                continue;
            };
            attempts.push(Attempt { intent, state });
        }
        attempts.sort_by(|a, b| a.intent.created_at.cmp(&b.intent.created_at));

        let mut appointment_states: Vec<_> = appointments.snapshot();
        appointment_states.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            attempts,
            appointments: appointment_states.into_iter().collect(),
        }
    }
}
