use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use telepay_types::{PaymentIntent, VerificationResult};
use tracing::debug;

/// Client-side verification state for one reference.
///
/// Monotonic once terminal: only `pending -> success`, `pending -> failed`
/// and `pending -> pending` are legal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "result")]
pub enum VerificationState {
    Pending,
    Success(VerificationResult),
    Failed(VerificationResult),
}

impl VerificationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationState::Pending)
    }
}

/// Process-scoped mutable state for the payment flow.
///
/// This is the only shared mutable state the core owns: intents by
/// reference, each reference's verification state, an in-flight guard that
/// serializes duplicate deep-link deliveries, and the last delivered
/// reference for platform redelivery de-dup. Lifetime is one app session;
/// construct a fresh one per session and inject it so tests control it
/// deterministically.
#[derive(Default)]
pub struct PaymentSession {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    states: Mutex<HashMap<String, VerificationState>>,
    in_flight: Mutex<HashSet<String>>,
    last_delivered: Mutex<Option<String>>,
}

impl PaymentSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a freshly initiated intent as `pending`.
    pub fn register_intent(&self, intent: PaymentIntent) {
        let reference = intent.reference.clone();
        self.intents.lock().insert(reference.clone(), intent);
        self.states.lock().insert(reference, VerificationState::Pending);
    }

    /// Restore a previously persisted attempt (CLI state file, app resume).
    pub fn restore(&self, intent: PaymentIntent, state: VerificationState) {
        let reference = intent.reference.clone();
        self.intents.lock().insert(reference.clone(), intent);
        self.states.lock().insert(reference, state);
    }

    pub fn intent(&self, reference: &str) -> Option<PaymentIntent> {
        self.intents.lock().get(reference).cloned()
    }

    pub fn state(&self, reference: &str) -> Option<VerificationState> {
        self.states.lock().get(reference).cloned()
    }

    pub fn references(&self) -> Vec<String> {
        self.intents.lock().keys().cloned().collect()
    }

    /// Time since initiation, so an external expiry sweep can act on stale
    /// pending attempts. This core runs no sweep itself.
    pub fn elapsed(&self, reference: &str, now: DateTime<Utc>) -> Option<Duration> {
        self.intents
            .lock()
            .get(reference)
            .map(|intent| now - intent.created_at)
    }

    /// Claim the in-flight slot for a reference.
    ///
    /// Returns `None` when a verification for this reference is already in
    /// progress; the duplicate trigger must be ignored, not queued. The
    /// returned guard releases the slot on drop, including on error paths.
    pub fn begin_verification(self: &Arc<Self>, reference: &str) -> Option<InFlightGuard> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(reference.to_string()) {
            debug!(reference, "verification already in flight, ignoring duplicate trigger");
            return None;
        }
        Some(InFlightGuard {
            session: Arc::clone(self),
            reference: reference.to_string(),
        })
    }

    /// Record a terminal verification state. A no-op if the reference is
    /// already terminal, preserving monotonicity.
    pub fn record_terminal(&self, reference: &str, state: VerificationState) {
        debug_assert!(state.is_terminal());
        let mut states = self.states.lock();
        match states.get(reference) {
            Some(existing) if existing.is_terminal() => {
                debug!(reference, "reference already terminal, keeping existing state");
            }
            _ => {
                states.insert(reference.to_string(), state);
            }
        }
    }

    /// De-duplicate platform deep-link redelivery: returns `false` when the
    /// reference is the same one delivered last.
    pub fn accept_delivery(&self, reference: &str) -> bool {
        let mut last = self.last_delivered.lock();
        if last.as_deref() == Some(reference) {
            return false;
        }
        *last = Some(reference.to_string());
        true
    }
}

/// RAII guard over one reference's in-flight verification slot.
pub struct InFlightGuard {
    session: Arc<PaymentSession>,
    reference: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.session.in_flight.lock().remove(&self.reference);
    }
}
