use std::sync::Arc;

use telepay_types::{
    AppointmentPaymentState, GatewayStatus, PaymentError, VerificationResult,
};
use tracing::{info, warn};

use crate::appointments::AppointmentDirectory;
use crate::backend::PaymentBackend;
use crate::notify::{NotificationSink, PaymentNotification};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::session::{PaymentSession, VerificationState};

/// Observable outcome of one reconciliation pass.
///
/// `Already*` variants are idempotent replays: the cached result comes back
/// and no side effect fires again. `DuplicateTrigger` means another
/// verification for the same reference was in flight and this trigger was
/// ignored.
#[derive(Debug, Clone)]
pub enum Reconciliation {
    Confirmed(VerificationResult),
    AlreadyConfirmed(VerificationResult),
    Failed(VerificationResult),
    AlreadyFailed(VerificationResult),
    StillPending(VerificationResult),
    DuplicateTrigger,
}

impl Reconciliation {
    pub fn result(&self) -> Option<&VerificationResult> {
        match self {
            Reconciliation::Confirmed(r)
            | Reconciliation::AlreadyConfirmed(r)
            | Reconciliation::Failed(r)
            | Reconciliation::AlreadyFailed(r)
            | Reconciliation::StillPending(r) => Some(r),
            Reconciliation::DuplicateTrigger => None,
        }
    }

    /// Collapse into the flow's error taxonomy for callers that treat a
    /// failed payment as an error: failed outcomes become
    /// [`PaymentError::GatewayReportedFailure`] carrying the gateway's
    /// verbatim reason. A duplicate trigger collapses to
    /// `VerificationUnreachable` since the outcome is simply not known yet.
    pub fn into_verified(self) -> Result<VerificationResult, PaymentError> {
        match self {
            Reconciliation::Confirmed(r)
            | Reconciliation::AlreadyConfirmed(r)
            | Reconciliation::StillPending(r) => Ok(r),
            Reconciliation::Failed(r) | Reconciliation::AlreadyFailed(r) => {
                Err(PaymentError::GatewayReportedFailure(
                    r.reason.unwrap_or_else(|| "payment failed".to_string()),
                ))
            }
            Reconciliation::DuplicateTrigger => Err(PaymentError::VerificationUnreachable(
                "a verification for this reference is already in progress".to_string(),
            )),
        }
    }
}

/// Applies gateway-reported payment status to the appointment exactly once.
///
/// This is the single reconciliation path for every trigger: automatic
/// deep-link return, manual retry, and any future webhook must all come
/// through [`VerificationReconciler::verify`].
pub struct VerificationReconciler<B, S = TokioSleeper> {
    backend: B,
    session: Arc<PaymentSession>,
    appointments: Arc<dyn AppointmentDirectory>,
    sink: Arc<dyn NotificationSink>,
    retry: RetryPolicy,
    sleeper: S,
}

impl<B: PaymentBackend> VerificationReconciler<B, TokioSleeper> {
    pub fn new(
        backend: B,
        session: Arc<PaymentSession>,
        appointments: Arc<dyn AppointmentDirectory>,
        sink: Arc<dyn NotificationSink>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            session,
            appointments,
            sink,
            retry,
            sleeper: TokioSleeper,
        }
    }
}

impl<B: PaymentBackend, S: Sleeper> VerificationReconciler<B, S> {
    pub fn with_sleeper(
        backend: B,
        session: Arc<PaymentSession>,
        appointments: Arc<dyn AppointmentDirectory>,
        sink: Arc<dyn NotificationSink>,
        retry: RetryPolicy,
        sleeper: S,
    ) -> Self {
        Self {
            backend,
            session,
            appointments,
            sink,
            retry,
            sleeper,
        }
    }

    /// Verify a transaction reference and reconcile the gateway's answer
    /// into the appointment state.
    ///
    /// `Err` means the question went unanswered (`UnknownReference`,
    /// `VerificationUnreachable`); a gateway-reported failure is an answer
    /// and comes back as `Ok(Reconciliation::Failed)`. Once a reference is
    /// terminal, any further call returns the cached result without
    /// re-triggering side effects.
    pub async fn verify(&self, reference: &str) -> Result<Reconciliation, PaymentError> {
        let Some(intent) = self.session.intent(reference) else {
            return Err(PaymentError::UnknownReference(reference.to_string()));
        };

        if let Some(replay) = self.replay(reference) {
            return Ok(replay);
        }

        let Some(_guard) = self.session.begin_verification(reference) else {
            return Ok(Reconciliation::DuplicateTrigger);
        };
        // The state may have gone terminal between the check and the claim.
        if let Some(replay) = self.replay(reference) {
            return Ok(replay);
        }

        let verification = self.verify_with_retry(reference).await?;

        match verification.status {
            GatewayStatus::Success if verification.amount == intent.amount => {
                let result = VerificationResult {
                    reference: reference.to_string(),
                    status: GatewayStatus::Success,
                    amount: verification.amount,
                    appointment_id: Some(intent.appointment_id.clone()),
                    reason: None,
                };
                self.session
                    .record_terminal(reference, VerificationState::Success(result.clone()));
                let applied = self
                    .appointments
                    .apply_outcome(&intent.appointment_id, AppointmentPaymentState::Confirmed);
                if applied {
                    info!(reference, appointment_id = %intent.appointment_id,
                          "payment confirmed");
                    self.sink.notify(PaymentNotification::Confirmed {
                        reference: reference.to_string(),
                        appointment_id: intent.appointment_id.clone(),
                    });
                }
                Ok(Reconciliation::Confirmed(result))
            }
            GatewayStatus::Success => {
                // Gateway says success but the money does not match the
                // intent. Never coerced to success.
                let mismatch = PaymentError::AmountMismatch {
                    expected: intent.amount.minor(),
                    actual: verification.amount.minor(),
                };
                warn!(reference, %mismatch, "amount mismatch on verification");
                Ok(self.fail(reference, &intent.appointment_id, verification.amount.minor(), mismatch.to_string()))
            }
            GatewayStatus::Failed | GatewayStatus::Cancelled => {
                let reason = verification
                    .gateway_response
                    .unwrap_or_else(|| "payment failed".to_string());
                Ok(self.fail(reference, &intent.appointment_id, verification.amount.minor(), reason))
            }
            GatewayStatus::Pending => {
                let result = VerificationResult {
                    reference: reference.to_string(),
                    status: GatewayStatus::Pending,
                    amount: verification.amount,
                    appointment_id: Some(intent.appointment_id.clone()),
                    reason: None,
                };
                // Still processing on the gateway side: no transition, no
                // automatic re-poll. The user retries manually.
                self.sink.notify(PaymentNotification::Pending {
                    reference: reference.to_string(),
                });
                Ok(Reconciliation::StillPending(result))
            }
        }
    }

    fn replay(&self, reference: &str) -> Option<Reconciliation> {
        match self.session.state(reference) {
            Some(VerificationState::Success(result)) => {
                Some(Reconciliation::AlreadyConfirmed(result))
            }
            Some(VerificationState::Failed(result)) => Some(Reconciliation::AlreadyFailed(result)),
            _ => None,
        }
    }

    fn fail(
        &self,
        reference: &str,
        appointment_id: &str,
        reported_minor: i64,
        reason: String,
    ) -> Reconciliation {
        let result = VerificationResult {
            reference: reference.to_string(),
            status: GatewayStatus::Failed,
            amount: telepay_types::Amount::from_minor(reported_minor),
            appointment_id: Some(appointment_id.to_string()),
            reason: Some(reason.clone()),
        };
        self.session
            .record_terminal(reference, VerificationState::Failed(result.clone()));
        let applied = self
            .appointments
            .apply_outcome(appointment_id, AppointmentPaymentState::PaymentFailed);
        if applied {
            info!(reference, appointment_id, reason, "payment failed");
            self.sink.notify(PaymentNotification::Failed {
                reference: reference.to_string(),
                reason,
            });
        }
        Reconciliation::Failed(result)
    }

    /// Bounded retry over transport-level failures only; a gateway answer,
    /// good or bad, returns immediately.
    async fn verify_with_retry(
        &self,
        reference: &str,
    ) -> Result<telepay_types::GatewayVerification, PaymentError> {
        let mut attempt = 1;
        loop {
            match self.backend.verify(reference).await {
                Ok(verification) => return Ok(verification),
                Err(error @ PaymentError::VerificationUnreachable(_))
                    if attempt < self.retry.max_attempts =>
                {
                    warn!(reference, attempt, %error, "verification unreachable, retrying");
                    attempt += 1;
                    self.sleeper.sleep(self.retry.delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
