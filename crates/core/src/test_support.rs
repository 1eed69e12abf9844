//! Scripted collaborators shared by the core's tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use telepay_types::{
    Amount, CheckoutSession, GatewayConfig, GatewayStatus, GatewayVerification, PaymentError,
    PaymentIntent,
};
use url::Url;

use crate::appointments::{AppointmentDirectory, InMemoryAppointments};
use crate::backend::PaymentBackend;
use crate::initiator::PaymentInitiator;
use crate::notify::NotificationSink;
use crate::notify::test_support::RecordingSink;
use crate::reconciler::VerificationReconciler;
use crate::retry::RetryPolicy;
use crate::retry::test_support::NoSleep;
use crate::session::PaymentSession;

/// Backend double with scripted responses.
///
/// `initialize` echoes the intent's reference and hands back an HTTPS
/// checkout URL unless a failure or URL override is queued. `verify` pops
/// scripted results in order and counts calls.
#[derive(Default)]
pub struct ScriptedBackend {
    pub init_failures: Mutex<VecDeque<PaymentError>>,
    pub checkout_url_override: Mutex<Option<String>>,
    pub verifications: Mutex<VecDeque<Result<GatewayVerification, PaymentError>>>,
    pub verify_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn script_verification(&self, result: Result<GatewayVerification, PaymentError>) {
        self.verifications.lock().push_back(result);
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

pub fn gateway_success(minor: i64, appointment_id: &str) -> GatewayVerification {
    GatewayVerification {
        status: GatewayStatus::Success,
        amount: Amount::from_minor(minor),
        appointment_id: Some(appointment_id.to_string()),
        gateway_response: Some("Approved".to_string()),
        metadata: IndexMap::new(),
    }
}

pub fn gateway_failed(minor: i64, reason: &str) -> GatewayVerification {
    GatewayVerification {
        status: GatewayStatus::Failed,
        amount: Amount::from_minor(minor),
        appointment_id: None,
        gateway_response: Some(reason.to_string()),
        metadata: IndexMap::new(),
    }
}

pub fn gateway_pending(minor: i64) -> GatewayVerification {
    GatewayVerification {
        status: GatewayStatus::Pending,
        amount: Amount::from_minor(minor),
        appointment_id: None,
        gateway_response: None,
        metadata: IndexMap::new(),
    }
}

impl PaymentBackend for Arc<ScriptedBackend> {
    async fn initialize(&self, intent: &PaymentIntent) -> Result<CheckoutSession, PaymentError> {
        if let Some(error) = self.init_failures.lock().pop_front() {
            return Err(error);
        }
        let authorization_url = self
            .checkout_url_override
            .lock()
            .clone()
            .unwrap_or_else(|| format!("https://checkout.paystack.com/{}", intent.reference));
        Ok(CheckoutSession {
            authorization_url,
            access_code: format!("AC_{}", intent.reference),
            reference: intent.reference.clone(),
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, PaymentError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verifications
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted verify call for {reference}"))
    }
}

/// One fully wired flow with scripted collaborators.
pub struct World {
    pub backend: Arc<ScriptedBackend>,
    pub session: Arc<PaymentSession>,
    pub appointments: Arc<InMemoryAppointments>,
    pub sink: Arc<RecordingSink>,
    pub config: GatewayConfig,
}

impl World {
    pub fn new() -> Self {
        Self {
            backend: Arc::new(ScriptedBackend::default()),
            session: PaymentSession::new(),
            appointments: Arc::new(InMemoryAppointments::new()),
            sink: Arc::new(RecordingSink::default()),
            config: GatewayConfig::sandbox(
                Url::parse("http://localhost:3000/api")
                    .unwrap_or_else(|_| unreachable!("valid test url")),
            ),
        }
    }

    pub fn initiator(&self) -> PaymentInitiator<Arc<ScriptedBackend>> {
        PaymentInitiator::new(
            Arc::clone(&self.backend),
            self.config.clone(),
            Arc::clone(&self.session),
            Arc::clone(&self.appointments) as Arc<dyn AppointmentDirectory>,
        )
    }

    pub fn reconciler(&self) -> VerificationReconciler<Arc<ScriptedBackend>, NoSleep> {
        VerificationReconciler::with_sleeper(
            Arc::clone(&self.backend),
            Arc::clone(&self.session),
            Arc::clone(&self.appointments) as Arc<dyn AppointmentDirectory>,
            Arc::clone(&self.sink) as Arc<dyn NotificationSink>,
            RetryPolicy {
                max_attempts: 3,
                delay: Duration::ZERO,
            },
            NoSleep::default(),
        )
    }
}
