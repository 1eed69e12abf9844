use std::sync::Arc;

use indexmap::IndexMap;
use telepay_types::{Amount, GatewayConfig, PaymentError, PaymentIntent};
use tracing::{info, warn};
use url::Url;

use crate::appointments::AppointmentDirectory;
use crate::backend::PaymentBackend;
use crate::session::PaymentSession;

/// Input for one checkout attempt. Amount is in major units here; the
/// minor-unit conversion happens when the intent is built.
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    pub appointment_id: String,
    pub amount: f64,
    pub payer_email: String,
    /// Doctor/patient/schedule context carried through the gateway verbatim
    pub metadata: IndexMap<String, String>,
}

/// What the caller needs to hand control to the external checkout surface.
#[derive(Debug, Clone)]
pub struct CheckoutHandoff {
    pub reference: String,
    pub checkout_url: Url,
    pub access_code: String,
}

/// Builds payment intents and submits them to the backend.
pub struct PaymentInitiator<B> {
    backend: B,
    config: GatewayConfig,
    session: Arc<PaymentSession>,
    appointments: Arc<dyn AppointmentDirectory>,
}

/// Matches the gateway's email requirement: one `@`, no whitespace, and a
/// dotted domain with non-empty segments.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.split('.').count() >= 2
        && domain.split('.').all(|segment| !segment.is_empty())
}

impl<B: PaymentBackend> PaymentInitiator<B> {
    pub fn new(
        backend: B,
        config: GatewayConfig,
        session: Arc<PaymentSession>,
        appointments: Arc<dyn AppointmentDirectory>,
    ) -> Self {
        Self {
            backend,
            config,
            session,
            appointments,
        }
    }

    /// Start a checkout attempt for an appointment.
    ///
    /// The appointment moves to `awaiting_verification` only after the
    /// backend has accepted the intent and returned a usable checkout URL;
    /// every failure path leaves it `unpaid` and bookable again. A failed
    /// attempt is retried with a fresh call here, never by reusing the old
    /// reference.
    pub async fn initiate(
        &self,
        request: InitiateRequest,
    ) -> Result<CheckoutHandoff, PaymentError> {
        let amount = Amount::from_major(request.amount);
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount(format!(
                "amount must be positive, got {}",
                request.amount
            )));
        }
        if amount > self.config.amount_ceiling {
            return Err(PaymentError::InvalidAmount(format!(
                "amount {} exceeds ceiling {}",
                amount, self.config.amount_ceiling
            )));
        }
        if !is_valid_email(&request.payer_email) {
            return Err(PaymentError::InvalidEmail(request.payer_email));
        }

        let current = self
            .appointments
            .payment_state(&request.appointment_id)
            .unwrap_or(telepay_types::AppointmentPaymentState::Unpaid);
        if !current.accepts_initiation() {
            return Err(PaymentError::DuplicateInitiation(request.appointment_id));
        }

        let mut intent = PaymentIntent::new(
            request.appointment_id.clone(),
            amount,
            request.payer_email,
            request.metadata,
            self.config.callback_url.clone(),
        );
        info!(reference = %intent.reference, appointment_id = %request.appointment_id,
              amount = %amount, "initiating payment");

        let checkout = self.backend.initialize(&intent).await?;

        // Fail closed on anything that is not an absolute HTTPS URL; the
        // checkout surface is outside the app's control and must never be
        // opened on an unvetted target.
        let checkout_url = Url::parse(&checkout.authorization_url)
            .map_err(|_| PaymentError::InvalidCheckoutUrl(checkout.authorization_url.clone()))?;
        if checkout_url.scheme() != "https" {
            return Err(PaymentError::InvalidCheckoutUrl(checkout.authorization_url));
        }

        // The gateway's reference is the one verification will be keyed on.
        if checkout.reference != intent.reference {
            warn!(ours = %intent.reference, theirs = %checkout.reference,
                  "backend substituted the transaction reference");
            intent.reference = checkout.reference.clone();
        }

        let reference = intent.reference.clone();
        self.session.register_intent(intent);
        self.appointments.mark_awaiting(&request.appointment_id);

        Ok(CheckoutHandoff {
            reference,
            checkout_url,
            access_code: checkout.access_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::World;
    use telepay_types::AppointmentPaymentState;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("p@x.com"));
        assert!(is_valid_email("first.last@clinic.example.org"));
        assert!(!is_valid_email("p@x"));
        assert!(!is_valid_email("p@x."));
        assert!(!is_valid_email("p@.com"));
        assert!(!is_valid_email("p x@x.com"));
        assert!(!is_valid_email("p@x@y.com"));
        assert!(!is_valid_email(""));
    }

    fn request(appointment_id: &str, amount: f64, email: &str) -> InitiateRequest {
        InitiateRequest {
            appointment_id: appointment_id.to_string(),
            amount,
            payer_email: email.to_string(),
            metadata: IndexMap::new(),
        }
    }

    #[tokio::test]
    async fn test_successful_initiation() {
        let world = World::new();
        let handoff = world
            .initiator()
            .initiate(request("A1", 150.0, "p@x.com"))
            .await
            .unwrap();

        assert_eq!(handoff.checkout_url.scheme(), "https");
        assert!(handoff.reference.starts_with("TPAY_"));
        assert_eq!(
            world.appointments.payment_state("A1"),
            Some(AppointmentPaymentState::AwaitingVerification)
        );
        let intent = world.session.intent(&handoff.reference).unwrap();
        assert_eq!(intent.amount.minor(), 15_000);
        assert_eq!(intent.callback_url.as_str(), "telepay://payment-callback");
    }

    #[tokio::test]
    async fn test_rejects_invalid_amounts() {
        let world = World::new();
        let initiator = world.initiator();

        let error = initiator.initiate(request("A1", 0.0, "p@x.com")).await.unwrap_err();
        assert!(matches!(error, PaymentError::InvalidAmount(_)));

        let error = initiator.initiate(request("A1", -5.0, "p@x.com")).await.unwrap_err();
        assert!(matches!(error, PaymentError::InvalidAmount(_)));

        let error = initiator
            .initiate(request("A1", 1_000_001.0, "p@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(error, PaymentError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_rejects_invalid_email() {
        let world = World::new();
        let error = world
            .initiator()
            .initiate(request("A1", 150.0, "not-an-email"))
            .await
            .unwrap_err();
        assert!(matches!(error, PaymentError::InvalidEmail(_)));
    }

    #[tokio::test]
    async fn test_rejects_duplicate_initiation() {
        let world = World::new();
        for state in [
            AppointmentPaymentState::AwaitingVerification,
            AppointmentPaymentState::Confirmed,
        ] {
            world.appointments.insert("A1", state);
            let error = world
                .initiator()
                .initiate(request("A1", 150.0, "p@x.com"))
                .await
                .unwrap_err();
            assert!(matches!(error, PaymentError::DuplicateInitiation(_)));
        }
    }

    #[tokio::test]
    async fn test_failed_initiation_leaves_appointment_unpaid() {
        let world = World::new();
        world.appointments.insert("A1", AppointmentPaymentState::Unpaid);
        world
            .backend
            .init_failures
            .lock()
            .push_back(PaymentError::InitiationFailed("backend 502".to_string()));

        let error = world
            .initiator()
            .initiate(request("A1", 150.0, "p@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(error, PaymentError::InitiationFailed(_)));
        assert_eq!(
            world.appointments.payment_state("A1"),
            Some(AppointmentPaymentState::Unpaid)
        );
        assert!(world.session.references().is_empty());
    }

    #[tokio::test]
    async fn test_non_https_checkout_url_fails_closed() {
        let world = World::new();
        world.appointments.insert("A1", AppointmentPaymentState::Unpaid);
        *world.backend.checkout_url_override.lock() =
            Some("http://checkout.paystack.com/abc".to_string());

        let error = world
            .initiator()
            .initiate(request("A1", 150.0, "p@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(error, PaymentError::InvalidCheckoutUrl(_)));
        // Fail closed: nothing registered, appointment still bookable.
        assert_eq!(
            world.appointments.payment_state("A1"),
            Some(AppointmentPaymentState::Unpaid)
        );
        assert!(world.session.references().is_empty());
    }
}
