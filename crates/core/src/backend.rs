use telepay_driver_paystack::{BackendClient, DriverError, InitializeRequest};
use telepay_types::{CheckoutSession, GatewayVerification, PaymentError, PaymentIntent};

/// Seam between the flow and the platform backend.
///
/// Production uses [`BackendClient`]; tests script the two calls. Both
/// methods distinguish "could not reach the backend" from "the backend
/// answered no": the former keeps the reference retryable, the latter does
/// not.
pub trait PaymentBackend {
    fn initialize(
        &self,
        intent: &PaymentIntent,
    ) -> impl Future<Output = Result<CheckoutSession, PaymentError>> + Send;

    fn verify(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<GatewayVerification, PaymentError>> + Send;
}

impl PaymentBackend for BackendClient {
    async fn initialize(&self, intent: &PaymentIntent) -> Result<CheckoutSession, PaymentError> {
        let request = InitializeRequest {
            appointment_id: intent.appointment_id.clone(),
            amount: intent.amount.minor(),
            email: intent.payer_email.clone(),
            reference: intent.reference.clone(),
            callback_url: intent.callback_url.to_string(),
            metadata: intent.metadata.clone(),
        };
        BackendClient::initialize(self, &request)
            .await
            .map_err(|e| match e {
                DriverError::Transport(e) => PaymentError::InitiationFailed(e.to_string()),
                DriverError::Rejected { message, .. } => PaymentError::InitiationRejected(message),
                DriverError::Malformed(message) => PaymentError::InitiationFailed(message),
            })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, PaymentError> {
        BackendClient::verify(self, reference)
            .await
            .map_err(|e| match e {
                DriverError::Transport(e) => PaymentError::VerificationUnreachable(e.to_string()),
                DriverError::Rejected { message, .. } => {
                    PaymentError::VerificationUnreachable(message)
                }
                DriverError::Malformed(message) => PaymentError::VerificationUnreachable(message),
            })
    }
}
