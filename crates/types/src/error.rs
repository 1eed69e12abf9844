/// Error taxonomy for the payment flow.
///
/// The split that matters most at the call sites: transport-level failures
/// ("we don't know yet", retryable against the same reference) versus
/// gateway-reported failures ("the gateway says no", terminal for the
/// reference, retryable only via a brand-new initiation).
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid payer email: {0}")]
    InvalidEmail(String),

    #[error("appointment {0} already has a payment confirmed or awaiting verification")]
    DuplicateInitiation(String),

    #[error("payment initialization failed: {0}")]
    InitiationFailed(String),

    #[error("payment initialization rejected: {0}")]
    InitiationRejected(String),

    #[error("checkout url is not an absolute https url: {0}")]
    InvalidCheckoutUrl(String),

    #[error("verification unreachable: {0}")]
    VerificationUnreachable(String),

    #[error("gateway reported failure: {0}")]
    GatewayReportedFailure(String),

    #[error("amount mismatch: expected {expected} minor units, gateway reported {actual}")]
    AmountMismatch { expected: i64, actual: i64 },

    #[error("unknown payment reference: {0}")]
    UnknownReference(String),
}

impl PaymentError {
    /// Whether the caller may retry the same operation without changing
    /// input. `InitiationFailed` is retryable but only with a NEW reference;
    /// `VerificationUnreachable` is retryable against the same reference.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::InitiationFailed(_) | PaymentError::VerificationUnreachable(_)
        )
    }
}
