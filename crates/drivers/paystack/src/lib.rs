//! HTTP client for the platform backend's payment endpoints.
//!
//! The app never talks to Paystack directly: initialization and verification
//! both go through the backend, which holds the secret key and is the only
//! party allowed to ask the gateway for transaction truth.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use telepay_types::{Amount, CheckoutSession, GatewayStatus, GatewayVerification};
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// Initialization request as the backend expects it. Amount is already in
/// minor units; the conversion happens before the transport boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub appointment_id: String,
    pub amount: i64,
    pub email: String,
    pub reference: String,
    pub callback_url: String,
    pub metadata: IndexMap<String, String>,
}

/// Standard backend response envelope: `{success, message, data}`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: i64,
    #[serde(rename = "appointmentId")]
    appointment_id: Option<String>,
    #[serde(rename = "paystackStatus")]
    paystack_status: Option<String>,
    #[serde(default)]
    metadata: IndexMap<String, String>,
}

/// Map a gateway status string to the typed status. Paystack reports
/// `abandoned` for checkouts the payer walked away from; unknown strings are
/// treated as failed rather than silently accepted.
fn parse_gateway_status(raw: &str) -> GatewayStatus {
    match raw {
        "success" => GatewayStatus::Success,
        "pending" | "ongoing" | "processing" | "queued" => GatewayStatus::Pending,
        "cancelled" | "abandoned" => GatewayStatus::Cancelled,
        "failed" => GatewayStatus::Failed,
        other => {
            warn!(status = other, "unrecognized gateway status, treating as failed");
            GatewayStatus::Failed
        }
    }
}

/// Client for the backend payment routes.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: Url, bearer_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            bearer_token,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// POST /payments/initialize
    ///
    /// Submits a payment intent and returns the checkout session the payer
    /// is redirected to.
    pub async fn initialize(
        &self,
        request: &InitializeRequest,
    ) -> Result<CheckoutSession, DriverError> {
        let url = self.endpoint("payments/initialize");
        debug!(reference = %request.reference, amount = request.amount, "initializing payment");

        let response = self
            .authorize(self.http.post(&url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DriverError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<CheckoutSession> = response
            .json()
            .await
            .map_err(|e| DriverError::Malformed(e.to_string()))?;

        if !envelope.success {
            return Err(DriverError::Rejected {
                status: status.as_u16(),
                message: envelope.message.unwrap_or_else(|| "initialization refused".to_string()),
            });
        }
        envelope
            .data
            .ok_or_else(|| DriverError::Malformed("missing data in initialize response".to_string()))
    }

    /// GET /payments/verify/{reference}
    ///
    /// Asks the backend for the gateway's authoritative view of the
    /// transaction. A non-success gateway status is a valid response here,
    /// not an error; only transport and envelope problems surface as `Err`.
    pub async fn verify(&self, reference: &str) -> Result<GatewayVerification, DriverError> {
        let url = self.endpoint(&format!("payments/verify/{reference}"));
        debug!(reference, "verifying payment");

        let response = self.authorize(self.http.get(&url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DriverError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        // The backend sets success=false for non-success gateway statuses,
        // so the envelope flag is not consulted for verification.
        let envelope: Envelope<VerifyData> = response
            .json()
            .await
            .map_err(|e| DriverError::Malformed(e.to_string()))?;

        let data = envelope
            .data
            .ok_or_else(|| DriverError::Malformed("missing data in verify response".to_string()))?;

        Ok(GatewayVerification {
            status: parse_gateway_status(&data.status),
            amount: Amount::from_minor(data.amount),
            appointment_id: data.appointment_id,
            gateway_response: data.paystack_status,
            metadata: data.metadata,
        })
    }
}
