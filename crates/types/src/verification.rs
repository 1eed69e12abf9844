use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// Gateway-reported transaction status.
///
/// Only a verification round-trip through the backend is authoritative;
/// status is never inferred from the redirect alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Success,
    Failed,
    Pending,
    Cancelled,
}

impl GatewayStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, GatewayStatus::Success)
    }

    /// Terminal statuses admit no further transitions for the reference.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GatewayStatus::Pending)
    }
}

/// Response payload from payment initialization: where to send the payer,
/// and the reference that correlates the attempt end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Raw verification payload as reported by the backend, which itself asks
/// the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayVerification {
    pub status: GatewayStatus,

    /// Gateway-confirmed amount in minor units
    pub amount: Amount,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,

    /// Verbatim gateway response string (e.g. "Declined by issuer")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_response: Option<String>,

    /// Intent metadata echoed back by the gateway
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
}

/// Reconciled, client-side view of one verification outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub reference: String,
    pub status: GatewayStatus,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    /// Pass-through failure reason when the outcome is not success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&GatewayStatus::Success).unwrap(),
            "\"success\""
        );
        let parsed: GatewayStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, GatewayStatus::Cancelled);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(GatewayStatus::Success.is_terminal());
        assert!(GatewayStatus::Failed.is_terminal());
        assert!(GatewayStatus::Cancelled.is_terminal());
        assert!(!GatewayStatus::Pending.is_terminal());
    }

    #[test]
    fn test_verification_payload_parses_backend_shape() {
        let json = r#"{
            "status": "success",
            "amount": 15000,
            "appointment_id": "A1",
            "gateway_response": "Approved",
            "metadata": {"doctorId": "D9"}
        }"#;
        let payload: GatewayVerification = serde_json::from_str(json).unwrap();
        assert!(payload.status.is_success());
        assert_eq!(payload.amount, Amount::from_minor(15_000));
        assert_eq!(payload.appointment_id.as_deref(), Some("A1"));
    }
}
