use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::amount::Amount;

/// Generate a fresh transaction reference.
///
/// The reference is the idempotency key for one checkout attempt, correlating
/// initiation, the external checkout redirect, the deep-link return and
/// verification. High-entropy construction: millisecond timestamp plus a
/// random alphanumeric suffix.
pub fn generate_reference() -> String {
    use rand::Rng;
    use rand::distr::Alphanumeric;
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("TPAY_{}_{}", Utc::now().timestamp_millis(), suffix).to_uppercase()
}

/// A payment intent for one checkout attempt.
///
/// Immutable after creation and never reused across attempts: a failed
/// attempt mints a new reference rather than retrying the old one, so the
/// gateway never sees a reference it has already marked terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Client-generated idempotency key, unique per attempt
    pub reference: String,

    /// Consultation fee, carried in minor units
    pub amount: Amount,

    /// Payer email, required by the gateway
    pub payer_email: String,

    /// Appointment record owned by the booking subsystem
    pub appointment_id: String,

    /// Open key-value bag (doctor id, patient id, appointment date/time).
    /// Passed through the gateway unmodified and echoed on verification.
    #[serde(default)]
    pub metadata: IndexMap<String, String>,

    /// URI the external checkout surface invokes to hand control back
    pub callback_url: Url,

    /// When the intent was created
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl PaymentIntent {
    pub fn new(
        appointment_id: String,
        amount: Amount,
        payer_email: String,
        metadata: IndexMap<String, String>,
        callback_url: Url,
    ) -> Self {
        Self {
            reference: generate_reference(),
            amount,
            payer_email,
            appointment_id,
            metadata,
            callback_url,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_shape() {
        let reference = generate_reference();
        assert!(reference.starts_with("TPAY_"));
        let parts: Vec<&str> = reference.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn test_references_are_unique() {
        let a = generate_reference();
        let b = generate_reference();
        assert_ne!(a, b);
    }

    #[test]
    fn test_intent_round_trips_through_yaml() {
        let mut metadata = IndexMap::new();
        metadata.insert("doctorId".to_string(), "D9".to_string());
        metadata.insert("patientId".to_string(), "P4".to_string());
        let intent = PaymentIntent::new(
            "A1".to_string(),
            Amount::from_major(150.0),
            "p@x.com".to_string(),
            metadata,
            Url::parse("telepay://payment-callback").unwrap(),
        );

        let yaml = serde_yml::to_string(&intent).unwrap();
        let parsed: PaymentIntent = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.reference, intent.reference);
        assert_eq!(parsed.amount, intent.amount);
        assert_eq!(parsed.metadata.get("doctorId").unwrap(), "D9");
    }
}
