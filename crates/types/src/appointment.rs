use serde::{Deserialize, Serialize};

/// Payment lifecycle of an appointment record, as seen by this core.
///
/// The appointment itself is owned by the booking subsystem; this is the
/// subset of its state the payment flow reads and writes.
///
/// Legal transitions:
/// `unpaid -> awaiting_verification -> confirmed`
/// `unpaid -> awaiting_verification -> payment_failed`
///
/// Terminal states are monotonic: once `confirmed` or `payment_failed`, no
/// call sequence may move the appointment back or to the opposite terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentPaymentState {
    Unpaid,
    AwaitingVerification,
    Confirmed,
    PaymentFailed,
}

impl AppointmentPaymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentPaymentState::Confirmed | AppointmentPaymentState::PaymentFailed
        )
    }

    /// Whether a new checkout attempt may be started for this appointment.
    /// A failed payment is re-bookable with a fresh reference; an attempt
    /// already awaiting verification or confirmed is not (prevents
    /// double-charging one appointment).
    pub fn accepts_initiation(&self) -> bool {
        matches!(
            self,
            AppointmentPaymentState::Unpaid | AppointmentPaymentState::PaymentFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiation_gate() {
        assert!(AppointmentPaymentState::Unpaid.accepts_initiation());
        assert!(AppointmentPaymentState::PaymentFailed.accepts_initiation());
        assert!(!AppointmentPaymentState::AwaitingVerification.accepts_initiation());
        assert!(!AppointmentPaymentState::Confirmed.accepts_initiation());
    }

    #[test]
    fn test_snake_case_wire_format() {
        assert_eq!(
            serde_json::to_string(&AppointmentPaymentState::AwaitingVerification).unwrap(),
            "\"awaiting_verification\""
        );
    }
}
