//! Payment initialization and verification core.
//!
//! One checkout attempt flows through three stages sharing a single
//! [`session::PaymentSession`]:
//!
//! 1. [`initiator::PaymentInitiator`] builds an immutable intent, submits it
//!    to the backend and hands back the external checkout URL.
//! 2. [`deeplink::DeepLinkRouter`] captures the platform deep-link that
//!    returns the transaction reference after the out-of-app checkout.
//! 3. [`reconciler::VerificationReconciler`] asks the backend for the
//!    gateway's authoritative status and applies it to the appointment
//!    exactly once, no matter how many times it is invoked.

pub mod appointments;
pub mod backend;
pub mod deeplink;
pub mod initiator;
pub mod notify;
pub mod reconciler;
pub mod retry;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use appointments::{AppointmentDirectory, InMemoryAppointments};
pub use backend::PaymentBackend;
pub use deeplink::DeepLinkRouter;
pub use initiator::{CheckoutHandoff, InitiateRequest, PaymentInitiator};
pub use notify::{BroadcastSink, NotificationSink, PaymentNotification};
pub use reconciler::{Reconciliation, VerificationReconciler};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use session::{PaymentSession, VerificationState};
