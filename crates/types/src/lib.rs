pub mod amount;
pub mod appointment;
pub mod config;
pub mod error;
pub mod intent;
pub mod verification;

pub use amount::Amount;
pub use appointment::AppointmentPaymentState;
pub use config::{Environment, GatewayConfig};
pub use error::PaymentError;
pub use intent::{PaymentIntent, generate_reference};
pub use verification::{CheckoutSession, GatewayStatus, GatewayVerification, VerificationResult};
