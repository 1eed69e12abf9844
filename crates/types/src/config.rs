use serde::{Deserialize, Serialize};
use url::Url;

use crate::amount::Amount;

/// Gateway environment. Test keys and live keys are distinct on the gateway
/// side; the flag only selects which externally supplied key is in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Test,
    Live,
}

/// Externally supplied configuration for the payment flow.
///
/// None of this is core logic: the public key, environment, currency and
/// URLs all arrive from the deployment environment.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway public key (pk_test_... / pk_live_...)
    pub public_key: String,
    pub environment: Environment,
    /// Three-letter ISO currency code
    pub currency: String,
    /// Custom-scheme URI the checkout surface redirects to on completion
    pub callback_url: Url,
    /// Base URL of the platform backend that proxies the gateway
    pub backend_url: Url,
    /// Upper bound on a single charge, in major units
    pub amount_ceiling: Amount,
}

impl GatewayConfig {
    pub const DEFAULT_CALLBACK: &str = "telepay://payment-callback";
    pub const DEFAULT_CURRENCY: &str = "GHS";

    /// Maximum single charge: 1,000,000 major units.
    pub fn default_ceiling() -> Amount {
        Amount::from_major(1_000_000.0)
    }

    /// Load configuration from the environment.
    ///
    /// Recognized variables: `TELEPAY_PUBLIC_KEY`, `TELEPAY_ENVIRONMENT`
    /// ("test"/"live"), `TELEPAY_CURRENCY`, `TELEPAY_CALLBACK_URL`,
    /// `TELEPAY_BACKEND_URL`.
    pub fn from_env() -> Result<Self, String> {
        let environment = match std::env::var("TELEPAY_ENVIRONMENT").as_deref() {
            Ok("live") => Environment::Live,
            _ => Environment::Test,
        };
        let callback_url = std::env::var("TELEPAY_CALLBACK_URL")
            .unwrap_or_else(|_| Self::DEFAULT_CALLBACK.to_string());
        let backend_url = std::env::var("TELEPAY_BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000/api".to_string());

        Ok(Self {
            public_key: std::env::var("TELEPAY_PUBLIC_KEY").unwrap_or_default(),
            environment,
            currency: std::env::var("TELEPAY_CURRENCY")
                .unwrap_or_else(|_| Self::DEFAULT_CURRENCY.to_string()),
            callback_url: Url::parse(&callback_url)
                .map_err(|e| format!("invalid TELEPAY_CALLBACK_URL: {e}"))?,
            backend_url: Url::parse(&backend_url)
                .map_err(|e| format!("invalid TELEPAY_BACKEND_URL: {e}"))?,
            amount_ceiling: Self::default_ceiling(),
        })
    }

    /// Configuration for tests and local sandboxes.
    pub fn sandbox(backend_url: Url) -> Self {
        Self {
            public_key: "pk_test_sandbox".to_string(),
            environment: Environment::Test,
            currency: Self::DEFAULT_CURRENCY.to_string(),
            callback_url: Url::parse(Self::DEFAULT_CALLBACK)
                .unwrap_or_else(|_| unreachable!("default callback is a valid url")),
            backend_url,
            amount_ceiling: Self::default_ceiling(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_defaults() {
        let config = GatewayConfig::sandbox(Url::parse("http://localhost:3000/api").unwrap());
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.currency, "GHS");
        assert_eq!(config.callback_url.scheme(), "telepay");
        assert_eq!(config.amount_ceiling, Amount::from_minor(100_000_000));
    }
}
