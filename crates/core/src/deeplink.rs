use telepay_types::GatewayConfig;
use tracing::debug;
use url::Url;

use crate::session::PaymentSession;

/// Filters inbound platform deep-links down to payment callbacks.
///
/// The checkout surface redirects to a custom-scheme URI such as
/// `telepay://payment-callback?reference=TPAY_...`. Anything whose scheme or
/// host differs from the configured callback target is ignored with no side
/// effects, so unrelated links opened elsewhere in the app can never reach
/// the payment logic.
#[derive(Debug, Clone)]
pub struct DeepLinkRouter {
    scheme: String,
    host: String,
}

impl DeepLinkRouter {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            scheme: config.callback_url.scheme().to_string(),
            host: config
                .callback_url
                .host_str()
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Extract the transaction reference from a callback URI, or `None` for
    /// anything that is not a well-formed payment callback.
    pub fn extract_reference(&self, uri: &str) -> Option<String> {
        let parsed = Url::parse(uri).ok()?;
        if parsed.scheme() != self.scheme || parsed.host_str() != Some(self.host.as_str()) {
            debug!(uri, "ignoring non-callback uri");
            return None;
        }
        parsed
            .query_pairs()
            .find(|(key, _)| key == "reference")
            .map(|(_, value)| value.into_owned())
            .filter(|reference| !reference.is_empty())
    }

    /// Filter plus redelivery de-dup: platforms can deliver the same link
    /// more than once, and only the first delivery of a reference should
    /// trigger verification.
    pub fn accept(&self, uri: &str, session: &PaymentSession) -> Option<String> {
        let reference = self.extract_reference(uri)?;
        if !session.accept_delivery(&reference) {
            debug!(reference, "deep-link redelivery, ignoring");
            return None;
        }
        Some(reference)
    }

    /// Startup catch-up for a deep-link that arrived before the listener was
    /// attached (the platform's "last launching URI").
    pub fn accept_initial(&self, uri: Option<&str>, session: &PaymentSession) -> Option<String> {
        self.accept(uri?, session)
    }
}
