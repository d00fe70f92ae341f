//! Card payment gateway client.
//!
//! The checkout flow never sees raw card handling logic; it hands an opaque
//! [`CardDetails`] capture and a single-use [`ClientSecret`] to a
//! [`PaymentGateway`] and gets back the provider's verdict. The production
//! implementation is [`StripeGateway`], which confirms a payment intent
//! against Stripe's REST API using only the publishable key - the secret key
//! stays on the backend that created the intent.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use saffron_core::PaymentReference;

use crate::config::StripeConfig;

/// Errors reported by the payment gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The provider declined the payment instrument. Carries the provider's
    /// message verbatim.
    #[error("{0}")]
    Declined(String),

    /// Provider-side fault other than a decline.
    #[error("payment provider error: {0}")]
    Provider(String),

    /// The HTTP request never produced a response.
    #[error("payment request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider's response did not match the expected shape.
    #[error("malformed provider response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The client secret is not in the provider's expected format.
    #[error("client secret is not in the expected format")]
    BadClientSecret,
}

/// A payment intent's single-use client secret.
///
/// One secret authorizes exactly one confirmation attempt; after a failed
/// attempt a fresh intent (and secret) must be requested from the backend.
/// The raw value never appears in `Debug` output.
#[derive(Clone)]
pub struct ClientSecret(SecretString);

impl ClientSecret {
    /// Wrap a backend-issued client secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::from(secret.into()))
    }

    /// Expose the raw secret for the confirmation call.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// The payment intent id embedded in the secret
    /// (`pi_123_secret_abc` -> `pi_123`).
    #[must_use]
    pub fn intent_id(&self) -> Option<&str> {
        let raw = self.0.expose_secret();
        let (id, _) = raw.split_once("_secret")?;
        if id.is_empty() { None } else { Some(id) }
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ClientSecret").field(&"[REDACTED]").finish()
    }
}

/// A captured payment instrument.
///
/// Treated as opaque by everything except the gateway itself; `Debug` shows
/// only the last four digits.
#[derive(Clone)]
pub struct CardDetails {
    /// Primary account number.
    pub number: String,
    /// Expiry month (1-12).
    pub exp_month: u32,
    /// Expiry year (four digits).
    pub exp_year: u32,
    /// Card verification code.
    pub cvc: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let last4 = self
            .number
            .get(self.number.len().saturating_sub(4)..)
            .unwrap_or("");
        f.debug_struct("CardDetails")
            .field("number", &format!("****{last4}"))
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvc", &"***")
            .finish()
    }
}

/// Payment intent status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Processing,
    RequiresAction,
    RequiresPaymentMethod,
    RequiresConfirmation,
    Canceled,
    /// Any status this client does not recognize.
    #[serde(other)]
    Unknown,
}

/// The provider's verdict on a confirmation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// The provider's reference for this payment attempt.
    pub payment_reference: PaymentReference,
    /// Reported intent status.
    pub status: PaymentStatus,
}

impl PaymentConfirmation {
    /// Whether funds were captured.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == PaymentStatus::Succeeded
    }
}

/// A client that can confirm a payment intent with a captured instrument.
pub trait PaymentGateway {
    /// Confirm the intent identified by `client_secret` with `card`.
    ///
    /// Blocks until the provider resolves or errors; there is no
    /// client-owned timeout. A failed confirmation consumes the secret.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Declined`] for instrument declines and other
    /// variants for transport or provider faults.
    async fn confirm_payment(
        &self,
        client_secret: &ClientSecret,
        card: &CardDetails,
    ) -> Result<PaymentConfirmation, GatewayError>;
}

// =============================================================================
// StripeGateway
// =============================================================================

/// Stripe implementation of [`PaymentGateway`].
///
/// Confirms payment intents through Stripe's REST API with the publishable
/// key, the same surface the browser SDK uses under the hood.
#[derive(Clone)]
pub struct StripeGateway {
    inner: Arc<StripeGatewayInner>,
}

struct StripeGatewayInner {
    http: reqwest::Client,
    api_base: String,
    publishable_key: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    id: String,
    status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ProviderFault,
}

#[derive(Debug, Deserialize)]
struct ProviderFault {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl StripeGateway {
    /// Create a new Stripe gateway client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            inner: Arc::new(StripeGatewayInner {
                http: reqwest::Client::new(),
                api_base: config.api_base.as_str().trim_end_matches('/').to_string(),
                publishable_key: config.publishable_key.clone(),
            }),
        }
    }
}

impl PaymentGateway for StripeGateway {
    #[instrument(skip_all)]
    async fn confirm_payment(
        &self,
        client_secret: &ClientSecret,
        card: &CardDetails,
    ) -> Result<PaymentConfirmation, GatewayError> {
        let intent_id = client_secret
            .intent_id()
            .ok_or(GatewayError::BadClientSecret)?;

        let url = format!(
            "{}/v1/payment_intents/{intent_id}/confirm",
            self.inner.api_base
        );

        let exp_month = card.exp_month.to_string();
        let exp_year = card.exp_year.to_string();
        let params = [
            ("key", self.inner.publishable_key.as_str()),
            ("client_secret", client_secret.expose()),
            ("payment_method_data[type]", "card"),
            ("payment_method_data[card][number]", card.number.as_str()),
            ("payment_method_data[card][exp_month]", exp_month.as_str()),
            ("payment_method_data[card][exp_year]", exp_year.as_str()),
            ("payment_method_data[card][cvc]", card.cvc.as_str()),
        ];

        let response = self.inner.http.post(&url).form(&params).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(decode_fault(&text, status));
        }

        let confirmed: ConfirmResponse = serde_json::from_str(&text)?;
        tracing::debug!(status = ?confirmed.status, "payment confirmation resolved");

        Ok(PaymentConfirmation {
            payment_reference: PaymentReference::new(confirmed.id),
            status: confirmed.status,
        })
    }
}

/// Map a non-success provider response to a [`GatewayError`].
fn decode_fault(body: &str, status: reqwest::StatusCode) -> GatewayError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope
                .error
                .message
                .unwrap_or_else(|| format!("provider returned HTTP {status}"));
            if envelope.error.kind.as_deref() == Some("card_error") {
                GatewayError::Declined(message)
            } else {
                GatewayError::Provider(message)
            }
        }
        Err(_) => GatewayError::Provider(format!("provider returned HTTP {status}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_secret_intent_id() {
        let secret = ClientSecret::new("pi_3Abc_secret_xyz");
        assert_eq!(secret.intent_id(), Some("pi_3Abc"));
    }

    #[test]
    fn test_client_secret_intent_id_rejects_bad_shapes() {
        assert_eq!(ClientSecret::new("garbage").intent_id(), None);
        assert_eq!(ClientSecret::new("_secret_xyz").intent_id(), None);
    }

    #[test]
    fn test_client_secret_debug_is_redacted() {
        let secret = ClientSecret::new("pi_3Abc_secret_xyz");
        let debug = format!("{secret:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("xyz"));
    }

    #[test]
    fn test_card_debug_shows_only_last4() {
        let card = CardDetails {
            number: "4242424242424242".to_string(),
            exp_month: 12,
            exp_year: 2030,
            cvc: "123".to_string(),
        };
        let debug = format!("{card:?}");
        assert!(debug.contains("****4242"));
        assert!(!debug.contains("4242424242424242"));
        assert!(!debug.contains("123"));
    }

    #[test]
    fn test_decode_fault_card_error_is_a_decline() {
        let body = r#"{"error": {"type": "card_error", "message": "Your card was declined."}}"#;
        let err = decode_fault(body, reqwest::StatusCode::PAYMENT_REQUIRED);
        assert!(matches!(err, GatewayError::Declined(_)));
        assert_eq!(err.to_string(), "Your card was declined.");
    }

    #[test]
    fn test_decode_fault_other_errors_are_provider_faults() {
        let body = r#"{"error": {"type": "api_error", "message": "Backplane unavailable"}}"#;
        let err = decode_fault(body, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, GatewayError::Provider(_)));
    }

    #[test]
    fn test_decode_fault_unparseable_body() {
        let err = decode_fault("<html>", reqwest::StatusCode::BAD_GATEWAY);
        assert!(matches!(err, GatewayError::Provider(_)));
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_payment_status_wire_names() {
        let status: PaymentStatus = serde_json::from_str("\"succeeded\"").unwrap();
        assert_eq!(status, PaymentStatus::Succeeded);

        let unknown: PaymentStatus = serde_json::from_str("\"some_future_status\"").unwrap();
        assert_eq!(unknown, PaymentStatus::Unknown);
    }

    #[test]
    fn test_confirmation_succeeded() {
        let confirmation = PaymentConfirmation {
            payment_reference: PaymentReference::new("pi_123"),
            status: PaymentStatus::Succeeded,
        };
        assert!(confirmation.succeeded());

        let pending = PaymentConfirmation {
            status: PaymentStatus::Processing,
            ..confirmation
        };
        assert!(!pending.succeeded());
    }
}
