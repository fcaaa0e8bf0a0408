//! Razorpay client for gateway payments.
//!
//! The storefront creates a gateway order for the cart total, the browser
//! completes payment in Razorpay's checkout widget, and the returned
//! `(payment_id, order_id, signature)` triple is verified here with
//! HMAC-SHA256 over `"{order_id}|{payment_id}"` keyed by the key secret.
//!
//! Created orders are remembered (with their amount) for a day, so a
//! signature is only accepted for an order this process created.

use std::time::Duration;

use hmac::{Hmac, Mac};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::RazorpayConfig;

type HmacSha256 = Hmac<Sha256>;

/// How long a created order can be verified against.
const ORDER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors that can occur when talking to Razorpay or verifying a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Signature did not match.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// The order handle was not created by this storefront (or expired).
    #[error("unknown gateway order: {0}")]
    UnknownOrder(String),

    /// The gateway order was for a different amount than the cart.
    #[error("gateway order amount {order} does not match cart amount {cart}")]
    AmountMismatch { order: i64, cart: i64 },

    /// Gateway payments are not configured.
    #[error("gateway payments are not enabled")]
    NotConfigured,
}

impl PaymentError {
    /// Whether this is a verdict on the customer's payment rather than an
    /// upstream failure.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature
                | Self::UnknownOrder(_)
                | Self::AmountMismatch { .. }
                | Self::NotConfigured
        )
    }
}

/// A gateway order as returned to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Minor units (paise).
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    key_id: String,
    key_secret: SecretString,
    orders_url: Url,
    orders: Cache<String, i64>,
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the base URL is
    /// unusable.
    pub fn new(config: &RazorpayConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let orders_url = config
            .api_base
            .join("orders")
            .map_err(|e| PaymentError::Parse(format!("Invalid API base: {e}")))?;
        let orders = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ORDER_TTL)
            .build();

        Ok(Self {
            client,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            orders_url,
            orders,
        })
    }

    /// Public key ID for the checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a gateway order for `amount` paise.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder, PaymentError> {
        let body = CreateOrderRequest {
            amount,
            currency: "INR",
            receipt,
        };

        let response = self
            .client
            .post(self.orders_url.clone())
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        self.remember(&order).await;
        debug!(order_id = %order.id, amount = order.amount, "Gateway order created");
        Ok(order)
    }

    /// Record an order as created by this storefront.
    pub async fn remember(&self, order: &GatewayOrder) {
        self.orders.insert(order.id.clone(), order.amount).await;
    }

    /// Verify a completed payment and return the order's amount in paise.
    ///
    /// # Errors
    ///
    /// Returns `UnknownOrder` if this storefront did not create the order and
    /// `InvalidSignature` if the signature does not match.
    #[instrument(skip(self, signature))]
    pub async fn verify(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<i64, PaymentError> {
        let amount = self
            .orders
            .get(order_id)
            .await
            .ok_or_else(|| PaymentError::UnknownOrder(order_id.to_string()))?;

        let expected = sign(self.key_secret.expose_secret(), order_id, payment_id)?;
        if !constant_time_compare(&expected, signature.trim()) {
            return Err(PaymentError::InvalidSignature);
        }

        debug!("Payment signature verified");
        Ok(amount)
    }
}

/// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"`.
///
/// # Errors
///
/// Returns `PaymentError::Parse` if the key is rejected by the MAC.
pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> Result<String, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Parse(e.to_string()))?;
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::RAZORPAY_API_BASE;

    const SECRET: &str = "Qw8rT2zL9pX4mN7vB1cK6jH3";

    fn client() -> RazorpayClient {
        RazorpayClient::new(&RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: SecretString::from(SECRET),
            api_base: Url::parse(RAZORPAY_API_BASE).unwrap(),
            timeout: Duration::from_secs(15),
        })
        .unwrap()
    }

    fn order(id: &str, amount: i64) -> GatewayOrder {
        GatewayOrder {
            id: id.to_string(),
            amount,
            currency: "INR".to_string(),
            receipt: None,
        }
    }

    #[test]
    fn test_orders_url() {
        assert_eq!(
            client().orders_url.as_str(),
            "https://api.razorpay.com/v1/orders"
        );
    }

    #[test]
    fn test_sign_is_hex_sha256() {
        let signature = sign(SECRET, "order_1", "pay_1").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(signature, sign(SECRET, "order_1", "pay_2").unwrap());
    }

    #[tokio::test]
    async fn test_verify_accepts_valid_signature() {
        let client = client();
        client.remember(&order("order_1", 10_000)).await;
        let signature = sign(SECRET, "order_1", "pay_1").unwrap();
        assert_eq!(client.verify("order_1", "pay_1", &signature).await.unwrap(), 10_000);
    }

    #[tokio::test]
    async fn test_verify_rejects_tampered_signature() {
        let client = client();
        client.remember(&order("order_1", 10_000)).await;
        let signature = sign(SECRET, "order_1", "pay_other").unwrap();
        assert!(matches!(
            client.verify("order_1", "pay_1", &signature).await,
            Err(PaymentError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_unknown_order() {
        let client = client();
        let signature = sign(SECRET, "order_x", "pay_1").unwrap();
        assert!(matches!(
            client.verify("order_x", "pay_1", &signature).await,
            Err(PaymentError::UnknownOrder(_))
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }
}
