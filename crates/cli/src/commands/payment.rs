//! Gateway payment helpers.
//!
//! # Usage
//!
//! ```bash
//! tiffin-cli payment sign --order-id order_abc --payment-id pay_xyz
//! ```
//!
//! # Environment Variables
//!
//! - `RAZORPAY_KEY_SECRET` - Gateway key secret

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use tiffin_storefront::services::payment::{self, PaymentError};

/// Errors that can occur during payment commands.
#[derive(Debug, Error)]
pub enum PaymentCommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Signing failed.
    #[error("Signing failed: {0}")]
    Sign(#[from] PaymentError),
}

/// Log the signature the gateway would return for this payment, for
/// exercising `/api/checkout/gateway/verify` against a test order.
///
/// # Errors
///
/// Returns an error if `RAZORPAY_KEY_SECRET` is unset.
pub fn sign(order_id: &str, payment_id: &str) -> Result<(), PaymentCommandError> {
    let secret: SecretString = std::env::var("RAZORPAY_KEY_SECRET")
        .map_err(|_| PaymentCommandError::MissingEnvVar("RAZORPAY_KEY_SECRET"))?
        .into();

    let signature = payment::sign(secret.expose_secret(), order_id, payment_id)?;
    tracing::info!(order_id, payment_id, "razorpay_signature = {signature}");
    Ok(())
}
