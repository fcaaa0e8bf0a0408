//! Checkout orchestration across the browser's storage and external services.
//!
//! The state machine itself lives in `tiffin_core::checkout`; this module
//! loads the browser's cart, profile and checkout state, calls out to the
//! payment gateway and order log, and writes everything back.

use serde::Serialize;
use tracing::{info, instrument, warn};

use tiffin_core::cart::Cart;
use tiffin_core::checkout::{Checkout, CheckoutStage};
use tiffin_core::order::{OrderIdMode, PaymentMethod};
use tiffin_core::profile::UserProfile;
use tiffin_core::types::{OrderId, Price};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::BrowserStorage;
use crate::services::notify::whatsapp_link;
use crate::services::payment::PaymentError;
use crate::state::AppState;

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedOrder {
    pub order_id: OrderId,
    pub total: Price,
    /// Deep link that opens WhatsApp with the merchant message filled in.
    pub whatsapp_url: String,
    pub message: String,
    /// Whether the order log accepted the order.
    pub logged: bool,
}

/// What the browser needs to open the gateway's checkout widget.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayCheckout {
    pub key_id: String,
    pub order_id: String,
    /// Minor units (paise).
    pub amount: i64,
    pub currency: String,
}

/// Current stage for this browser.
pub async fn stage(state: &AppState, storage: &BrowserStorage) -> CheckoutStage {
    let menu = state.catalog().menu().await;
    let cart = Cart::load(storage);
    let profile = UserProfile::load(storage);
    Checkout::load(storage).stage(
        &cart,
        profile.as_ref(),
        &menu,
        &state.config().cutoffs,
        state.now(),
    )
}

/// Self-attested payment: the customer says they have paid.
///
/// # Errors
///
/// Returns a checkout error if the cart is empty, no profile is saved, or a
/// line fails re-validation.
#[instrument(skip(state, storage))]
pub async fn confirm_self_attested(
    state: &AppState,
    storage: &mut BrowserStorage,
) -> Result<CheckoutStage> {
    attest(state, storage, PaymentMethod::SelfAttested).await
}

/// Create a gateway order for the current cart total.
///
/// # Errors
///
/// Returns `PaymentError::NotConfigured` without gateway credentials, a
/// checkout error if the cart is not ready, or an upstream payment error.
#[instrument(skip(state, storage))]
pub async fn create_gateway_order(
    state: &AppState,
    storage: &BrowserStorage,
) -> Result<GatewayCheckout> {
    let client = state.razorpay().ok_or(PaymentError::NotConfigured)?;
    let menu = state.catalog().menu().await;
    let cart = Cart::load(storage);
    let profile = UserProfile::load(storage);
    Checkout::check_ready(
        &cart,
        profile.as_ref(),
        &menu,
        &state.config().cutoffs,
        state.now(),
    )?;

    let amount = cart
        .total()
        .to_minor_units()
        .filter(|amount| *amount > 0)
        .ok_or_else(|| AppError::BadRequest("cart total cannot be charged".to_string()))?;
    let receipt = format!("rcpt_{}", uuid::Uuid::new_v4().simple());

    let order = client.create_order(amount, &receipt).await?;
    add_breadcrumb("checkout", "Gateway order created", Some(&[("order_id", order.id.as_str())]));

    Ok(GatewayCheckout {
        key_id: client.key_id().to_string(),
        order_id: order.id,
        amount: order.amount,
        currency: order.currency,
    })
}

/// Verify a completed gateway payment and attest it.
///
/// # Errors
///
/// Returns a payment error if the signature is invalid, the order is unknown
/// or its amount differs from the cart, and a checkout error if the cart is
/// no longer ready.
#[instrument(skip(state, storage, signature))]
pub async fn verify_gateway_payment(
    state: &AppState,
    storage: &mut BrowserStorage,
    gateway_order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<CheckoutStage> {
    let client = state.razorpay().ok_or(PaymentError::NotConfigured)?;
    let paid = client.verify(gateway_order_id, payment_id, signature).await?;

    let cart_amount = Cart::load(storage).total().to_minor_units().unwrap_or(0);
    if paid != cart_amount {
        warn!(paid, cart_amount, "Gateway amount differs from cart");
        return Err(PaymentError::AmountMismatch {
            order: paid,
            cart: cart_amount,
        }
        .into());
    }

    attest(
        state,
        storage,
        PaymentMethod::Gateway {
            payment_id: payment_id.to_string(),
            gateway_order_id: gateway_order_id.to_string(),
        },
    )
    .await
}

async fn attest(
    state: &AppState,
    storage: &mut BrowserStorage,
    method: PaymentMethod,
) -> Result<CheckoutStage> {
    let menu = state.catalog().menu().await;
    let policy = &state.config().cutoffs;
    let now = state.now();
    let cart = Cart::load(storage);
    let profile = UserProfile::load(storage);

    let mut checkout = Checkout::load(storage);
    let method_name = method.name();
    checkout.attest(&cart, profile.as_ref(), &menu, policy, method, now)?;
    checkout.persist(storage)?;
    storage.save().await?;

    add_breadcrumb("checkout", "Payment attested", Some(&[("method", method_name)]));
    Ok(checkout.stage(&cart, profile.as_ref(), &menu, policy, now))
}

/// Submit an attested order.
///
/// Issues (or reuses) the order ID, posts the order to the log if one is
/// configured, builds the merchant message and clears the cart. A failed log
/// post is recorded and otherwise ignored.
///
/// # Errors
///
/// Returns `NotAttested` before payment, `AttestationStale` if the cart
/// changed since payment, or a storage error.
#[instrument(skip(state, storage))]
pub async fn submit(state: &AppState, storage: &mut BrowserStorage) -> Result<SubmittedOrder> {
    let config = state.config();
    let mode = config.store.order_id_mode;
    let mut cart = Cart::load(storage);
    let profile = UserProfile::load(storage);
    let mut checkout = Checkout::load(storage);

    let prepared = checkout.prepare_order(
        storage,
        &cart,
        profile.as_ref(),
        &config.cutoffs,
        mode,
        state.now(),
    );
    // Keep the issued ID (or the dropped stale attestation) even on error
    checkout.persist(storage)?;
    storage.save().await?;
    let mut order = prepared?;

    let mut logged = false;
    if let Some(log) = state.order_log() {
        match log.record(&order.log_entry(config.store.time_zone)).await {
            Ok(assigned) => {
                logged = true;
                if let (OrderIdMode::Server, Some(id)) = (mode, assigned) {
                    checkout.assign_order_id(id.clone());
                    checkout.persist(storage)?;
                    order.id = id;
                }
            }
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "Order log failed, continuing");
            }
        }
    }

    let message = order.merchant_message(&config.store.name);
    let whatsapp_url = whatsapp_link(&config.store.whatsapp_number, &message);

    Checkout::complete(storage, &mut cart)?;
    storage.save().await?;

    info!(order_id = %order.id, total = %order.total, logged, "Order submitted");
    add_breadcrumb("checkout", "Order submitted", Some(&[("order_id", order.id.as_str())]));

    Ok(SubmittedOrder {
        order_id: order.id,
        total: order.total,
        whatsapp_url,
        message,
        logged,
    })
}
