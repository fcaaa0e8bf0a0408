//! Checkout route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use tiffin_core::checkout::CheckoutStage;

use crate::error::Result;
use crate::models::BrowserStorage;
use crate::services::checkout::{self, GatewayCheckout, SubmittedOrder};
use crate::state::AppState;

/// Values returned by the gateway's checkout widget.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// Display the current stage.
#[instrument(skip(state, storage))]
pub async fn show(State(state): State<AppState>, storage: BrowserStorage) -> Json<CheckoutStage> {
    Json(checkout::stage(&state, &storage).await)
}

/// "I have paid" confirmation.
#[instrument(skip(state, storage))]
pub async fn confirm(
    State(state): State<AppState>,
    mut storage: BrowserStorage,
) -> Result<Json<CheckoutStage>> {
    checkout::confirm_self_attested(&state, &mut storage)
        .await
        .map(Json)
}

/// Create a gateway order for the cart.
#[instrument(skip(state, storage))]
pub async fn gateway_order(
    State(state): State<AppState>,
    storage: BrowserStorage,
) -> Result<Json<GatewayCheckout>> {
    checkout::create_gateway_order(&state, &storage)
        .await
        .map(Json)
}

/// Verify a completed gateway payment.
#[instrument(skip(state, storage, req), fields(order_id = %req.razorpay_order_id))]
pub async fn gateway_verify(
    State(state): State<AppState>,
    mut storage: BrowserStorage,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<CheckoutStage>> {
    checkout::verify_gateway_payment(
        &state,
        &mut storage,
        &req.razorpay_order_id,
        &req.razorpay_payment_id,
        &req.razorpay_signature,
    )
    .await
    .map(Json)
}

/// Submit the attested order.
#[instrument(skip(state, storage))]
pub async fn submit(
    State(state): State<AppState>,
    mut storage: BrowserStorage,
) -> Result<Json<SubmittedOrder>> {
    checkout::submit(&state, &mut storage).await.map(Json)
}
