//! Delivery area check.
//!
//! Builds a WhatsApp link that sends the customer's map location to the
//! merchant, who answers whether they deliver there.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::notify::{delivery_check_message, whatsapp_link};
use crate::state::AppState;

/// Customer location query.
#[derive(Debug, Deserialize)]
pub struct DeliveryCheckQuery {
    pub lat: f64,
    pub lng: f64,
}

/// Pre-filled message for the merchant.
#[derive(Debug, Serialize)]
pub struct DeliveryCheck {
    pub message: String,
    pub whatsapp_url: String,
}

/// Link asking the merchant whether delivery reaches a location.
#[instrument(skip(state))]
pub async fn check(
    State(state): State<AppState>,
    Query(query): Query<DeliveryCheckQuery>,
) -> Result<Json<DeliveryCheck>> {
    let message = delivery_check_message(query.lat, query.lng)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let whatsapp_url = whatsapp_link(&state.config().store.whatsapp_number, &message);
    Ok(Json(DeliveryCheck {
        message,
        whatsapp_url,
    }))
}
