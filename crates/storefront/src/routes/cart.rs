//! Cart route handlers.
//!
//! The cart lives in the browser's session storage. Every edit drops any
//! payment attestation so the attested total always matches the cart.

use axum::{Json, extract::State};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tiffin_core::cart::{Cart, CartDay, CartLine, LineKey};
use tiffin_core::checkout::Checkout;
use tiffin_core::cutoff::ensure_addable;
use tiffin_core::types::{MenuItemId, Price};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::BrowserStorage;
use crate::state::AppState;

/// One delivery day in the cart.
#[derive(Debug, Serialize)]
pub struct CartDayView {
    pub delivery_date: NaiveDate,
    pub day_label: String,
    pub lines: Vec<CartLine>,
    pub subtotal: Price,
}

impl From<CartDay<'_>> for CartDayView {
    fn from(day: CartDay<'_>) -> Self {
        Self {
            delivery_date: day.delivery_date,
            day_label: day.day_label.to_string(),
            subtotal: day.lines.iter().map(|line| line.line_total()).sum(),
            lines: day.lines.into_iter().cloned().collect(),
        }
    }
}

/// Cart display data.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub days: Vec<CartDayView>,
    pub item_count: u32,
    pub total: Price,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            days: cart.by_day().into_iter().map(CartDayView::from).collect(),
            item_count: cart.item_count(),
            total: cart.total(),
        }
    }
}

/// Add to cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub item_id: MenuItemId,
    pub date: NaiveDate,
    pub quantity: Option<u32>,
}

/// Update quantity request.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    #[serde(flatten)]
    pub line: LineRequest,
    pub quantity: i64,
}

/// Line identity in a request body.
#[derive(Debug, Deserialize)]
pub struct LineRequest {
    pub item_id: MenuItemId,
    pub date: NaiveDate,
}

impl From<LineRequest> for LineKey {
    fn from(req: LineRequest) -> Self {
        Self {
            item_id: req.item_id,
            delivery_date: req.date,
        }
    }
}

/// Persist an edited cart and drop any attestation.
async fn store_cart(storage: &mut BrowserStorage, cart: &Cart) -> Result<()> {
    cart.persist(storage)
        .map_err(|e| AppError::Internal(format!("cart encode: {e}")))?;
    Checkout::invalidate(storage);
    storage.save().await
}

/// Display the cart.
#[instrument(skip(storage))]
pub async fn show(storage: BrowserStorage) -> Json<CartView> {
    let cart = Cart::load(&storage);
    Json(CartView::from(&cart))
}

/// Add an item for a delivery date.
///
/// Eligibility is re-checked against the live menu and clock.
#[instrument(skip(state, storage), fields(item_id = %req.item_id, date = %req.date))]
pub async fn add(
    State(state): State<AppState>,
    mut storage: BrowserStorage,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let snapshot = state.catalog().snapshot().await;
    let Some(item) = snapshot.menu.find(&req.item_id) else {
        if !snapshot.is_loaded() {
            return Err(AppError::MenuUnavailable);
        }
        return Err(AppError::NotFound(format!("menu item {}", req.item_id)));
    };

    let slot = ensure_addable(item, req.date, &state.config().cutoffs, state.now())?;
    let mut cart = Cart::load(&storage);
    cart.add(CartLine::from_slot(&slot, req.quantity.unwrap_or(1)));
    store_cart(&mut storage, &cart).await?;

    add_breadcrumb("cart", "Added to cart", Some(&[("item_id", req.item_id.as_str())]));
    Ok(Json(CartView::from(&cart)))
}

/// Set a line's quantity; zero or less removes it.
#[instrument(skip(storage))]
pub async fn update(
    mut storage: BrowserStorage,
    Json(req): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    let key = LineKey::from(req.line);
    let mut cart = Cart::load(&storage);
    if !cart.update_quantity(&key, req.quantity) {
        return Err(AppError::NotFound("cart line".to_string()));
    }
    store_cart(&mut storage, &cart).await?;

    Ok(Json(CartView::from(&cart)))
}

/// Remove a line.
#[instrument(skip(storage))]
pub async fn remove(
    mut storage: BrowserStorage,
    Json(req): Json<LineRequest>,
) -> Result<Json<CartView>> {
    let mut cart = Cart::load(&storage);
    let key = LineKey::from(req);
    if !cart.remove(&key) {
        return Err(AppError::NotFound("cart line".to_string()));
    }
    store_cart(&mut storage, &cart).await?;

    Ok(Json(CartView::from(&cart)))
}

/// Empty the cart.
#[instrument(skip(storage))]
pub async fn clear(mut storage: BrowserStorage) -> Result<Json<CartView>> {
    let mut cart = Cart::load(&storage);
    cart.clear();
    store_cart(&mut storage, &cart).await?;

    Ok(Json(CartView::from(&cart)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_update_and_remove_requests_share_line_identity() {
        let update: UpdateCartRequest = serde_json::from_value(json!({
            "item_id": "2",
            "date": "2026-10-20",
            "quantity": -1,
        }))
        .unwrap();
        let remove: LineRequest =
            serde_json::from_value(json!({ "item_id": "2", "date": "2026-10-20" })).unwrap();

        assert_eq!(update.quantity, -1);
        assert_eq!(LineKey::from(update.line), LineKey::from(remove));
    }
}
