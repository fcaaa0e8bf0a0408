//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                       - Liveness
//! GET    /health/ready                 - Readiness (menu loaded)
//!
//! # Menu
//! GET    /api/menu                     - Meal list and active meal
//! GET    /api/menu/{meal}              - Delivery days and candidate slots
//!
//! # Cart
//! GET    /api/cart                     - Cart grouped by day
//! POST   /api/cart/add                 - Add (eligibility re-checked)
//! POST   /api/cart/update              - Set quantity (<= 0 removes)
//! POST   /api/cart/remove              - Remove line
//! POST   /api/cart/clear               - Clear
//!
//! # Profile
//! GET    /api/profile                  - Saved profile
//! PUT    /api/profile                  - Save profile
//! DELETE /api/profile                  - Clear profile
//!
//! # Delivery
//! GET    /api/delivery-check?lat=&lng= - WhatsApp link with a map location
//!
//! # Checkout (rate limited in production)
//! GET    /api/checkout                 - Current stage
//! POST   /api/checkout/confirm         - "I have paid"
//! POST   /api/checkout/gateway/order   - Create gateway order
//! POST   /api/checkout/gateway/verify  - Verify gateway payment
//! POST   /api/checkout/submit          - Submit order
//! ```

pub mod cart;
pub mod checkout;
pub mod delivery;
pub mod menu;
pub mod profile;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Create the menu routes router.
pub fn menu_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(menu::overview))
        .route("/{meal}", get(menu::schedule))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(profile::show).put(profile::save).delete(profile::clear),
    )
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/confirm", post(checkout::confirm))
        .route("/gateway/order", post(checkout::gateway_order))
        .route("/gateway/verify", post(checkout::gateway_verify))
        .route("/submit", post(checkout::submit))
}

/// Create all API routes.
///
/// `checkout_limiter` is applied to the checkout routes only.
pub fn routes(checkout_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let checkout = match checkout_limiter {
        Some(limiter) => checkout_routes().layer(limiter),
        None => checkout_routes(),
    };

    Router::new()
        .nest("/api/menu", menu_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/profile", profile_routes())
        .route("/api/delivery-check", get(delivery::check))
        .nest("/api/checkout", checkout)
}
