//! Tiffin Storefront library.
//!
//! JSON API for the pre-order storefront: menu schedule, per-browser cart and
//! profile, and checkout. Exposed as a library so the router can be driven
//! in-process by tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    RateLimiterLayer, create_session_layer, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Build the application router.
///
/// Sentry layers are added by the binary on top of this.
pub fn app(state: AppState, checkout_limiter: Option<RateLimiterLayer>) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(checkout_limiter))
        .layer(session_layer)
        .with_state(state)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable until the menu feed has loaded once.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.catalog().snapshot().await.is_loaded() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;

    fn test_app() -> (Router, AppState) {
        let config = StorefrontConfig::new(
            url::Url::parse("http://127.0.0.1:9/menu.csv").unwrap(),
            "919840012345",
        );
        let state = AppState::new(config).unwrap();
        (app(state.clone(), None), state)
    }

    #[tokio::test]
    async fn test_health_sets_security_and_request_id_headers() {
        let (app, _) = test_app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_readiness_waits_for_menu() {
        let (app, state) = test_app();
        let response = app
            .clone()
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state
            .catalog()
            .replace(tiffin_core::menu::Menu::default(), chrono::Utc::now())
            .await;
        let response = app
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_meal_is_not_found() {
        let (app, _) = test_app();
        let response = app
            .oneshot(Request::get("/api/menu/brunch").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
