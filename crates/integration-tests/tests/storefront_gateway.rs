//! In-process tests for gateway payment verification.
//!
//! No gateway calls are made: orders are seeded into the client's cache as
//! if this storefront had created them.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::StatusCode;
use secrecy::SecretString;
use serde_json::json;

use tiffin_core::order::OrderIdMode;
use tiffin_integration_tests::{TestBrowser, TestClock, ist, test_config, test_state};
use tiffin_storefront::config::{RAZORPAY_API_BASE, RazorpayConfig};
use tiffin_storefront::services::payment::{GatewayOrder, sign};
use tiffin_storefront::state::AppState;

const SECRET: &str = "Qw8rT2zL9pX4mN7vB1cK6jH3";
const TUESDAY: &str = "2026-10-20";

async fn gateway_state(mode: OrderIdMode) -> AppState {
    let clock = TestClock::at(ist(2026, 10, 19, 8, 0));
    let mut config = test_config();
    config.store.order_id_mode = mode;
    config.razorpay = Some(RazorpayConfig {
        key_id: "rzp_test_key".to_string(),
        key_secret: SecretString::from(SECRET),
        api_base: url::Url::parse(RAZORPAY_API_BASE).unwrap(),
        timeout: Duration::from_secs(1),
    });
    test_state(config, &clock).await
}

async fn seed_order(state: &AppState, id: &str, amount: i64) {
    state
        .razorpay()
        .unwrap()
        .remember(&GatewayOrder {
            id: id.to_string(),
            amount,
            currency: "INR".to_string(),
            receipt: None,
        })
        .await;
}

/// Browser with a profile and Idli x2 (100.00, i.e. 10000 paise) for Tuesday.
async fn ready_browser(state: AppState) -> TestBrowser {
    let mut browser = TestBrowser::new(state);
    browser.save_profile().await;
    browser.add("1", TUESDAY, 2).await;
    browser
}

fn verify_body(order_id: &str, payment_id: &str, signature: &str) -> serde_json::Value {
    json!({
        "razorpay_order_id": order_id,
        "razorpay_payment_id": payment_id,
        "razorpay_signature": signature,
    })
}

#[tokio::test]
async fn test_verified_payment_uses_gateway_order_id() {
    let state = gateway_state(OrderIdMode::Gateway).await;
    seed_order(&state, "order_T1", 10_000).await;
    let mut browser = ready_browser(state).await;

    let signature = sign(SECRET, "order_T1", "pay_T1").unwrap();
    let (status, stage) = browser
        .post(
            "/api/checkout/gateway/verify",
            verify_body("order_T1", "pay_T1", &signature),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stage["stage"], "payment_attested");
    assert_eq!(stage["method"]["kind"], "gateway");
    assert_eq!(stage["method"]["payment_id"], "pay_T1");

    let (status, order) = browser.post("/api/checkout/submit", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["order_id"], "order_T1");
    assert!(order["message"].as_str().unwrap().contains("Razorpay"));
}

#[tokio::test]
async fn test_local_mode_ignores_gateway_order_id() {
    let state = gateway_state(OrderIdMode::Local).await;
    seed_order(&state, "order_T2", 10_000).await;
    let mut browser = ready_browser(state).await;

    let signature = sign(SECRET, "order_T2", "pay_T2").unwrap();
    browser
        .post(
            "/api/checkout/gateway/verify",
            verify_body("order_T2", "pay_T2", &signature),
        )
        .await;
    let (_, order) = browser.post("/api/checkout/submit", json!({})).await;
    assert_eq!(order["order_id"], "ORD-00001");
}

#[tokio::test]
async fn test_bad_signature_is_rejected() {
    let state = gateway_state(OrderIdMode::Gateway).await;
    seed_order(&state, "order_T3", 10_000).await;
    let mut browser = ready_browser(state).await;

    let signature = sign("some-other-secret", "order_T3", "pay_T3").unwrap();
    let (status, body) = browser
        .post(
            "/api/checkout/gateway/verify",
            verify_body("order_T3", "pay_T3", &signature),
        )
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "Payment verification failed");

    let (_, stage) = browser.get("/api/checkout").await;
    assert_eq!(stage["stage"], "ready_to_confirm");
}

#[tokio::test]
async fn test_unknown_order_is_rejected() {
    let state = gateway_state(OrderIdMode::Gateway).await;
    let mut browser = ready_browser(state).await;

    let signature = sign(SECRET, "order_forged", "pay_T4").unwrap();
    let (status, _) = browser
        .post(
            "/api/checkout/gateway/verify",
            verify_body("order_forged", "pay_T4", &signature),
        )
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn test_amount_mismatch_is_rejected() {
    let state = gateway_state(OrderIdMode::Gateway).await;
    seed_order(&state, "order_T5", 5_000).await;
    let mut browser = ready_browser(state).await;

    let signature = sign(SECRET, "order_T5", "pay_T5").unwrap();
    let (status, _) = browser
        .post(
            "/api/checkout/gateway/verify",
            verify_body("order_T5", "pay_T5", &signature),
        )
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn test_gateway_routes_without_credentials() {
    let clock = TestClock::at(ist(2026, 10, 19, 8, 0));
    let mut browser = ready_browser(test_state(test_config(), &clock).await).await;

    let (status, body) = browser.post("/api/checkout/gateway/order", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Gateway payments are not enabled");
}
