//! Menu endpoint tests, in-process and against a live storefront.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use reqwest::Client;

use tiffin_integration_tests::{TestBrowser, TestClock, ist, test_config, test_state};
use tiffin_storefront::state::AppState;

async fn browser_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> TestBrowser {
    let clock = TestClock::at(ist(y, m, d, h, min));
    TestBrowser::new(test_state(test_config(), &clock).await)
}

#[tokio::test]
async fn test_overview_marks_feed_active_meal() {
    let mut browser = browser_at(2026, 10, 19, 8, 0).await;
    let (status, overview) = browser.get("/api/menu").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["active_meal"], "lunch");
    assert_eq!(overview["loaded"], true);
    assert_eq!(overview["meals"].as_array().unwrap().len(), 4);
    assert_eq!(overview["meals"][1]["slot_label"], "11:00 AM - 01:00 PM");
}

#[tokio::test]
async fn test_lunch_schedule_shows_countdown_and_stock() {
    let mut browser = browser_at(2026, 10, 19, 20, 59).await;
    let (status, schedule) = browser.get("/api/menu/lunch").await;
    assert_eq!(status, StatusCode::OK);

    let tuesday = &schedule["days"][0];
    assert_eq!(tuesday["date"], "2026-10-20");
    assert_eq!(tuesday["label"], "Tuesday, Oct 20");

    let slots = tuesday["slots"].as_array().unwrap();
    let meals = slots.iter().find(|s| s["item"]["name"] == "Meals").unwrap();
    assert_eq!(meals["closed"], false);
    assert_eq!(meals["countdown"], "0h 1m");
    let curd = slots.iter().find(|s| s["item"]["name"] == "Curd Rice").unwrap();
    assert_eq!(curd["stock"], "out_of_stock");
}

#[tokio::test]
async fn test_lunch_closes_at_cutoff() {
    let mut browser = browser_at(2026, 10, 19, 21, 0).await;
    let (_, schedule) = browser.get("/api/menu/lunch").await;

    let slot = &schedule["days"][0]["slots"][0];
    assert_eq!(schedule["days"][0]["date"], "2026-10-20");
    assert_eq!(slot["closed"], true);
    assert_eq!(slot["banner"], "Delivery Closed");
}

#[tokio::test]
async fn test_schedule_skips_weekend_and_inactive() {
    // Friday: next deliverable Tuesday comes after the weekend and Monday
    let mut browser = browser_at(2026, 10, 23, 8, 0).await;
    let (_, schedule) = browser.get("/api/menu/breakfast").await;

    let days = schedule["days"].as_array().unwrap();
    let dates: Vec<_> = days.iter().map(|d| d["date"].as_str().unwrap()).collect();
    assert_eq!(dates, ["2026-10-26", "2026-10-27"]);
    assert!(
        days.iter()
            .flat_map(|d| d["slots"].as_array().unwrap())
            .all(|s| s["item"]["name"] != "Pongal")
    );
}

#[tokio::test]
async fn test_empty_menu_before_first_fetch() {
    let state = AppState::new(test_config()).unwrap();
    let mut browser = TestBrowser::new(state);

    let (status, schedule) = browser.get("/api/menu/lunch").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(schedule["loaded"], false);
    assert!(schedule["days"].as_array().unwrap().is_empty());

    let (status, _) = browser.add("2", "2026-10-20", 1).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_delivery_check_links_location_to_merchant() {
    let mut browser = browser_at(2026, 10, 19, 8, 0).await;

    let (status, check) = browser
        .get("/api/delivery-check?lat=13.0827&lng=80.2707")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        check["message"]
            .as_str()
            .unwrap()
            .contains("https://maps.google.com/?q=13.0827,80.2707")
    );
    assert!(
        check["whatsapp_url"]
            .as_str()
            .unwrap()
            .starts_with("https://wa.me/919840012345?text=This%20is%20my%20live%20location")
    );

    let (status, _) = browser.get("/api/delivery-check?lat=123&lng=80").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Live server tests
// ============================================================================

/// Base URL for the storefront (configurable via environment).
fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

fn live_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_live_health_and_readiness() {
    let client = live_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to reach storefront");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to reach storefront");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server with a reachable menu feed"]
async fn test_live_menu_and_cart_session() {
    let client = live_client();
    let base_url = storefront_base_url();

    let overview: serde_json::Value = client
        .get(format!("{base_url}/api/menu"))
        .send()
        .await
        .expect("Failed to get menu")
        .json()
        .await
        .expect("Menu is not JSON");
    assert_eq!(overview["loaded"], true);

    let cart: serde_json::Value = client
        .get(format!("{base_url}/api/cart"))
        .send()
        .await
        .expect("Failed to get cart")
        .json()
        .await
        .expect("Cart is not JSON");
    assert_eq!(cart["item_count"], 0);
}
