//! Integration tests for the Tiffin storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process router tests
//! cargo test -p tiffin-integration-tests
//!
//! # Live tests against a running storefront
//! STOREFRONT_BASE_URL=http://localhost:3000 cargo test -p tiffin-integration-tests -- --ignored
//! ```
//!
//! In-process tests drive the router with `tower::ServiceExt::oneshot`, a
//! fixed menu and a controllable clock. [`TestBrowser`] carries the session
//! cookie between requests the way a browser would.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use tiffin_core::calendar::StoreTimeZone;
use tiffin_core::menu::Menu;
use tiffin_storefront::config::StorefrontConfig;
use tiffin_storefront::middleware::checkout_rate_limiter;
use tiffin_storefront::state::AppState;

/// Merchant number used by test configs.
pub const WHATSAPP_NUMBER: &str = "919840012345";

/// A small menu for Tuesday 2026-10-20 onwards.
pub const MENU_CSV: &str = "\
id,name,description,price,category,isActive,day,imageUrl,stockAvailability,activeMeal
1,Idli,Soft idlis with chutney,50,breakfast,true,mon tue,,in,lunch
2,Meals,South Indian meals,120,lunch,true,tue wed,,in,
3,Curd Rice,,60,lunch,true,tue,,out,
4,Sundal,Chickpea sundal,30,snacks,true,tue,,in,
5,Pongal,,70,breakfast,false,tue,,in,
";

/// Wall-clock time in the store's zone (IST) as a UTC instant.
#[must_use]
pub fn ist(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    StoreTimeZone::default()
        .offset()
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

/// A clock tests can move.
#[derive(Clone)]
pub struct TestClock(Arc<AtomicI64>);

impl TestClock {
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Arc::new(AtomicI64::new(now.timestamp())))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.0.store(now.timestamp(), Ordering::SeqCst);
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0.load(Ordering::SeqCst), 0).unwrap()
    }
}

/// Default test configuration. The feed URL is never fetched.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig::new(
        url::Url::parse("http://127.0.0.1:9/menu.csv").unwrap(),
        WHATSAPP_NUMBER,
    )
}

/// Build state for `config` with [`MENU_CSV`] loaded and the clock at `clock`.
pub async fn test_state(config: StorefrontConfig, clock: &TestClock) -> AppState {
    let ticking = clock.clone();
    let state = AppState::with_clock(config, Arc::new(move || ticking.now())).unwrap();
    state
        .catalog()
        .replace(Menu::from_csv(MENU_CSV), clock.now())
        .await;
    state
}

/// A browser: the router plus its session cookie.
pub struct TestBrowser {
    router: Router,
    cookie: Option<String>,
}

impl TestBrowser {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            router: tiffin_storefront::app(state, None),
            cookie: None,
        }
    }

    /// A browser against the production router: checkout rate limiting on,
    /// requests arriving from `peer` with no proxy headers.
    #[must_use]
    pub fn rate_limited(state: AppState, peer: SocketAddr) -> Self {
        Self {
            router: tiffin_storefront::app(state, Some(checkout_rate_limiter()))
                .layer(axum::Extension(ConnectInfo(peer))),
            cookie: None,
        }
    }

    /// Another browser against the same app, with no cookie.
    #[must_use]
    pub fn fresh(&self) -> Self {
        Self {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// Send a request and decode the JSON body (`Value::Null` if empty, a
    /// string if not JSON).
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    pub async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    /// Save a complete profile.
    pub async fn save_profile(&mut self) {
        let (status, _) = self
            .put(
                "/api/profile",
                serde_json::json!({
                    "name": "Priya",
                    "phone": "9840098400",
                    "address": "12 Lake View Road, Chennai",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    /// Add `quantity` of `item_id` for `date`.
    pub async fn add(&mut self, item_id: &str, date: &str, quantity: u32) -> (StatusCode, Value) {
        self.post(
            "/api/cart/add",
            serde_json::json!({ "item_id": item_id, "date": date, "quantity": quantity }),
        )
        .await
    }
}
