//! Application state shared across handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::StorefrontConfig;
use crate::services::menu_feed::{FeedError, MenuCatalog, MenuPoller};
use crate::services::order_log::{OrderLogClient, OrderLogError};
use crate::services::payment::{PaymentError, RazorpayClient};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("menu feed client: {0}")]
    Feed(#[from] FeedError),
    #[error("order log client: {0}")]
    OrderLog(#[from] OrderLogError),
    #[error("payment client: {0}")]
    Payment(#[from] PaymentError),
}

/// Source of "now", replaceable in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: MenuCatalog,
    poller: MenuPoller,
    order_log: Option<OrderLogClient>,
    razorpay: Option<RazorpayClient>,
    clock: Clock,
}

impl AppState {
    /// Create a new application state using the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        Self::with_clock(config, Arc::new(Utc::now))
    }

    /// Create a new application state with a custom clock.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn with_clock(config: StorefrontConfig, clock: Clock) -> Result<Self, StateError> {
        let catalog = MenuCatalog::new();
        let poller = MenuPoller::new(&config.menu, catalog.clone())?;
        let order_log = config
            .order_log
            .as_ref()
            .map(OrderLogClient::new)
            .transpose()?;
        let razorpay = config
            .razorpay
            .as_ref()
            .map(RazorpayClient::new)
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                poller,
                order_log,
                razorpay,
                clock,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The shared menu snapshot.
    #[must_use]
    pub fn catalog(&self) -> &MenuCatalog {
        &self.inner.catalog
    }

    /// The background menu poller.
    #[must_use]
    pub fn poller(&self) -> &MenuPoller {
        &self.inner.poller
    }

    /// The order log client, if configured.
    #[must_use]
    pub fn order_log(&self) -> Option<&OrderLogClient> {
        self.inner.order_log.as_ref()
    }

    /// The Razorpay client, if configured.
    #[must_use]
    pub fn razorpay(&self) -> Option<&RazorpayClient> {
        self.inner.razorpay.as_ref()
    }

    /// Current instant.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.inner.clock)()
    }
}
