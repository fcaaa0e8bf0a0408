//! Menu feed polling.
//!
//! A [`MenuCatalog`] holds the latest parsed menu. A [`MenuPoller`] refreshes
//! it from the published CSV on a fixed interval in a background task. At most
//! one fetch is in flight; a failed fetch keeps the previous snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};
use url::Url;

use tiffin_core::menu::Menu;

use crate::config::MenuConfig;

/// Errors that can occur when fetching the feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// A parsed menu and when it was fetched.
#[derive(Debug, Clone, Default)]
pub struct MenuSnapshot {
    pub menu: Arc<Menu>,
    /// `None` until the first successful fetch.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Increments on every successful refresh.
    pub generation: u64,
}

impl MenuSnapshot {
    /// Whether a feed has ever been loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.fetched_at.is_some()
    }
}

/// Shared, swappable menu snapshot.
#[derive(Clone, Default)]
pub struct MenuCatalog {
    snapshot: Arc<RwLock<MenuSnapshot>>,
    generation: Arc<AtomicU64>,
}

impl MenuCatalog {
    /// An empty, never-loaded catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub async fn snapshot(&self) -> MenuSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Current menu.
    pub async fn menu(&self) -> Arc<Menu> {
        Arc::clone(&self.snapshot.read().await.menu)
    }

    /// Install a new menu.
    pub async fn replace(&self, menu: Menu, fetched_at: DateTime<Utc>) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.snapshot.write().await = MenuSnapshot {
            menu: Arc::new(menu),
            fetched_at: Some(fetched_at),
            generation,
        };
        generation
    }
}

/// HTTP client for the published CSV.
#[derive(Clone)]
pub struct MenuFeedClient {
    client: reqwest::Client,
    url: Url,
}

impl MenuFeedClient {
    /// Create a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    /// Fetch and parse the feed.
    ///
    /// Appends a `t=<millis>` query parameter to bypass caches.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx status.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch(&self) -> Result<Menu, FeedError> {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("t", &Utc::now().timestamp_millis().to_string());

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        let menu = Menu::from_csv(&text);
        debug!(items = menu.items().len(), "Menu feed parsed");
        Ok(menu)
    }
}

/// Outcome of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new snapshot was installed.
    Refreshed { generation: u64 },
    /// Another fetch was still running.
    Skipped,
}

/// Clears the in-flight flag when a fetch ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Periodically refreshes a [`MenuCatalog`].
#[derive(Clone)]
pub struct MenuPoller {
    feed: MenuFeedClient,
    catalog: MenuCatalog,
    interval: Duration,
    in_flight: Arc<AtomicBool>,
    is_running: Arc<AtomicBool>,
}

impl MenuPoller {
    /// Create a poller for `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &MenuConfig, catalog: MenuCatalog) -> Result<Self, FeedError> {
        Ok(Self {
            feed: MenuFeedClient::new(config.csv_url.clone(), config.fetch_timeout)?,
            catalog,
            interval: config.poll_interval,
            in_flight: Arc::new(AtomicBool::new(false)),
            is_running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Fetch once, unless a fetch is already running.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the catalog keeps its previous snapshot.
    pub async fn poll_once(&self) -> Result<PollOutcome, FeedError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("Menu fetch already in flight, skipping");
            return Ok(PollOutcome::Skipped);
        }
        let _guard = InFlight(&self.in_flight);

        let menu = self.feed.fetch().await?;
        let generation = self.catalog.replace(menu, Utc::now()).await;
        Ok(PollOutcome::Refreshed { generation })
    }

    /// Whether the background loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Start the background loop. The first poll happens immediately.
    pub fn start(&self) -> JoinHandle<()> {
        let poller = self.clone();
        poller.is_running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            info!(interval_secs = poller.interval.as_secs(), "Menu poller started");
            let mut ticker = tokio::time::interval(poller.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if !poller.is_running() {
                    break;
                }

                // Overlapping polls are dropped by the in-flight flag
                let this = poller.clone();
                tokio::spawn(async move {
                    if let Err(e) = this.poll_once().await {
                        warn!(error = %e, "Menu refresh failed, keeping previous menu");
                    }
                });
            }

            info!("Menu poller stopped");
        })
    }

    /// Ask the background loop to stop after its current tick.
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catalog_starts_empty_and_replaces() {
        let catalog = MenuCatalog::new();
        let snapshot = catalog.snapshot().await;
        assert!(!snapshot.is_loaded());
        assert!(snapshot.menu.is_empty());

        let first = catalog
            .replace(Menu::from_csv("id,name,category,day\n1,Idli,breakfast,mon\n"), Utc::now())
            .await;
        let second = catalog.replace(Menu::default(), Utc::now()).await;
        assert_eq!((first, second), (1, 2));
        assert!(catalog.snapshot().await.is_loaded());
        assert!(catalog.menu().await.is_empty());
    }

    #[tokio::test]
    async fn test_poll_skips_while_in_flight() {
        let config = MenuConfig {
            csv_url: Url::parse("http://127.0.0.1:9/menu.csv").unwrap(),
            poll_interval: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(1),
            window: tiffin_core::cutoff::ScheduleWindow::default(),
        };
        let poller = MenuPoller::new(&config, MenuCatalog::new()).unwrap();
        poller.in_flight.store(true, Ordering::SeqCst);
        assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_previous_menu() {
        let config = MenuConfig {
            csv_url: Url::parse("http://127.0.0.1:9/menu.csv").unwrap(),
            poll_interval: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(1),
            window: tiffin_core::cutoff::ScheduleWindow::default(),
        };
        let catalog = MenuCatalog::new();
        catalog
            .replace(Menu::from_csv("id,name,category,day\n1,Idli,breakfast,mon\n"), Utc::now())
            .await;
        let poller = MenuPoller::new(&config, catalog.clone()).unwrap();

        assert!(poller.poll_once().await.is_err());
        assert!(!poller.in_flight.load(Ordering::SeqCst));
        let snapshot = catalog.snapshot().await;
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.menu.items().len(), 1);
    }
}
