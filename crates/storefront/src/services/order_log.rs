//! Order log webhook client.
//!
//! Posts each submitted order as JSON to a spreadsheet-backed endpoint. The
//! endpoint may answer with `{"success": true, "orderId": "..."}` or with a
//! plain-text order ID; any other body counts as a failed write.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use tiffin_core::order::OrderLogEntry;
use tiffin_core::types::OrderId;

use crate::config::OrderLogConfig;

/// Longest plain-text body accepted as an order ID.
const MAX_PLAIN_ID_LEN: usize = 64;

/// Errors that can occur when posting to the order log.
#[derive(Debug, Error)]
pub enum OrderLogError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Endpoint reported failure in its JSON body.
    #[error("order log rejected the entry")]
    Rejected,

    /// Endpoint answered 2xx with a body that is neither a log response nor
    /// an order ID.
    #[error("unrecognised order log response: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    order_id: Option<String>,
}

/// Order log webhook client.
#[derive(Clone)]
pub struct OrderLogClient {
    client: reqwest::Client,
    url: Url,
}

impl OrderLogClient {
    /// Create a new client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &OrderLogConfig) -> Result<Self, OrderLogError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.webhook_url.clone(),
        })
    }

    /// Post an entry, returning the endpoint-assigned order ID if any.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-2xx status, an explicit
    /// `success: false` or an unrecognised body.
    #[instrument(skip(self, entry), fields(order_id = %entry.order_id))]
    pub async fn record(&self, entry: &OrderLogEntry) -> Result<Option<OrderId>, OrderLogError> {
        let response = self.client.post(self.url.clone()).json(entry).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(OrderLogError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let assigned = parse_response(&body)?;
        debug!(assigned = ?assigned, "Order logged");
        Ok(assigned)
    }
}

/// Extract an order ID from a log response body.
///
/// JSON must carry `success` or `orderId`; a JSON `success: true` without an
/// ID is a write with no assigned ID.
fn parse_response(body: &str) -> Result<Option<OrderId>, OrderLogError> {
    let body = body.trim();
    if let Ok(parsed) = serde_json::from_str::<LogResponse>(body) {
        if parsed.success == Some(false) {
            return Err(OrderLogError::Rejected);
        }
        if parsed.success.is_none() && parsed.order_id.is_none() {
            return Err(malformed(body));
        }
        return Ok(parsed
            .order_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .map(OrderId::new));
    }

    let plain = body.trim_matches('"');
    let looks_like_id = !plain.is_empty()
        && plain.len() <= MAX_PLAIN_ID_LEN
        && plain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '#'));
    if looks_like_id {
        Ok(Some(OrderId::new(plain)))
    } else {
        Err(malformed(body))
    }
}

fn malformed(body: &str) -> OrderLogError {
    OrderLogError::Malformed(body.chars().take(MAX_PLAIN_ID_LEN).collect())
}
