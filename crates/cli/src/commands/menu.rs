//! Menu feed commands.
//!
//! # Usage
//!
//! ```bash
//! tiffin-cli menu preview --source "$MENU_CSV_URL" --meal lunch
//! tiffin-cli menu check --source menu.csv
//! ```
//!
//! Cutoffs use the default rules (lunch 11:00 with 14 h lead, snacks 16:00
//! with 12 h lead) in the default store time zone.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use tiffin_core::csv::{CsvRecord, parse_records};
use tiffin_core::cutoff::{CutoffPolicy, ScheduleWindow, build_schedule};
use tiffin_core::menu::{Menu, MenuItem};
use tiffin_core::types::{MealCategory, Price};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur during menu commands.
#[derive(Debug, Error)]
pub enum MenuCommandError {
    /// Could not read the local file.
    #[error("Failed to read {0}: {1}")]
    Read(String, std::io::Error),

    /// Could not fetch the feed.
    #[error("Failed to fetch feed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Feed answered with a non-success status.
    #[error("Feed returned HTTP {0}")]
    Status(u16),

    /// `--at` was not an RFC 3339 instant.
    #[error("Invalid --at value {0:?}: {1}")]
    InvalidInstant(String, chrono::ParseError),

    /// The feed has no usable rows.
    #[error("Feed has no usable menu items")]
    Empty,
}

/// Print the schedule a customer would see for `meal`.
///
/// # Errors
///
/// Returns an error if the feed cannot be loaded or `at` is malformed.
pub async fn preview(source: &str, meal: MealCategory, at: Option<&str>) -> Result<(), MenuCommandError> {
    let now = match at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map_err(|e| MenuCommandError::InvalidInstant(raw.to_owned(), e))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let menu = Menu::from_csv(&load(source).await?);
    let policy = CutoffPolicy::default();
    let days = build_schedule(&menu, meal, &policy, ScheduleWindow::default(), now);

    tracing::info!(
        "{} schedule as of {} (feed marks {} as today's meal)",
        meal.label(),
        now.with_timezone(&policy.time_zone().offset()),
        menu.active_meal().label()
    );
    if days.is_empty() {
        tracing::info!("No delivery days with {} items", meal.label());
    }

    for day in &days {
        tracing::info!("{}", day.label);
        for slot in &day.slots {
            let state = match (&slot.banner, slot.stock.is_available()) {
                (_, false) => "Out of stock".to_string(),
                (Some(banner), true) => banner.clone(),
                (None, true) => "Open".to_string(),
            };
            tracing::info!("  {:<28} {:>8}  {}", slot.item.name, slot.item.price, state);
        }
    }
    Ok(())
}

/// Validate feed rows and log any problems found.
///
/// # Errors
///
/// Returns an error if the feed cannot be loaded or yields no items.
pub async fn check(source: &str) -> Result<(), MenuCommandError> {
    let records = parse_records(&load(source).await?);
    let report = FeedReport::from_records(&records);

    tracing::info!(
        rows = report.rows,
        items = report.items,
        active = report.active,
        "Feed parsed"
    );
    for problem in &report.problems {
        tracing::warn!("{problem}");
    }
    if report.items == 0 {
        return Err(MenuCommandError::Empty);
    }
    if report.problems.is_empty() {
        tracing::info!("No problems found");
    }
    Ok(())
}

/// Summary of a feed's rows.
#[derive(Debug, Default)]
pub struct FeedReport {
    pub rows: usize,
    pub items: usize,
    pub active: usize,
    pub problems: Vec<String>,
}

impl FeedReport {
    /// Inspect every row. Row numbers count the header as row 1.
    #[must_use]
    pub fn from_records(records: &[CsvRecord]) -> Self {
        let mut report = Self {
            rows: records.len(),
            ..Self::default()
        };
        let mut seen = HashSet::new();

        for (index, record) in records.iter().enumerate() {
            let row = index + 2;
            let category = record.get("category").map_or("", |value| value.trim());
            if category.is_empty() {
                continue;
            }
            let Some(item) = MenuItem::from_record(record) else {
                report
                    .problems
                    .push(format!("row {row}: unknown category {category:?}"));
                continue;
            };

            report.items += 1;
            if item.active {
                report.active += 1;
            }
            report.problems.extend(item_problems(row, record, &item));
            if !seen.insert(item.id.clone()) {
                report
                    .problems
                    .push(format!("row {row}: duplicate id {}", item.id));
            }
        }
        report
    }
}

fn item_problems(row: usize, record: &CsvRecord, item: &MenuItem) -> Vec<String> {
    let mut problems = Vec::new();
    let name = if item.name.is_empty() { "(unnamed)" } else { &item.name };

    if item.name.is_empty() {
        problems.push(format!("row {row}: missing name"));
    }
    if item.active && item.available_days.is_empty() {
        problems.push(format!("row {row}: {name} has no available days and is never shown"));
    }
    if item.price == Price::ZERO {
        let raw = record.get("price").map_or("", |value| value.trim());
        problems.push(format!("row {row}: {name} has price {raw:?}, read as 0"));
    }
    if record.get("id").is_none_or(|value| value.trim().is_empty()) {
        problems.push(format!("row {row}: {name} has no id; one is generated on every fetch"));
    }
    problems
}

async fn load(source: &str) -> Result<String, MenuCommandError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        let response = client.get(source).send().await?;
        if !response.status().is_success() {
            return Err(MenuCommandError::Status(response.status().as_u16()));
        }
        return Ok(response.text().await?);
    }

    tokio::fs::read_to_string(source)
        .await
        .map_err(|e| MenuCommandError::Read(source.to_owned(), e))
}
