//! Ordering cutoffs and delivery-date eligibility.
//!
//! A category with a [`SlotRule`] stops taking orders for a date `lead_hours`
//! before its delivery slot starts on that date. Categories without a rule
//! never close. Whether an item is shown on a date depends only on its
//! weekday pattern, its category and its active flag; weekends are never
//! offered.
//!
//! Every function here is pure in `now`, so "closed" can only flip from
//! `false` to `true` as time moves forward for a fixed category and date.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::calendar::{StoreTimeZone, Weekday, upcoming_dates};
use crate::menu::{Menu, MenuItem};
use crate::types::{MealCategory, StockState};

/// Delivery slot and ordering lead time for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRule {
    /// Wall-clock start of the delivery slot in the store's zone.
    pub start: NaiveTime,
    /// Hours before `start` at which ordering closes.
    pub lead_hours: u32,
    /// Human label, e.g. `11:00 AM - 01:00 PM`.
    pub label: String,
}

impl SlotRule {
    /// Create a rule.
    #[must_use]
    pub fn new(start: NaiveTime, lead_hours: u32, label: impl Into<String>) -> Self {
        Self {
            start,
            lead_hours,
            label: label.into(),
        }
    }

    /// Default lunch rule: slot at 11:00, closes 14 hours earlier.
    #[must_use]
    pub fn lunch() -> Self {
        Self::new(
            NaiveTime::from_hms_opt(11, 0, 0).unwrap_or(NaiveTime::MIN),
            14,
            "11:00 AM - 01:00 PM",
        )
    }

    /// Default snacks rule: slot at 16:00, closes 12 hours earlier.
    #[must_use]
    pub fn snacks() -> Self {
        Self::new(
            NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
            12,
            "04:00 PM - 05:00 PM",
        )
    }
}

/// Ordering state of a category on a date at some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffStatus {
    /// The category has no cutoff rule.
    NoCutoff,
    /// Ordering is open for `remaining` more time.
    Open { remaining: TimeDelta },
    /// The cutoff instant has been reached.
    Closed,
}

impl CutoffStatus {
    /// Whether ordering has closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// `"{h}h {m}m"` until close, when a cutoff applies and is still open.
    #[must_use]
    pub fn countdown(&self) -> Option<String> {
        match self {
            Self::Open { remaining } => Some(format_countdown(*remaining)),
            Self::NoCutoff | Self::Closed => None,
        }
    }

    /// Text shown on a menu card.
    #[must_use]
    pub fn banner(&self) -> Option<String> {
        match self {
            Self::NoCutoff => None,
            Self::Open { remaining } => Some(format!("Closes in {}", format_countdown(*remaining))),
            Self::Closed => Some("Delivery Closed".to_string()),
        }
    }
}

/// Whole hours and whole minutes, e.g. `14h 1m`. Seconds are dropped.
#[must_use]
pub fn format_countdown(remaining: TimeDelta) -> String {
    let minutes = remaining.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Per-category cutoff rules in the store's reference time zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutoffPolicy {
    rules: BTreeMap<MealCategory, SlotRule>,
    time_zone: StoreTimeZone,
}

impl Default for CutoffPolicy {
    fn default() -> Self {
        Self::new(StoreTimeZone::default())
            .with_rule(MealCategory::Lunch, SlotRule::lunch())
            .with_rule(MealCategory::Snacks, SlotRule::snacks())
    }
}

impl CutoffPolicy {
    /// A policy with no rules: every category is always open.
    #[must_use]
    pub const fn new(time_zone: StoreTimeZone) -> Self {
        Self {
            rules: BTreeMap::new(),
            time_zone,
        }
    }

    /// Add or replace the rule for a category.
    #[must_use]
    pub fn with_rule(mut self, category: MealCategory, rule: SlotRule) -> Self {
        self.rules.insert(category, rule);
        self
    }

    /// The reference time zone.
    #[must_use]
    pub const fn time_zone(&self) -> StoreTimeZone {
        self.time_zone
    }

    /// The rule for a category, if any.
    #[must_use]
    pub fn rule(&self, category: MealCategory) -> Option<&SlotRule> {
        self.rules.get(&category)
    }

    /// Slot label for a category, if it has a rule.
    #[must_use]
    pub fn slot_label(&self, category: MealCategory) -> Option<&str> {
        self.rule(category).map(|rule| rule.label.as_str())
    }

    /// The last instant at which `category` can still be ordered for `date`
    /// (exclusive).
    #[must_use]
    pub fn cutoff_instant(&self, category: MealCategory, date: NaiveDate) -> Option<DateTime<Utc>> {
        let rule = self.rule(category)?;
        let slot_start = self.time_zone.instant(date, rule.start);
        Some(slot_start - TimeDelta::hours(i64::from(rule.lead_hours)))
    }

    /// Evaluate the cutoff for `category` on `date` at `now`.
    ///
    /// Reaching the cutoff exactly counts as closed.
    #[must_use]
    pub fn evaluate(&self, category: MealCategory, date: NaiveDate, now: DateTime<Utc>) -> CutoffStatus {
        let Some(cutoff) = self.cutoff_instant(category, date) else {
            return CutoffStatus::NoCutoff;
        };
        let remaining = cutoff - now;
        if remaining <= TimeDelta::zero() {
            CutoffStatus::Closed
        } else {
            CutoffStatus::Open { remaining }
        }
    }

    /// "Today" in the store's zone.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.time_zone.today(now)
    }
}

/// A menu item paired with one delivery date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateSlot {
    pub item: MenuItem,
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub day_label: &'static str,
    pub closed: bool,
    pub countdown: Option<String>,
    pub banner: Option<String>,
    pub stock: StockState,
    pub slot_label: Option<String>,
}

impl CandidateSlot {
    /// Evaluate `item` for `date` at `now`.
    #[must_use]
    pub fn evaluate(item: &MenuItem, date: NaiveDate, policy: &CutoffPolicy, now: DateTime<Utc>) -> Self {
        let status = policy.evaluate(item.category, date, now);
        let weekday = Weekday::of(date);
        Self {
            item: item.clone(),
            date,
            weekday,
            day_label: weekday.name(),
            closed: status.is_closed(),
            countdown: status.countdown(),
            banner: status.banner(),
            stock: item.stock,
            slot_label: policy.slot_label(item.category).map(str::to_string),
        }
    }

    /// Open and in stock.
    #[must_use]
    pub const fn is_addable(&self) -> bool {
        !self.closed && self.stock.is_available()
    }
}

/// How far ahead the menu looks and how many days it surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    /// Calendar days scanned, starting tomorrow.
    pub lookahead_days: usize,
    /// Maximum number of days with items to surface.
    pub max_days: usize,
}

impl Default for ScheduleWindow {
    fn default() -> Self {
        Self {
            lookahead_days: 7,
            max_days: 5,
        }
    }
}

/// One surfaced delivery day and its candidate slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub weekday: Weekday,
    /// e.g. `Tuesday, Oct 20`.
    pub label: String,
    pub slots: Vec<CandidateSlot>,
}

/// Resolve the delivery days shown for `meal` and the items on each.
///
/// Days are scanned from tomorrow for `window.lookahead_days`, weekends are
/// dropped, days with no eligible item are dropped, and the earliest
/// `window.max_days` remaining days are returned in order.
#[must_use]
pub fn build_schedule(
    menu: &Menu,
    meal: MealCategory,
    policy: &CutoffPolicy,
    window: ScheduleWindow,
    now: DateTime<Utc>,
) -> Vec<DaySchedule> {
    upcoming_dates(policy.today(now), window.lookahead_days)
        .filter(|upcoming| !upcoming.weekday.is_weekend())
        .filter_map(|upcoming| {
            let slots: Vec<_> = menu
                .items()
                .iter()
                .filter(|item| item.is_offered_on(meal, upcoming.date))
                .map(|item| CandidateSlot::evaluate(item, upcoming.date, policy, now))
                .collect();
            if slots.is_empty() {
                return None;
            }
            Some(DaySchedule {
                date: upcoming.date,
                weekday: upcoming.weekday,
                label: upcoming.date.format("%A, %b %-d").to_string(),
                slots,
            })
        })
        .take(window.max_days)
        .collect()
}

/// Reasons a candidate cannot be added to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EligibilityError {
    #[error("{name} is not available")]
    Inactive { name: String },

    #[error("{name} is out of stock")]
    OutOfStock { name: String },

    #[error("no deliveries on weekends ({date})")]
    Weekend { date: NaiveDate },

    #[error("{date} is not an upcoming delivery date")]
    NotUpcoming { date: NaiveDate },

    #[error("{name} is not on the menu for {date}")]
    NotOffered { name: String, date: NaiveDate },

    #[error("{category} for {date} closed (must be ordered {lead_hours} hours before the slot)")]
    Closed {
        category: MealCategory,
        date: NaiveDate,
        lead_hours: u32,
    },
}

/// Check that `item` may be added to a cart for `date` right now.
///
/// # Errors
///
/// Returns the first failing rule: inactive, weekend, today or earlier,
/// weekday not in the item's pattern, out of stock, or cutoff reached.
pub fn ensure_addable(
    item: &MenuItem,
    date: NaiveDate,
    policy: &CutoffPolicy,
    now: DateTime<Utc>,
) -> Result<CandidateSlot, EligibilityError> {
    if !item.active {
        return Err(EligibilityError::Inactive {
            name: item.name.clone(),
        });
    }
    if Weekday::of(date).is_weekend() {
        return Err(EligibilityError::Weekend { date });
    }
    if date <= policy.today(now) {
        return Err(EligibilityError::NotUpcoming { date });
    }
    if !item.is_offered_on(item.category, date) {
        return Err(EligibilityError::NotOffered {
            name: item.name.clone(),
            date,
        });
    }
    if !item.stock.is_available() {
        return Err(EligibilityError::OutOfStock {
            name: item.name.clone(),
        });
    }

    let slot = CandidateSlot::evaluate(item, date, policy, now);
    if slot.closed {
        return Err(EligibilityError::Closed {
            category: item.category,
            date,
            lead_hours: policy.rule(item.category).map_or(0, |rule| rule.lead_hours),
        });
    }
    Ok(slot)
}
