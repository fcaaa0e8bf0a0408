//! Typed menu built from feed records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{Weekday, WeekdaySet};
use crate::csv::{CsvRecord, parse_records};
use crate::types::{MealCategory, MenuItemId, Price, StockState};

/// Image shown when a row has no `imageUrl`.
pub const PLACEHOLDER_IMAGE: &str = "/no-image.png";

/// One offering for a meal category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: MealCategory,
    pub active: bool,
    pub available_days: WeekdaySet,
    pub image_url: String,
    pub stock: StockState,
}

impl MenuItem {
    /// Build an item from one feed record.
    ///
    /// Returns `None` when the category is missing or unknown; every other
    /// column falls back to a default.
    #[must_use]
    pub fn from_record(record: &CsvRecord) -> Option<Self> {
        let cell = |key: &str| record.get(key).map_or("", |value| value.trim());

        let category = match cell("category").parse::<MealCategory>() {
            Ok(category) => category,
            Err(err) => {
                tracing::warn!(row_id = cell("id"), error = %err, "skipping menu row");
                return None;
            }
        };

        let id = match cell("id") {
            "" => MenuItemId::generate(),
            id => MenuItemId::new(id),
        };

        let active = match cell("isActive") {
            "" => true,
            flag => flag.eq_ignore_ascii_case("true"),
        };

        let days = match cell("day") {
            "" => cell("availableDays"),
            days => days,
        };

        let image_url = match cell("imageUrl") {
            "" => PLACEHOLDER_IMAGE.to_string(),
            url => url.to_string(),
        };

        Some(Self {
            id,
            name: cell("name").to_string(),
            description: cell("description").to_string(),
            price: Price::parse_lenient(cell("price")),
            category,
            active,
            available_days: WeekdaySet::parse(days),
            image_url,
            stock: StockState::from_feed(cell("stockAvailability")),
        })
    }

    /// Whether this item is shown for `meal` on `date`.
    #[must_use]
    pub fn is_offered_on(&self, meal: MealCategory, date: NaiveDate) -> bool {
        self.active && self.category == meal && self.available_days.contains(Weekday::of(date))
    }
}

/// The result of one feed fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Menu {
    items: Vec<MenuItem>,
    active_meal: Option<MealCategory>,
}

impl Menu {
    /// Create a menu from already-typed items.
    #[must_use]
    pub const fn new(items: Vec<MenuItem>, active_meal: Option<MealCategory>) -> Self {
        Self { items, active_meal }
    }

    /// Parse raw feed text.
    #[must_use]
    pub fn from_csv(text: &str) -> Self {
        Self::from_records(&parse_records(text))
    }

    /// Build from parsed records. Rows with a blank `category` that only carry
    /// an `activeMeal` value are valid and contribute nothing but the flag.
    #[must_use]
    pub fn from_records(records: &[CsvRecord]) -> Self {
        let active_meal = records.iter().find_map(|record| {
            record
                .get("activeMeal")
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .and_then(|value| value.parse::<MealCategory>().ok())
        });

        let items = records
            .iter()
            .filter(|record| {
                record
                    .get("category")
                    .is_some_and(|value| !value.trim().is_empty())
            })
            .filter_map(MenuItem::from_record)
            .collect();

        Self { items, active_meal }
    }

    /// All items, including inactive ones.
    #[must_use]
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// The meal the feed marks as available today (lunch when unspecified).
    #[must_use]
    pub fn active_meal(&self) -> MealCategory {
        self.active_meal.unwrap_or_default()
    }

    /// Active items of a meal category.
    pub fn items_for(&self, meal: MealCategory) -> impl Iterator<Item = &MenuItem> {
        self.items
            .iter()
            .filter(move |item| item.active && item.category == meal)
    }

    /// Look up an item by ID.
    #[must_use]
    pub fn find(&self, id: &MenuItemId) -> Option<&MenuItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Whether the menu has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
