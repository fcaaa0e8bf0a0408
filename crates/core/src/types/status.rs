//! Enumerations read from the menu feed.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Meal category a menu item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MealCategory {
    Breakfast,
    #[default]
    Lunch,
    Dinner,
    Snacks,
}

impl MealCategory {
    /// All categories in display order.
    pub const ALL: [Self; 4] = [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snacks];

    /// Lowercase identifier used in URLs and the feed.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snacks => "snacks",
        }
    }

    /// Human label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snacks => "Snacks",
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a category cell is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown meal category: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for MealCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snacks" | "snack" => Ok(Self::Snacks),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// Stock flag from the `stockAvailability` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockState {
    #[default]
    InStock,
    OutOfStock,
}

impl StockState {
    /// Read a feed cell. Only an explicit `out` marks an item out of stock;
    /// a blank cell means in stock.
    #[must_use]
    pub fn from_feed(raw: &str) -> Self {
        let value = raw.trim().to_ascii_lowercase();
        if value == "out" || value == "out of stock" || value == "out_of_stock" {
            Self::OutOfStock
        } else {
            Self::InStock
        }
    }

    /// Whether the item can be added to a cart.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::InStock)
    }
}
