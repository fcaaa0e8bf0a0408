//! The customer's cart.
//!
//! Lines are keyed by item and delivery date: the same dish for two days is
//! two lines. Quantities are always at least one; a line whose quantity
//! would drop to zero is removed instead.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cutoff::CandidateSlot;
use crate::storage::{CART_KEY, KeyValueStore, get_json, set_json};
use crate::types::{MealCategory, MenuItemId, Price};

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineKey {
    pub item_id: MenuItemId,
    pub delivery_date: NaiveDate,
}

/// A chosen quantity of an item for one delivery date.
///
/// Name, price, image and category are snapshots taken when the line was
/// added and are not refreshed from later feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: MenuItemId,
    pub name: String,
    pub price: Price,
    pub image_url: String,
    pub category: MealCategory,
    pub delivery_date: NaiveDate,
    pub day_label: String,
    pub quantity: u32,
}

impl CartLine {
    /// Snapshot a candidate slot into a line. A zero quantity becomes one.
    #[must_use]
    pub fn from_slot(slot: &CandidateSlot, quantity: u32) -> Self {
        Self {
            item_id: slot.item.id.clone(),
            name: slot.item.name.clone(),
            price: slot.item.price,
            image_url: slot.item.image_url.clone(),
            category: slot.item.category,
            delivery_date: slot.date,
            day_label: slot.day_label.to_string(),
            quantity: quantity.max(1),
        }
    }

    /// The line's identity.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            item_id: self.item_id.clone(),
            delivery_date: self.delivery_date,
        }
    }

    fn matches(&self, key: &LineKey) -> bool {
        self.item_id == key.item_id && self.delivery_date == key.delivery_date
    }

    /// Price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Lines sharing a delivery date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartDay<'a> {
    pub delivery_date: NaiveDate,
    pub day_label: &'a str,
    pub lines: Vec<&'a CartLine>,
}

/// Ordered collection of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add a line, merging quantities with an existing line for the same
    /// item and date.
    pub fn add(&mut self, line: CartLine) {
        let quantity = line.quantity.max(1);
        if let Some(existing) = self.lines.iter_mut().find(|l| l.matches(&line.key())) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.lines.push(CartLine { quantity, ..line });
        }
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// Returns `false` if no line has that key.
    pub fn update_quantity(&mut self, key: &LineKey, quantity: i64) -> bool {
        let Some(position) = self.lines.iter().position(|l| l.matches(key)) else {
            return false;
        };
        if quantity <= 0 {
            self.lines.remove(position);
        } else if let Some(line) = self.lines.get_mut(position) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
        true
    }

    /// Remove a line. Returns `false` if no line has that key.
    pub fn remove(&mut self, key: &LineKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| !l.matches(key));
        self.lines.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |count, line| count.saturating_add(line.quantity))
    }

    /// Sum of price × quantity.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Lines grouped by delivery date, earliest first.
    #[must_use]
    pub fn by_day(&self) -> Vec<CartDay<'_>> {
        let mut days: BTreeMap<NaiveDate, Vec<&CartLine>> = BTreeMap::new();
        for line in &self.lines {
            days.entry(line.delivery_date).or_default().push(line);
        }
        days.into_iter()
            .map(|(delivery_date, lines)| CartDay {
                delivery_date,
                day_label: lines.first().map_or("No Day Assigned", |l| l.day_label.as_str()),
                lines,
            })
            .collect()
    }

    /// Load the stored cart, or an empty one.
    #[must_use]
    pub fn load(store: &impl KeyValueStore) -> Self {
        get_json(store, CART_KEY).unwrap_or_default()
    }

    /// Store the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be serialized.
    pub fn persist(&self, store: &mut impl KeyValueStore) -> Result<(), serde_json::Error> {
        set_json(store, CART_KEY, self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::MemoryStore;

    fn line(id: &str, price: i64, day: u32, quantity: u32) -> CartLine {
        let delivery_date = NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
        CartLine {
            item_id: MenuItemId::new(id),
            name: format!("Item {id}"),
            price: Price::new(Decimal::from(price)),
            image_url: String::new(),
            category: MealCategory::Lunch,
            delivery_date,
            day_label: crate::calendar::Weekday::of(delivery_date).name().to_string(),
            quantity,
        }
    }

    #[test]
    fn test_add_merges_same_item_and_date() {
        let mut cart = Cart::new();
        cart.add(line("1", 50, 20, 1));
        cart.add(line("1", 50, 20, 2));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), Price::new(Decimal::from(150)));
    }

    #[test]
    fn test_same_item_different_dates_are_distinct() {
        let mut cart = Cart::new();
        cart.add(line("1", 50, 20, 1));
        cart.add(line("1", 50, 21, 1));
        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn test_add_zero_quantity_counts_as_one() {
        let mut cart = Cart::new();
        cart.add(line("1", 50, 20, 0));
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_update_to_zero_removes_and_recomputes_total() {
        let mut cart = Cart::new();
        cart.add(line("1", 50, 20, 2));
        cart.add(line("2", 80, 20, 1));
        let key = cart.lines()[0].key();

        assert!(cart.update_quantity(&key, 5));
        assert_eq!(cart.total(), Price::new(Decimal::from(330)));

        assert!(cart.update_quantity(&key, 0));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total(), Price::new(Decimal::from(80)));

        let other = cart.lines()[0].key();
        assert!(cart.update_quantity(&other, -3));
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_update_and_remove_unknown_line() {
        let mut cart = Cart::new();
        let key = line("9", 10, 20, 1).key();
        assert!(!cart.update_quantity(&key, 2));
        assert!(!cart.remove(&key));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(line("1", 50, 20, 1));
        cart.add(line("2", 50, 21, 1));
        assert!(cart.remove(&line("1", 50, 20, 1).key()));
        assert_eq!(cart.lines().len(), 1);
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_by_day_is_chronological() {
        let mut cart = Cart::new();
        cart.add(line("1", 50, 22, 1));
        cart.add(line("2", 50, 20, 1));
        cart.add(line("3", 50, 22, 2));
        let days = cart.by_day();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day_label, "Tuesday");
        assert_eq!(days[1].day_label, "Thursday");
        assert_eq!(days[1].lines.len(), 2);
    }

    #[test]
    fn test_persist_and_load() {
        let mut store = MemoryStore::new();
        assert!(Cart::load(&store).is_empty());

        let mut cart = Cart::new();
        cart.add(line("1", 50, 20, 2));
        cart.persist(&mut store).unwrap();
        assert_eq!(Cart::load(&store), cart);

        store.set(CART_KEY, "{broken".to_string());
        assert!(Cart::load(&store).is_empty());
    }
}
