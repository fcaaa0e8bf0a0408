//! The assembled order and its two outbound renderings: the merchant's
//! WhatsApp message and the order-log row.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::StoreTimeZone;
use crate::cart::{Cart, CartLine};
use crate::cutoff::CutoffPolicy;
use crate::profile::UserProfile;
use crate::storage::{KeyValueStore, ORDER_COUNTER_KEY};
use crate::types::{OrderId, Price};

/// Slot label used when no line's category has a delivery slot rule.
pub const DEFAULT_SLOT_LABEL: &str = "Standard delivery";

/// How the order identifier is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderIdMode {
    /// Per-browser counter in the key-value store.
    ///
    /// Two tabs of the same browser can race and issue the same ID; that is
    /// accepted for a single-merchant storefront.
    #[default]
    Local,
    /// The payment gateway's order handle when one exists.
    Gateway,
    /// Whatever the order-log endpoint assigns.
    Server,
}

/// How the customer paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentMethod {
    /// The customer scanned the UPI QR and clicked "I have paid". Nothing is
    /// verified; the merchant confirms receipt out of band.
    SelfAttested,
    /// A gateway payment whose signature was verified.
    Gateway {
        payment_id: String,
        gateway_order_id: String,
    },
}

impl PaymentMethod {
    /// Short method name for the order log.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelfAttested => "GPay",
            Self::Gateway { .. } => "Razorpay",
        }
    }

    /// Gateway payment reference, if any.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::SelfAttested => None,
            Self::Gateway { payment_id, .. } => Some(payment_id),
        }
    }
}

/// A recorded payment attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAttestation {
    pub method: PaymentMethod,
    pub attested_at: DateTime<Utc>,
    /// Cart total at attestation time.
    pub total: Price,
    /// Set once an order ID has been issued, so retries reuse it.
    pub order_id: Option<OrderId>,
}

/// Issue the next ID from the per-browser counter, e.g. `ORD-00007`.
pub fn next_local_order_id(store: &mut impl KeyValueStore) -> OrderId {
    let next = store
        .get(ORDER_COUNTER_KEY)
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(0)
        .saturating_add(1);
    store.set(ORDER_COUNTER_KEY, next.to_string());
    OrderId::new(format!("ORD-{next:05}"))
}

/// An order ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub lines: Vec<CartLine>,
    pub total: Price,
    pub slot_label: String,
    pub customer: UserProfile,
    pub payment: PaymentMethod,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// Snapshot a cart into an order.
    #[must_use]
    pub fn assemble(
        id: OrderId,
        cart: &Cart,
        customer: UserProfile,
        payment: PaymentMethod,
        policy: &CutoffPolicy,
        placed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            lines: cart.lines().to_vec(),
            total: cart.total(),
            slot_label: slot_label(cart, policy),
            customer,
            payment,
            placed_at,
        }
    }

    /// Distinct delivery dates, earliest first.
    #[must_use]
    pub fn delivery_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<_> = self.lines.iter().map(|l| l.delivery_date).collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    /// The text sent to the merchant on WhatsApp.
    #[must_use]
    pub fn merchant_message(&self, store_name: &str) -> String {
        let mut cart = Cart::new();
        for line in &self.lines {
            cart.add(line.clone());
        }

        let mut items = String::new();
        for day in cart.by_day() {
            let _ = writeln!(items, "{} ({}):", day.day_label, day.delivery_date);
            for line in day.lines {
                let _ = writeln!(items, "- {}x {}", line.quantity, line.name);
            }
            items.push('\n');
        }

        let dates = self
            .delivery_dates()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "New Order from {store_name}\n\
             Order ID: {id}\n\n\
             {name}\n{phone}\n{address}\n\n\
             Order Details:\n\
             {items}\
             Total: {total}\n\
             Delivery Slot: {slot}\n\
             Delivery Date: {dates}\n\
             Payment: Paid via {method}",
            id = self.id,
            name = self.customer.name,
            phone = self.customer.phone,
            address = self.customer.address,
            total = self.total,
            slot = self.slot_label,
            method = self.payment.name(),
        )
    }

    /// The row posted to the order-log webhook.
    #[must_use]
    pub fn log_entry(&self, time_zone: StoreTimeZone) -> OrderLogEntry {
        let placed = self.placed_at.with_timezone(&time_zone.offset());
        let items = self
            .lines
            .iter()
            .map(|l| format!("{}x {} (for {})", l.quantity, l.name, l.delivery_date))
            .collect::<Vec<_>>()
            .join(" | ");

        OrderLogEntry {
            order_id: self.id.to_string(),
            date: placed.format("%Y-%m-%d").to_string(),
            month: placed.format("%B").to_string(),
            year: placed.format("%Y").to_string(),
            items,
            total: self.total,
            slot: self.slot_label.clone(),
            delivery_dates: self
                .delivery_dates()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            customer_name: self.customer.name.clone(),
            customer_phone: self.customer.phone.clone(),
            delivery_address: self.customer.address.clone(),
            payment_method: self.payment.name().to_string(),
            payment_status: "Paid".to_string(),
            payment_ref: self.payment.reference().unwrap_or_default().to_string(),
        }
    }
}

/// Distinct slot labels of the cart's categories, joined; or the default.
fn slot_label(cart: &Cart, policy: &CutoffPolicy) -> String {
    let mut labels: Vec<&str> = Vec::new();
    for line in cart.lines() {
        if let Some(label) = policy.slot_label(line.category)
            && !labels.contains(&label)
        {
            labels.push(label);
        }
    }
    if labels.is_empty() {
        DEFAULT_SLOT_LABEL.to_string()
    } else {
        labels.join(", ")
    }
}

/// Flattened order row for the spreadsheet webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLogEntry {
    pub order_id: String,
    pub date: String,
    pub month: String,
    pub year: String,
    pub items: String,
    pub total: Price,
    pub slot: String,
    pub delivery_dates: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub payment_method: String,
    pub payment_status: String,
    pub payment_ref: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::{MealCategory, MenuItemId};

    fn line(id: &str, name: &str, category: MealCategory, day: u32, quantity: u32) -> CartLine {
        let delivery_date = NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
        CartLine {
            item_id: MenuItemId::new(id),
            name: name.to_string(),
            price: Price::new(Decimal::from(50)),
            image_url: String::new(),
            category,
            delivery_date,
            day_label: crate::calendar::Weekday::of(delivery_date).name().to_string(),
            quantity,
        }
    }

    fn order(cart: &Cart) -> Order {
        Order::assemble(
            OrderId::new("ORD-00001"),
            cart,
            UserProfile::new("Anu", "9840012345", "12 Main St").unwrap(),
            PaymentMethod::SelfAttested,
            &CutoffPolicy::default(),
            Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_local_order_ids_increase() {
        let mut store = MemoryStore::new();
        assert_eq!(next_local_order_id(&mut store).as_str(), "ORD-00001");
        assert_eq!(next_local_order_id(&mut store).as_str(), "ORD-00002");
        store.set(ORDER_COUNTER_KEY, "garbage".to_string());
        assert_eq!(next_local_order_id(&mut store).as_str(), "ORD-00001");
    }

    #[test]
    fn test_merchant_message_groups_by_day() {
        let mut cart = Cart::new();
        cart.add(line("2", "Meals", MealCategory::Lunch, 21, 1));
        cart.add(line("1", "Curd Rice", MealCategory::Lunch, 20, 2));
        cart.add(line("3", "Payasam", MealCategory::Lunch, 21, 3));

        let message = order(&cart).merchant_message("Sakthi Kitchen");
        let expected = "New Order from Sakthi Kitchen\n\
                        Order ID: ORD-00001\n\n\
                        Anu\n9840012345\n12 Main St\n\n\
                        Order Details:\n\
                        Tuesday (2026-10-20):\n\
                        - 2x Curd Rice\n\n\
                        Wednesday (2026-10-21):\n\
                        - 1x Meals\n\
                        - 3x Payasam\n\n\
                        Total: ₹300\n\
                        Delivery Slot: 11:00 AM - 01:00 PM\n\
                        Delivery Date: 2026-10-20, 2026-10-21\n\
                        Payment: Paid via GPay";
        assert_eq!(message, expected);
    }

    #[test]
    fn test_slot_label_mixed_and_default() {
        let mut cart = Cart::new();
        cart.add(line("1", "Idli", MealCategory::Breakfast, 20, 1));
        assert_eq!(order(&cart).slot_label, DEFAULT_SLOT_LABEL);

        cart.add(line("2", "Bajji", MealCategory::Snacks, 20, 1));
        cart.add(line("3", "Meals", MealCategory::Lunch, 20, 1));
        assert_eq!(
            order(&cart).slot_label,
            "04:00 PM - 05:00 PM, 11:00 AM - 01:00 PM"
        );
    }

    #[test]
    fn test_log_entry_fields() {
        let mut cart = Cart::new();
        cart.add(line("1", "Idli", MealCategory::Breakfast, 20, 2));
        let entry = order(&cart).log_entry(StoreTimeZone::default());
        assert_eq!(entry.order_id, "ORD-00001");
        assert_eq!(entry.items, "2x Idli (for 2026-10-20)");
        assert_eq!(entry.month, "October");
        assert_eq!(entry.payment_status, "Paid");
        assert_eq!(entry.payment_ref, "");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["customerName"], "Anu");
        assert_eq!(json["deliveryDates"], "2026-10-20");
    }
}
