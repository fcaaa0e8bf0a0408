//! Checkout stages, re-validation and order preparation.
//!
//! The stage is derived from the cart, the saved profile and the stored
//! payment attestation. Only the attestation is persisted (under
//! [`CHECKOUT_KEY`]); it is dropped whenever the cart changes so a payment
//! can never be attached to a different cart than the one it covered.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::Weekday;
use crate::cart::Cart;
use crate::cutoff::CutoffPolicy;
use crate::menu::Menu;
use crate::order::{Order, OrderIdMode, PaymentAttestation, PaymentMethod, next_local_order_id};
use crate::profile::UserProfile;
use crate::storage::{CHECKOUT_KEY, KeyValueStore, get_json, set_json};
use crate::types::{MealCategory, OrderId, Price};

/// Where a browser is in the checkout flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum CheckoutStage {
    Empty,
    ProfileMissing,
    /// Lines and profile present. `issue` names the first line failing
    /// re-validation, if any.
    ReadyToConfirm { issue: Option<String> },
    PaymentAttested { method: PaymentMethod, total: Price },
}

/// Reasons checkout cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("profile required: save your name, phone and address first")]
    ProfileRequired,

    #[error("ordering for {name} on {date} has closed ({category} must be ordered {lead_hours} hours before the slot)")]
    CutoffClosed {
        name: String,
        category: MealCategory,
        date: NaiveDate,
        lead_hours: u32,
    },

    #[error("{name} is marked for {label} but {date} is a {day}", day = .actual.name())]
    DateMismatch {
        name: String,
        label: String,
        date: NaiveDate,
        actual: Weekday,
    },

    #[error("no deliveries on weekends ({date})")]
    WeekendDelivery { date: NaiveDate },

    #[error("delivery date {date} has passed")]
    DeliveryDatePassed { date: NaiveDate },

    #[error("{name} is out of stock")]
    OutOfStock { name: String },

    #[error("payment has not been confirmed")]
    NotAttested,

    #[error("cart changed after payment was confirmed")]
    AttestationStale,

    #[error("could not store checkout state: {0}")]
    Storage(String),
}

/// Re-check every cart line at `now`.
///
/// Stock is checked against `menu` only for items still listed there; a
/// line whose item vanished from the feed keeps its snapshot.
///
/// # Errors
///
/// Returns the first failing line's reason.
pub fn revalidate(
    cart: &Cart,
    menu: &Menu,
    policy: &CutoffPolicy,
    now: DateTime<Utc>,
) -> Result<(), CheckoutError> {
    let today = policy.today(now);
    for line in cart.lines() {
        let date = line.delivery_date;
        let actual = Weekday::of(date);

        if !line.day_label.eq_ignore_ascii_case(actual.name()) {
            return Err(CheckoutError::DateMismatch {
                name: line.name.clone(),
                label: line.day_label.clone(),
                date,
                actual,
            });
        }
        if actual.is_weekend() {
            return Err(CheckoutError::WeekendDelivery { date });
        }
        if date < today {
            return Err(CheckoutError::DeliveryDatePassed { date });
        }
        if policy.evaluate(line.category, date, now).is_closed() {
            return Err(CheckoutError::CutoffClosed {
                name: line.name.clone(),
                category: line.category,
                date,
                lead_hours: policy.rule(line.category).map_or(0, |rule| rule.lead_hours),
            });
        }
        if let Some(item) = menu.find(&line.item_id)
            && !item.stock.is_available()
        {
            return Err(CheckoutError::OutOfStock {
                name: line.name.clone(),
            });
        }
    }
    Ok(())
}

/// Persisted checkout state for one browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    attestation: Option<PaymentAttestation>,
}

impl Checkout {
    /// Load the stored state, or a fresh one.
    #[must_use]
    pub fn load(store: &impl KeyValueStore) -> Self {
        get_json(store, CHECKOUT_KEY).unwrap_or_default()
    }

    /// Store the state.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Storage` if encoding fails.
    pub fn persist(&self, store: &mut impl KeyValueStore) -> Result<(), CheckoutError> {
        set_json(store, CHECKOUT_KEY, self).map_err(|err| CheckoutError::Storage(err.to_string()))
    }

    /// Drop any attestation. Called whenever the cart is edited.
    pub fn invalidate(store: &mut impl KeyValueStore) {
        store.remove(CHECKOUT_KEY);
    }

    /// The current attestation, if any.
    #[must_use]
    pub const fn attestation(&self) -> Option<&PaymentAttestation> {
        self.attestation.as_ref()
    }

    /// Work out the stage for this cart and profile.
    #[must_use]
    pub fn stage(
        &self,
        cart: &Cart,
        profile: Option<&UserProfile>,
        menu: &Menu,
        policy: &CutoffPolicy,
        now: DateTime<Utc>,
    ) -> CheckoutStage {
        if cart.is_empty() {
            return CheckoutStage::Empty;
        }
        if profile.is_none() {
            return CheckoutStage::ProfileMissing;
        }
        if let Some(attestation) = self.current_attestation(cart) {
            return CheckoutStage::PaymentAttested {
                method: attestation.method.clone(),
                total: attestation.total,
            };
        }
        CheckoutStage::ReadyToConfirm {
            issue: revalidate(cart, menu, policy, now)
                .err()
                .map(|err| err.to_string()),
        }
    }

    /// Record a payment after re-validating the cart.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart`, `ProfileRequired` or the first re-validation
    /// failure. Nothing is recorded on error.
    pub fn attest(
        &mut self,
        cart: &Cart,
        profile: Option<&UserProfile>,
        menu: &Menu,
        policy: &CutoffPolicy,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<&PaymentAttestation, CheckoutError> {
        Self::check_ready(cart, profile, menu, policy, now)?;
        Ok(self.attestation.insert(PaymentAttestation {
            method,
            attested_at: now,
            total: cart.total(),
            order_id: None,
        }))
    }

    /// The checks `attest` runs, without recording anything.
    ///
    /// # Errors
    ///
    /// Same as [`Checkout::attest`].
    pub fn check_ready(
        cart: &Cart,
        profile: Option<&UserProfile>,
        menu: &Menu,
        policy: &CutoffPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if profile.is_none() {
            return Err(CheckoutError::ProfileRequired);
        }
        revalidate(cart, menu, policy, now)
    }

    /// Build the order for an attested cart, issuing its ID on first call and
    /// reusing it afterwards.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart`, `ProfileRequired`, `NotAttested`, or
    /// `AttestationStale` if the cart total moved since payment.
    pub fn prepare_order(
        &mut self,
        store: &mut impl KeyValueStore,
        cart: &Cart,
        profile: Option<&UserProfile>,
        policy: &CutoffPolicy,
        mode: OrderIdMode,
        now: DateTime<Utc>,
    ) -> Result<Order, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let profile = profile.ok_or(CheckoutError::ProfileRequired)?;
        let Some(attestation) = self.attestation.as_mut() else {
            return Err(CheckoutError::NotAttested);
        };
        if attestation.total != cart.total() {
            self.attestation = None;
            return Err(CheckoutError::AttestationStale);
        }

        let id = match &attestation.order_id {
            Some(id) => id.clone(),
            None => {
                let id = match (mode, &attestation.method) {
                    (OrderIdMode::Gateway, PaymentMethod::Gateway { gateway_order_id, .. }) => {
                        OrderId::new(gateway_order_id.as_str())
                    }
                    _ => next_local_order_id(store),
                };
                attestation.order_id = Some(id.clone());
                id
            }
        };

        Ok(Order::assemble(
            id,
            cart,
            profile.clone(),
            attestation.method.clone(),
            policy,
            now,
        ))
    }

    /// Replace the issued order ID, e.g. with one assigned by the order log.
    pub fn assign_order_id(&mut self, id: OrderId) {
        if let Some(attestation) = self.attestation.as_mut() {
            attestation.order_id = Some(id);
        }
    }

    /// Finish checkout: clear the cart and the stored state.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Storage` if the empty cart cannot be stored.
    pub fn complete(store: &mut impl KeyValueStore, cart: &mut Cart) -> Result<(), CheckoutError> {
        cart.clear();
        cart.persist(store)
            .map_err(|err| CheckoutError::Storage(err.to_string()))?;
        Self::invalidate(store);
        Ok(())
    }

    fn current_attestation(&self, cart: &Cart) -> Option<&PaymentAttestation> {
        self.attestation
            .as_ref()
            .filter(|attestation| attestation.total == cart.total())
    }
}
