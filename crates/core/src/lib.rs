//! Tiffin Core - domain logic for the pre-order storefront.
//!
//! Everything here is pure: callers pass in the current instant, the parsed
//! menu and a [`storage::KeyValueStore`]. No HTTP, no clocks, no globals.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, meal categories, stock states
//! - [`calendar`] - weekdays, the store time zone, upcoming delivery dates
//! - [`csv`] - the menu feed's CSV dialect
//! - [`menu`] - menu items and the parsed snapshot
//! - [`cutoff`] - ordering cutoffs, eligibility and the day-grouped schedule
//! - [`storage`] - per-browser key-value storage
//! - [`profile`] - customer contact details
//! - [`cart`] - cart lines and totals
//! - [`checkout`] - checkout stages and re-validation
//! - [`order`] - assembled orders, merchant message, order-log row

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod calendar;
pub mod cart;
pub mod checkout;
pub mod csv;
pub mod cutoff;
pub mod menu;
pub mod order;
pub mod profile;
pub mod storage;
pub mod types;

pub use types::*;
