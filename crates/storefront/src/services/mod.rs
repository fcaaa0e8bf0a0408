//! Business logic and external integrations for the storefront.
//!
//! # Services
//!
//! - `checkout` - Checkout orchestration (attestation, submission)
//! - `menu_feed` - Menu CSV feed client, shared snapshot and poller
//! - `notify` - Merchant WhatsApp link
//! - `order_log` - Order log webhook client
//! - `payment` - Razorpay order creation and signature verification

pub mod checkout;
pub mod menu_feed;
pub mod notify;
pub mod order_log;
pub mod payment;
