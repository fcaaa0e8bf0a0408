//! CLI command implementations.

pub mod menu;
pub mod payment;
