//! Merchant notification via WhatsApp deep link.

use thiserror::Error;

/// Coordinates outside the valid latitude/longitude ranges.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid location: {lat}, {lng}")]
pub struct InvalidLocation {
    pub lat: f64,
    pub lng: f64,
}

/// `https://wa.me/{number}?text={message}` with the message percent-encoded.
#[must_use]
pub fn whatsapp_link(number: &str, message: &str) -> String {
    format!(
        "https://wa.me/{number}?text={}",
        urlencoding::encode(message)
    )
}

/// Message asking the merchant whether they deliver to a map location.
///
/// # Errors
///
/// Returns `InvalidLocation` unless `lat` is in [-90, 90] and `lng` in
/// [-180, 180].
pub fn delivery_check_message(lat: f64, lng: f64) -> Result<String, InvalidLocation> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(InvalidLocation { lat, lng });
    }
    Ok(format!(
        "This is my live location: https://maps.google.com/?q={lat},{lng}. Is delivery possible?"
    ))
}
