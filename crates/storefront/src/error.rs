//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Responses are JSON: `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use tiffin_core::checkout::CheckoutError;
use tiffin_core::cutoff::EligibilityError;
use tiffin_core::profile::ProfileError;

use crate::services::payment::PaymentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout could not proceed.
    #[error("{0}")]
    Checkout(#[from] CheckoutError),

    /// A menu item cannot be added for that date.
    #[error("{0}")]
    Eligibility(#[from] EligibilityError),

    /// Profile fields were missing.
    #[error("{0}")]
    Profile(#[from] ProfileError),

    /// Payment gateway call or verification failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Session storage failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Menu has not been loaded yet.
    #[error("Menu unavailable")]
    MenuUnavailable,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Checkout(CheckoutError::Storage(_))
            | Self::Profile(ProfileError::Storage(_))
            | Self::Session(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Checkout(CheckoutError::NotAttested) => StatusCode::CONFLICT,
            Self::Checkout(_) | Self::Eligibility(_) | Self::Profile(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Payment(err) => match err {
                PaymentError::InvalidSignature
                | PaymentError::UnknownOrder(_)
                | PaymentError::AmountMismatch { .. } => StatusCode::PAYMENT_REQUIRED,
                PaymentError::NotConfigured => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MenuUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn is_server_error(&self) -> bool {
        matches!(self, Self::Session(_) | Self::Internal(_)) || matches!(self, Self::Payment(err) if !err.is_rejection())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Payment(PaymentError::NotConfigured) => {
                "Gateway payments are not enabled".to_string()
            }
            Self::Payment(err) if !err.is_rejection() => {
                "Payment service unavailable, please try again".to_string()
            }
            Self::Payment(_) => "Payment verification failed".to_string(),
            _ => self.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("meal brunch".to_string());
        assert_eq!(err.to_string(), "Not found: meal brunch");

        let err = AppError::from(CheckoutError::ProfileRequired);
        assert!(err.to_string().starts_with("profile required"));
    }

    #[test]
    fn test_validation_errors_are_unprocessable() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 24).unwrap_or_default();
        assert_eq!(
            get_status(CheckoutError::EmptyCart.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(EligibilityError::Weekend { date }.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(ProfileError::MissingField("phone").into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(CheckoutError::NotAttested.into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_payment_status_codes() {
        assert_eq!(
            get_status(PaymentError::InvalidSignature.into()),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            get_status(PaymentError::Api {
                status: 500,
                message: "down".to_string()
            }
            .into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(PaymentError::NotConfigured.into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_other_status_codes() {
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::MenuUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
