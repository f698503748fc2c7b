//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Responses carry a JSON body of the form `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use medpro_core::{OrderError, SinkError, SourceError};

use crate::services::CheckoutError;

/// Shown when an order could not be submitted. The cart is always kept.
pub const ORDER_FAILED_MESSAGE: &str =
    "We couldn't place your order right now. Your cart has been kept, please try again.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart or checkout form failed validation.
    #[error("Invalid order: {0}")]
    Order(#[from] OrderError),

    /// The order backend refused or could not take the order.
    #[error("Order submission failed: {0}")]
    OrderSubmission(#[from] SinkError),

    /// The product catalog could not be queried.
    #[error("Catalog error: {0}")]
    Catalog(#[from] SourceError),

    /// Session storage failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state (out of stock, duplicate submit).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::AlreadyPending => Self::Conflict(err.to_string()),
            CheckoutError::Invalid(e) => Self::Order(e),
            CheckoutError::Submission(e) => Self::OrderSubmission(e),
            CheckoutError::TimedOut(_) => {
                Self::OrderSubmission(SinkError::Unavailable(err.to_string()))
            }
        }
    }
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Order(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OrderSubmission(_) | Self::Catalog(_) => StatusCode::BAD_GATEWAY,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Message safe to show the shopper.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            // Don't expose internal error details to clients
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Catalog(_) => "External service error".to_string(),
            Self::OrderSubmission(SinkError::Rejected(reason)) => {
                format!("{ORDER_FAILED_MESSAGE} ({reason})")
            }
            Self::OrderSubmission(SinkError::Unavailable(_)) => ORDER_FAILED_MESSAGE.to_string(),
            Self::Order(e) => e.to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) | Self::Conflict(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Session(_)
                | Self::Internal(_)
                | Self::Catalog(_)
                | Self::OrderSubmission(SinkError::Unavailable(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added 2 x scalpel-10", Some(&[("item_count", "2")]));
/// ```
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
