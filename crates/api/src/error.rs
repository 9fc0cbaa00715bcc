//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use storage::{ErrorKind, StoreError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// The caller did not identify itself.
    Unauthorized,
    /// Service error, mapped by its kind.
    Checkout(CheckoutError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing user identity".to_string(),
            ),
            ApiError::Checkout(err) => {
                let status = match err.kind() {
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::Conflict => StatusCode::CONFLICT,
                    ErrorKind::Invalid => StatusCode::BAD_REQUEST,
                    ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
                    ErrorKind::Internal => return internal_error(&err),
                };
                tracing::debug!(error = %err, %status, "request rejected");
                (status, public_message(&err))
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

/// Client-facing text for a rejected request. Step names and row ids stay
/// in the logs.
fn public_message(err: &CheckoutError) -> String {
    let message = match err {
        CheckoutError::CartEmpty => "Cart is empty",
        CheckoutError::InsufficientStock { .. } => "Insufficient stock",
        CheckoutError::Invalid(reason) => return reason.clone(),
        CheckoutError::Store { source, .. } => match source {
            StoreError::ProductNotFound(_) => "Product not found",
            StoreError::CartLineNotFound { .. } => "Product is not in the cart",
            StoreError::OrderNotFound(_) => "Order not found",
            StoreError::InsufficientStock { .. } => "Insufficient stock",
            StoreError::InvalidQuantity(_) => "Invalid quantity",
            _ => "Request failed",
        },
    };
    message.to_string()
}

/// Logs the detailed error under a fresh correlation id and returns a body
/// that carries only that id.
fn internal_error(err: &CheckoutError) -> Response {
    let correlation_id = uuid::Uuid::new_v4();
    tracing::error!(%correlation_id, error = %err, "internal server error");

    let body = serde_json::json!({
        "error": "internal server error",
        "correlation_id": correlation_id.to_string(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}
