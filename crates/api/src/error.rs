//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::RejectionReason;
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No valid identity on the request.
    Unauthorized(String),
    /// Malformed request from the client.
    BadRequest(String),
    /// Order placement error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    /// Returns the HTTP status, stable error code and client-safe message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Checkout(err) => checkout_error_parts(err),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        metrics::counter!("api_errors_total", "code" => code).increment(1);

        if status.is_server_error() {
            // Details go to the log only.
            match &self {
                ApiError::Checkout(err) => {
                    tracing::error!(error = %err, kind = err.kind(), code, "order placement error")
                }
                other => tracing::error!(error = ?other, code, "internal server error"),
            }
        }

        let body = ErrorBody {
            success: false,
            error: message,
            code,
        };
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_parts(err: &CheckoutError) -> (StatusCode, &'static str, String) {
    match err {
        CheckoutError::Rejected(reason) => {
            let status = match reason {
                RejectionReason::ProductsNotFound { .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, reason.code(), reason.to_string())
        }
        CheckoutError::Persistence(_) | CheckoutError::CompensationFailed { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ORDER_PLACEMENT_FAILED",
            "Failed to place order".to_string(),
        ),
        CheckoutError::AssemblyFailed { order_number, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ORDER_CREATED_RESPONSE_UNAVAILABLE",
            format!("Order {order_number} was placed but its details could not be loaded"),
        ),
        CheckoutError::DeadlineExceeded { committed: true } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ORDER_CREATED_RESPONSE_UNAVAILABLE",
            "Order was placed but its details could not be loaded in time".to_string(),
        ),
        CheckoutError::DeadlineExceeded { committed: false } | CheckoutError::Abandoned => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ORDER_PLACEMENT_TIMEOUT",
            "Order placement timed out; no order was created".to_string(),
        ),
        CheckoutError::NotFound(_)
        | CheckoutError::InvalidTransition { .. }
        | CheckoutError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Internal server error".to_string(),
        ),
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}
