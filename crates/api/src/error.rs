//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::FulfillmentError;
use ledger::LedgerError;
use payment::PaymentError;
use shipping::ShippingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Inventory ledger error.
    Ledger(LedgerError),
    /// Payment error.
    Payment(PaymentError),
    /// Shipping error.
    Shipping(ShippingError),
    /// Fulfillment saga error.
    Fulfillment(FulfillmentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Ledger(err) => ledger_error_to_response(err),
            ApiError::Payment(err) => payment_error_to_response(err),
            ApiError::Shipping(err) => shipping_error_to_response(err),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn ledger_error_to_response(err: LedgerError) -> (StatusCode, String) {
    match &err {
        LedgerError::InsufficientStock { .. } => (StatusCode::CONFLICT, err.to_string()),
        LedgerError::TemporarilyUnavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        LedgerError::VersionConflict { .. } => (StatusCode::CONFLICT, err.to_string()),
        LedgerError::Database(_) | LedgerError::Migration(_) => {
            tracing::error!(error = %err, "ledger storage error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn payment_error_to_response(err: PaymentError) -> (StatusCode, String) {
    match &err {
        PaymentError::NotFound(_) | PaymentError::RefundNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        PaymentError::DuplicatePayment(_)
        | PaymentError::InvalidStateTransition { .. }
        | PaymentError::VersionConflict { .. } => (StatusCode::CONFLICT, err.to_string()),
        PaymentError::RefundExceedsCapture { .. } | PaymentError::InvalidAmount(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
    }
}

fn shipping_error_to_response(err: ShippingError) -> (StatusCode, String) {
    match &err {
        ShippingError::NotFound(_) | ShippingError::TrackingNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        ShippingError::DuplicateShipment(_)
        | ShippingError::InvalidStateTransition { .. }
        | ShippingError::VersionConflict { .. } => (StatusCode::CONFLICT, err.to_string()),
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    match err {
        FulfillmentError::Inventory(inner) => ledger_error_to_response(inner),
        FulfillmentError::Payment(inner) => payment_error_to_response(inner),
        FulfillmentError::Shipping(inner) => shipping_error_to_response(inner),
        other @ FulfillmentError::EmptyOrder => (StatusCode::BAD_REQUEST, other.to_string()),
        other @ (FulfillmentError::CaptureDeclined(_) | FulfillmentError::DispatchFailed(_)) => {
            (StatusCode::CONFLICT, other.to_string())
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Payment(err)
    }
}

impl From<ShippingError> for ApiError {
    fn from(err: ShippingError) -> Self {
        ApiError::Shipping(err)
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}
