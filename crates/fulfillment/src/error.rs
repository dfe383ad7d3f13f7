//! Fulfillment error types.

use ledger::LedgerError;
use payment::PaymentError;
use shipping::ShippingError;
use thiserror::Error;

/// Errors that can occur during fulfillment.
///
/// `CaptureDeclined` and `DispatchFailed` are the business failures the
/// saga compensates for; everything else is an infrastructure or
/// programming error surfaced to the caller.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Inventory ledger error.
    #[error("inventory error: {0}")]
    Inventory(#[from] LedgerError),

    /// Payment error.
    #[error("payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Shipping error.
    #[error("shipping error: {0}")]
    Shipping(#[from] ShippingError),

    /// The payment leg refused to capture.
    #[error("payment capture declined: {0}")]
    CaptureDeclined(String),

    /// The shipping leg could not dispatch.
    #[error("shipment dispatch failed: {0}")]
    DispatchFailed(String),

    /// An order with no lines cannot be fulfilled.
    #[error("order has no lines")]
    EmptyOrder,
}

/// Result type for fulfillment operations.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
