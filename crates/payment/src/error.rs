//! Payment error types.

use common::{Money, OrderId};
use thiserror::Error;

use crate::model::{PaymentId, RefundId};
use crate::status::PaymentStatus;

/// Errors that can occur during payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Payment not found.
    #[error("payment not found: {0}")]
    NotFound(PaymentId),

    /// Refund not found.
    #[error("refund not found: {0}")]
    RefundNotFound(RefundId),

    /// The order already has a payment.
    #[error("payment already exists for order {0}")]
    DuplicatePayment(OrderId),

    /// The state machine forbids this transition. Never retried.
    #[error("invalid payment state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// A concurrent writer committed first; the stale write was discarded.
    #[error("version conflict on payment {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: PaymentId,
        expected: u64,
        actual: u64,
    },

    /// Completed refunds can never exceed the captured amount.
    #[error("refund of {requested} exceeds remaining captured amount ({remaining} of {captured})")]
    RefundExceedsCapture {
        requested: Money,
        remaining: Money,
        captured: Money,
    },

    /// A payment or refund amount must be positive.
    #[error("amount must be positive, got {0}")]
    InvalidAmount(Money),
}

/// Result type for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;
