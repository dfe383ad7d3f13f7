//! Shipping error types.

use common::OrderId;
use thiserror::Error;

use crate::model::{ShipmentId, TrackingNumber};
use crate::status::ShipmentStatus;

/// Errors that can occur during shipping operations.
#[derive(Debug, Error)]
pub enum ShippingError {
    /// Shipment not found.
    #[error("shipment not found: {0}")]
    NotFound(ShipmentId),

    /// No shipment with the given tracking number.
    #[error("no shipment with tracking number {0}")]
    TrackingNotFound(TrackingNumber),

    /// The order already has a shipment.
    #[error("shipment already exists for order {0}")]
    DuplicateShipment(OrderId),

    /// The state machine forbids this transition. Never retried.
    #[error("invalid shipment state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    /// A concurrent writer committed first; the stale write was discarded.
    #[error("version conflict on shipment {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: ShipmentId,
        expected: u64,
        actual: u64,
    },
}

/// Result type for shipping operations.
pub type Result<T> = std::result::Result<T, ShippingError>;
