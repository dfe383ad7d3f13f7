//! Shipment status state machine.

use serde::{Deserialize, Serialize};

/// The state of a shipment in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Processing ──► Shipped ──► InTransit ──► Delivered
///    │            │             │            │
///    └────────────┴─────────────┴────────────┴──► Returned | Cancelled
/// ```
///
/// The status is always a projection of the latest tracking event; it
/// never moves without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Shipment created, not yet picked.
    #[default]
    Pending,

    /// Picked and packed at the warehouse.
    Processing,

    /// Handed to the carrier.
    Shipped,

    /// Moving through the carrier network.
    InTransit,

    /// Delivered to the customer (terminal state).
    Delivered,

    /// Returned to sender (terminal state).
    Returned,

    /// Cancelled before delivery (terminal state).
    Cancelled,
}

impl ShipmentStatus {
    /// Returns true if the state machine allows moving to `next`.
    ///
    /// The forward chain advances one step at a time; `Returned` and
    /// `Cancelled` are reachable from any non-terminal state.
    pub fn can_transition_to(self, next: ShipmentStatus) -> bool {
        use ShipmentStatus::*;
        if self.is_terminal() {
            return false;
        }
        match next {
            Returned | Cancelled => true,
            Processing => self == Pending,
            Shipped => self == Processing,
            InTransit => self == Shipped,
            Delivered => self == InTransit,
            Pending => false,
        }
    }

    /// Returns true if this is a terminal state (no events may follow).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ShipmentStatus::Delivered | ShipmentStatus::Returned | ShipmentStatus::Cancelled
        )
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::Processing => "processing",
            ShipmentStatus::Shipped => "shipped",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Returned => "returned",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
