//! Shipment and tracking event records.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::ShipmentStatus;

/// Unique identifier for a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(Uuid);

impl ShipmentId {
    /// Creates a new random shipment ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ShipmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Carrier-facing tracking number, unique per shipment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingNumber(String);

impl TrackingNumber {
    /// Generates a fresh tracking number.
    pub fn generate() -> Self {
        Self(format!("TRK-{}", Uuid::new_v4().simple()))
    }

    /// Wraps an existing tracking number.
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Returns the tracking number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TrackingNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One shipment, tied to exactly one order.
///
/// `status` is a cached projection of the latest tracking event and never
/// diverges from it: the repository writes event and status as one atomic
/// unit. `version` guards that write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub order_id: OrderId,
    pub tracking_number: TrackingNumber,
    pub carrier: Option<String>,
    pub status: ShipmentStatus,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// Creates a pending shipment with a generated tracking number.
    pub fn new(order_id: OrderId, carrier: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ShipmentId::new(),
            order_id,
            tracking_number: TrackingNumber::generate(),
            carrier,
            status: ShipmentStatus::Pending,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One append-only tracking event.
///
/// The latest event determines the shipment's current status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: Uuid,
    pub shipment_id: ShipmentId,
    pub status: ShipmentStatus,
    pub location: Option<String>,
    pub description: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl TrackingEvent {
    /// Creates an event stamped with the current time.
    pub fn new(
        shipment_id: ShipmentId,
        status: ShipmentStatus,
        location: Option<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            shipment_id,
            status,
            location,
            description,
            recorded_at: Utc::now(),
        }
    }
}
