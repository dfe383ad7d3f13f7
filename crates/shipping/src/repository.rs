//! Shipment repository contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use tokio::sync::RwLock;

use crate::error::{Result, ShippingError};
use crate::model::{Shipment, ShipmentId, TrackingEvent, TrackingNumber};

/// Storage contract for shipments and their tracking events.
///
/// Shipments live in their own service with their own database; this trait
/// is the repository-level boundary other components talk through.
/// `append_event` must write the event and the cached status projection as
/// one atomic unit — the same discipline as the inventory ledger.
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    /// Inserts a new shipment together with its initial tracking event.
    /// Fails if the order already has a shipment.
    async fn insert(&self, shipment: Shipment, initial_event: TrackingEvent) -> Result<()>;

    /// Reads a shipment by ID.
    async fn get(&self, id: ShipmentId) -> Result<Option<Shipment>>;

    /// Reads the shipment for an order.
    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Shipment>>;

    /// Reads a shipment by tracking number.
    async fn get_by_tracking(&self, tracking: &TrackingNumber) -> Result<Option<Shipment>>;

    /// Atomically appends the event and projects its status onto the
    /// shipment, iff the version matches. Returns the updated shipment.
    async fn append_event(
        &self,
        shipment_id: ShipmentId,
        event: TrackingEvent,
        expected_version: u64,
    ) -> Result<Shipment>;

    /// Tracking events for a shipment, chronological.
    async fn events(&self, shipment_id: ShipmentId) -> Result<Vec<TrackingEvent>>;
}

#[derive(Default)]
struct Inner {
    shipments: HashMap<ShipmentId, Shipment>,
    by_order: HashMap<OrderId, ShipmentId>,
    by_tracking: HashMap<TrackingNumber, ShipmentId>,
    events: Vec<TrackingEvent>,
}

/// In-memory shipment repository for testing and single-process wiring.
#[derive(Clone, Default)]
pub struct InMemoryShipmentRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryShipmentRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored shipments.
    pub async fn shipment_count(&self) -> usize {
        self.inner.read().await.shipments.len()
    }
}

#[async_trait]
impl ShipmentRepository for InMemoryShipmentRepository {
    async fn insert(&self, shipment: Shipment, initial_event: TrackingEvent) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.by_order.contains_key(&shipment.order_id) {
            return Err(ShippingError::DuplicateShipment(shipment.order_id));
        }

        inner.by_order.insert(shipment.order_id, shipment.id);
        inner
            .by_tracking
            .insert(shipment.tracking_number.clone(), shipment.id);
        inner.shipments.insert(shipment.id, shipment);
        inner.events.push(initial_event);
        Ok(())
    }

    async fn get(&self, id: ShipmentId) -> Result<Option<Shipment>> {
        Ok(self.inner.read().await.shipments.get(&id).cloned())
    }

    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Shipment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_order
            .get(&order_id)
            .and_then(|id| inner.shipments.get(id))
            .cloned())
    }

    async fn get_by_tracking(&self, tracking: &TrackingNumber) -> Result<Option<Shipment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_tracking
            .get(tracking)
            .and_then(|id| inner.shipments.get(id))
            .cloned())
    }

    async fn append_event(
        &self,
        shipment_id: ShipmentId,
        event: TrackingEvent,
        expected_version: u64,
    ) -> Result<Shipment> {
        let mut inner = self.inner.write().await;
        let shipment = inner
            .shipments
            .get_mut(&shipment_id)
            .ok_or(ShippingError::NotFound(shipment_id))?;

        if shipment.version != expected_version {
            return Err(ShippingError::VersionConflict {
                id: shipment_id,
                expected: expected_version,
                actual: shipment.version,
            });
        }

        shipment.status = event.status;
        shipment.version += 1;
        shipment.updated_at = event.recorded_at;
        let updated = shipment.clone();
        inner.events.push(event);
        Ok(updated)
    }

    async fn events(&self, shipment_id: ShipmentId) -> Result<Vec<TrackingEvent>> {
        Ok(self
            .inner
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.shipment_id == shipment_id)
            .cloned()
            .collect())
    }
}
