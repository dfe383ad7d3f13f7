//! Shipping service: tracking-event-first status progression.

use common::OrderId;

use crate::error::{Result, ShippingError};
use crate::model::{Shipment, ShipmentId, TrackingEvent, TrackingNumber};
use crate::repository::ShipmentRepository;
use crate::status::ShipmentStatus;

/// Drives shipments through their lifecycle over a [`ShipmentRepository`].
///
/// Every status change is recorded as a tracking event first; the
/// shipment's status field is only ever the projection of the latest
/// event, written in the same atomic unit.
pub struct ShippingService<R> {
    repo: R,
}

impl<R: ShipmentRepository> ShippingService<R> {
    /// Creates a service over the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a pending shipment for an order, with its initial tracking
    /// event. One shipment per order.
    #[tracing::instrument(skip(self), fields(%order_id))]
    pub async fn create_shipment(
        &self,
        order_id: OrderId,
        carrier: Option<String>,
    ) -> Result<Shipment> {
        if self.repo.get_by_order(order_id).await?.is_some() {
            return Err(ShippingError::DuplicateShipment(order_id));
        }

        let shipment = Shipment::new(order_id, carrier);
        let initial_event = TrackingEvent::new(
            shipment.id,
            ShipmentStatus::Pending,
            Some("origin facility".to_string()),
            Some("shipment created, awaiting processing".to_string()),
        );
        self.repo.insert(shipment.clone(), initial_event).await?;
        tracing::info!(shipment_id = %shipment.id, tracking = %shipment.tracking_number, "shipment created");
        Ok(shipment)
    }

    /// Reads a shipment by ID.
    pub async fn get(&self, id: ShipmentId) -> Result<Shipment> {
        self.repo.get(id).await?.ok_or(ShippingError::NotFound(id))
    }

    /// Reads the shipment for an order, if any.
    pub async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Shipment>> {
        self.repo.get_by_order(order_id).await
    }

    /// Reads a shipment by tracking number.
    pub async fn get_by_tracking(&self, tracking: &TrackingNumber) -> Result<Shipment> {
        self.repo
            .get_by_tracking(tracking)
            .await?
            .ok_or_else(|| ShippingError::TrackingNotFound(tracking.clone()))
    }

    /// Records a tracking event and advances the cached status with it.
    ///
    /// Rejects transitions the state machine forbids; nothing can follow a
    /// terminal status.
    #[tracing::instrument(skip(self, location, description), fields(%shipment_id, %next))]
    pub async fn advance(
        &self,
        shipment_id: ShipmentId,
        next: ShipmentStatus,
        location: Option<String>,
        description: Option<String>,
    ) -> Result<Shipment> {
        let shipment = self.get(shipment_id).await?;
        if !shipment.status.can_transition_to(next) {
            return Err(ShippingError::InvalidStateTransition {
                from: shipment.status,
                to: next,
            });
        }

        let event = TrackingEvent::new(shipment_id, next, location, description);
        self.repo
            .append_event(shipment_id, event, shipment.version)
            .await
    }

    /// Cancels the shipment from any non-terminal state.
    pub async fn cancel(&self, shipment_id: ShipmentId, reason: Option<String>) -> Result<Shipment> {
        self.advance(shipment_id, ShipmentStatus::Cancelled, None, reason)
            .await
    }

    /// Tracking events for a shipment, chronological.
    pub async fn events(&self, shipment_id: ShipmentId) -> Result<Vec<TrackingEvent>> {
        self.repo.events(shipment_id).await
    }
}
