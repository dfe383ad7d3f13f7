//! Shipping leg: trait, state-machine-backed client, and in-memory fake.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use shipping::{ShipmentRepository, ShipmentStatus, ShippingService, TrackingNumber};

use crate::error::{FulfillmentError, Result};

/// Contract for the shipping leg of the saga.
///
/// `cancel` is the compensating counterpart of `dispatch` and must
/// tolerate replay.
#[async_trait]
pub trait ShippingClient: Send + Sync {
    /// Creates and dispatches a shipment for the order; returns its
    /// tracking number.
    async fn dispatch(&self, order_id: OrderId) -> Result<TrackingNumber>;

    /// Compensating cancellation by tracking number.
    async fn cancel(&self, tracking: &TrackingNumber) -> Result<()>;
}

/// Shipping leg driving the real shipment state machine over its
/// repository.
///
/// Dispatch is replay-tolerant: a retried saga finds the order's existing
/// shipment and resumes instead of creating a duplicate.
pub struct RepositoryShippingClient<R> {
    shipments: ShippingService<R>,
}

impl<R: ShipmentRepository> RepositoryShippingClient<R> {
    /// Creates a client over the given shipping service.
    pub fn new(shipments: ShippingService<R>) -> Self {
        Self { shipments }
    }
}

#[async_trait]
impl<R: ShipmentRepository> ShippingClient for RepositoryShippingClient<R> {
    async fn dispatch(&self, order_id: OrderId) -> Result<TrackingNumber> {
        let shipment = match self.shipments.get_by_order(order_id).await? {
            Some(shipment) => shipment,
            None => self.shipments.create_shipment(order_id, None).await?,
        };

        let shipment = if shipment.status == ShipmentStatus::Pending {
            self.shipments
                .advance(
                    shipment.id,
                    ShipmentStatus::Processing,
                    None,
                    Some("picked for fulfillment".to_string()),
                )
                .await?
        } else {
            shipment
        };

        if shipment.status.is_terminal() {
            return Err(FulfillmentError::DispatchFailed(format!(
                "shipment {} is {}",
                shipment.id, shipment.status
            )));
        }
        Ok(shipment.tracking_number)
    }

    async fn cancel(&self, tracking: &TrackingNumber) -> Result<()> {
        let shipment = self.shipments.get_by_tracking(tracking).await?;
        if shipment.status == ShipmentStatus::Cancelled {
            return Ok(());
        }
        self.shipments
            .cancel(shipment.id, Some("fulfillment compensation".to_string()))
            .await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryShippingState {
    shipments: HashMap<TrackingNumber, OrderId>,
    cancelled: Vec<TrackingNumber>,
    next_id: u32,
    fail_on_dispatch: bool,
}

/// In-memory shipping client for saga tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingClient {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingClient {
    /// Creates a new in-memory shipping client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the client to fail the next dispatch call.
    pub fn set_fail_on_dispatch(&self, fail: bool) {
        self.state.write().unwrap().fail_on_dispatch = fail;
    }

    /// Returns the number of active (not cancelled) shipments.
    pub fn shipment_count(&self) -> usize {
        self.state.read().unwrap().shipments.len()
    }

    /// Returns true if the shipment has been cancelled.
    pub fn is_cancelled(&self, tracking: &TrackingNumber) -> bool {
        self.state.read().unwrap().cancelled.contains(tracking)
    }
}

#[async_trait]
impl ShippingClient for InMemoryShippingClient {
    async fn dispatch(&self, order_id: OrderId) -> Result<TrackingNumber> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_dispatch {
            return Err(FulfillmentError::DispatchFailed(
                "carrier unavailable".to_string(),
            ));
        }

        state.next_id += 1;
        let tracking = TrackingNumber::new(format!("TRK-{:04}", state.next_id));
        state.shipments.insert(tracking.clone(), order_id);
        Ok(tracking)
    }

    async fn cancel(&self, tracking: &TrackingNumber) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.shipments.remove(tracking);
        if !state.cancelled.contains(tracking) {
            state.cancelled.push(tracking.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipping::InMemoryShipmentRepository;

    #[tokio::test]
    async fn repository_client_creates_and_advances_shipment() {
        let repo = InMemoryShipmentRepository::new();
        let service = ShippingService::new(repo.clone());
        let client = RepositoryShippingClient::new(ShippingService::new(repo));

        let order_id = OrderId::new();
        let tracking = client.dispatch(order_id).await.unwrap();

        let shipment = service.get_by_tracking(&tracking).await.unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Processing);
        assert_eq!(shipment.order_id, order_id);
    }

    #[tokio::test]
    async fn repository_client_dispatch_is_replay_tolerant() {
        let repo = InMemoryShipmentRepository::new();
        let client = RepositoryShippingClient::new(ShippingService::new(repo));

        let order_id = OrderId::new();
        let first = client.dispatch(order_id).await.unwrap();
        let second = client.dispatch(order_id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn repository_client_cancel_tolerates_replay() {
        let repo = InMemoryShipmentRepository::new();
        let service = ShippingService::new(repo.clone());
        let client = RepositoryShippingClient::new(ShippingService::new(repo));

        let tracking = client.dispatch(OrderId::new()).await.unwrap();
        client.cancel(&tracking).await.unwrap();
        client.cancel(&tracking).await.unwrap();

        let shipment = service.get_by_tracking(&tracking).await.unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn in_memory_client_fail_toggle() {
        let client = InMemoryShippingClient::new();
        client.set_fail_on_dispatch(true);

        let result = client.dispatch(OrderId::new()).await;
        assert!(matches!(result, Err(FulfillmentError::DispatchFailed(_))));
        assert_eq!(client.shipment_count(), 0);
    }
}
