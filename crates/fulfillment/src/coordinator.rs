//! Saga coordinator for order fulfillment.
//!
//! Drives reserve → capture → dispatch. There is no transaction spanning
//! the three legs; each is locally atomic and every compensating action
//! carries the original order reference, so the whole saga is safe to
//! retry after any failure.

use std::sync::Arc;

use common::{Money, OrderId, ReferenceId};
use ledger::{LedgerEngine, LedgerError, StockKey, StockStore};
use payment::PaymentId;
use serde::{Deserialize, Serialize};
use shipping::TrackingNumber;

use crate::clients::{PaymentClient, ShippingClient};
use crate::error::{FulfillmentError, Result};

/// A single order line to reserve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub key: StockKey,
    pub quantity: u32,
}

/// Everything the coordinator needs to fulfill one order.
///
/// Orders themselves live in a separate service; the coordinator only
/// sees the order's identity, its lines, and the amount to capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentRequest {
    pub order_id: OrderId,
    pub lines: Vec<OrderLine>,
    pub amount: Money,
}

impl FulfillmentRequest {
    /// The correlation reference every ledger entry and compensation for
    /// this order carries. Derived from the order ID so retried sagas
    /// share it.
    pub fn reference(&self) -> ReferenceId {
        ReferenceId::for_order(self.order_id)
    }
}

/// The saga step a rejected fulfillment failed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStage {
    ReserveStock,
    CapturePayment,
    DispatchShipment,
}

impl FulfillmentStage {
    /// Returns the stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStage::ReserveStock => "reserve_stock",
            FulfillmentStage::CapturePayment => "capture_payment",
            FulfillmentStage::DispatchShipment => "dispatch_shipment",
        }
    }
}

impl std::fmt::Display for FulfillmentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a fulfillment attempt.
///
/// Business failures (insufficient stock, declined capture, failed
/// dispatch) come back as `Rejected` with compensations already applied;
/// infrastructure errors surface as `Err` and the caller may retry the
/// whole saga with the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FulfillmentOutcome {
    /// All three legs committed.
    Fulfilled {
        payment_id: PaymentId,
        tracking_number: TrackingNumber,
    },
    /// A leg failed; completed legs were compensated in reverse order.
    Rejected {
        stage: FulfillmentStage,
        reason: String,
    },
}

/// Orchestrates the fulfillment saga over the inventory ledger and the
/// payment/shipping legs.
pub struct FulfillmentCoordinator<S, P, H> {
    ledger: Arc<LedgerEngine<S>>,
    payments: P,
    shipping: H,
}

impl<S, P, H> FulfillmentCoordinator<S, P, H>
where
    S: StockStore,
    P: PaymentClient,
    H: ShippingClient,
{
    /// Creates a new coordinator.
    pub fn new(ledger: Arc<LedgerEngine<S>>, payments: P, shipping: H) -> Self {
        Self {
            ledger,
            payments,
            shipping,
        }
    }

    /// Executes the fulfillment saga for one order.
    ///
    /// Steps: reserve every line, capture payment, dispatch the shipment.
    /// On a failed step the completed ones are compensated in reverse
    /// order — cancel nothing (dispatch never completed), refund the
    /// capture, release the reserved lines — all keyed by the order
    /// reference so replays are no-ops.
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn fulfill(&self, request: &FulfillmentRequest) -> Result<FulfillmentOutcome> {
        if request.lines.is_empty() {
            return Err(FulfillmentError::EmptyOrder);
        }

        metrics::counter!("fulfillment_started_total").increment(1);
        let started = std::time::Instant::now();
        let reference = request.reference();

        // Step 1: reserve every line.
        let mut reserved: Vec<OrderLine> = Vec::new();
        for line in &request.lines {
            if self.already_holds(line, &reference).await? {
                reserved.push(*line);
                continue;
            }
            match self
                .ledger
                .reserve(line.key, line.quantity, reference.clone())
                .await
            {
                Ok(_) => reserved.push(*line),
                Err(e @ LedgerError::InsufficientStock { .. }) => {
                    tracing::warn!(key = %line.key, error = %e, "reservation failed");
                    self.release_lines(&reserved, &reference).await?;
                    return self.rejected(FulfillmentStage::ReserveStock, e.to_string(), started);
                }
                Err(e) => {
                    self.release_lines(&reserved, &reference).await?;
                    return Err(e.into());
                }
            }
        }

        // Step 2: capture payment.
        let payment_id = match self
            .payments
            .capture(request.order_id, request.amount)
            .await
        {
            Ok(payment_id) => payment_id,
            Err(FulfillmentError::CaptureDeclined(reason)) => {
                tracing::warn!(%reason, "payment capture declined");
                self.release_lines(&request.lines, &reference).await?;
                return self.rejected(FulfillmentStage::CapturePayment, reason, started);
            }
            Err(e) => {
                self.release_lines(&request.lines, &reference).await?;
                return Err(e);
            }
        };

        // Step 3: dispatch the shipment.
        let tracking_number = match self.shipping.dispatch(request.order_id).await {
            Ok(tracking) => tracking,
            Err(FulfillmentError::DispatchFailed(reason)) => {
                tracing::warn!(%reason, "shipment dispatch failed");
                self.payments.refund(payment_id).await?;
                self.release_lines(&request.lines, &reference).await?;
                return self.rejected(FulfillmentStage::DispatchShipment, reason, started);
            }
            Err(e) => {
                self.payments.refund(payment_id).await?;
                self.release_lines(&request.lines, &reference).await?;
                return Err(e);
            }
        };

        metrics::counter!("fulfillment_completed_total").increment(1);
        metrics::histogram!("fulfillment_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(%payment_id, tracking = %tracking_number, "order fulfilled");

        Ok(FulfillmentOutcome::Fulfilled {
            payment_id,
            tracking_number,
        })
    }

    /// Releases the given lines under the order reference. Idempotent per
    /// line: the ledger applies each release at most once per reference.
    async fn release_lines(&self, lines: &[OrderLine], reference: &ReferenceId) -> Result<()> {
        for line in lines {
            self.ledger
                .release(line.key, line.quantity, reference.clone())
                .await?;
        }
        Ok(())
    }

    /// Returns true if a prior saga attempt already reserved this line and
    /// has not released it, so a retried saga skips re-reserving.
    async fn already_holds(&self, line: &OrderLine, reference: &ReferenceId) -> Result<bool> {
        let entries = self.ledger.entries_for_reference(reference).await?;
        let outstanding: i64 = entries
            .iter()
            .filter(|e| e.key == line.key)
            .filter(|e| {
                matches!(e.kind, ledger::EntryKind::Reserve | ledger::EntryKind::Release)
            })
            .map(|e| -e.quantity_change)
            .sum();
        Ok(outstanding > 0)
    }

    fn rejected(
        &self,
        stage: FulfillmentStage,
        reason: String,
        started: std::time::Instant,
    ) -> Result<FulfillmentOutcome> {
        metrics::counter!("fulfillment_rejected_total", "stage" => stage.as_str()).increment(1);
        metrics::histogram!("fulfillment_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(FulfillmentOutcome::Rejected { stage, reason })
    }
}
