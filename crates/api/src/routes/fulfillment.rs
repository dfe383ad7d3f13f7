//! Fulfillment trigger and order correlation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{Money, OrderId};
use fulfillment::{FulfillmentOutcome, FulfillmentRequest, OrderLine};
use ledger::StockStore;
use serde::{Deserialize, Serialize};
use shipping::TrackingNumber;

use crate::error::ApiError;
use crate::routes::stock::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct FulfillBody {
    pub lines: Vec<LineRequest>,
    pub amount_cents: i64,
}

#[derive(Deserialize)]
pub struct LineRequest {
    pub product: u64,
    pub variant: Option<u64>,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct FulfillResponse {
    pub order_id: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub order_id: String,
    pub amount_cents: i64,
    pub status: &'static str,
    pub version: u64,
}

#[derive(Serialize)]
pub struct ShipmentResponse {
    pub id: String,
    pub order_id: String,
    pub tracking_number: String,
    pub carrier: Option<String>,
    pub status: &'static str,
    pub events: Vec<TrackingEventResponse>,
}

#[derive(Serialize)]
pub struct TrackingEventResponse {
    pub status: &'static str,
    pub location: Option<String>,
    pub description: Option<String>,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

// -- Handlers --

/// POST /orders/:id/fulfill — run the fulfillment saga for an order.
#[tracing::instrument(skip(state, body))]
pub async fn fulfill<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(body): Json<FulfillBody>,
) -> Result<Json<FulfillResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let request = FulfillmentRequest {
        order_id,
        lines: body
            .lines
            .iter()
            .map(|line| OrderLine {
                key: ledger::StockKey {
                    product: common::ProductId::new(line.product),
                    variant: line.variant.map(common::VariantId::new),
                },
                quantity: line.quantity,
            })
            .collect(),
        amount: Money::from_cents(body.amount_cents),
    };

    let outcome = state.coordinator.fulfill(&request).await?;
    let response = match outcome {
        FulfillmentOutcome::Fulfilled {
            payment_id,
            tracking_number,
        } => FulfillResponse {
            order_id: order_id.to_string(),
            outcome: "fulfilled",
            payment_id: Some(payment_id.to_string()),
            tracking_number: Some(tracking_number.to_string()),
            failed_stage: None,
            reason: None,
        },
        FulfillmentOutcome::Rejected { stage, reason } => FulfillResponse {
            order_id: order_id.to_string(),
            outcome: "rejected",
            payment_id: None,
            tracking_number: None,
            failed_stage: Some(stage.as_str()),
            reason: Some(reason),
        },
    };
    Ok(Json(response))
}

/// GET /orders/:id/payment — the payment correlated with an order.
pub async fn payment<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let payment = state
        .payments
        .get_by_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no payment for order {order_id}")))?;

    Ok(Json(PaymentResponse {
        id: payment.id.to_string(),
        order_id: payment.order_id.to_string(),
        amount_cents: payment.amount.cents(),
        status: payment.status.as_str(),
        version: payment.version,
    }))
}

/// GET /orders/:id/shipment — the shipment correlated with an order.
pub async fn shipment_by_order<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let shipment = state
        .shipments
        .get_by_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no shipment for order {order_id}")))?;
    shipment_response(&state, shipment).await
}

/// GET /shipments/:tracking — shipment and its tracking history.
pub async fn shipment_by_tracking<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(tracking): Path<String>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let shipment = state
        .shipments
        .get_by_tracking(&TrackingNumber::new(tracking))
        .await?;
    shipment_response(&state, shipment).await
}

async fn shipment_response<S: StockStore>(
    state: &AppState<S>,
    shipment: shipping::Shipment,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let events = state.shipments.events(shipment.id).await?;
    Ok(Json(ShipmentResponse {
        id: shipment.id.to_string(),
        order_id: shipment.order_id.to_string(),
        tracking_number: shipment.tracking_number.to_string(),
        carrier: shipment.carrier,
        status: shipment.status.as_str(),
        events: events
            .into_iter()
            .map(|e| TrackingEventResponse {
                status: e.status.as_str(),
                location: e.location,
                description: e.description,
                recorded_at: e.recorded_at,
            })
            .collect(),
    }))
}
