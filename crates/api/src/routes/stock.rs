//! Ledger operation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::{ProductId, ReferenceId, VariantId};
use futures_util::TryStreamExt;
use fulfillment::{FulfillmentCoordinator, RepositoryPaymentClient, RepositoryShippingClient};
use ledger::{LedgerEngine, LedgerEntry, StockKey, StockLevel, StockStore};
use payment::{InMemoryPaymentRepository, PaymentService};
use serde::{Deserialize, Serialize};
use shipping::{InMemoryShipmentRepository, ShippingService};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: StockStore> {
    pub ledger: Arc<LedgerEngine<S>>,
    pub coordinator: FulfillmentCoordinator<
        S,
        RepositoryPaymentClient<InMemoryPaymentRepository>,
        RepositoryShippingClient<InMemoryShipmentRepository>,
    >,
    pub payments: PaymentService<InMemoryPaymentRepository>,
    pub shipments: ShippingService<InMemoryShipmentRepository>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct VariantQuery {
    pub variant: Option<u64>,
}

#[derive(Deserialize)]
pub struct ThresholdQuery {
    pub threshold: i64,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct MutationRequest {
    pub product: u64,
    pub variant: Option<u64>,
    pub quantity: u32,
    pub reference: String,
}

#[derive(Deserialize)]
pub struct AdjustRequest {
    pub product: u64,
    pub variant: Option<u64>,
    pub delta: i64,
    pub reference: String,
    pub reason: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct StockResponse {
    pub product: u64,
    pub variant: Option<u64>,
    pub quantity: i64,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl From<StockLevel> for StockResponse {
    fn from(level: StockLevel) -> Self {
        Self {
            product: level.key.product.as_u64(),
            variant: level.key.variant.map(|v| v.as_u64()),
            quantity: level.quantity,
            version: level.version,
            updated_at: level.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct EntryResponse {
    pub id: String,
    pub reference: String,
    pub product: u64,
    pub variant: Option<u64>,
    pub quantity_change: i64,
    pub balance_after: i64,
    pub kind: &'static str,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl From<LedgerEntry> for EntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            reference: entry.reference.to_string(),
            product: entry.key.product.as_u64(),
            variant: entry.key.variant.map(|v| v.as_u64()),
            quantity_change: entry.quantity_change,
            balance_after: entry.balance_after,
            kind: entry.kind.as_str(),
            note: entry.note,
            recorded_at: entry.recorded_at,
        }
    }
}

fn key_of(product: u64, variant: Option<u64>) -> StockKey {
    StockKey {
        product: ProductId::new(product),
        variant: variant.map(VariantId::new),
    }
}

// -- Handlers --

/// GET /stock — every stock row.
pub async fn levels<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<StockResponse>>, ApiError> {
    let levels = state.ledger.levels().await?;
    Ok(Json(levels.into_iter().map(Into::into).collect()))
}

/// GET /stock/low?threshold=N — rows at or below the threshold, ascending.
pub async fn low<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ThresholdQuery>,
) -> Result<Json<Vec<StockResponse>>, ApiError> {
    let rows: Vec<StockLevel> = state
        .ledger
        .low_stock(query.threshold)
        .await?
        .try_collect()
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// GET /stock/:product — current stock for a product (or one variant).
pub async fn get<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(product): Path<u64>,
    Query(query): Query<VariantQuery>,
) -> Result<Json<StockResponse>, ApiError> {
    let key = key_of(product, query.variant);
    let level = state
        .ledger
        .stock(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no stock recorded for {key}")))?;
    Ok(Json(level.into()))
}

/// GET /stock/:product/history — chronological ledger entries.
pub async fn history<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(product): Path<u64>,
    Query(query): Query<VariantQuery>,
) -> Result<Json<Vec<EntryResponse>>, ApiError> {
    let entries = state
        .ledger
        .history(ProductId::new(product), query.variant.map(VariantId::new))
        .await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// GET /ledger/recent?limit=N — newest entries across all keys.
pub async fn recent<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<EntryResponse>>, ApiError> {
    let entries = state.ledger.recent(query.limit.unwrap_or(50)).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// POST /stock/receive — inbound restock.
#[tracing::instrument(skip(state, req))]
pub async fn receive<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<MutationRequest>,
) -> Result<(axum::http::StatusCode, Json<EntryResponse>), ApiError> {
    let entry = state
        .ledger
        .receive(
            key_of(req.product, req.variant),
            req.quantity,
            ReferenceId::new(req.reference),
        )
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(entry.into())))
}

/// POST /stock/reserve — decrement for a pending order.
#[tracing::instrument(skip(state, req))]
pub async fn reserve<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<MutationRequest>,
) -> Result<(axum::http::StatusCode, Json<EntryResponse>), ApiError> {
    let entry = state
        .ledger
        .reserve(
            key_of(req.product, req.variant),
            req.quantity,
            ReferenceId::new(req.reference),
        )
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(entry.into())))
}

/// POST /stock/release — compensating increment.
#[tracing::instrument(skip(state, req))]
pub async fn release<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<MutationRequest>,
) -> Result<(axum::http::StatusCode, Json<EntryResponse>), ApiError> {
    let entry = state
        .ledger
        .release(
            key_of(req.product, req.variant),
            req.quantity,
            ReferenceId::new(req.reference),
        )
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(entry.into())))
}

/// POST /stock/adjust — manual correction with a reason.
#[tracing::instrument(skip(state, req))]
pub async fn adjust<S: StockStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AdjustRequest>,
) -> Result<(axum::http::StatusCode, Json<EntryResponse>), ApiError> {
    let entry = state
        .ledger
        .adjust(
            key_of(req.product, req.variant),
            req.delta,
            ReferenceId::new(req.reference),
            req.reason,
        )
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(entry.into())))
}
