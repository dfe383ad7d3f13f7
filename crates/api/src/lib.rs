//! Operational HTTP surface for the fulfillment inventory core.
//!
//! A deliberately thin wrapper: the ledger engine operations, the
//! fulfillment trigger, and shipment/payment correlation reads, with
//! structured logging (tracing) and Prometheus metrics. No auth, no
//! validation framework, no catalog CRUD — those belong to the
//! surrounding services.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fulfillment::{FulfillmentCoordinator, RepositoryPaymentClient, RepositoryShippingClient};
use ledger::{LedgerEngine, StockStore};
use metrics_exporter_prometheus::PrometheusHandle;
use payment::{InMemoryPaymentRepository, PaymentService};
use shipping::{InMemoryShipmentRepository, ShippingService};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::stock::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: StockStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/stock", get(routes::stock::levels::<S>))
        .route("/stock/low", get(routes::stock::low::<S>))
        .route("/stock/{product}", get(routes::stock::get::<S>))
        .route("/stock/{product}/history", get(routes::stock::history::<S>))
        .route("/stock/receive", post(routes::stock::receive::<S>))
        .route("/stock/reserve", post(routes::stock::reserve::<S>))
        .route("/stock/release", post(routes::stock::release::<S>))
        .route("/stock/adjust", post(routes::stock::adjust::<S>))
        .route("/ledger/recent", get(routes::stock::recent::<S>))
        .route(
            "/orders/{id}/fulfill",
            post(routes::fulfillment::fulfill::<S>),
        )
        .route("/orders/{id}/payment", get(routes::fulfillment::payment::<S>))
        .route(
            "/orders/{id}/shipment",
            get(routes::fulfillment::shipment_by_order::<S>),
        )
        .route(
            "/shipments/{tracking}",
            get(routes::fulfillment::shipment_by_tracking::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over the given stock store,
/// wiring the payment and shipping legs through their in-memory
/// repositories.
pub fn create_default_state<S: StockStore>(store: S) -> Arc<AppState<S>> {
    let ledger = Arc::new(LedgerEngine::new(store));

    let payment_repo = InMemoryPaymentRepository::new();
    let shipment_repo = InMemoryShipmentRepository::new();

    let coordinator = FulfillmentCoordinator::new(
        Arc::clone(&ledger),
        RepositoryPaymentClient::new(PaymentService::new(payment_repo.clone())),
        RepositoryShippingClient::new(ShippingService::new(shipment_repo.clone())),
    );

    Arc::new(AppState {
        ledger,
        coordinator,
        payments: PaymentService::new(payment_repo),
        shipments: ShippingService::new(shipment_repo),
    })
}
