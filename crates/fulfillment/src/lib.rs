//! Fulfillment saga for the inventory core.
//!
//! Inventory, payments, and shipments each own their own storage; no
//! transaction spans them. The coordinator runs the three legs in order —
//! reserve stock, capture payment, dispatch shipment — and compensates
//! completed legs in reverse order when one fails. Correctness rests on
//! each leg being locally atomic and every compensation being idempotent
//! under the order's reference, so any attempt can be retried safely.

pub mod clients;
pub mod coordinator;
pub mod error;

pub use clients::{
    InMemoryPaymentClient, InMemoryShippingClient, PaymentClient, RepositoryPaymentClient,
    RepositoryShippingClient, ShippingClient,
};
pub use coordinator::{
    FulfillmentCoordinator, FulfillmentOutcome, FulfillmentRequest, FulfillmentStage, OrderLine,
};
pub use error::{FulfillmentError, Result};
