//! External collaborator contracts for the payment and shipping legs.

pub mod payment;
pub mod shipping;

pub use payment::{InMemoryPaymentClient, PaymentClient, RepositoryPaymentClient};
pub use shipping::{InMemoryShippingClient, RepositoryShippingClient, ShippingClient};
