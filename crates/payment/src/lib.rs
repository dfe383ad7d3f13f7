//! Payment lifecycle for the fulfillment core.
//!
//! Payments move through a forward-monotonic state machine
//! (pending → authorized → captured → refund paths) guarded by an
//! optimistic version check at the repository, so a stale status write can
//! never clobber a committed one. Refunds are tracked per payment and the
//! sum of completed refunds never exceeds the captured amount.

pub mod error;
pub mod model;
pub mod repository;
pub mod service;
pub mod status;

pub use error::{PaymentError, Result};
pub use model::{Payment, PaymentId, Refund, RefundId};
pub use repository::{InMemoryPaymentRepository, PaymentRepository};
pub use service::PaymentService;
pub use status::{PaymentStatus, RefundStatus};
