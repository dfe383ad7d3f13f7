//! Payment leg: trait, state-machine-backed client, and in-memory fake.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId};
use payment::{PaymentId, PaymentRepository, PaymentService, PaymentStatus};

use crate::error::{FulfillmentError, Result};

/// Contract for the payment leg of the saga.
///
/// `refund` is the compensating counterpart of `capture` and must
/// tolerate replay.
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Captures payment for the order; returns the payment ID on success.
    async fn capture(&self, order_id: OrderId, amount: Money) -> Result<PaymentId>;

    /// Compensating refund of the full captured amount.
    async fn refund(&self, payment_id: PaymentId) -> Result<()>;
}

/// Payment leg driving the real payment state machine over its repository.
///
/// Capture is replay-tolerant: a retried saga finds the order's existing
/// payment and resumes its lifecycle instead of creating a duplicate.
pub struct RepositoryPaymentClient<R> {
    payments: PaymentService<R>,
}

impl<R: PaymentRepository> RepositoryPaymentClient<R> {
    /// Creates a client over the given payment service.
    pub fn new(payments: PaymentService<R>) -> Self {
        Self { payments }
    }
}

#[async_trait]
impl<R: PaymentRepository> PaymentClient for RepositoryPaymentClient<R> {
    async fn capture(&self, order_id: OrderId, amount: Money) -> Result<PaymentId> {
        let payment = match self.payments.get_by_order(order_id).await? {
            Some(payment) => payment,
            None => self.payments.create(order_id, amount).await?,
        };

        let payment = if payment.status == PaymentStatus::Pending {
            self.payments.authorize(payment.id).await?
        } else {
            payment
        };
        let payment = if payment.status == PaymentStatus::Authorized {
            self.payments.capture(payment.id).await?
        } else {
            payment
        };

        if payment.status == PaymentStatus::Captured {
            Ok(payment.id)
        } else {
            Err(FulfillmentError::CaptureDeclined(format!(
                "payment {} is {}",
                payment.id, payment.status
            )))
        }
    }

    async fn refund(&self, payment_id: PaymentId) -> Result<()> {
        self.payments
            .refund_in_full(payment_id, "fulfillment compensation")
            .await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    captures: HashMap<PaymentId, (OrderId, Money)>,
    refunded: Vec<PaymentId>,
    fail_on_capture: bool,
}

/// In-memory payment client for saga tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentClient {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentClient {
    /// Creates a new in-memory payment client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the client to decline the next capture call.
    pub fn set_fail_on_capture(&self, fail: bool) {
        self.state.write().unwrap().fail_on_capture = fail;
    }

    /// Returns the number of captured, unrefunded payments.
    pub fn captured_count(&self) -> usize {
        self.state.read().unwrap().captures.len()
    }

    /// Returns true if the payment has been refunded.
    pub fn is_refunded(&self, payment_id: PaymentId) -> bool {
        self.state.read().unwrap().refunded.contains(&payment_id)
    }
}

#[async_trait]
impl PaymentClient for InMemoryPaymentClient {
    async fn capture(&self, order_id: OrderId, amount: Money) -> Result<PaymentId> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_capture {
            return Err(FulfillmentError::CaptureDeclined(
                "payment declined".to_string(),
            ));
        }

        let payment_id = PaymentId::new();
        state.captures.insert(payment_id, (order_id, amount));
        Ok(payment_id)
    }

    async fn refund(&self, payment_id: PaymentId) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.captures.remove(&payment_id);
        if !state.refunded.contains(&payment_id) {
            state.refunded.push(payment_id);
        }
        Ok(())
    }
}
