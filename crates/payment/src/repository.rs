//! Payment repository contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use tokio::sync::RwLock;

use crate::error::{PaymentError, Result};
use crate::model::{Payment, PaymentId, Refund, RefundId};
use crate::status::{PaymentStatus, RefundStatus};

/// Storage contract for payments and refunds.
///
/// Payments live in their own service with their own database; this trait
/// is the repository-level boundary other components talk through.
/// `update_status` must be a single atomic write guarded by the payment's
/// version so a stale writer can never clobber a newer status.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserts a new payment. Fails if the order already has one.
    async fn insert(&self, payment: Payment) -> Result<()>;

    /// Reads a payment by ID.
    async fn get(&self, id: PaymentId) -> Result<Option<Payment>>;

    /// Reads the payment for an order.
    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>>;

    /// Atomically writes the new status iff the version matches, bumping
    /// the version. Returns the updated payment.
    async fn update_status(
        &self,
        id: PaymentId,
        next: PaymentStatus,
        expected_version: u64,
    ) -> Result<Payment>;

    /// Inserts a new refund.
    async fn insert_refund(&self, refund: Refund) -> Result<()>;

    /// Reads a refund by ID.
    async fn get_refund(&self, id: RefundId) -> Result<Option<Refund>>;

    /// Refunds raised against a payment, oldest first.
    async fn refunds_for_payment(&self, id: PaymentId) -> Result<Vec<Refund>>;

    /// Updates a refund's status. Returns the updated refund.
    async fn update_refund_status(&self, id: RefundId, next: RefundStatus) -> Result<Refund>;
}

#[derive(Default)]
struct Inner {
    payments: HashMap<PaymentId, Payment>,
    by_order: HashMap<OrderId, PaymentId>,
    refunds: Vec<Refund>,
}

/// In-memory payment repository for testing and single-process wiring.
#[derive(Clone, Default)]
pub struct InMemoryPaymentRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryPaymentRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored payments.
    pub async fn payment_count(&self) -> usize {
        self.inner.read().await.payments.len()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.by_order.contains_key(&payment.order_id) {
            return Err(PaymentError::DuplicatePayment(payment.order_id));
        }
        inner.by_order.insert(payment.order_id, payment.id);
        inner.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.inner.read().await.payments.get(&id).cloned())
    }

    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_order
            .get(&order_id)
            .and_then(|id| inner.payments.get(id))
            .cloned())
    }

    async fn update_status(
        &self,
        id: PaymentId,
        next: PaymentStatus,
        expected_version: u64,
    ) -> Result<Payment> {
        let mut inner = self.inner.write().await;
        let payment = inner
            .payments
            .get_mut(&id)
            .ok_or(PaymentError::NotFound(id))?;

        if payment.version != expected_version {
            return Err(PaymentError::VersionConflict {
                id,
                expected: expected_version,
                actual: payment.version,
            });
        }

        payment.status = next;
        payment.version += 1;
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }

    async fn insert_refund(&self, refund: Refund) -> Result<()> {
        self.inner.write().await.refunds.push(refund);
        Ok(())
    }

    async fn get_refund(&self, id: RefundId) -> Result<Option<Refund>> {
        Ok(self
            .inner
            .read()
            .await
            .refunds
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn refunds_for_payment(&self, id: PaymentId) -> Result<Vec<Refund>> {
        Ok(self
            .inner
            .read()
            .await
            .refunds
            .iter()
            .filter(|r| r.payment_id == id)
            .cloned()
            .collect())
    }

    async fn update_refund_status(&self, id: RefundId, next: RefundStatus) -> Result<Refund> {
        let mut inner = self.inner.write().await;
        let refund = inner
            .refunds
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(PaymentError::RefundNotFound(id))?;
        refund.status = next;
        Ok(refund.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    #[tokio::test]
    async fn insert_rejects_second_payment_for_order() {
        let repo = InMemoryPaymentRepository::new();
        let order_id = OrderId::new();

        repo.insert(Payment::new(order_id, Money::from_cents(1000)))
            .await
            .unwrap();
        let duplicate = repo
            .insert(Payment::new(order_id, Money::from_cents(1000)))
            .await;
        assert!(matches!(duplicate, Err(PaymentError::DuplicatePayment(_))));
    }

    #[tokio::test]
    async fn stale_status_write_is_discarded() {
        let repo = InMemoryPaymentRepository::new();
        let payment = Payment::new(OrderId::new(), Money::from_cents(1000));
        let id = payment.id;
        repo.insert(payment).await.unwrap();

        // two writers read version 1; the second commit loses
        let updated = repo
            .update_status(id, PaymentStatus::Authorized, 1)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        let stale = repo.update_status(id, PaymentStatus::Failed, 1).await;
        assert!(matches!(
            stale,
            Err(PaymentError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));

        // the committed status survives
        let current = repo.get(id).await.unwrap().unwrap();
        assert_eq!(current.status, PaymentStatus::Authorized);
    }

    #[tokio::test]
    async fn refunds_tracked_per_payment() {
        let repo = InMemoryPaymentRepository::new();
        let payment = Payment::new(OrderId::new(), Money::from_cents(1000));
        let id = payment.id;
        repo.insert(payment).await.unwrap();

        let refund = Refund::new(id, Money::from_cents(400), "damaged");
        let refund_id = refund.id;
        repo.insert_refund(refund).await.unwrap();

        let completed = repo
            .update_refund_status(refund_id, RefundStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.status, RefundStatus::Completed);

        let refunds = repo.refunds_for_payment(id).await.unwrap();
        assert_eq!(refunds.len(), 1);
    }
}
