//! Payment service enforcing the state machine and refund invariants.

use common::{Money, OrderId};

use crate::error::{PaymentError, Result};
use crate::model::{Payment, PaymentId, Refund, RefundId};
use crate::repository::PaymentRepository;
use crate::status::{PaymentStatus, RefundStatus};

/// Drives payments through their lifecycle over a [`PaymentRepository`].
///
/// Transition checks happen here; the repository's version guard closes
/// the read-check-write race, so a stale writer gets `VersionConflict`
/// instead of clobbering a newer status.
pub struct PaymentService<R> {
    repo: R,
}

impl<R: PaymentRepository> PaymentService<R> {
    /// Creates a service over the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a pending payment for an order. One payment per order.
    #[tracing::instrument(skip(self), fields(%order_id, %amount))]
    pub async fn create(&self, order_id: OrderId, amount: Money) -> Result<Payment> {
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount(amount));
        }
        if self.repo.get_by_order(order_id).await?.is_some() {
            return Err(PaymentError::DuplicatePayment(order_id));
        }

        let payment = Payment::new(order_id, amount);
        self.repo.insert(payment.clone()).await?;
        tracing::info!(payment_id = %payment.id, "payment created");
        Ok(payment)
    }

    /// Reads a payment by ID.
    pub async fn get(&self, id: PaymentId) -> Result<Payment> {
        self.repo.get(id).await?.ok_or(PaymentError::NotFound(id))
    }

    /// Reads the payment for an order, if any.
    pub async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>> {
        self.repo.get_by_order(order_id).await
    }

    /// Advances the payment to `next`, enforcing the state machine.
    #[tracing::instrument(skip(self), fields(%id, %next))]
    pub async fn update_status(&self, id: PaymentId, next: PaymentStatus) -> Result<Payment> {
        let payment = self.get(id).await?;
        if !payment.status.can_transition_to(next) {
            return Err(PaymentError::InvalidStateTransition {
                from: payment.status,
                to: next,
            });
        }
        self.repo.update_status(id, next, payment.version).await
    }

    /// Marks the payment authorized.
    pub async fn authorize(&self, id: PaymentId) -> Result<Payment> {
        self.update_status(id, PaymentStatus::Authorized).await
    }

    /// Marks the payment captured.
    pub async fn capture(&self, id: PaymentId) -> Result<Payment> {
        self.update_status(id, PaymentStatus::Captured).await
    }

    /// Marks the payment failed.
    pub async fn fail(&self, id: PaymentId) -> Result<Payment> {
        self.update_status(id, PaymentStatus::Failed).await
    }

    /// Raises a refund against a captured payment.
    ///
    /// The sum of completed refunds can never exceed the captured amount;
    /// the authoritative check re-runs at completion time.
    #[tracing::instrument(skip(self, reason), fields(%id, %amount))]
    pub async fn refund(
        &self,
        id: PaymentId,
        amount: Money,
        reason: impl Into<String>,
    ) -> Result<Refund> {
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount(amount));
        }

        let payment = self.get(id).await?;
        if !payment.status.can_refund() {
            return Err(PaymentError::InvalidStateTransition {
                from: payment.status,
                to: PaymentStatus::Refunded,
            });
        }

        let remaining = self.remaining_refundable(&payment).await?;
        if amount > remaining {
            return Err(PaymentError::RefundExceedsCapture {
                requested: amount,
                remaining,
                captured: payment.amount,
            });
        }

        let refund = Refund::new(id, amount, reason);
        self.repo.insert_refund(refund.clone()).await?;
        Ok(refund)
    }

    /// Settles a pending refund and projects the payment status.
    ///
    /// A refund that would push the completed total past the captured
    /// amount is marked failed instead.
    #[tracing::instrument(skip(self), fields(%refund_id))]
    pub async fn complete_refund(&self, refund_id: RefundId) -> Result<Refund> {
        let refund = self
            .repo
            .get_refund(refund_id)
            .await?
            .ok_or(PaymentError::RefundNotFound(refund_id))?;
        if refund.status == RefundStatus::Completed {
            return Ok(refund);
        }
        let payment = self.get(refund.payment_id).await?;
        let refunds = self.repo.refunds_for_payment(refund.payment_id).await?;

        let completed = Money::sum(
            refunds
                .iter()
                .filter(|r| r.status == RefundStatus::Completed)
                .map(|r| r.amount),
        );
        let after = completed
            .checked_add(refund.amount)
            .unwrap_or(payment.amount);

        if after > payment.amount {
            self.repo
                .update_refund_status(refund_id, RefundStatus::Failed)
                .await?;
            return Err(PaymentError::RefundExceedsCapture {
                requested: refund.amount,
                remaining: payment.amount.checked_sub(completed).unwrap_or(Money::zero()),
                captured: payment.amount,
            });
        }

        let settled = self
            .repo
            .update_refund_status(refund_id, RefundStatus::Completed)
            .await?;

        let next = if after >= payment.amount {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        self.repo
            .update_status(payment.id, next, payment.version)
            .await?;

        tracing::info!(payment_id = %payment.id, status = %next, "refund completed");
        Ok(settled)
    }

    /// Refunds whatever remains of the captured amount, settling it
    /// immediately.
    ///
    /// Idempotent: a payment that is already fully refunded hands back the
    /// refund that completed it, so replayed compensations are safe.
    #[tracing::instrument(skip(self, reason), fields(%id))]
    pub async fn refund_in_full(
        &self,
        id: PaymentId,
        reason: impl Into<String>,
    ) -> Result<Refund> {
        let payment = self.get(id).await?;

        if payment.status == PaymentStatus::Refunded {
            let refunds = self.repo.refunds_for_payment(id).await?;
            if let Some(prior) = refunds
                .into_iter()
                .rev()
                .find(|r| r.status == RefundStatus::Completed)
            {
                tracing::debug!(%id, "payment already refunded, returning prior refund");
                return Ok(prior);
            }
        }

        let remaining = self.remaining_refundable(&payment).await?;
        let refund = self.refund(id, remaining, reason).await?;
        self.complete_refund(refund.id).await
    }

    /// Refunds raised against a payment, oldest first.
    pub async fn refunds(&self, id: PaymentId) -> Result<Vec<Refund>> {
        self.repo.refunds_for_payment(id).await
    }

    async fn remaining_refundable(&self, payment: &Payment) -> Result<Money> {
        let refunds = self.repo.refunds_for_payment(payment.id).await?;
        let completed = Money::sum(
            refunds
                .iter()
                .filter(|r| r.status == RefundStatus::Completed)
                .map(|r| r.amount),
        );
        Ok(payment
            .amount
            .checked_sub(completed)
            .unwrap_or(Money::zero()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryPaymentRepository;

    fn service() -> PaymentService<InMemoryPaymentRepository> {
        PaymentService::new(InMemoryPaymentRepository::new())
    }

    #[tokio::test]
    async fn lifecycle_pending_to_captured() {
        let service = service();
        let payment = service
            .create(OrderId::new(), Money::from_cents(5000))
            .await
            .unwrap();

        let payment = service.authorize(payment.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Authorized);

        let payment = service.capture(payment.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Captured);
    }

    #[tokio::test]
    async fn failed_payment_cannot_be_captured() {
        let service = service();
        let payment = service
            .create(OrderId::new(), Money::from_cents(5000))
            .await
            .unwrap();
        service.fail(payment.id).await.unwrap();

        let result = service.capture(payment.id).await;
        assert!(matches!(
            result,
            Err(PaymentError::InvalidStateTransition {
                from: PaymentStatus::Failed,
                to: PaymentStatus::Captured,
            })
        ));
    }

    #[tokio::test]
    async fn capture_requires_authorization() {
        let service = service();
        let payment = service
            .create(OrderId::new(), Money::from_cents(5000))
            .await
            .unwrap();

        let result = service.capture(payment.id).await;
        assert!(matches!(
            result,
            Err(PaymentError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn one_payment_per_order() {
        let service = service();
        let order_id = OrderId::new();
        service
            .create(order_id, Money::from_cents(5000))
            .await
            .unwrap();

        let duplicate = service.create(order_id, Money::from_cents(5000)).await;
        assert!(matches!(duplicate, Err(PaymentError::DuplicatePayment(_))));
    }

    #[tokio::test]
    async fn partial_refund_then_full() {
        let service = service();
        let payment = service
            .create(OrderId::new(), Money::from_cents(1000))
            .await
            .unwrap();
        service.authorize(payment.id).await.unwrap();
        service.capture(payment.id).await.unwrap();

        let refund = service
            .refund(payment.id, Money::from_cents(300), "damaged item")
            .await
            .unwrap();
        service.complete_refund(refund.id).await.unwrap();
        assert_eq!(
            service.get(payment.id).await.unwrap().status,
            PaymentStatus::PartiallyRefunded
        );

        let refund = service
            .refund(payment.id, Money::from_cents(700), "order cancelled")
            .await
            .unwrap();
        service.complete_refund(refund.id).await.unwrap();
        assert_eq!(
            service.get(payment.id).await.unwrap().status,
            PaymentStatus::Refunded
        );
    }

    #[tokio::test]
    async fn refund_cannot_exceed_captured_amount() {
        let service = service();
        let payment = service
            .create(OrderId::new(), Money::from_cents(1000))
            .await
            .unwrap();
        service.authorize(payment.id).await.unwrap();
        service.capture(payment.id).await.unwrap();

        let refund = service
            .refund(payment.id, Money::from_cents(800), "damaged")
            .await
            .unwrap();
        service.complete_refund(refund.id).await.unwrap();

        let excessive = service
            .refund(payment.id, Money::from_cents(300), "more damage")
            .await;
        assert!(matches!(
            excessive,
            Err(PaymentError::RefundExceedsCapture { .. })
        ));
    }

    #[tokio::test]
    async fn refund_requires_capture() {
        let service = service();
        let payment = service
            .create(OrderId::new(), Money::from_cents(1000))
            .await
            .unwrap();

        let result = service
            .refund(payment.id, Money::from_cents(100), "early")
            .await;
        assert!(matches!(
            result,
            Err(PaymentError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn refund_in_full_is_idempotent() {
        let service = service();
        let payment = service
            .create(OrderId::new(), Money::from_cents(1000))
            .await
            .unwrap();
        service.authorize(payment.id).await.unwrap();
        service.capture(payment.id).await.unwrap();

        let first = service
            .refund_in_full(payment.id, "compensation")
            .await
            .unwrap();
        let second = service
            .refund_in_full(payment.id, "compensation")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(service.refunds(payment.id).await.unwrap().len(), 1);
        assert_eq!(
            service.get(payment.id).await.unwrap().status,
            PaymentStatus::Refunded
        );
    }

    #[tokio::test]
    async fn refund_in_full_after_partial_refund() {
        let service = service();
        let payment = service
            .create(OrderId::new(), Money::from_cents(1000))
            .await
            .unwrap();
        service.authorize(payment.id).await.unwrap();
        service.capture(payment.id).await.unwrap();

        let partial = service
            .refund(payment.id, Money::from_cents(250), "damaged")
            .await
            .unwrap();
        service.complete_refund(partial.id).await.unwrap();

        let rest = service
            .refund_in_full(payment.id, "cancelled")
            .await
            .unwrap();
        assert_eq!(rest.amount, Money::from_cents(750));
        assert_eq!(
            service.get(payment.id).await.unwrap().status,
            PaymentStatus::Refunded
        );
    }
}
