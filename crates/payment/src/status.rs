//! Payment and refund state machines.

use serde::{Deserialize, Serialize};

/// The state of a payment in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Authorized ──► Captured ──┬──► Refunded
///    │            │                     └──► PartiallyRefunded ──► Refunded
///    └────────────┴──► Failed
/// ```
///
/// Transitions are monotonic forward except the refund paths. Everything
/// else is an invalid transition and is rejected, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment created, nothing charged yet.
    #[default]
    Pending,

    /// Funds held by the gateway, not yet captured.
    Authorized,

    /// Funds captured; the payment can now be refunded.
    Captured,

    /// Charge was declined or abandoned (terminal state).
    Failed,

    /// Captured amount fully returned (terminal state).
    Refunded,

    /// Part of the captured amount returned; more refunds may follow.
    PartiallyRefunded,
}

impl PaymentStatus {
    /// Returns true if the state machine allows moving to `next`.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Authorized)
                | (Pending, Failed)
                | (Authorized, Captured)
                | (Authorized, Failed)
                | (Captured, Refunded)
                | (Captured, PartiallyRefunded)
                | (PartiallyRefunded, PartiallyRefunded)
                | (PartiallyRefunded, Refunded)
        )
    }

    /// Returns true if refunds can be raised against this payment.
    pub fn can_refund(self) -> bool {
        matches!(
            self,
            PaymentStatus::Captured | PaymentStatus::PartiallyRefunded
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Refunded)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Captured => "captured",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The state of a single refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// Refund raised, awaiting gateway confirmation.
    #[default]
    Pending,

    /// Refund settled; counts against the captured amount.
    Completed,

    /// Gateway rejected the refund.
    Failed,
}

impl RefundStatus {
    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Completed => "completed",
            RefundStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentStatus::*;

    #[test]
    fn default_state_is_pending() {
        assert_eq!(PaymentStatus::default(), Pending);
    }

    #[test]
    fn forward_chain_is_allowed() {
        assert!(Pending.can_transition_to(Authorized));
        assert!(Authorized.can_transition_to(Captured));
        assert!(Captured.can_transition_to(Refunded));
        assert!(Captured.can_transition_to(PartiallyRefunded));
        assert!(PartiallyRefunded.can_transition_to(Refunded));
    }

    #[test]
    fn failure_only_before_capture() {
        assert!(Pending.can_transition_to(Failed));
        assert!(Authorized.can_transition_to(Failed));
        assert!(!Captured.can_transition_to(Failed));
        assert!(!Refunded.can_transition_to(Failed));
    }

    #[test]
    fn no_resurrection_from_terminal_states() {
        for next in [Pending, Authorized, Captured, PartiallyRefunded] {
            assert!(!Failed.can_transition_to(next));
            assert!(!Refunded.can_transition_to(next));
        }
    }

    #[test]
    fn no_skipping_authorization() {
        assert!(!Pending.can_transition_to(Captured));
        assert!(!Pending.can_transition_to(Refunded));
    }

    #[test]
    fn refund_eligibility() {
        assert!(Captured.can_refund());
        assert!(PartiallyRefunded.can_refund());
        assert!(!Pending.can_refund());
        assert!(!Authorized.can_refund());
        assert!(!Failed.can_refund());
        assert!(!Refunded.can_refund());
    }

    #[test]
    fn terminal_states() {
        assert!(Failed.is_terminal());
        assert!(Refunded.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!PartiallyRefunded.is_terminal());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&PartiallyRefunded).unwrap();
        assert_eq!(json, "\"partially_refunded\"");
    }
}
