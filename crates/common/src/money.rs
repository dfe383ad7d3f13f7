//! Money represented in integer cents.

use serde::{Deserialize, Serialize};

/// Money amount in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a whole dollar value.
    pub fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars * 100,
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Adds another amount, returning `None` on overflow.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }

    /// Subtracts another amount, returning `None` on overflow.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.cents.checked_sub(other.cents).map(Money::from_cents)
    }

    /// Sums amounts, saturating at the numeric bounds.
    pub fn sum(amounts: impl IntoIterator<Item = Money>) -> Money {
        amounts
            .into_iter()
            .fold(Money::zero(), |acc, m| Money {
                cents: acc.cents.saturating_add(m.cents),
            })
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            (self.cents / 100).abs(),
            (self.cents % 100).abs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_dollars_converts_to_cents() {
        assert_eq!(Money::from_dollars(10).cents(), 1000);
    }

    #[test]
    fn checked_add_and_sub() {
        let a = Money::from_cents(500);
        let b = Money::from_cents(300);
        assert_eq!(a.checked_add(b), Some(Money::from_cents(800)));
        assert_eq!(a.checked_sub(b), Some(Money::from_cents(200)));
        assert_eq!(Money::from_cents(i64::MAX).checked_add(a), None);
    }

    #[test]
    fn sum_over_amounts() {
        let total = Money::sum([
            Money::from_cents(100),
            Money::from_cents(250),
            Money::from_cents(50),
        ]);
        assert_eq!(total, Money::from_cents(400));
    }

    #[test]
    fn display_formats_dollars_and_cents() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn serialization_roundtrip() {
        let amount = Money::from_cents(4999);
        let json = serde_json::to_string(&amount).unwrap();
        let deserialized: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(amount, deserialized);
    }
}
