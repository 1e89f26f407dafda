//! Coin and balance types for collateral accounting.
//!
//! Coin amounts are integral base units of a denom. Every account has an
//! `available` balance (spendable) and a `frozen` balance (locked by
//! resting orders).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integral amount of a denom, in base units.
pub type Amount = u64;

/// An amount of a single denom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Amount,
}

impl Coin {
    #[must_use]
    pub fn new(denom: impl Into<String>, amount: Amount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A single balance entry for an (account, denom) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    /// Spendable by new orders and transfers.
    pub available: Amount,
    /// Locked by resting orders.
    pub frozen: Amount,
}

impl BalanceEntry {
    /// Total balance (available + frozen), saturating.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.available.saturating_add(self.frozen)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available == 0 && self.frozen == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_entry_default_is_zero() {
        let entry = BalanceEntry::default();
        assert!(entry.is_zero());
        assert_eq!(entry.total(), 0);
    }

    #[test]
    fn balance_entry_total() {
        let entry = BalanceEntry {
            available: 100,
            frozen: 50,
        };
        assert_eq!(entry.total(), 150);
        assert!(!entry.is_zero());
    }

    #[test]
    fn coin_display() {
        assert_eq!(Coin::new("usdt", 55).to_string(), "55usdt");
        assert!(Coin::new("usdt", 0).is_zero());
    }
}
