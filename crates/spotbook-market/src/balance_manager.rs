//! In-memory collateral ledger.
//!
//! Tracks per-(account, denom) balances with available/frozen accounting
//! and implements [`CollateralKeeper`] for embedders without a host chain.
//! All mutations are atomic: either the full operation succeeds or the
//! balances are unchanged.

use std::collections::BTreeMap;

use spotbook_types::{Address, Amount, BalanceEntry, Coin, MarketError, Result};

use crate::keepers::CollateralKeeper;

/// Manages account balances with available/frozen accounting.
#[derive(Debug, Clone, Default)]
pub struct BalanceManager {
    balances: BTreeMap<(Address, String), BalanceEntry>,
    /// Fees charged so far, per denom.
    collected_fees: BTreeMap<String, Amount>,
}

fn overflow(what: &str, coin: &Coin) -> MarketError {
    MarketError::AmountOverflow {
        reason: format!("{what} {coin}"),
    }
}

impl BalanceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposit funds (increases available balance).
    pub fn deposit(&mut self, owner: &Address, coin: &Coin) -> Result<()> {
        let entry = self
            .balances
            .entry((owner.clone(), coin.denom.clone()))
            .or_default();
        entry.available = entry
            .available
            .checked_add(coin.amount)
            .ok_or_else(|| overflow("deposit of", coin))?;
        Ok(())
    }

    #[must_use]
    pub fn balance(&self, owner: &Address, denom: &str) -> BalanceEntry {
        self.balances
            .get(&(owner.clone(), denom.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Total supply of a denom held by accounts (available + frozen),
    /// excluding collected fees.
    #[must_use]
    pub fn total_supply(&self, denom: &str) -> Amount {
        self.balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, entry)| entry.total())
            .sum()
    }

    /// Total frozen amount of a denom across all accounts.
    #[must_use]
    pub fn total_frozen(&self, denom: &str) -> Amount {
        self.balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, entry)| entry.frozen)
            .sum()
    }

    #[must_use]
    pub fn collected_fees(&self, denom: &str) -> Amount {
        self.collected_fees.get(denom).copied().unwrap_or_default()
    }

    fn entry_mut(&mut self, owner: &Address, denom: &str) -> Option<&mut BalanceEntry> {
        self.balances.get_mut(&(owner.clone(), denom.to_string()))
    }

    fn check_frozen(&self, owner: &Address, coin: &Coin) -> Result<()> {
        let frozen = self.balance(owner, &coin.denom).frozen;
        if frozen < coin.amount {
            return Err(MarketError::InsufficientFrozen {
                denom: coin.denom.clone(),
                needed: coin.amount,
                frozen,
            });
        }
        Ok(())
    }
}

impl CollateralKeeper for BalanceManager {
    fn freeze(&mut self, owner: &Address, coin: &Coin) -> Result<()> {
        let available = self.balance(owner, &coin.denom).available;
        if available < coin.amount {
            return Err(MarketError::InsufficientBalance {
                denom: coin.denom.clone(),
                needed: coin.amount,
                available,
            });
        }
        if coin.is_zero() {
            return Ok(());
        }
        let entry = self
            .entry_mut(owner, &coin.denom)
            .ok_or_else(|| overflow("freeze of", coin))?;
        let frozen = entry
            .frozen
            .checked_add(coin.amount)
            .ok_or_else(|| overflow("freeze of", coin))?;
        entry.available -= coin.amount;
        entry.frozen = frozen;
        Ok(())
    }

    fn unfreeze(&mut self, owner: &Address, coin: &Coin) -> Result<()> {
        self.check_frozen(owner, coin)?;
        if coin.is_zero() {
            return Ok(());
        }
        let entry = self
            .entry_mut(owner, &coin.denom)
            .ok_or_else(|| overflow("unfreeze of", coin))?;
        let available = entry
            .available
            .checked_add(coin.amount)
            .ok_or_else(|| overflow("unfreeze of", coin))?;
        entry.frozen -= coin.amount;
        entry.available = available;
        Ok(())
    }

    fn settle(&mut self, from: &Address, to: &Address, coin: &Coin) -> Result<()> {
        self.check_frozen(from, coin)?;
        if coin.is_zero() {
            return Ok(());
        }
        let credited = self
            .balance(to, &coin.denom)
            .available
            .checked_add(coin.amount)
            .ok_or_else(|| overflow("settlement of", coin))?;
        if let Some(entry) = self.entry_mut(from, &coin.denom) {
            entry.frozen -= coin.amount;
        }
        self.balances
            .entry((to.clone(), coin.denom.clone()))
            .or_default()
            .available = credited;
        Ok(())
    }

    fn charge_fee(&mut self, payer: &Address, coin: &Coin) -> Result<()> {
        let available = self.balance(payer, &coin.denom).available;
        if available < coin.amount {
            return Err(MarketError::InsufficientBalance {
                denom: coin.denom.clone(),
                needed: coin.amount,
                available,
            });
        }
        if coin.is_zero() {
            return Ok(());
        }
        let pool = self.collected_fees.entry(coin.denom.clone()).or_default();
        *pool = pool
            .checked_add(coin.amount)
            .ok_or_else(|| overflow("fee of", coin))?;
        if let Some(entry) = self.entry_mut(payer, &coin.denom) {
            entry.available -= coin.amount;
        }
        Ok(())
    }
}
