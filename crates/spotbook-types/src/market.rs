//! Trading pair (market) entity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, TradingPair};

/// Lifecycle status of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketStatus {
    /// Accepting orders.
    Active,
    /// Delist requested; removed once block time reaches `effective_time`.
    PendingDelist { effective_time: i64 },
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::PendingDelist { effective_time } => {
                write!(f, "PENDING_DELIST@{effective_time}")
            }
        }
    }
}

/// A listed trading pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub pair: TradingPair,
    pub creator: Address,
    /// Number of decimal places order prices carry.
    pub price_precision: u32,
    /// Price of the most recent fill, zero before the first one.
    pub last_executed_price: Decimal,
    pub status: MarketStatus,
}

impl MarketInfo {
    #[must_use]
    pub fn new(pair: TradingPair, creator: Address, price_precision: u32) -> Self {
        Self {
            pair,
            creator,
            price_precision,
            last_executed_price: Decimal::ZERO,
            status: MarketStatus::Active,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == MarketStatus::Active
    }

    /// Effective delist time, if a delist is pending.
    #[must_use]
    pub fn delist_time(&self) -> Option<i64> {
        match self.status {
            MarketStatus::Active => None,
            MarketStatus::PendingDelist { effective_time } => Some(effective_time),
        }
    }

    #[must_use]
    pub fn stock(&self) -> &str {
        &self.pair.stock
    }

    #[must_use]
    pub fn money(&self) -> &str {
        &self.pair.money
    }
}
