//! Matching candidates and execution price selection.

use rust_decimal::{Decimal, RoundingStrategy};
use spotbook_types::Order;

/// Snapshot of the crossing top-of-book levels of one pair.
///
/// `bids` holds every order at the best bid price and `asks` every order at
/// the best ask price, each in price-time priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
}

impl CandidateSet {
    /// `true` unless both sides have at least one order.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() || self.asks.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    #[must_use]
    pub fn bid_price(&self) -> Option<Decimal> {
        self.bids.first().map(|o| o.price)
    }

    #[must_use]
    pub fn ask_price(&self) -> Option<Decimal> {
        self.asks.first().map(|o| o.price)
    }

    /// All candidates, bids first.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.bids.iter().chain(self.asks.iter())
    }

    /// The price every fill of this round executes at.
    ///
    /// The last executed price when it falls inside `[ask, bid]`, else the
    /// nearer bound. Before the first fill of a pair (`last` is zero) it is
    /// the midpoint, rounded to `precision` and kept inside the band.
    #[must_use]
    pub fn execution_price(&self, last: Decimal, precision: u32) -> Option<Decimal> {
        let bid = self.bid_price()?;
        let ask = self.ask_price()?;
        if self.is_empty() || bid < ask {
            return None;
        }

        let price = if last > Decimal::ZERO {
            last
        } else {
            ((bid + ask) / Decimal::TWO)
                .round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven)
        };
        Some(price.clamp(ask, bid))
    }
}
