//! All resting orders of one trading pair.
//!
//! Orders live in an insertion log keyed by a per-pair sequence number that
//! only ever grows. Three explicit index sets point into the log:
//!
//! - **Bids**: `(Reverse(price), height, seq)` -- highest price first
//! - **Asks**: `(price, height, seq)` -- lowest price first
//! - **Heights**: `(height, seq)` -- oldest first, for expiry sweeps
//! - **Owners**: `(owner, seq)` -- per-account listing
//!
//! Every collection is a `BTreeMap`/`BTreeSet`, so every iteration order is
//! a total order that is identical on all nodes.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use spotbook_types::{Address, MarketError, Order, OrderId, Result, Side, TradingPair};

use crate::candidates::CandidateSet;

/// Position of an order in the insertion log.
pub type Seq = u64;

/// The order index for a single trading pair.
#[derive(Debug, Clone)]
pub struct PairOrderIndex {
    pair: TradingPair,
    next_seq: Seq,
    /// Insertion log: the single owner of every resting order.
    log: BTreeMap<Seq, Order>,
    ids: BTreeMap<OrderId, Seq>,
    bids: BTreeSet<(Reverse<Decimal>, i64, Seq)>,
    asks: BTreeSet<(Decimal, i64, Seq)>,
    heights: BTreeSet<(i64, Seq)>,
    owners: BTreeSet<(Address, Seq)>,
}

impl PairOrderIndex {
    /// Create an empty index bound to `pair`.
    #[must_use]
    pub fn new(pair: TradingPair) -> Self {
        Self {
            pair,
            next_seq: 0,
            log: BTreeMap::new(),
            ids: BTreeMap::new(),
            bids: BTreeSet::new(),
            asks: BTreeSet::new(),
            heights: BTreeSet::new(),
            owners: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn pair(&self) -> &TradingPair {
        &self.pair
    }

    // =================================================================
    // Mutation
    // =================================================================

    /// Insert an order under all access paths.
    pub fn add(&mut self, order: Order) -> Result<()> {
        if order.trading_pair != self.pair {
            return Err(MarketError::invariant(format!(
                "order {} of {} added to index of {}",
                order.id, order.trading_pair, self.pair
            )));
        }
        if self.ids.contains_key(&order.id) {
            return Err(MarketError::DuplicateOrder(order.id));
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        self.ids.insert(order.id.clone(), seq);
        match order.side {
            Side::Buy => {
                self.bids.insert((Reverse(order.price), order.height, seq));
            }
            Side::Sell => {
                self.asks.insert((order.price, order.height, seq));
            }
        }
        self.heights.insert((order.height, seq));
        self.owners.insert((order.sender().clone(), seq));

        tracing::debug!(pair = %self.pair, order = %order.id, seq, "Order indexed");
        self.log.insert(seq, order);
        Ok(())
    }

    /// Remove an order from all access paths and return it.
    ///
    /// An id that is unknown is `OrderNotFound`. An id that is known but
    /// missing from any access path is an invariant violation, and nothing
    /// is removed.
    pub fn remove(&mut self, order_id: &OrderId) -> Result<Order> {
        let seq = *self
            .ids
            .get(order_id)
            .ok_or_else(|| MarketError::OrderNotFound(order_id.clone()))?;
        let order = self.log.get(&seq).ok_or_else(|| {
            MarketError::invariant(format!("order {order_id} has no log entry"))
        })?;

        let priority_present = match order.side {
            Side::Buy => self.bids.contains(&(Reverse(order.price), order.height, seq)),
            Side::Sell => self.asks.contains(&(order.price, order.height, seq)),
        };
        let height_key = (order.height, seq);
        let owner_key = (order.sender().clone(), seq);
        if !priority_present || !self.heights.contains(&height_key) || !self.owners.contains(&owner_key)
        {
            tracing::error!(pair = %self.pair, order = %order_id, "Order missing from an access path");
            return Err(MarketError::invariant(format!(
                "order {order_id} is not present in every access path of {}",
                self.pair
            )));
        }

        match order.side {
            Side::Buy => self.bids.remove(&(Reverse(order.price), order.height, seq)),
            Side::Sell => self.asks.remove(&(order.price, order.height, seq)),
        };
        self.heights.remove(&height_key);
        self.owners.remove(&owner_key);
        self.ids.remove(order_id);
        let order = self.log.remove(&seq).ok_or_else(|| {
            MarketError::invariant(format!("order {order_id} vanished from the log"))
        })?;

        tracing::debug!(pair = %self.pair, order = %order_id, seq, "Order unindexed");
        Ok(order)
    }

    /// Overwrite a resting order after a fill.
    ///
    /// Fields that key an access path (side, price, height, owner) must be
    /// unchanged.
    pub fn replace(&mut self, order: Order) -> Result<()> {
        let seq = *self
            .ids
            .get(&order.id)
            .ok_or_else(|| MarketError::OrderNotFound(order.id.clone()))?;
        let slot = self.log.get_mut(&seq).ok_or_else(|| {
            MarketError::invariant(format!("order {} has no log entry", order.id))
        })?;
        if slot.side != order.side || slot.price != order.price || slot.height != order.height {
            return Err(MarketError::invariant(format!(
                "replacement of order {} changes its index keys",
                order.id
            )));
        }
        *slot = order;
        Ok(())
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.ids.get(order_id).and_then(|seq| self.log.get(seq))
    }

    #[must_use]
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.ids.contains_key(order_id)
    }

    /// Orders created strictly before `height`, oldest first, ties in
    /// insertion order.
    #[must_use]
    pub fn get_older_than(&self, height: i64) -> Vec<&Order> {
        self.heights
            .range(..(height, 0))
            .filter_map(|(_, seq)| self.log.get(seq))
            .collect()
    }

    /// Orders created at exactly `height`, in insertion order.
    #[must_use]
    pub fn get_orders_at_height(&self, height: i64) -> Vec<&Order> {
        self.heights
            .range((height, 0)..=(height, Seq::MAX))
            .filter_map(|(_, seq)| self.log.get(seq))
            .collect()
    }

    /// Orders owned by `owner`, in insertion order.
    #[must_use]
    pub fn orders_of(&self, owner: &Address) -> Vec<&Order> {
        self.owners
            .range((owner.clone(), 0)..=(owner.clone(), Seq::MAX))
            .filter_map(|(_, seq)| self.log.get(seq))
            .collect()
    }

    /// Best (highest) bid price, or `None` if no bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|(Reverse(price), _, _)| *price)
    }

    /// Best (lowest) ask price, or `None` if no asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|(price, _, _)| *price)
    }

    /// Every order at the best bid level and at the best ask level, when
    /// those levels cross. Each side comes in price-time priority: lower
    /// creation height first, then lower insertion sequence.
    ///
    /// Empty when a side is empty or best bid < best ask.
    #[must_use]
    pub fn get_matching_candidates(&self) -> CandidateSet {
        let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) else {
            return CandidateSet::default();
        };
        if bid < ask {
            return CandidateSet::default();
        }

        let bids = self
            .bids
            .iter()
            .take_while(|(Reverse(price), _, _)| *price == bid)
            .filter_map(|(_, _, seq)| self.log.get(seq))
            .cloned()
            .collect();
        let asks = self
            .asks
            .iter()
            .take_while(|(price, _, _)| *price == ask)
            .filter_map(|(_, _, seq)| self.log.get(seq))
            .cloned()
            .collect();
        CandidateSet { bids, asks }
    }

    /// All orders in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.log.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.log.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Number of distinct bid orders / ask orders.
    #[must_use]
    pub fn side_counts(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    // =================================================================
    // Verification
    // =================================================================

    /// Check that every access path indexes exactly the orders in the log.
    pub fn verify(&self) -> Result<()> {
        let n = self.log.len();
        if self.ids.len() != n
            || self.bids.len() + self.asks.len() != n
            || self.heights.len() != n
            || self.owners.len() != n
        {
            return Err(MarketError::invariant(format!(
                "index sizes of {} diverge from {n} logged orders",
                self.pair
            )));
        }
        for (seq, order) in &self.log {
            let keyed = match order.side {
                Side::Buy => self.bids.contains(&(Reverse(order.price), order.height, *seq)),
                Side::Sell => self.asks.contains(&(order.price, order.height, *seq)),
            };
            if !keyed
                || self.ids.get(&order.id) != Some(seq)
                || !self.heights.contains(&(order.height, *seq))
                || !self.owners.contains(&(order.sender().clone(), *seq))
            {
                return Err(MarketError::invariant(format!(
                    "order {} is not fully indexed in {}",
                    order.id, self.pair
                )));
            }
        }
        Ok(())
    }
}
