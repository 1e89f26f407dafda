//! Lock-step owner of the per-pair indices and the global index.
//!
//! Every mutation goes through [`OrderStore`] so an order is either in its
//! pair index and the global index, or in neither.

use std::collections::BTreeMap;

use spotbook_types::{MarketError, Order, OrderId, Result, TradingPair};

use crate::global_index::GlobalOrderIndex;
use crate::pair_index::PairOrderIndex;

#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    pairs: BTreeMap<TradingPair, PairOrderIndex>,
    global: GlobalOrderIndex,
}

impl OrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The index of `pair`, if it has ever held an order.
    #[must_use]
    pub fn pair_index(&self, pair: &TradingPair) -> Option<&PairOrderIndex> {
        self.pairs.get(pair)
    }

    /// Open the index bound to `pair`, creating it on first use.
    pub fn pair_index_mut(&mut self, pair: &TradingPair) -> &mut PairOrderIndex {
        self.pairs
            .entry(pair.clone())
            .or_insert_with(|| PairOrderIndex::new(pair.clone()))
    }

    #[must_use]
    pub fn global(&self) -> &GlobalOrderIndex {
        &self.global
    }

    /// Pairs that currently have an index, ascending.
    pub fn pairs(&self) -> impl Iterator<Item = &TradingPair> {
        self.pairs.keys()
    }

    /// Every pair index, by ascending pair.
    pub fn indices(&self) -> impl Iterator<Item = &PairOrderIndex> {
        self.pairs.values()
    }

    /// Insert into the pair index, then the global index. A global failure
    /// rolls the pair insert back.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if self.global.contains(&order.id) {
            return Err(MarketError::DuplicateOrder(order.id));
        }
        let pair = order.trading_pair.clone();
        let id = order.id.clone();
        self.pair_index_mut(&pair).add(order.clone())?;
        if let Err(err) = self.global.add(order) {
            self.pair_index_mut(&pair).remove(&id)?;
            return Err(err);
        }
        Ok(())
    }

    /// Remove an order from both indices.
    pub fn remove(&mut self, order_id: &OrderId) -> Result<Order> {
        let pair = self
            .global
            .query_order(order_id)
            .map(|o| o.trading_pair.clone())
            .ok_or_else(|| MarketError::OrderNotFound(order_id.clone()))?;

        let index = self.pairs.get_mut(&pair).ok_or_else(|| {
            MarketError::invariant(format!("order {order_id} has no index for {pair}"))
        })?;
        let removed = index.remove(order_id).map_err(|err| match err {
            MarketError::OrderNotFound(id) => {
                MarketError::invariant(format!("order {id} is global only"))
            }
            other => other,
        })?;
        let global = self.global.remove(order_id)?;
        if global != removed {
            return Err(MarketError::invariant(format!(
                "order {order_id} differs between pair and global index"
            )));
        }
        Ok(removed)
    }

    /// Overwrite an order's fill state in both indices.
    pub fn replace(&mut self, order: Order) -> Result<()> {
        let index = self.pairs.get_mut(&order.trading_pair).ok_or_else(|| {
            MarketError::OrderNotFound(order.id.clone())
        })?;
        index.replace(order.clone())?;
        self.global.replace(order)
    }

    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.global.query_order(order_id)
    }

    /// Drop the index of `pair`. It must be empty.
    pub fn remove_pair(&mut self, pair: &TradingPair) -> Result<()> {
        match self.pairs.get(pair) {
            Some(index) if !index.is_empty() => Err(MarketError::invariant(format!(
                "index of {pair} still holds {} orders",
                index.len()
            ))),
            _ => {
                self.pairs.remove(pair);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.global.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    /// Check every index and that the pair indices and the global index
    /// hold the same orders.
    pub fn verify(&self) -> Result<()> {
        self.global.verify()?;
        let mut total = 0;
        for index in self.pairs.values() {
            index.verify()?;
            total += index.len();
            for order in index.iter() {
                if self.global.query_order(&order.id) != Some(order) {
                    return Err(MarketError::invariant(format!(
                        "order {} differs between pair and global index",
                        order.id
                    )));
                }
            }
        }
        if total != self.global.len() {
            return Err(MarketError::invariant(format!(
                "{total} orders in pair indices, {} in the global index",
                self.global.len()
            )));
        }
        Ok(())
    }
}
