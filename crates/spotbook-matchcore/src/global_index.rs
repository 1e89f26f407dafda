//! Cross-pair order lookup.
//!
//! Holds a copy of every resting order keyed by id, an owner listing, and
//! the canonical listing used by [`GlobalOrderIndex::get_all_orders`]:
//! trading pair, then price, then creation height, then order id.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use spotbook_types::{Address, MarketError, Order, OrderId, Result, TradingPair};

type ListingKey = (TradingPair, Decimal, i64, OrderId);

fn listing_key(order: &Order) -> ListingKey {
    (
        order.trading_pair.clone(),
        order.price,
        order.height,
        order.id.clone(),
    )
}

#[derive(Debug, Clone, Default)]
pub struct GlobalOrderIndex {
    orders: BTreeMap<OrderId, Order>,
    owners: BTreeMap<Address, BTreeSet<OrderId>>,
    listing: BTreeSet<ListingKey>,
}

impl GlobalOrderIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, order: Order) -> Result<()> {
        if self.orders.contains_key(&order.id) {
            return Err(MarketError::DuplicateOrder(order.id));
        }
        self.owners
            .entry(order.sender().clone())
            .or_default()
            .insert(order.id.clone());
        self.listing.insert(listing_key(&order));
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    pub fn remove(&mut self, order_id: &OrderId) -> Result<Order> {
        let order = self
            .orders
            .remove(order_id)
            .ok_or_else(|| MarketError::OrderNotFound(order_id.clone()))?;

        let owned = self
            .owners
            .get_mut(order.sender())
            .is_some_and(|ids| ids.remove(order_id));
        if self.owners.get(order.sender()).is_some_and(BTreeSet::is_empty) {
            self.owners.remove(order.sender());
        }
        let listed = self.listing.remove(&listing_key(&order));
        if !owned || !listed {
            tracing::error!(order = %order_id, owned, listed, "Global index out of sync");
            return Err(MarketError::invariant(format!(
                "order {order_id} missing from the global owner or listing index"
            )));
        }
        Ok(order)
    }

    /// Overwrite an order's fill state. Listing keys must be unchanged.
    pub fn replace(&mut self, order: Order) -> Result<()> {
        let slot = self
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| MarketError::OrderNotFound(order.id.clone()))?;
        if listing_key(slot) != listing_key(&order) {
            return Err(MarketError::invariant(format!(
                "replacement of order {} changes its listing key",
                order.id
            )));
        }
        *slot = order;
        Ok(())
    }

    #[must_use]
    pub fn query_order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    #[must_use]
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.orders.contains_key(order_id)
    }

    /// Ids of the orders owned by `owner`, ascending.
    #[must_use]
    pub fn get_orders_from_user(&self, owner: &Address) -> Vec<OrderId> {
        self.owners
            .get(owner)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every resting order: by pair, then price, then height, then id.
    #[must_use]
    pub fn get_all_orders(&self) -> Vec<&Order> {
        self.listing
            .iter()
            .filter_map(|(_, _, _, id)| self.orders.get(id))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Check that the owner and listing indices cover exactly the stored
    /// orders.
    pub fn verify(&self) -> Result<()> {
        let owned: usize = self.owners.values().map(BTreeSet::len).sum();
        if owned != self.orders.len() || self.listing.len() != self.orders.len() {
            return Err(MarketError::invariant(format!(
                "global index sizes diverge: {} orders, {owned} owned, {} listed",
                self.orders.len(),
                self.listing.len()
            )));
        }
        for order in self.orders.values() {
            let owned = self
                .owners
                .get(order.sender())
                .is_some_and(|ids| ids.contains(&order.id));
            if !owned || !self.listing.contains(&listing_key(order)) {
                return Err(MarketError::invariant(format!(
                    "order {} is not fully indexed globally",
                    order.id
                )));
            }
        }
        Ok(())
    }
}
