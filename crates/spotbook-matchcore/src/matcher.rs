//! Pure fill computation for one matching round.
//!
//! ```text
//! match_candidates(CandidateSet, price) -> Vec<Fill>
//! ```
//!
//! No side effects: the caller applies the fills to the book and moves the
//! collateral. Bids and asks are walked in priority order and every fill
//! trades `min(bid.left, ask.left)` at the single round price.

use rust_decimal::Decimal;
use spotbook_types::{Amount, MarketError, Order, OrderId, Result};

use crate::candidates::CandidateSet;

/// One trade between a resting bid and a resting ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub bid: OrderId,
    pub ask: OrderId,
    pub price: Decimal,
    /// Stock moved from seller to buyer.
    pub stock: Amount,
    /// Money moved from buyer to seller: `floor(price × stock)`.
    pub money: Amount,
}

/// Compute the fills of one round at `price`.
///
/// `price` must lie inside `[ask, bid]` of the set; anything else is an
/// invariant violation because it would trade an order through its limit.
pub fn match_candidates(candidates: &CandidateSet, price: Decimal) -> Result<Vec<Fill>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(order) = candidates
        .bids
        .iter()
        .find(|o| o.price < price)
        .or_else(|| candidates.asks.iter().find(|o| o.price > price))
    {
        return Err(MarketError::invariant(format!(
            "round price {price} crosses the limit of order {}",
            order.id
        )));
    }

    let mut bid_left: Vec<Amount> = candidates.bids.iter().map(|o| o.left_stock).collect();
    let mut ask_left: Vec<Amount> = candidates.asks.iter().map(|o| o.left_stock).collect();
    let mut fills = Vec::new();

    let mut ask_idx = 0;
    for (bid_idx, bid) in candidates.bids.iter().enumerate() {
        while ask_idx < ask_left.len() && bid_left[bid_idx] > 0 {
            if ask_left[ask_idx] == 0 {
                ask_idx += 1;
                continue;
            }
            let ask: &Order = &candidates.asks[ask_idx];
            let stock = bid_left[bid_idx].min(ask_left[ask_idx]);
            let money = Order::deal_money_at(price, stock)?;

            tracing::debug!(
                bid = %bid.id,
                ask = %ask.id,
                %price,
                stock,
                money,
                "Fill computed"
            );
            fills.push(Fill {
                bid: bid.id.clone(),
                ask: ask.id.clone(),
                price,
                stock,
                money,
            });

            bid_left[bid_idx] -= stock;
            ask_left[ask_idx] -= stock;
            if ask_left[ask_idx] == 0 {
                ask_idx += 1;
            }
        }
    }

    Ok(fills)
}

#[cfg(test)]
mod tests {
    use spotbook_types::{Side, TimeInForce};

    use super::*;

    fn buy(sender: &str, price_e4: i64, qty: Amount, height: i64) -> Order {
        Order::dummy(sender, 1, price_e4, qty, Side::Buy, TimeInForce::Gte, height)
    }

    fn sell(sender: &str, price_e4: i64, qty: Amount, height: i64) -> Order {
        Order::dummy(sender, 1, price_e4, qty, Side::Sell, TimeInForce::Gte, height)
    }

    #[test]
    fn empty_candidates_no_fills() {
        let fills = match_candidates(&CandidateSet::default(), Decimal::ONE).unwrap();
        assert!(fills.is_empty());
    }

    #[test]
    fn single_partial_fill() {
        let set = CandidateSet {
            bids: vec![buy("alice", 11080, 50, 998)],
            asks: vec![sell("bob", 11010, 100, 997)],
        };
        let price = Decimal::new(11045, 4);
        let fills = match_candidates(&set, price).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].stock, 50);
        // floor(1.1045 * 50) = floor(55.225)
        assert_eq!(fills[0].money, 55);
        assert_eq!(fills[0].bid, set.bids[0].id);
        assert_eq!(fills[0].ask, set.asks[0].id);
    }

    #[test]
    fn walks_both_sides_in_priority() {
        let set = CandidateSet {
            bids: vec![buy("a", 20000, 30, 1), buy("b", 20000, 30, 2)],
            asks: vec![sell("c", 20000, 20, 1), sell("d", 20000, 50, 1)],
        };
        let fills = match_candidates(&set, Decimal::new(2, 0)).unwrap();
        let shape: Vec<(&str, &str, Amount)> = fills
            .iter()
            .map(|f| (f.bid.sender.as_str(), f.ask.sender.as_str(), f.stock))
            .collect();
        assert_eq!(shape, vec![("a", "c", 20), ("a", "d", 10), ("b", "d", 30)]);
        assert!(fills.iter().all(|f| f.money == f.stock * 2));
    }

    #[test]
    fn total_fill_is_min_of_sides() {
        let set = CandidateSet {
            bids: vec![buy("a", 15000, 7, 1), buy("b", 15000, 9, 1)],
            asks: vec![sell("c", 14000, 40, 1)],
        };
        let fills = match_candidates(&set, Decimal::new(15, 1)).unwrap();
        let total: Amount = fills.iter().map(|f| f.stock).sum();
        assert_eq!(total, 16);
    }

    #[test]
    fn price_outside_band_is_fatal() {
        let set = CandidateSet {
            bids: vec![buy("a", 11000, 10, 1)],
            asks: vec![sell("b", 10000, 10, 1)],
        };
        let err = match_candidates(&set, Decimal::new(12, 1)).unwrap_err();
        assert!(err.is_fatal());
        let err = match_candidates(&set, Decimal::new(9, 1)).unwrap_err();
        assert!(err.is_fatal());
    }
}
