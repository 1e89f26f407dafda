//! End-of-block processing.
//!
//! Runs once per block, after every transaction of the block:
//!
//! ```text
//! NewHeight -> match active pairs -> sweep IOC orders of this height
//!           -> (new cleanup bucket) expire GTE orders, finalize delists
//! ```
//!
//! Matching repeats per pair until its book no longer crosses. Each round
//! trades the whole best bid level against the whole best ask level at a
//! single execution price, so every round empties at least one level.

use spotbook_matchcore::{Fill, match_candidates};
use spotbook_types::{
    CancelReason, Coin, FillOrderInfo, MarketError, MarketEvent, NewHeightInfo, Order, OrderId,
    Result, TimeInForce, TradingPair,
};

use crate::cleanup::bucket_start;
use crate::engine::MarketEngine;
use crate::keepers::{AssetKeeper, BlockContext, CollateralKeeper, EventSink};

/// What one `end_block` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndBlockSummary {
    pub height: i64,
    pub fills: usize,
    pub fully_filled: usize,
    pub ioc_cancelled: usize,
    pub expired: usize,
    /// Pairs finalized by the delist sweep, ascending by effective time.
    pub delisted: Vec<TradingPair>,
    /// Whether this block opened a new cleanup bucket.
    pub swept: bool,
}

impl<C, A, E> MarketEngine<C, A, E>
where
    C: CollateralKeeper,
    A: AssetKeeper,
    E: EventSink,
{
    pub fn end_block(&mut self, ctx: &BlockContext) -> Result<EndBlockSummary> {
        let mut summary = EndBlockSummary {
            height: ctx.height,
            ..EndBlockSummary::default()
        };
        self.events.publish(MarketEvent::NewHeight(NewHeightInfo {
            height: ctx.height,
            timestamp: ctx.unix_time(),
        }));

        let active: Vec<TradingPair> = self
            .markets
            .values()
            .filter(|m| m.is_active())
            .map(|m| m.pair.clone())
            .collect();
        for pair in &active {
            self.match_pair(ctx, pair, &mut summary)?;
        }

        summary.ioc_cancelled = self.sweep_ioc(ctx)?;

        let now = ctx.unix_time();
        let interval = self.params.cleanup_interval_secs;
        if self.cleanup.is_due(now, interval) {
            summary.expired = self.sweep_expired(ctx)?;
            summary.delisted = self.sweep_delisted(ctx)?;
            self.cleanup.set_unix_time(bucket_start(now, interval));
            summary.swept = true;
        }

        tracing::info!(
            height = ctx.height,
            fills = summary.fills,
            fully_filled = summary.fully_filled,
            ioc_cancelled = summary.ioc_cancelled,
            expired = summary.expired,
            delisted = summary.delisted.len(),
            swept = summary.swept,
            "End of block"
        );
        Ok(summary)
    }

    fn match_pair(
        &mut self,
        ctx: &BlockContext,
        pair: &TradingPair,
        summary: &mut EndBlockSummary,
    ) -> Result<()> {
        loop {
            let Some(index) = self.store.pair_index(pair) else {
                return Ok(());
            };
            let candidates = index.get_matching_candidates();
            if candidates.is_empty() {
                return Ok(());
            }

            let market = self.markets.get(pair).ok_or_else(|| {
                MarketError::invariant(format!("orders rest on unlisted pair {pair}"))
            })?;
            let price = candidates
                .execution_price(market.last_executed_price, market.price_precision)
                .ok_or_else(|| {
                    MarketError::invariant(format!("crossed book of {pair} has no price"))
                })?;
            let fills = match_candidates(&candidates, price)?;
            if fills.is_empty() {
                tracing::error!(pair = %pair, %price, "Crossed book produced no fills");
                return Err(MarketError::invariant(format!(
                    "crossed book of {pair} produced no fills"
                )));
            }

            for fill in &fills {
                summary.fully_filled += self.apply_fill(ctx, pair, fill)?;
            }
            summary.fills += fills.len();
            if let Some(market) = self.markets.get_mut(pair) {
                market.last_executed_price = price;
            }
            tracing::debug!(pair = %pair, %price, fills = fills.len(), "Matching round");
        }
    }

    /// Apply one fill to both orders and move the collateral. Returns how
    /// many of the two orders it fully filled.
    fn apply_fill(&mut self, ctx: &BlockContext, pair: &TradingPair, fill: &Fill) -> Result<usize> {
        let mut bid = self.resting(&fill.bid)?;
        let mut ask = self.resting(&fill.ask)?;
        let released = bid.apply_fill(fill.stock, fill.money)?;
        ask.apply_fill(fill.stock, fill.money)?;
        let surplus = released.checked_sub(fill.money).ok_or_else(|| {
            MarketError::invariant(format!("order {} under-released on fill", bid.id))
        })?;

        let buyer = bid.sender().clone();
        let seller = ask.sender().clone();
        let settle_failed = |err: MarketError| {
            tracing::error!(bid = %fill.bid, ask = %fill.ask, error = %err, "Settlement failed");
            MarketError::invariant(format!("settling {} against {}: {err}", fill.bid, fill.ask))
        };
        self.collateral
            .settle(&seller, &buyer, &Coin::new(pair.stock.clone(), fill.stock))
            .map_err(settle_failed)?;
        self.collateral
            .settle(&buyer, &seller, &Coin::new(pair.money.clone(), fill.money))
            .map_err(settle_failed)?;
        if surplus > 0 {
            self.collateral
                .unfreeze(&buyer, &Coin::new(pair.money.clone(), surplus))
                .map_err(settle_failed)?;
        }

        self.store.replace(bid.clone())?;
        self.store.replace(ask.clone())?;
        for order in [&bid, &ask] {
            self.events.publish(MarketEvent::FillOrder(FillOrderInfo {
                order_id: order.id.clone(),
                height: ctx.height,
                left_stock: order.left_stock,
                freeze: order.freeze,
                deal_stock: order.deal_stock,
                deal_money: order.deal_money,
                curr_stock: fill.stock,
                curr_money: fill.money,
                price: fill.price,
            }));
        }

        let mut fully_filled = 0;
        for order in [bid, ask] {
            if order.is_filled() {
                self.remove_order(ctx.height, &order.id, CancelReason::FullyFilled)?;
                fully_filled += 1;
            }
        }
        Ok(fully_filled)
    }

    fn resting(&self, order_id: &OrderId) -> Result<Order> {
        self.store.get(order_id).cloned().ok_or_else(|| {
            MarketError::invariant(format!("matched order {order_id} is not in the book"))
        })
    }

    /// Cancel the IOC orders created in this block.
    fn sweep_ioc(&mut self, ctx: &BlockContext) -> Result<usize> {
        let ids: Vec<OrderId> = self
            .store
            .indices()
            .flat_map(|index| index.get_orders_at_height(ctx.height))
            .filter(|o| o.time_in_force == TimeInForce::Ioc)
            .map(|o| o.id.clone())
            .collect();
        for id in &ids {
            self.remove_order(ctx.height, id, CancelReason::IocUnmatched)?;
        }
        Ok(ids.len())
    }

    /// Cancel GTE orders whose expire height has been reached.
    ///
    /// Every GTE lifetime is at least one block, so an expired order was
    /// created before this height; each pair is scanned oldest first.
    fn sweep_expired(&mut self, ctx: &BlockContext) -> Result<usize> {
        let ids: Vec<OrderId> = self
            .store
            .indices()
            .flat_map(|index| index.get_older_than(ctx.height))
            .filter(|o| o.is_expired_at(ctx.height))
            .map(|o| o.id.clone())
            .collect();
        for id in &ids {
            self.remove_order(ctx.height, id, CancelReason::GteTimeout)?;
        }
        if !ids.is_empty() {
            tracing::info!(height = ctx.height, expired = ids.len(), "GTE orders expired");
        }
        Ok(ids.len())
    }

    /// Remove every pair whose delist time has passed, with all its orders.
    fn sweep_delisted(&mut self, ctx: &BlockContext) -> Result<Vec<TradingPair>> {
        let now = ctx.unix_time();
        let due = self.delist.get_delist_symbols_before_time(now);
        for pair in &due {
            let ids: Vec<OrderId> = self
                .store
                .pair_index(pair)
                .map(|index| index.iter().map(|o| o.id.clone()).collect())
                .unwrap_or_default();
            for id in &ids {
                self.remove_order(ctx.height, id, CancelReason::PairRemoved)?;
            }
            self.store.remove_pair(pair)?;
            self.markets.remove(pair);
            tracing::info!(pair = %pair, orders = ids.len(), "Trading pair delisted");
        }
        self.delist.remove_delist_symbols_before_time(now);
        Ok(due)
    }
}
