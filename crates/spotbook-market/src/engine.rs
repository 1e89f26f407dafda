//! The market engine: pair lifecycle and order admission.
//!
//! [`MarketEngine`] owns the order store, the market table and both
//! schedulers, and talks to the host chain only through the keeper traits
//! it is generic over. Each public operation either succeeds completely or
//! returns an error with no state change; an [`MarketError::InvariantViolation`]
//! means the book is already inconsistent and the caller must halt.
//!
//! End-of-block processing lives in [`crate::end_block`], queries in
//! [`crate::query`].

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use spotbook_matchcore::{OrderStore, compute_book_root};
use spotbook_types::{
    Address, CancelMarketInfo, CancelOrderInfo, CancelReason, Coin, CreateMarketInfo,
    CreateOrderInfo, MarketError, MarketEvent, MarketInfo, MarketParams, MarketStatus,
    ModifyPricePrecisionInfo, Order, OrderId, OrderType, Result, Side, TimeInForce, TradingPair,
};

use crate::cleanup::CleanupScheduler;
use crate::delist::DelistScheduler;
use crate::keepers::{AssetKeeper, BlockContext, CollateralKeeper, EventSink};
use crate::msg::{CreateOrderMsg, MarketMsg};

/// Orchestrates every market operation over injected collaborators.
#[derive(Debug)]
pub struct MarketEngine<C, A, E> {
    pub(crate) params: MarketParams,
    pub(crate) collateral: C,
    pub(crate) assets: A,
    pub(crate) events: E,
    pub(crate) markets: BTreeMap<TradingPair, MarketInfo>,
    pub(crate) store: OrderStore,
    pub(crate) cleanup: CleanupScheduler,
    pub(crate) delist: DelistScheduler,
}

impl<C, A, E> MarketEngine<C, A, E> {
    #[must_use]
    pub fn params(&self) -> &MarketParams {
        &self.params
    }

    #[must_use]
    pub fn collateral(&self) -> &C {
        &self.collateral
    }

    /// Direct access to the ledger, e.g. to fund accounts.
    pub fn collateral_mut(&mut self) -> &mut C {
        &mut self.collateral
    }

    #[must_use]
    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut A {
        &mut self.assets
    }

    #[must_use]
    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    #[must_use]
    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    #[must_use]
    pub fn market(&self, pair: &TradingPair) -> Option<&MarketInfo> {
        self.markets.get(pair)
    }

    /// All listed markets, by ascending pair.
    pub fn markets(&self) -> impl Iterator<Item = &MarketInfo> {
        self.markets.values()
    }

    #[must_use]
    pub fn cleanup(&self) -> &CleanupScheduler {
        &self.cleanup
    }

    #[must_use]
    pub fn delist(&self) -> &DelistScheduler {
        &self.delist
    }

    /// SHA-256 over the market table, the book, the delist queue and the
    /// cleanup marker. Equal on every node that replayed the same messages.
    pub fn state_root(&self) -> Result<[u8; 32]> {
        let mut hasher = Sha256::new();
        hasher.update(b"spotbook:state_root:v1:");

        hasher.update((self.markets.len() as u64).to_le_bytes());
        for market in self.markets.values() {
            hasher.update(serde_json::to_vec(market)?);
            hasher.update([0]);
        }
        hasher.update(compute_book_root(self.store.global().get_all_orders()));
        hasher.update((self.delist.len() as u64).to_le_bytes());
        for (time, pair) in self.delist.iter() {
            hasher.update(time.to_le_bytes());
            hasher.update(pair.to_string().as_bytes());
            hasher.update([0]);
        }
        hasher.update(self.cleanup.get_unix_time().to_le_bytes());

        let result = hasher.finalize();
        let mut root = [0u8; 32];
        root.copy_from_slice(&result);
        Ok(root)
    }
}

impl<C, A, E> MarketEngine<C, A, E>
where
    C: CollateralKeeper,
    A: AssetKeeper,
    E: EventSink,
{
    pub fn new(params: MarketParams, collateral: C, assets: A, events: E) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            collateral,
            assets,
            events,
            markets: BTreeMap::new(),
            store: OrderStore::new(),
            cleanup: CleanupScheduler::new(),
            delist: DelistScheduler::new(),
        })
    }

    /// Dispatch a transaction message.
    pub fn handle(&mut self, ctx: &BlockContext, msg: &MarketMsg) -> Result<()> {
        match msg {
            MarketMsg::CreateTradingPair {
                creator,
                stock,
                money,
                price_precision,
            } => self.create_trading_pair(ctx, creator, stock, money, *price_precision),
            MarketMsg::CancelTradingPair {
                sender,
                trading_pair,
                effective_time,
            } => {
                let pair: TradingPair = trading_pair.parse()?;
                self.cancel_trading_pair(ctx, sender, &pair, *effective_time)
            }
            MarketMsg::ModifyPricePrecision {
                sender,
                trading_pair,
                price_precision,
            } => {
                let pair: TradingPair = trading_pair.parse()?;
                self.modify_price_precision(ctx, sender, &pair, *price_precision)
            }
            MarketMsg::CreateOrder(order) => self.create_order(ctx, order).map(|_| ()),
            MarketMsg::CancelOrder { sender, order_id } => {
                self.cancel_order(ctx, sender, order_id).map(|_| ())
            }
        }
    }

    // =================================================================
    // Trading pairs
    // =================================================================

    /// List a new trading pair. Charges the creation fee.
    pub fn create_trading_pair(
        &mut self,
        ctx: &BlockContext,
        creator: &Address,
        stock: &str,
        money: &str,
        price_precision: u32,
    ) -> Result<()> {
        let pair = TradingPair::new(stock, money);
        pair.validate()?;
        self.check_precision(price_precision)?;
        for denom in [stock, money] {
            if !self.assets.token_exists(denom) {
                return Err(MarketError::TokenNotFound(denom.to_string()));
            }
        }
        if self.markets.contains_key(&pair) {
            return Err(MarketError::MarketAlreadyExists(pair));
        }

        let fee = Coin::new(self.params.fee_denom.clone(), self.params.create_market_fee);
        self.collateral.charge_fee(creator, &fee)?;

        self.markets.insert(
            pair.clone(),
            MarketInfo::new(pair.clone(), creator.clone(), price_precision),
        );
        tracing::info!(
            pair = %pair,
            creator = %creator,
            price_precision,
            height = ctx.height,
            "Trading pair created"
        );
        self.events
            .publish(MarketEvent::CreateTradingPair(CreateMarketInfo {
                stock: pair.stock,
                money: pair.money,
                price_precision,
                creator: creator.clone(),
                create_height: ctx.height,
            }));
        Ok(())
    }

    /// Schedule a pair for delisting at `effective_time` (unix seconds).
    pub fn cancel_trading_pair(
        &mut self,
        ctx: &BlockContext,
        sender: &Address,
        pair: &TradingPair,
        effective_time: i64,
    ) -> Result<()> {
        let earliest = ctx
            .unix_time()
            .saturating_add(self.params.market_min_expired_time);
        let market = self.owned_market_mut(pair, sender)?;
        if effective_time < 0 {
            return Err(MarketError::InvalidTime {
                reason: format!("effective time {effective_time} is negative"),
            });
        }
        if effective_time < earliest {
            return Err(MarketError::InvalidTime {
                reason: format!("effective time {effective_time} is before {earliest}"),
            });
        }
        if !market.is_active() {
            return Err(MarketError::MarketNotActive(pair.clone()));
        }

        market.status = MarketStatus::PendingDelist { effective_time };
        self.delist.add_delist_request(pair.clone(), effective_time);
        tracing::info!(pair = %pair, effective_time, height = ctx.height, "Trading pair delist scheduled");
        self.events
            .publish(MarketEvent::CancelTradingPair(CancelMarketInfo {
                stock: pair.stock.clone(),
                money: pair.money.clone(),
                deleter: sender.clone(),
                del_time: effective_time,
            }));
        Ok(())
    }

    /// Change the precision new orders of `pair` may use.
    pub fn modify_price_precision(
        &mut self,
        ctx: &BlockContext,
        sender: &Address,
        pair: &TradingPair,
        price_precision: u32,
    ) -> Result<()> {
        self.check_precision(price_precision)?;
        let market = self.owned_market_mut(pair, sender)?;
        if !market.is_active() {
            return Err(MarketError::MarketNotActive(pair.clone()));
        }

        let old_price_precision = market.price_precision;
        market.price_precision = price_precision;
        tracing::info!(
            pair = %pair,
            old_price_precision,
            price_precision,
            height = ctx.height,
            "Price precision modified"
        );
        self.events
            .publish(MarketEvent::ModifyPricePrecision(ModifyPricePrecisionInfo {
                sender: sender.clone(),
                trading_pair: pair.clone(),
                old_price_precision,
                new_price_precision: price_precision,
            }));
        Ok(())
    }

    fn check_precision(&self, precision: u32) -> Result<()> {
        let max = self.params.max_price_precision;
        if precision > max {
            return Err(MarketError::InvalidPricePrecision { precision, max });
        }
        Ok(())
    }

    fn owned_market_mut(&mut self, pair: &TradingPair, sender: &Address) -> Result<&mut MarketInfo> {
        let market = self
            .markets
            .get_mut(pair)
            .ok_or_else(|| MarketError::MarketNotFound(pair.clone()))?;
        if market.creator != *sender {
            return Err(MarketError::NotMarketOwner {
                pair: pair.clone(),
                sender: sender.clone(),
            });
        }
        Ok(market)
    }

    // =================================================================
    // Orders
    // =================================================================

    /// Validate, freeze collateral for and index a new limit order.
    pub fn create_order(&mut self, ctx: &BlockContext, msg: &CreateOrderMsg) -> Result<OrderId> {
        self.admit_order(ctx, msg).inspect_err(|err| {
            tracing::warn!(
                sender = %msg.sender,
                sequence = msg.sequence,
                pair = %msg.trading_pair,
                error = %err,
                "Order rejected"
            );
        })
    }

    fn admit_order(&mut self, ctx: &BlockContext, msg: &CreateOrderMsg) -> Result<OrderId> {
        let pair: TradingPair = msg.trading_pair.parse()?;
        let order_type = OrderType::try_from(msg.order_type)?;
        let side = Side::try_from(msg.side)?;
        let time_in_force = TimeInForce::try_from(msg.time_in_force)?;

        let market = self
            .markets
            .get(&pair)
            .ok_or_else(|| MarketError::MarketNotFound(pair.clone()))?;
        if !market.is_active() {
            return Err(MarketError::MarketNotActive(pair));
        }
        if msg.price <= Decimal::ZERO {
            return Err(MarketError::InvalidPrice(msg.price));
        }
        if msg.quantity == 0 {
            return Err(MarketError::InvalidQuantity(msg.quantity));
        }
        let price = rescale_price(msg.price, market.price_precision)?;

        // The id must parse back for cancel and queries to reach the order.
        msg.sender.as_str().parse::<Address>()?;
        self.check_tokens(&pair, &msg.sender)?;

        let expire_height = match time_in_force {
            TimeInForce::Ioc => ctx.height,
            TimeInForce::Gte => {
                let blocks = self.gte_lifetime(msg.exist_blocks)?;
                ctx.height
                    .checked_add(blocks)
                    .ok_or(MarketError::InvalidExistBlocks {
                        blocks,
                        max: self.params.max_gte_order_lifetime,
                    })?
            }
        };

        let id = OrderId::new(msg.sender.clone(), msg.sequence, msg.identify);
        if self.store.get(&id).is_some() {
            return Err(MarketError::DuplicateOrder(id));
        }
        let freeze = Order::required_freeze(side, price, msg.quantity)?;
        let order = Order {
            id,
            trading_pair: pair,
            order_type,
            price,
            quantity: msg.quantity,
            side,
            time_in_force,
            height: ctx.height,
            expire_height,
            left_stock: msg.quantity,
            freeze,
            deal_stock: 0,
            deal_money: 0,
        };

        let frozen = Coin::new(order.freeze_denom(), freeze);
        self.collateral.freeze(&msg.sender, &frozen)?;
        if let Err(err) = self.store.insert(order.clone()) {
            self.collateral
                .unfreeze(&msg.sender, &frozen)
                .map_err(|e| MarketError::invariant(format!("rolling back freeze of {}: {e}", order.id)))?;
            return Err(err);
        }

        tracing::debug!(
            order = %order.id,
            pair = %order.trading_pair,
            side = %side,
            %price,
            quantity = order.quantity,
            freeze,
            "Order created"
        );
        self.events.publish(MarketEvent::CreateOrder(CreateOrderInfo {
            order_id: order.id.clone(),
            sender: msg.sender.clone(),
            trading_pair: order.trading_pair.clone(),
            price,
            quantity: order.quantity,
            side,
            time_in_force,
            height: ctx.height,
            freeze,
        }));
        Ok(order.id)
    }

    fn check_tokens(&self, pair: &TradingPair, sender: &Address) -> Result<()> {
        for denom in [&pair.stock, &pair.money] {
            if self.assets.is_token_forbidden(denom) {
                return Err(MarketError::TokenForbidden(denom.clone()));
            }
            if self.assets.is_forbidden_by_token_issuer(denom, sender) {
                return Err(MarketError::AddressForbidden {
                    token: denom.clone(),
                    address: sender.clone(),
                });
            }
        }
        Ok(())
    }

    /// Lifetime of a GTE order: `exist_blocks` when positive, else the default.
    fn gte_lifetime(&self, exist_blocks: i64) -> Result<i64> {
        let max = self.params.max_gte_order_lifetime;
        let blocks = if exist_blocks > 0 {
            exist_blocks
        } else {
            self.params.gte_order_lifetime
        };
        if exist_blocks < 0 || blocks > max {
            return Err(MarketError::InvalidExistBlocks {
                blocks: exist_blocks,
                max,
            });
        }
        Ok(blocks)
    }

    /// Cancel an order on behalf of its owner.
    pub fn cancel_order(
        &mut self,
        ctx: &BlockContext,
        sender: &Address,
        order_id: &str,
    ) -> Result<Order> {
        let id: OrderId = order_id
            .parse()
            .map_err(|_| MarketError::bad_request(format!("malformed order id {order_id:?}")))?;
        let order = self
            .store
            .get(&id)
            .ok_or_else(|| MarketError::OrderNotFound(id.clone()))?;
        if order.sender() != sender {
            return Err(MarketError::NotOrderOwner {
                order_id: id,
                sender: sender.clone(),
            });
        }
        self.remove_order(ctx.height, &id, CancelReason::Manual)
    }

    /// Take an order out of the book and release its remaining freeze.
    pub(crate) fn remove_order(
        &mut self,
        height: i64,
        order_id: &OrderId,
        reason: CancelReason,
    ) -> Result<Order> {
        let order = self.store.remove(order_id)?;
        let remain = Coin::new(order.freeze_denom(), order.freeze);
        self.collateral
            .unfreeze(order.sender(), &remain)
            .map_err(|err| {
                tracing::error!(order = %order_id, error = %err, "Freeze release failed");
                MarketError::invariant(format!("releasing freeze of order {order_id}: {err}"))
            })?;

        tracing::debug!(order = %order_id, reason = ?reason, remain = order.freeze, "Order removed");
        self.events.publish(MarketEvent::CancelOrder(CancelOrderInfo {
            order_id: order.id.clone(),
            del_reason: reason,
            del_height: height,
            left_stock: order.left_stock,
            remain_amount: order.freeze,
            deal_stock: order.deal_stock,
            deal_money: order.deal_money,
        }));
        Ok(order)
    }
}

/// Carry `price` at exactly `precision` decimal places.
fn rescale_price(price: Decimal, precision: u32) -> Result<Decimal> {
    if price.scale() > precision {
        return Err(MarketError::InvalidPricePrecision {
            precision: price.scale(),
            max: precision,
        });
    }
    let mut scaled = price;
    scaled.rescale(precision);
    if scaled.scale() != precision || scaled != price {
        return Err(MarketError::InvalidPrice(price));
    }
    Ok(scaled)
}
