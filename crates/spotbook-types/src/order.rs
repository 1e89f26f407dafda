//! Order types for the SpotBook order book.
//!
//! An [`Order`] rests in the book from creation until it is fully filled,
//! cancelled, expired, or its pair is delisted. While it rests, its
//! `freeze` always equals [`Order::required_freeze`] of its `left_stock`.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, MarketError, OrderId, Result, TradingPair};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire code used in messages and event payloads.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Buy => 1,
            Self::Sell => 2,
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = MarketError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Buy),
            2 => Ok(Self::Sell),
            other => Err(MarketError::InvalidTradeSide(other)),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// The type of order. Only limit orders exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
}

impl OrderType {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Limit => 2,
        }
    }
}

impl TryFrom<u8> for OrderType {
    type Error = MarketError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            2 => Ok(Self::Limit),
            other => Err(MarketError::InvalidOrderType(other)),
        }
    }
}

/// How long an order may rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till expire: rests until its expire height or until filled.
    Gte,
    /// Immediate or cancel: the remainder is cancelled at the end of its block.
    Ioc,
}

impl TimeInForce {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Gte => 3,
            Self::Ioc => 4,
        }
    }
}

impl TryFrom<u8> for TimeInForce {
    type Error = MarketError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            3 => Ok(Self::Gte),
            4 => Ok(Self::Ioc),
            other => Err(MarketError::InvalidTimeInForce(other)),
        }
    }
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gte => write!(f, "GTE"),
            Self::Ioc => write!(f, "IOC"),
        }
    }
}

/// A resting limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub trading_pair: TradingPair,
    pub order_type: OrderType,
    /// Limit price, carried at exactly the pair's precision.
    pub price: Decimal,
    /// Original size in stock units.
    pub quantity: Amount,
    pub side: Side,
    pub time_in_force: TimeInForce,
    /// Block height at which the order was created.
    pub height: i64,
    /// First height at which a GTE order counts as expired.
    pub expire_height: i64,
    /// Unfilled stock.
    pub left_stock: Amount,
    /// Collateral currently frozen: money for buys, stock for sells.
    pub freeze: Amount,
    /// Cumulative filled stock.
    pub deal_stock: Amount,
    /// Cumulative money exchanged for `deal_stock`.
    pub deal_money: Amount,
}

impl Order {
    #[must_use]
    pub fn sender(&self) -> &Address {
        &self.id.sender
    }

    /// The denom this order freezes: money for buys, stock for sells.
    #[must_use]
    pub fn freeze_denom(&self) -> &str {
        match self.side {
            Side::Buy => &self.trading_pair.money,
            Side::Sell => &self.trading_pair.stock,
        }
    }

    /// Collateral needed to back `left_stock` at `price`.
    ///
    /// Buy: `ceil(price × left_stock)` money. Sell: `left_stock` stock.
    pub fn required_freeze(side: Side, price: Decimal, left_stock: Amount) -> Result<Amount> {
        match side {
            Side::Sell => Ok(left_stock),
            Side::Buy => price
                .checked_mul(Decimal::from(left_stock))
                .and_then(|money| money.ceil().to_u64())
                .ok_or_else(|| MarketError::AmountOverflow {
                    reason: format!("{price} x {left_stock}"),
                }),
        }
    }

    /// Money exchanged when `deal_stock` trades at `price`, rounded down.
    pub fn deal_money_at(price: Decimal, deal_stock: Amount) -> Result<Amount> {
        price
            .checked_mul(Decimal::from(deal_stock))
            .and_then(|money| money.floor().to_u64())
            .ok_or_else(|| MarketError::AmountOverflow {
                reason: format!("{price} x {deal_stock}"),
            })
    }

    /// Whether `freeze` matches the formula for the current `left_stock`.
    #[must_use]
    pub fn is_freeze_consistent(&self) -> bool {
        Self::required_freeze(self.side, self.price, self.left_stock)
            .is_ok_and(|needed| needed == self.freeze)
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.left_stock == 0
    }

    /// Whether a GTE order has reached its expire height.
    #[must_use]
    pub fn is_expired_at(&self, height: i64) -> bool {
        self.time_in_force == TimeInForce::Gte && self.expire_height <= height
    }

    /// Apply a fill of `deal_stock` exchanged for `deal_money`.
    ///
    /// Recomputes `freeze` from the new `left_stock` and returns the amount
    /// of freeze that was released. For a sell that equals `deal_stock`; for
    /// a buy it is at least `deal_money`, the surplus going back to the owner.
    pub fn apply_fill(&mut self, deal_stock: Amount, deal_money: Amount) -> Result<Amount> {
        if deal_stock == 0 || deal_stock > self.left_stock {
            return Err(MarketError::invariant(format!(
                "fill of {deal_stock} on order {} with {} left",
                self.id, self.left_stock
            )));
        }
        let left_stock = self.left_stock - deal_stock;
        let freeze = Self::required_freeze(self.side, self.price, left_stock)?;
        let released = self.freeze.checked_sub(freeze).ok_or_else(|| {
            MarketError::invariant(format!("freeze of order {} would grow on fill", self.id))
        })?;
        if self.side == Side::Buy && released < deal_money {
            return Err(MarketError::invariant(format!(
                "order {} releases {released} but owes {deal_money}",
                self.id
            )));
        }

        self.left_stock = left_stock;
        self.freeze = freeze;
        self.deal_stock += deal_stock;
        self.deal_money += deal_money;
        Ok(released)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// A `cet/usdt` limit order with freeze computed from the formula.
    ///
    /// `price` is given in ten-thousandths, as in `Decimal::new(11051, 4)`.
    pub fn dummy(
        sender: &str,
        sequence: u64,
        price_e4: i64,
        quantity: Amount,
        side: Side,
        time_in_force: TimeInForce,
        height: i64,
    ) -> Self {
        let price = Decimal::new(price_e4, 4);
        let freeze = Self::required_freeze(side, price, quantity).expect("test freeze fits");
        Self {
            id: OrderId::new(Address::new(sender), sequence, 0),
            trading_pair: TradingPair::new("cet", "usdt"),
            order_type: OrderType::Limit,
            price,
            quantity,
            side,
            time_in_force,
            height,
            expire_height: match time_in_force {
                TimeInForce::Gte => height + crate::constants::DEFAULT_GTE_ORDER_LIFETIME,
                TimeInForce::Ioc => height,
            },
            left_stock: quantity,
            freeze,
            deal_stock: 0,
            deal_money: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_roundtrip() {
        for side in [Side::Buy, Side::Sell] {
            assert_eq!(Side::try_from(side.code()).unwrap(), side);
        }
        for tif in [TimeInForce::Gte, TimeInForce::Ioc] {
            assert_eq!(TimeInForce::try_from(tif.code()).unwrap(), tif);
        }
        assert_eq!(OrderType::try_from(2).unwrap(), OrderType::Limit);
        assert!(matches!(Side::try_from(0), Err(MarketError::InvalidTradeSide(0))));
        assert!(matches!(
            TimeInForce::try_from(1),
            Err(MarketError::InvalidTimeInForce(1))
        ));
        assert!(matches!(
            OrderType::try_from(1),
            Err(MarketError::InvalidOrderType(1))
        ));
    }

    #[test]
    fn buy_freeze_rounds_up() {
        // 1.1051 x 50 = 55.255
        let order = Order::dummy("a", 1, 11051, 50, Side::Buy, TimeInForce::Gte, 998);
        assert_eq!(order.freeze, 56);
        assert_eq!(order.freeze_denom(), "usdt");
        assert!(order.is_freeze_consistent());
    }

    #[test]
    fn sell_freeze_is_stock() {
        let order = Order::dummy("a", 1, 11010, 100, Side::Sell, TimeInForce::Ioc, 997);
        assert_eq!(order.freeze, 100);
        assert_eq!(order.freeze_denom(), "cet");
    }

    #[test]
    fn deal_money_rounds_down() {
        assert_eq!(Order::deal_money_at(Decimal::new(11051, 4), 50).unwrap(), 55);
    }

    #[test]
    fn partial_fill_keeps_freeze_consistent() {
        let mut order = Order::dummy("a", 1, 11051, 50, Side::Buy, TimeInForce::Gte, 998);
        let price = Decimal::new(11010, 4);
        let money = Order::deal_money_at(price, 20).unwrap();
        let released = order.apply_fill(20, money).unwrap();

        assert_eq!(order.left_stock, 30);
        // ceil(1.1051 x 30) = ceil(33.153) = 34; 56 - 34 = 22
        assert_eq!(order.freeze, 34);
        assert_eq!(released, 22);
        assert!(released >= money);
        assert!(order.is_freeze_consistent());
        assert_eq!(order.deal_stock, 20);
        assert_eq!(order.deal_money, money);
    }

    #[test]
    fn full_fill_releases_everything() {
        let mut order = Order::dummy("a", 1, 11010, 100, Side::Sell, TimeInForce::Gte, 1);
        let released = order.apply_fill(100, 110).unwrap();
        assert_eq!(released, 100);
        assert!(order.is_filled());
        assert_eq!(order.freeze, 0);
    }

    #[test]
    fn overfill_is_invariant_violation() {
        let mut order = Order::dummy("a", 1, 11010, 10, Side::Sell, TimeInForce::Gte, 1);
        let err = order.apply_fill(11, 0).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(order.left_stock, 10, "failed fill must not mutate");
    }

    #[test]
    fn gte_expiry() {
        let order = Order::dummy("a", 1, 10000, 1, Side::Buy, TimeInForce::Gte, 100);
        assert!(!order.is_expired_at(order.expire_height - 1));
        assert!(order.is_expired_at(order.expire_height));
        let ioc = Order::dummy("a", 2, 10000, 1, Side::Buy, TimeInForce::Ioc, 100);
        assert!(!ioc.is_expired_at(1_000_000));
    }
}
