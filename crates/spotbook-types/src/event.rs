//! Lifecycle notifications emitted by the market engine.
//!
//! The engine hands every [`MarketEvent`] to an event sink and never waits
//! for delivery. Payload field names follow the indexer feed: each event
//! serializes as `{"<topic>": {...payload...}}`.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{Address, Amount, OrderId, Side, TimeInForce, TradingPair};

/// Why an order left the book.
///
/// Serializes as its [`description`](CancelReason::description), the string
/// the `del_order_info` feed carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// The owner cancelled it.
    Manual,
    /// `left_stock` reached zero.
    FullyFilled,
    /// A GTE order passed its expire height.
    GteTimeout,
    /// An IOC order was not fully filled in its block.
    IocUnmatched,
    /// Its trading pair was delisted.
    PairRemoved,
}

impl CancelReason {
    pub const ALL: [Self; 5] = [
        Self::Manual,
        Self::FullyFilled,
        Self::GteTimeout,
        Self::IocUnmatched,
        Self::PairRemoved,
    ];

    /// Human-readable description used in logs and feeds.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Manual => "Manually cancel the order",
            Self::FullyFilled => "The order was fully filled",
            Self::GteTimeout => "GTE order timeout",
            Self::IocUnmatched => "IOC order cancel",
            Self::PairRemoved => "Trading pair removed, insufficient information to match",
        }
    }
}

impl Serialize for CancelReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.description())
    }
}

impl<'de> Deserialize<'de> for CancelReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::ALL
            .into_iter()
            .find(|reason| reason.description() == text)
            .ok_or_else(|| de::Error::custom(format!("unknown cancel reason {text:?}")))
    }
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMarketInfo {
    pub stock: String,
    pub money: String,
    pub price_precision: u32,
    pub creator: Address,
    pub create_height: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelMarketInfo {
    pub stock: String,
    pub money: String,
    pub deleter: Address,
    pub del_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyPricePrecisionInfo {
    pub sender: Address,
    pub trading_pair: TradingPair,
    pub old_price_precision: u32,
    pub new_price_precision: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderInfo {
    pub order_id: OrderId,
    pub sender: Address,
    pub trading_pair: TradingPair,
    pub price: Decimal,
    pub quantity: Amount,
    pub side: Side,
    pub time_in_force: TimeInForce,
    pub height: i64,
    pub freeze: Amount,
}

/// A fill applied to one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillOrderInfo {
    pub order_id: OrderId,
    pub height: i64,
    /// Unfilled stock after this fill.
    pub left_stock: Amount,
    /// Freeze after this fill.
    pub freeze: Amount,
    /// Cumulative filled stock.
    pub deal_stock: Amount,
    /// Cumulative money exchanged.
    pub deal_money: Amount,
    /// Stock traded by this fill alone.
    pub curr_stock: Amount,
    /// Money traded by this fill alone.
    pub curr_money: Amount,
    /// Execution price of this fill.
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderInfo {
    pub order_id: OrderId,
    pub del_reason: CancelReason,
    pub del_height: i64,
    /// Unfilled stock at removal.
    pub left_stock: Amount,
    /// Freeze released back to the owner.
    pub remain_amount: Amount,
    pub deal_stock: Amount,
    pub deal_money: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHeightInfo {
    pub height: i64,
    pub timestamp: i64,
}

/// Every notification the engine can emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    #[serde(rename = "create_trading_info")]
    CreateTradingPair(CreateMarketInfo),
    #[serde(rename = "cancel_trading_info")]
    CancelTradingPair(CancelMarketInfo),
    #[serde(rename = "modify-price-precision")]
    ModifyPricePrecision(ModifyPricePrecisionInfo),
    #[serde(rename = "create_order_info")]
    CreateOrder(CreateOrderInfo),
    #[serde(rename = "fill_order_info")]
    FillOrder(FillOrderInfo),
    #[serde(rename = "del_order_info")]
    CancelOrder(CancelOrderInfo),
    #[serde(rename = "height-info")]
    NewHeight(NewHeightInfo),
}

impl MarketEvent {
    /// Feed topic of this event.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        match self {
            Self::CreateTradingPair(_) => "create_trading_info",
            Self::CancelTradingPair(_) => "cancel_trading_info",
            Self::ModifyPricePrecision(_) => "modify-price-precision",
            Self::CreateOrder(_) => "create_order_info",
            Self::FillOrder(_) => "fill_order_info",
            Self::CancelOrder(_) => "del_order_info",
            Self::NewHeight(_) => "height-info",
        }
    }
}
