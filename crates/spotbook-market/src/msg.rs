//! Transaction messages handled by the market engine.
//!
//! Messages carry wire values (symbols, order id strings, side and
//! time-in-force codes). The engine parses and validates them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spotbook_types::{Address, Amount};

/// Place a limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderMsg {
    pub sender: Address,
    /// Account sequence of the creating transaction.
    pub sequence: u64,
    /// Distinguishes orders created by one transaction.
    pub identify: u8,
    /// `stock/money` symbol.
    pub trading_pair: String,
    pub order_type: u8,
    pub price: Decimal,
    pub quantity: Amount,
    pub side: u8,
    pub time_in_force: u8,
    /// GTE lifetime in blocks; zero selects the default.
    #[serde(default)]
    pub exist_blocks: i64,
}

/// Every message the engine accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketMsg {
    CreateTradingPair {
        creator: Address,
        stock: String,
        money: String,
        price_precision: u32,
    },
    CancelTradingPair {
        sender: Address,
        trading_pair: String,
        effective_time: i64,
    },
    ModifyPricePrecision {
        sender: Address,
        trading_pair: String,
        price_precision: u32,
    },
    CreateOrder(CreateOrderMsg),
    CancelOrder {
        sender: Address,
        order_id: String,
    },
}

impl MarketMsg {
    /// Short name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTradingPair { .. } => "create_trading_pair",
            Self::CancelTradingPair { .. } => "cancel_trading_pair",
            Self::ModifyPricePrecision { .. } => "modify_price_precision",
            Self::CreateOrder(_) => "create_order",
            Self::CancelOrder { .. } => "cancel_order",
        }
    }
}
