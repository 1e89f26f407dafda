//! Fixtures shared by the unit tests of this crate.

use std::str::FromStr;

use rust_decimal::Decimal;
use spotbook_types::{Address, Amount, Coin, MarketParams, Side, TimeInForce, TradingPair};

use crate::msg::CreateOrderMsg;
use crate::{BalanceManager, BlockContext, MarketEngine, MemoryEventSink, TokenRegistry};

pub(crate) type TestEngine = MarketEngine<BalanceManager, TokenRegistry, MemoryEventSink>;

pub(crate) const FEE: Amount = 10;
pub(crate) const GENESIS: i64 = 1_600_000_000;
pub(crate) const DAY: i64 = 86_400;

pub(crate) fn addr(s: &str) -> Address {
    Address::new(s)
}

pub(crate) fn cet_usdt() -> TradingPair {
    TradingPair::new("cet", "usdt")
}

/// Block `height`, five seconds per block after genesis.
pub(crate) fn ctx(height: i64) -> BlockContext {
    ctx_at(height, GENESIS + height * 5)
}

pub(crate) fn ctx_at(height: i64, unix_time: i64) -> BlockContext {
    BlockContext::from_unix(height, unix_time).unwrap()
}

pub(crate) fn engine() -> TestEngine {
    let params = MarketParams {
        create_market_fee: FEE,
        ..MarketParams::default()
    };
    MarketEngine::new(
        params,
        BalanceManager::new(),
        TokenRegistry::with_tokens(["cet", "usdt", "btc"]),
        MemoryEventSink::new(),
    )
    .unwrap()
}

/// `cet/usdt` at precision 4, created by `owner`, events drained.
pub(crate) fn listed_engine() -> TestEngine {
    let mut engine = engine();
    fund(&mut engine, "owner", "cet", FEE);
    engine
        .create_trading_pair(&ctx(1), &addr("owner"), "cet", "usdt", 4)
        .unwrap();
    engine.events_mut().take();
    engine
}

pub(crate) fn fund(engine: &mut TestEngine, who: &str, denom: &str, amount: Amount) {
    engine
        .collateral_mut()
        .deposit(&addr(who), &Coin::new(denom, amount))
        .unwrap();
}

pub(crate) fn order_msg(
    sender: &str,
    sequence: u64,
    side: Side,
    time_in_force: TimeInForce,
    price: &str,
    quantity: Amount,
) -> CreateOrderMsg {
    CreateOrderMsg {
        sender: addr(sender),
        sequence,
        identify: 0,
        trading_pair: "cet/usdt".to_string(),
        order_type: 2,
        price: Decimal::from_str(price).unwrap(),
        quantity,
        side: side.code(),
        time_in_force: time_in_force.code(),
        exist_blocks: 0,
    }
}

pub(crate) fn buy_msg(sender: &str, sequence: u64, price: &str, quantity: Amount) -> CreateOrderMsg {
    order_msg(sender, sequence, Side::Buy, TimeInForce::Gte, price, quantity)
}

pub(crate) fn sell_msg(sender: &str, sequence: u64, price: &str, quantity: Amount) -> CreateOrderMsg {
    order_msg(sender, sequence, Side::Sell, TimeInForce::Gte, price, quantity)
}
