//! End-to-end tests through the public engine API.
//!
//! These drive whole blocks of messages through `MarketEngine::handle` and
//! `end_block`, and check what must hold after every block: supply is
//! conserved, frozen balances equal the freezes of resting orders, the
//! indices agree, and two engines replaying the same messages end in the
//! same state.

use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use spotbook_market::{
    BalanceManager, BlockContext, CreateOrderMsg, MarketEngine, MarketMsg, MemoryEventSink,
    Querier, TokenRegistry,
};
use spotbook_types::{
    Address, Amount, CancelReason, Coin, MarketError, MarketEvent, MarketParams, Side, TimeInForce,
};

type Engine = MarketEngine<BalanceManager, TokenRegistry, MemoryEventSink>;

const GENESIS: i64 = 1_700_000_000;
const FUNDING: Amount = 1_000_000;
const TRADERS: [&str; 5] = ["t0", "t1", "t2", "t3", "t4"];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn ctx(height: i64) -> BlockContext {
    BlockContext::from_unix(height, GENESIS + height * 600).unwrap()
}

fn new_engine() -> Engine {
    let params = MarketParams::from_json(r#"{"create_market_fee": 100, "gte_order_lifetime": 40}"#)
        .unwrap();
    let mut engine = MarketEngine::new(
        params,
        BalanceManager::new(),
        TokenRegistry::with_tokens(["cet", "usdt"]),
        MemoryEventSink::new(),
    )
    .unwrap();
    for who in TRADERS.iter().chain(["owner"].iter()) {
        for denom in ["cet", "usdt"] {
            engine
                .collateral_mut()
                .deposit(&Address::new(*who), &Coin::new(denom, FUNDING))
                .unwrap();
        }
    }
    engine
        .handle(
            &ctx(1),
            &MarketMsg::CreateTradingPair {
                creator: Address::new("owner"),
                stock: "cet".into(),
                money: "usdt".into(),
                price_precision: 4,
            },
        )
        .unwrap();
    engine
}

fn order(
    sender: &str,
    sequence: u64,
    side: Side,
    tif: TimeInForce,
    price: &str,
    quantity: Amount,
) -> MarketMsg {
    MarketMsg::CreateOrder(CreateOrderMsg {
        sender: Address::new(sender),
        sequence,
        identify: 0,
        trading_pair: "cet/usdt".into(),
        order_type: 2,
        price: Decimal::from_str(price).unwrap(),
        quantity,
        side: side.code(),
        time_in_force: tif.code(),
        exist_blocks: 0,
    })
}

/// Supply conservation and freeze accounting.
fn assert_books_balance(engine: &Engine) {
    engine.store().verify().unwrap();

    let accounts = TRADERS.len() as Amount + 1;
    let ledger = engine.collateral();
    assert_eq!(ledger.total_supply("usdt"), FUNDING * accounts);
    assert_eq!(
        ledger.total_supply("cet") + ledger.collected_fees("cet"),
        FUNDING * accounts
    );

    let orders = engine.store().global().get_all_orders();
    assert!(orders.iter().all(|o| o.is_freeze_consistent()));
    assert!(orders.iter().all(|o| o.left_stock > 0 && o.left_stock <= o.quantity));
    let frozen_money: Amount = orders
        .iter()
        .filter(|o| o.side == Side::Buy)
        .map(|o| o.freeze)
        .sum();
    let frozen_stock: Amount = orders
        .iter()
        .filter(|o| o.side == Side::Sell)
        .map(|o| o.freeze)
        .sum();
    assert_eq!(ledger.total_frozen("usdt"), frozen_money);
    assert_eq!(ledger.total_frozen("cet"), frozen_stock);
}

#[test]
fn full_lifecycle() {
    init_tracing();
    let mut engine = new_engine();

    // Block 2: a resting ask, a crossing bid, and an IOC ask that cannot fill.
    let c = ctx(2);
    engine.handle(&c, &order("t0", 1, Side::Sell, TimeInForce::Gte, "2.0", 300)).unwrap();
    engine.handle(&c, &order("t1", 1, Side::Buy, TimeInForce::Gte, "2.1", 100)).unwrap();
    engine.handle(&c, &order("t2", 1, Side::Sell, TimeInForce::Ioc, "3.0", 10)).unwrap();
    let summary = engine.end_block(&c).unwrap();
    assert_eq!(summary.fills, 1);
    assert_eq!(summary.ioc_cancelled, 1);
    assert_books_balance(&engine);

    // 100 at 2.05: t1 pays 205 usdt for 100 cet.
    let t1 = Address::new("t1");
    assert_eq!(engine.collateral().balance(&t1, "cet").available, FUNDING + 100);
    assert_eq!(engine.collateral().balance(&t1, "usdt").available, FUNDING - 205);
    assert_eq!(
        engine.market(&"cet/usdt".parse().unwrap()).unwrap().last_executed_price,
        Decimal::new(205, 2)
    );

    // Block 3: t0 cancels the rest of its ask.
    let c = ctx(3);
    let err = engine
        .handle(
            &c,
            &MarketMsg::CancelOrder {
                sender: t1.clone(),
                order_id: "t0-1-0".into(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, MarketError::NotOrderOwner { .. }));
    engine
        .handle(
            &c,
            &MarketMsg::CancelOrder {
                sender: Address::new("t0"),
                order_id: "t0-1-0".into(),
            },
        )
        .unwrap();
    engine.end_block(&c).unwrap();
    assert!(engine.store().is_empty());
    assert_books_balance(&engine);

    let reasons: Vec<CancelReason> = engine
        .events()
        .events()
        .iter()
        .filter_map(|e| match e {
            MarketEvent::CancelOrder(info) => Some(info.del_reason),
            _ => None,
        })
        .collect();
    assert_eq!(
        reasons,
        vec![
            CancelReason::FullyFilled,
            CancelReason::IocUnmatched,
            CancelReason::Manual
        ]
    );
}

#[test]
fn delist_through_messages_and_queries() {
    init_tracing();
    let mut engine = new_engine();
    let c = ctx(2);
    engine.handle(&c, &order("t0", 1, Side::Buy, TimeInForce::Gte, "1.5", 10)).unwrap();
    engine.end_block(&c).unwrap();

    let effective = c.unix_time() + engine.params().market_min_expired_time;
    engine
        .handle(
            &c,
            &MarketMsg::CancelTradingPair {
                sender: Address::new("owner"),
                trading_pair: "cet/usdt".into(),
                effective_time: effective,
            },
        )
        .unwrap();

    let querier = Querier::new(&engine);
    let wait = |time: i64| -> Vec<String> {
        let body = format!(r#"{{"time":{time}}}"#);
        serde_json::from_slice(&querier.query("wait-cancel-markets", body.as_bytes()).unwrap())
            .unwrap()
    };
    assert!(wait(effective - 1).is_empty());
    assert_eq!(wait(effective), vec!["cet/usdt"]);
    assert_eq!(wait(effective + 1), vec!["cet/usdt"]);

    // Blocks are ten minutes apart; run until the delist has been swept.
    let mut height = 3;
    while engine.market(&"cet/usdt".parse().unwrap()).is_some() {
        let summary = engine.end_block(&ctx(height)).unwrap();
        if !summary.delisted.is_empty() {
            assert!(ctx(height).unix_time() >= effective);
        }
        height += 1;
        assert!(height < 2_000, "delist never swept");
    }
    assert!(engine.store().is_empty());
    assert_books_balance(&engine);

    let querier = Querier::new(&engine);
    let err = querier
        .query("market-info", br#"{"trading_pair":"cet/usdt"}"#)
        .unwrap_err();
    assert!(matches!(err, MarketError::MarketNotFound(_)));
}

#[test]
fn gte_orders_expire_on_sweep() {
    init_tracing();
    let mut engine = new_engine();
    let c = ctx(2);
    engine.handle(&c, &order("t3", 1, Side::Sell, TimeInForce::Gte, "9", 10)).unwrap();
    engine.end_block(&c).unwrap();

    // Lifetime is 40 blocks; sweeps run on the first block of each day.
    let mut height = 3;
    while !engine.store().is_empty() {
        let summary = engine.end_block(&ctx(height)).unwrap();
        if summary.expired > 0 {
            assert!(height >= 2 + 40);
            assert!(summary.swept);
        }
        height += 1;
        assert!(height < 1_000, "order never expired");
    }
    assert_books_balance(&engine);
}

/// A random but reproducible block of messages.
fn random_block(rng: &mut StdRng, height: i64, sequences: &mut [u64; 5]) -> Vec<MarketMsg> {
    let mut msgs = Vec::new();
    for _ in 0..rng.gen_range(1..12) {
        let trader = rng.gen_range(0..TRADERS.len());
        let sender = TRADERS[trader];
        if rng.gen_bool(0.2) && sequences[trader] > 0 {
            let target = rng.gen_range(0..sequences[trader]);
            msgs.push(MarketMsg::CancelOrder {
                sender: Address::new(sender),
                order_id: format!("{sender}-{target}-0"),
            });
            continue;
        }
        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let tif = if rng.gen_bool(0.2) {
            TimeInForce::Ioc
        } else {
            TimeInForce::Gte
        };
        let price = Decimal::new(rng.gen_range(9_500..10_500), 4).to_string();
        let msg = order(sender, sequences[trader], side, tif, &price, rng.gen_range(1..400));
        sequences[trader] += 1;
        msgs.push(msg);
    }
    if height % 17 == 0 {
        msgs.push(MarketMsg::ModifyPricePrecision {
            sender: Address::new("owner"),
            trading_pair: "cet/usdt".into(),
            price_precision: 4 + u32::try_from(height % 3).unwrap(),
        });
    }
    msgs
}

#[test]
fn replay_is_deterministic() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut sequences = [0u64; 5];
    let blocks: Vec<Vec<MarketMsg>> = (2..120)
        .map(|height| random_block(&mut rng, height, &mut sequences))
        .collect();

    let mut a = new_engine();
    let mut b = new_engine();
    for (offset, msgs) in blocks.iter().enumerate() {
        let c = ctx(2 + i64::try_from(offset).unwrap());
        for msg in msgs {
            let ra = a.handle(&c, msg);
            let rb = b.handle(&c, msg);
            assert_eq!(ra.is_ok(), rb.is_ok(), "{} diverged", msg.kind());
            if let Err(err) = ra {
                assert!(!err.is_fatal(), "{err}");
            }
        }
        let sa = a.end_block(&c).unwrap();
        let sb = b.end_block(&c).unwrap();
        assert_eq!(sa, sb);
        assert_eq!(a.state_root().unwrap(), b.state_root().unwrap());
        assert_books_balance(&a);
    }

    assert_eq!(a.events().events(), b.events().events());
    let fills = a
        .events()
        .events()
        .iter()
        .filter(|e| matches!(e, MarketEvent::FillOrder(_)))
        .count();
    assert!(fills > 0, "random flow never traded");
}

#[test]
fn different_histories_differ() {
    let mut a = new_engine();
    let mut b = new_engine();
    let c = ctx(2);
    a.handle(&c, &order("t0", 1, Side::Buy, TimeInForce::Gte, "1", 10)).unwrap();
    b.handle(&c, &order("t0", 1, Side::Buy, TimeInForce::Gte, "1", 11)).unwrap();
    assert_ne!(a.state_root().unwrap(), b.state_root().unwrap());
}
