//! Read-only queries and the path-based JSON querier.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use spotbook_types::{Address, MarketError, MarketStatus, Order, OrderId, Result, TradingPair};

use crate::engine::MarketEngine;

pub const QUERY_MARKET: &str = "market-info";
pub const QUERY_ORDER: &str = "order-info";
pub const QUERY_USER_ORDERS: &str = "user-order-list";
pub const QUERY_WAIT_CANCEL_MARKETS: &str = "wait-cancel-markets";

/// Public view of a listed market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfoResponse {
    pub creator: Address,
    pub stock: String,
    pub money: String,
    pub price_precision: u32,
    pub last_executed_price: Decimal,
    pub status: MarketStatus,
}

impl<C, A, E> MarketEngine<C, A, E> {
    pub fn query_market(&self, pair: &TradingPair) -> Result<MarketInfoResponse> {
        let market = self
            .market(pair)
            .ok_or_else(|| MarketError::MarketNotFound(pair.clone()))?;
        Ok(MarketInfoResponse {
            creator: market.creator.clone(),
            stock: market.pair.stock.clone(),
            money: market.pair.money.clone(),
            price_precision: market.price_precision,
            last_executed_price: market.last_executed_price,
            status: market.status,
        })
    }

    pub fn query_order(&self, order_id: &OrderId) -> Result<Order> {
        self.store
            .global()
            .query_order(order_id)
            .cloned()
            .ok_or_else(|| MarketError::OrderNotFound(order_id.clone()))
    }

    /// Ids of the orders `owner` has resting, ascending. Empty for an
    /// unknown owner.
    #[must_use]
    pub fn query_user_orders(&self, owner: &Address) -> Vec<OrderId> {
        self.store.global().get_orders_from_user(owner)
    }

    /// Pairs pending delist with effective time at or before `time`.
    #[must_use]
    pub fn query_wait_cancel_markets(&self, time: i64) -> Vec<TradingPair> {
        self.delist.get_delist_symbols_before_time(time)
    }
}

#[derive(Debug, Deserialize)]
struct MarketRequest {
    trading_pair: String,
}

#[derive(Debug, Deserialize)]
struct OrderRequest {
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct UserOrdersRequest {
    user: String,
}

#[derive(Debug, Deserialize)]
struct WaitCancelRequest {
    time: i64,
}

/// Dispatches `(path, json)` queries to the engine and answers in JSON.
#[derive(Debug)]
pub struct Querier<'a, C, A, E> {
    engine: &'a MarketEngine<C, A, E>,
}

impl<'a, C, A, E> Querier<'a, C, A, E> {
    #[must_use]
    pub fn new(engine: &'a MarketEngine<C, A, E>) -> Self {
        Self { engine }
    }

    pub fn query(&self, path: &str, data: &[u8]) -> Result<Vec<u8>> {
        let response = match path {
            QUERY_MARKET => {
                let req: MarketRequest = parse_request(data)?;
                let pair: TradingPair = req
                    .trading_pair
                    .parse()
                    .map_err(|e: MarketError| MarketError::bad_request(e.to_string()))?;
                serde_json::to_vec(&self.engine.query_market(&pair)?)?
            }
            QUERY_ORDER => {
                let req: OrderRequest = parse_request(data)?;
                let id: OrderId = req
                    .order_id
                    .parse()
                    .map_err(|e: MarketError| MarketError::bad_request(e.to_string()))?;
                serde_json::to_vec(&self.engine.query_order(&id)?)?
            }
            QUERY_USER_ORDERS => {
                let req: UserOrdersRequest = parse_request(data)?;
                let user: Address = req.user.parse()?;
                let ids: Vec<String> = self
                    .engine
                    .query_user_orders(&user)
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                serde_json::to_vec(&ids)?
            }
            QUERY_WAIT_CANCEL_MARKETS => {
                let req: WaitCancelRequest = parse_request(data)?;
                serde_json::to_vec(&self.engine.query_wait_cancel_markets(req.time))?
            }
            other => {
                return Err(MarketError::bad_request(format!(
                    "unknown query path {other:?}"
                )));
            }
        };
        Ok(response)
    }
}

fn parse_request<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| MarketError::bad_request(e.to_string()))
}

#[cfg(test)]
mod tests {
    use spotbook_types::{Side, TimeInForce};

    use super::*;
    use crate::testing::*;

    #[test]
    fn market_info_query() {
        let engine = listed_engine();
        let querier = Querier::new(&engine);
        let bytes = querier
            .query(QUERY_MARKET, br#"{"trading_pair":"cet/usdt"}"#)
            .unwrap();
        let info: MarketInfoResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(info.creator, addr("owner"));
        assert_eq!(info.price_precision, 4);
        assert_eq!(info.status, MarketStatus::Active);

        let err = querier
            .query(QUERY_MARKET, br#"{"trading_pair":"btc/usdt"}"#)
            .unwrap_err();
        assert!(matches!(err, MarketError::MarketNotFound(_)));
        let err = querier
            .query(QUERY_MARKET, br#"{"trading_pair":"btcusdt"}"#)
            .unwrap_err();
        assert!(matches!(err, MarketError::BadRequest { .. }));
    }

    #[test]
    fn order_queries() {
        let mut engine = listed_engine();
        fund(&mut engine, "buyer", "usdt", 1_000);
        let id = engine
            .create_order(
                &ctx(5),
                &order_msg("buyer", 7, Side::Buy, TimeInForce::Gte, "1.1051", 50),
            )
            .unwrap();
        let querier = Querier::new(&engine);

        let bytes = querier
            .query(QUERY_ORDER, br#"{"order_id":"buyer-7-0"}"#)
            .unwrap();
        let order: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(order["id"], "buyer-7-0");
        assert_eq!(order["freeze"], 56);

        let bytes = querier
            .query(QUERY_USER_ORDERS, br#"{"user":"buyer"}"#)
            .unwrap();
        let ids: Vec<String> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ids, vec![id.to_string()]);

        let err = querier
            .query(QUERY_ORDER, br#"{"order_id":"buyer-8-0"}"#)
            .unwrap_err();
        assert!(matches!(err, MarketError::OrderNotFound(_)));
        let err = querier.query(QUERY_ORDER, br#"{"order_id":"buyer"}"#).unwrap_err();
        assert!(matches!(err, MarketError::BadRequest { .. }));
    }

    #[test]
    fn punctuated_owner_queries_roundtrip() {
        let mut engine = listed_engine();
        fund(&mut engine, "alice_1", "usdt", 100);
        let id = engine
            .create_order(&ctx(5), &buy_msg("alice_1", 1, "1", 10))
            .unwrap();
        let querier = Querier::new(&engine);

        let body = format!(r#"{{"order_id":"{id}"}}"#);
        let bytes = querier.query(QUERY_ORDER, body.as_bytes()).unwrap();
        let order: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(order["id"], id.to_string());

        let bytes = querier
            .query(QUERY_USER_ORDERS, br#"{"user":"alice_1"}"#)
            .unwrap();
        let ids: Vec<String> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ids, vec![id.to_string()]);
    }

    #[test]
    fn wait_cancel_boundary() {
        let mut engine = listed_engine();
        let c = ctx(10);
        let t = c.unix_time() + engine.params().market_min_expired_time;
        engine
            .cancel_trading_pair(&c, &addr("owner"), &cet_usdt(), t)
            .unwrap();

        assert!(engine.query_wait_cancel_markets(t - 1).is_empty());
        assert_eq!(engine.query_wait_cancel_markets(t), vec![cet_usdt()]);
        assert_eq!(engine.query_wait_cancel_markets(t + 1), vec![cet_usdt()]);

        let querier = Querier::new(&engine);
        let body = format!(r#"{{"time":{}}}"#, t + 1);
        let bytes = querier
            .query(QUERY_WAIT_CANCEL_MARKETS, body.as_bytes())
            .unwrap();
        let pairs: Vec<String> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(pairs, vec!["cet/usdt".to_string()]);
    }

    #[test]
    fn malformed_requests() {
        let engine = listed_engine();
        let querier = Querier::new(&engine);
        let cases: [(&str, &[u8]); 4] = [
            (QUERY_MARKET, b"{"),
            (QUERY_USER_ORDERS, br#"{"user":""}"#),
            (QUERY_WAIT_CANCEL_MARKETS, br#"{"time":"soon"}"#),
            ("order-book", b"{}"),
        ];
        for (path, data) in cases {
            let err = querier.query(path, data).unwrap_err();
            assert!(matches!(err, MarketError::BadRequest { .. }), "{path}: {err}");
        }
    }
}
