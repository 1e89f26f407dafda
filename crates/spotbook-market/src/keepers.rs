//! Narrow interfaces to the host chain, plus in-memory implementations.
//!
//! The engine never touches account storage, token metadata or the event
//! transport directly; it calls these traits synchronously and observes
//! the result immediately.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use spotbook_types::{Address, Coin, MarketError, MarketEvent, Result};

/// Height and time of the block being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockContext {
    pub height: i64,
    pub time: DateTime<Utc>,
}

impl BlockContext {
    #[must_use]
    pub fn new(height: i64, time: DateTime<Utc>) -> Self {
        Self { height, time }
    }

    /// Build a context from unix seconds.
    pub fn from_unix(height: i64, secs: i64) -> Result<Self> {
        let time = DateTime::from_timestamp(secs, 0).ok_or_else(|| MarketError::InvalidTime {
            reason: format!("block time {secs} out of range"),
        })?;
        Ok(Self { height, time })
    }

    /// Block time in unix seconds.
    #[must_use]
    pub fn unix_time(&self) -> i64 {
        self.time.timestamp()
    }
}

/// Account balances as seen by the market: available and frozen coins.
pub trait CollateralKeeper {
    /// Move `coin` from available to frozen.
    fn freeze(&mut self, owner: &Address, coin: &Coin) -> Result<()>;

    /// Move `coin` from frozen back to available.
    fn unfreeze(&mut self, owner: &Address, coin: &Coin) -> Result<()>;

    /// Move frozen `coin` of `from` to the available balance of `to`.
    fn settle(&mut self, from: &Address, to: &Address, coin: &Coin) -> Result<()>;

    /// Take `coin` from the available balance of `payer` as a fee.
    fn charge_fee(&mut self, payer: &Address, coin: &Coin) -> Result<()>;
}

/// Token metadata and forbid status.
pub trait AssetKeeper {
    fn token_exists(&self, denom: &str) -> bool;

    /// Globally forbidden by its issuer.
    fn is_token_forbidden(&self, denom: &str) -> bool;

    /// `address` is on the issuer's forbid list for `denom`.
    fn is_forbidden_by_token_issuer(&self, denom: &str, address: &Address) -> bool;
}

/// Fire-and-forget lifecycle notifications.
pub trait EventSink {
    fn publish(&mut self, event: MarketEvent);
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// Token registry backed by ordered sets.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: BTreeSet<String>,
    forbidden: BTreeSet<String>,
    forbidden_addresses: BTreeSet<(String, Address)>,
}

impl TokenRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that knows every denom in `denoms`.
    #[must_use]
    pub fn with_tokens<'a>(denoms: impl IntoIterator<Item = &'a str>) -> Self {
        let mut registry = Self::new();
        for denom in denoms {
            registry.register(denom);
        }
        registry
    }

    pub fn register(&mut self, denom: &str) {
        self.tokens.insert(denom.to_string());
    }

    pub fn forbid(&mut self, denom: &str) {
        self.forbidden.insert(denom.to_string());
    }

    pub fn forbid_address(&mut self, denom: &str, address: &Address) {
        self.forbidden_addresses
            .insert((denom.to_string(), address.clone()));
    }
}

impl AssetKeeper for TokenRegistry {
    fn token_exists(&self, denom: &str) -> bool {
        self.tokens.contains(denom)
    }

    fn is_token_forbidden(&self, denom: &str) -> bool {
        self.forbidden.contains(denom)
    }

    fn is_forbidden_by_token_issuer(&self, denom: &str, address: &Address) -> bool {
        self.forbidden_addresses
            .contains(&(denom.to_string(), address.clone()))
    }
}

/// Collects events in publish order.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSink {
    events: Vec<MarketEvent>,
}

impl MemoryEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[MarketEvent] {
        &self.events
    }

    /// Drain everything published so far.
    pub fn take(&mut self) -> Vec<MarketEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn topics(&self) -> Vec<&'static str> {
        self.events.iter().map(MarketEvent::topic).collect()
    }
}

impl EventSink for MemoryEventSink {
    fn publish(&mut self, event: MarketEvent) {
        tracing::trace!(topic = event.topic(), "Event published");
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use spotbook_types::NewHeightInfo;

    use super::*;

    #[test]
    fn context_from_unix() {
        let ctx = BlockContext::from_unix(7, 1_600_000_000).unwrap();
        assert_eq!(ctx.height, 7);
        assert_eq!(ctx.unix_time(), 1_600_000_000);
        assert!(BlockContext::from_unix(1, i64::MAX).is_err());
    }

    #[test]
    fn registry_forbid_paths() {
        let alice = Address::new("alice");
        let mut registry = TokenRegistry::with_tokens(["cet", "usdt"]);
        assert!(registry.token_exists("cet"));
        assert!(!registry.token_exists("btc"));

        registry.forbid("usdt");
        registry.forbid_address("cet", &alice);
        assert!(registry.is_token_forbidden("usdt"));
        assert!(!registry.is_token_forbidden("cet"));
        assert!(registry.is_forbidden_by_token_issuer("cet", &alice));
        assert!(!registry.is_forbidden_by_token_issuer("cet", &Address::new("bob")));
    }

    #[test]
    fn sink_keeps_publish_order() {
        let mut sink = MemoryEventSink::new();
        for height in 1..=3 {
            sink.publish(MarketEvent::NewHeight(NewHeightInfo {
                height,
                timestamp: 0,
            }));
        }
        assert_eq!(sink.topics(), vec!["height-info"; 3]);
        let drained = sink.take();
        assert_eq!(drained.len(), 3);
        assert!(sink.events().is_empty());
    }
}
