//! Identifiers used throughout SpotBook.
//!
//! Every identifier is a plain value derived from transaction data, never
//! from clocks or randomness: all validators must derive the same ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{MarketError, constants};

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Opaque account address (bech32 string on the host chain).
///
/// A parsed or deserialized address is non-empty, has no whitespace or
/// control characters, and never contains the order id separator, so every
/// [`OrderId`] built from it parses back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Wrap an address that was already verified by the host chain.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let well_formed = !s.is_empty()
            && !s.contains(constants::ORDER_ID_SEPARATOR)
            && !s.chars().any(|c| c.is_whitespace() || c.is_control());
        if !well_formed {
            return Err(MarketError::bad_request(format!("invalid address: {s:?}")));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = MarketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Order identity: `(sender, sequence, sub_index)`.
///
/// `sub_index` distinguishes several orders created by one transaction
/// that share the sender's sequence. The canonical string form is
/// `"{sender}-{sequence}-{sub_index}"`; ordering is by sender, then
/// sequence, then sub-index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId {
    pub sender: Address,
    pub sequence: u64,
    pub sub_index: u8,
}

impl OrderId {
    #[must_use]
    pub fn new(sender: Address, sequence: u64, sub_index: u8) -> Self {
        Self {
            sender,
            sequence,
            sub_index,
        }
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.sender, self.sequence, self.sub_index)
    }
}

impl FromStr for OrderId {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(constants::ORDER_ID_SEPARATOR).collect();
        let [sender, sequence, sub_index] = parts.as_slice() else {
            return Err(MarketError::InvalidOrderId(s.to_string()));
        };
        let sender: Address = sender
            .parse()
            .map_err(|_| MarketError::InvalidOrderId(s.to_string()))?;
        let sequence = sequence
            .parse::<u64>()
            .map_err(|_| MarketError::InvalidOrderId(s.to_string()))?;
        let sub_index = sub_index
            .parse::<u8>()
            .map_err(|_| MarketError::InvalidOrderId(s.to_string()))?;
        Ok(Self::new(sender, sequence, sub_index))
    }
}

impl TryFrom<String> for OrderId {
    type Error = MarketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// TradingPair
// ---------------------------------------------------------------------------

/// A trading pair key, e.g. `cet/usdt` (stock `cet`, money `usdt`).
///
/// This is the value that namespaces every per-pair structure; see
/// `OrderStore::pair_index_mut` for the index it opens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingPair {
    pub stock: String,
    pub money: String,
}

impl TradingPair {
    #[must_use]
    pub fn new(stock: impl Into<String>, money: impl Into<String>) -> Self {
        Self {
            stock: stock.into(),
            money: money.into(),
        }
    }

    /// Returns the symbol (e.g., "cet/usdt").
    #[must_use]
    pub fn symbol(&self) -> String {
        self.to_string()
    }

    /// Check denom syntax and that stock and money differ.
    pub fn validate(&self) -> Result<(), MarketError> {
        validate_denom(&self.stock)?;
        validate_denom(&self.money)?;
        if self.stock == self.money {
            return Err(MarketError::InvalidSymbol {
                reason: "stock and money should be different".to_string(),
            });
        }
        Ok(())
    }
}

fn validate_denom(denom: &str) -> Result<(), MarketError> {
    let well_formed = !denom.is_empty()
        && denom.len() <= constants::MAX_DENOM_LEN
        && denom
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if well_formed {
        Ok(())
    } else {
        Err(MarketError::InvalidSymbol {
            reason: format!("invalid denom {denom:?}"),
        })
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.stock,
            constants::SYMBOL_SEPARATOR,
            self.money
        )
    }
}

impl FromStr for TradingPair {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(constants::SYMBOL_SEPARATOR).collect();
        let [stock, money] = parts.as_slice() else {
            return Err(MarketError::InvalidSymbol {
                reason: format!("{s:?} is not stock/money"),
            });
        };
        let pair = Self::new(*stock, *money);
        pair.validate()?;
        Ok(pair)
    }
}

impl TryFrom<String> for TradingPair {
    type Error = MarketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TradingPair> for String {
    fn from(pair: TradingPair) -> Self {
        pair.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
