//! Error types for the SpotBook order book.
//!
//! All errors use the `MKT_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by handling category:
//! - 1xx: Validation errors (malformed or out-of-range message fields)
//! - 2xx: Authorization errors (sender is not the owner)
//! - 3xx: Resource errors (balance cannot be frozen / released)
//! - 4xx: Lookup errors (unknown pair / order, bad query input)
//! - 9xx: Consistency and internal errors
//!
//! Categories 1xx–4xx are recovered at the message boundary: the caller gets
//! the error and no state was touched. [`MarketError::InvariantViolation`]
//! means the book is already corrupt and the node must halt.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Address, Amount, OrderId, TradingPair};

/// Handling category of a [`MarketError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    Authorization,
    Resource,
    NotFound,
    Internal,
    Consistency,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Resource => write!(f, "RESOURCE"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Consistency => write!(f, "CONSISTENCY"),
        }
    }
}

/// Central error enum for all SpotBook operations.
#[derive(Debug, Error)]
pub enum MarketError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// The order identifier string is not `sender-sequence-index`.
    #[error("MKT_ERR_100: Invalid order id: {0}")]
    InvalidOrderId(String),

    /// The trading pair symbol or one of its denoms is malformed.
    #[error("MKT_ERR_101: Invalid symbol: {reason}")]
    InvalidSymbol { reason: String },

    /// Price precision outside `[0, max]` or finer than the pair allows.
    #[error("MKT_ERR_102: Invalid price precision {precision}, allowed maximum is {max}")]
    InvalidPricePrecision { precision: u32, max: u32 },

    /// Price is zero, negative, or too large.
    #[error("MKT_ERR_103: Invalid price: {0}")]
    InvalidPrice(Decimal),

    /// Quantity is zero.
    #[error("MKT_ERR_104: Invalid quantity: {0}")]
    InvalidQuantity(Amount),

    /// Unknown trade side wire code.
    #[error("MKT_ERR_105: Invalid trade side: {0}")]
    InvalidTradeSide(u8),

    /// Unknown order type wire code.
    #[error("MKT_ERR_106: Invalid order type: {0}")]
    InvalidOrderType(u8),

    /// Unknown time-in-force wire code.
    #[error("MKT_ERR_107: Invalid time in force: {0}")]
    InvalidTimeInForce(u8),

    /// A time value (effective delist time) is out of range.
    #[error("MKT_ERR_108: Invalid time: {reason}")]
    InvalidTime { reason: String },

    /// The requested GTE lifetime is out of range.
    #[error("MKT_ERR_109: Invalid order lifetime: {blocks} blocks (max {max})")]
    InvalidExistBlocks { blocks: i64, max: i64 },

    /// An order with this identity already rests in the book.
    #[error("MKT_ERR_110: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The trading pair is already listed.
    #[error("MKT_ERR_111: Market already exists: {0}")]
    MarketAlreadyExists(TradingPair),

    /// The trading pair is pending delist and accepts no changes.
    #[error("MKT_ERR_112: Market is not active: {0}")]
    MarketNotActive(TradingPair),

    /// The token is unknown to the asset keeper.
    #[error("MKT_ERR_113: Token not found: {0}")]
    TokenNotFound(String),

    /// The token is globally forbidden.
    #[error("MKT_ERR_114: Token is forbidden: {0}")]
    TokenForbidden(String),

    /// The token issuer forbade this address from using the token.
    #[error("MKT_ERR_115: Address {address} is forbidden by the issuer of {token}")]
    AddressForbidden { token: String, address: Address },

    /// The market parameters failed validation.
    #[error("MKT_ERR_116: Configuration error: {0}")]
    Configuration(String),

    // =================================================================
    // Authorization Errors (2xx)
    // =================================================================
    /// Only the market creator may cancel or modify a market.
    #[error("MKT_ERR_200: {sender} is not the creator of market {pair}")]
    NotMarketOwner { pair: TradingPair, sender: Address },

    /// Only the order owner may cancel an order.
    #[error("MKT_ERR_201: {sender} is not the owner of order {order_id}")]
    NotOrderOwner { order_id: OrderId, sender: Address },

    // =================================================================
    // Resource Errors (3xx)
    // =================================================================
    /// Not enough available balance to freeze or pay a fee.
    #[error("MKT_ERR_300: Insufficient {denom} balance: need {needed}, have {available}")]
    InsufficientBalance {
        denom: String,
        needed: Amount,
        available: Amount,
    },

    /// Not enough frozen balance to unfreeze or settle.
    #[error("MKT_ERR_301: Insufficient frozen {denom}: need {needed}, have {frozen}")]
    InsufficientFrozen {
        denom: String,
        needed: Amount,
        frozen: Amount,
    },

    /// An amount computation does not fit in [`Amount`].
    #[error("MKT_ERR_302: Amount overflow: {reason}")]
    AmountOverflow { reason: String },

    // =================================================================
    // Lookup Errors (4xx)
    // =================================================================
    /// The trading pair is not listed.
    #[error("MKT_ERR_400: Market not found: {0}")]
    MarketNotFound(TradingPair),

    /// The order does not rest in the book.
    #[error("MKT_ERR_401: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Malformed query input.
    #[error("MKT_ERR_402: Bad request: {reason}")]
    BadRequest { reason: String },

    // =================================================================
    // Internal / Consistency (9xx)
    // =================================================================
    /// Output encoding failed.
    #[error("MKT_ERR_900: Encoding error: {0}")]
    Encoding(String),

    /// Book state is inconsistent. Never recoverable.
    #[error("MKT_ERR_901: Invariant violation: {reason}")]
    InvariantViolation { reason: String },
}

impl MarketError {
    /// The handling category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidOrderId(_)
            | Self::InvalidSymbol { .. }
            | Self::InvalidPricePrecision { .. }
            | Self::InvalidPrice(_)
            | Self::InvalidQuantity(_)
            | Self::InvalidTradeSide(_)
            | Self::InvalidOrderType(_)
            | Self::InvalidTimeInForce(_)
            | Self::InvalidTime { .. }
            | Self::InvalidExistBlocks { .. }
            | Self::DuplicateOrder(_)
            | Self::MarketAlreadyExists(_)
            | Self::MarketNotActive(_)
            | Self::TokenNotFound(_)
            | Self::TokenForbidden(_)
            | Self::AddressForbidden { .. }
            | Self::Configuration(_)
            | Self::BadRequest { .. } => ErrorCategory::Validation,
            Self::NotMarketOwner { .. } | Self::NotOrderOwner { .. } => {
                ErrorCategory::Authorization
            }
            Self::InsufficientBalance { .. }
            | Self::InsufficientFrozen { .. }
            | Self::AmountOverflow { .. } => ErrorCategory::Resource,
            Self::MarketNotFound(_) | Self::OrderNotFound(_) => ErrorCategory::NotFound,
            Self::Encoding(_) => ErrorCategory::Internal,
            Self::InvariantViolation { .. } => ErrorCategory::Consistency,
        }
    }

    /// `true` when the error means replicated state is already divergent.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Consistency
    }

    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest {
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, MarketError>;

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}
