//! System-wide constants for the SpotBook order book.

/// Separator between stock and money in a trading pair symbol.
pub const SYMBOL_SEPARATOR: char = '/';

/// Separator between the parts of an order id string.
pub const ORDER_ID_SEPARATOR: char = '-';

/// Longest accepted denom.
pub const MAX_DENOM_LEN: usize = 16;

/// Maximum decimal places a pair's price may declare.
pub const MAX_PRICE_PRECISION: u32 = 18;

/// Largest scale `rust_decimal` can carry.
pub const DECIMAL_MAX_SCALE: u32 = 28;

/// Default fee for listing a new trading pair, in `DEFAULT_FEE_DENOM`.
pub const DEFAULT_CREATE_MARKET_FEE: u64 = 1_000_000_000_000;

/// Denom in which market fees are charged.
pub const DEFAULT_FEE_DENOM: &str = "cet";

/// Default lifetime of a GTE order, in blocks.
pub const DEFAULT_GTE_ORDER_LIFETIME: i64 = 10_000;

/// Longest lifetime a GTE order may request, in blocks.
pub const DEFAULT_MAX_GTE_ORDER_LIFETIME: i64 = 6_000_000;

/// Minimum delay between a delist request and its effective time, in seconds.
pub const DEFAULT_MARKET_MIN_EXPIRED_TIME: i64 = 7 * 24 * 60 * 60;

/// Granularity of the expiry sweep marker, in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: i64 = 24 * 60 * 60;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
