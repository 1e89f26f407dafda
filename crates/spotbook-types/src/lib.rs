//! # spotbook-types
//!
//! Shared types, errors, and configuration for the **SpotBook** on-chain
//! order book.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`Address`], [`OrderId`], [`TradingPair`]
//! - **Order model**: [`Order`], [`Side`], [`OrderType`], [`TimeInForce`]
//! - **Market model**: [`MarketInfo`], [`MarketStatus`]
//! - **Collateral**: [`Amount`], [`Coin`], [`BalanceEntry`]
//! - **Events**: [`MarketEvent`] and its payloads, [`CancelReason`]
//! - **Configuration**: [`MarketParams`]
//! - **Errors**: [`MarketError`] with `MKT_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod market;
pub mod order;

pub use balance::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use market::*;
pub use order::*;

// Constants are accessed via `spotbook_types::constants::FOO`
// (not re-exported to avoid name collisions).
