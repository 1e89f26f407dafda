//! # spotbook-market
//!
//! **Market engine**: trading-pair lifecycle, order admission and
//! cancellation, end-of-block matching, and the expiry and delisting sweeps.
//!
//! ## Architecture
//!
//! [`MarketEngine`] is generic over three host-chain collaborators:
//! 1. **[`CollateralKeeper`]**: freezes, releases and settles coins
//! 2. **[`AssetKeeper`]**: token existence and forbid status
//! 3. **[`EventSink`]**: receives every [`spotbook_types::MarketEvent`]
//!
//! In-memory versions ([`BalanceManager`], [`TokenRegistry`],
//! [`MemoryEventSink`]) let the engine run without a chain.
//!
//! ## Block Flow
//!
//! ```text
//! handle(msg)*  ->  end_block()
//!   create/cancel pairs, orders     match, IOC sweep, expiry + delist sweep
//! ```
//!
//! Every order lives in both the per-pair index and the global index of
//! [`spotbook_matchcore::OrderStore`], or in neither.

pub mod balance_manager;
pub mod cleanup;
pub mod delist;
pub mod end_block;
pub mod engine;
pub mod keepers;
pub mod msg;
pub mod query;

#[cfg(test)]
mod testing;

pub use balance_manager::BalanceManager;
pub use cleanup::CleanupScheduler;
pub use delist::DelistScheduler;
pub use end_block::EndBlockSummary;
pub use engine::MarketEngine;
pub use keepers::{
    AssetKeeper, BlockContext, CollateralKeeper, EventSink, MemoryEventSink, TokenRegistry,
};
pub use msg::{CreateOrderMsg, MarketMsg};
pub use query::{MarketInfoResponse, Querier};
