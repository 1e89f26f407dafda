//! # spotbook-matchcore
//!
//! Deterministic order storage and matching-candidate selection.
//!
//! ## Components
//!
//! - **[`PairOrderIndex`]**: all orders of one pair under three access
//!   paths (matching priority, creation height, owner)
//! - **[`GlobalOrderIndex`]**: cross-pair lookup by id and by owner
//! - **[`OrderStore`]**: mutates both in lock-step
//! - **[`CandidateSet`]**: the crossing top-of-book levels and their
//!   execution price
//! - **[`match_candidates`]**: pure fill computation for one round
//! - **[`compute_book_root`]**: SHA-256 digest of the canonical listing
//!
//! Nothing here touches balances or emits events; that is the market
//! engine's job.

pub mod candidates;
pub mod determinism;
pub mod global_index;
pub mod matcher;
pub mod pair_index;
pub mod store;

pub use candidates::CandidateSet;
pub use determinism::{compute_book_root, root_hex, verify_book_root};
pub use global_index::GlobalOrderIndex;
pub use matcher::{Fill, match_candidates};
pub use pair_index::{PairOrderIndex, Seq};
pub use store::OrderStore;
