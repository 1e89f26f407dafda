//! Determinism digests for cross-node consistency.
//!
//! Every node replaying the same messages must hold the same book. The
//! book root is a SHA-256 over the canonical order listing, so two books
//! can be compared without walking both.

use sha2::{Digest, Sha256};
use spotbook_types::Order;

/// Hash a sequence of orders in the order given.
///
/// Pass [`crate::GlobalOrderIndex::get_all_orders`] for the canonical root.
#[must_use]
pub fn compute_book_root<'a>(orders: impl IntoIterator<Item = &'a Order>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"spotbook:book_root:v1:");

    let mut count: u64 = 0;
    for order in orders {
        hasher.update(order.id.to_string().as_bytes());
        hasher.update([0]);
        hasher.update(order.trading_pair.to_string().as_bytes());
        hasher.update([0]);
        hasher.update([order.side.code(), order.time_in_force.code()]);
        hasher.update(order.price.to_string().as_bytes());
        hasher.update([0]);
        hasher.update(order.height.to_le_bytes());
        hasher.update(order.expire_height.to_le_bytes());
        hasher.update(order.quantity.to_le_bytes());
        hasher.update(order.left_stock.to_le_bytes());
        hasher.update(order.freeze.to_le_bytes());
        hasher.update(order.deal_stock.to_le_bytes());
        hasher.update(order.deal_money.to_le_bytes());
        count += 1;
    }
    hasher.update(count.to_le_bytes());

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

#[must_use]
pub fn verify_book_root<'a>(
    orders: impl IntoIterator<Item = &'a Order>,
    expected_root: &[u8; 32],
) -> bool {
    compute_book_root(orders) == *expected_root
}

/// Hex form of a root, for logs and query output.
#[must_use]
pub fn root_hex(root: &[u8; 32]) -> String {
    hex::encode(root)
}
