//! Stock ledger: per-product quantity-on-hand with a monotonic version.

use async_trait::async_trait;
use common::ProductId;
use serde::Serialize;

use crate::{Result, StoreError};

/// Quantity-on-hand and optimistic version of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub on_hand: u32,
    /// Incremented on every successful stock mutation.
    pub version: i64,
}

/// Atomic conditional stock mutation.
///
/// The decrement is a single guarded update evaluated by the store; it never
/// reads the current quantity and writes it back, so it is safe under any
/// number of concurrent decrements.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// The transaction handle this ledger participates in.
    type Tx: Send;

    /// Decreases stock by `quantity` if at least that much is on hand.
    ///
    /// Fails with `InsufficientStock` when the guard rejects the update and
    /// with `ProductNotFound` when the product does not exist.
    async fn decrease_stock(
        &self,
        tx: &mut Self::Tx,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()>;

    /// Unconditionally adds `quantity` to stock. Used for restocking.
    async fn increase_stock(&self, product_id: ProductId, quantity: u32) -> Result<()>;

    /// Reads the current stock level.
    async fn stock_level(&self, product_id: ProductId) -> Result<StockLevel>;
}

/// Largest quantity a stock level or cart line may hold; both stores agree
/// with the `INTEGER` columns of the Postgres schema.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// Adds `added` to `current`, rejecting sums above [`MAX_QUANTITY`].
pub(crate) fn add_quantity(current: u32, added: u32) -> Result<u32> {
    current
        .checked_add(added)
        .filter(|sum| *sum <= MAX_QUANTITY)
        .ok_or(StoreError::InvalidQuantity(added))
}

/// Rejects zero quantities before they reach a store.
pub(crate) fn ensure_positive(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(StoreError::InvalidQuantity(quantity));
    }
    Ok(())
}
