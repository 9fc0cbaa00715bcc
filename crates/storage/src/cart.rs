//! Cart aggregate: one cart per owner, at most one line per product.

use async_trait::async_trait;
use common::{CartId, CartLineId, Money, OwnerId, ProductId};
use serde::Serialize;

use crate::Result;

/// A cart line joined with live catalog state.
///
/// `unit_price` and `stock_on_hand` reflect the catalog at read time; they
/// are not snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product_name: String,
    pub unit_price: Money,
    pub stock_on_hand: u32,
}

impl CartLine {
    /// Returns `unit_price * quantity`, or `None` if it does not fit in `Money`.
    pub fn checked_line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }

    /// Display total, clamped at `i64::MAX` minor units.
    pub fn line_total(&self) -> Money {
        self.unit_price.saturating_multiply(self.quantity)
    }
}

/// Persistence for carts and their lines.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The transaction handle this repository participates in.
    type Tx: Send;

    /// Returns the owner's cart id, creating the cart if absent and touching
    /// `updated_at` otherwise. Idempotent and race-safe.
    async fn resolve_cart_id(&self, tx: &mut Self::Tx, owner_id: &OwnerId) -> Result<CartId>;

    /// Adds `quantity` of a product, summing into the existing line if the
    /// product is already in the cart. Fails with `ProductNotFound` if the
    /// product does not exist.
    async fn add_item(
        &self,
        tx: &mut Self::Tx,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()>;

    /// Lists the owner's cart lines, most recently added first.
    ///
    /// Returns an empty list when the owner has no cart or no lines.
    async fn list_items(&self, owner_id: &OwnerId) -> Result<Vec<CartLine>>;

    /// Deletes the line for `product_id`; `CartLineNotFound` if none matched.
    async fn remove_item(
        &self,
        tx: &mut Self::Tx,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<()>;

    /// Deletes every line in the owner's cart, returning how many were removed.
    async fn clear_all(&self, tx: &mut Self::Tx, owner_id: &OwnerId) -> Result<u64>;
}
