use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, CartLineId, OwnerId, ProductId};

use super::{CartLineRow, CartRow, MemoryTx, SharedState};
use crate::cart::{CartLine, CartRepository};
use crate::stock::{add_quantity, ensure_positive};
use crate::{Result, StoreError};

/// In-memory cart repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartRepository {
    shared: SharedState,
}

impl InMemoryCartRepository {
    pub(super) fn new(shared: SharedState) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    type Tx = MemoryTx;

    async fn resolve_cart_id(&self, tx: &mut MemoryTx, owner_id: &OwnerId) -> Result<CartId> {
        let state = tx.state();
        if let Some(cart) = state.carts.get(owner_id) {
            return Ok(cart.id);
        }
        let id = CartId::new(state.next_id());
        state.carts.insert(owner_id.clone(), CartRow { id });
        Ok(id)
    }

    async fn add_item(
        &self,
        tx: &mut MemoryTx,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        ensure_positive(quantity)?;
        let state = tx.state();
        state.product(product_id)?;
        if !state.carts.values().any(|c| c.id == cart_id) {
            return Err(StoreError::Integrity(format!("cart {cart_id} does not exist")));
        }

        if let Some(line) = state
            .cart_lines
            .iter_mut()
            .find(|l| l.cart_id == cart_id && l.product_id == product_id)
        {
            line.quantity = add_quantity(line.quantity, quantity)?;
            return Ok(());
        }

        let id = CartLineId::new(state.next_id());
        state.cart_lines.push(CartLineRow {
            id,
            cart_id,
            product_id,
            quantity,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_items(&self, owner_id: &OwnerId) -> Result<Vec<CartLine>> {
        let state = self.shared.lock().await;
        let Some(cart) = state.carts.get(owner_id) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<&CartLineRow> = state
            .cart_lines
            .iter()
            .filter(|l| l.cart_id == cart.id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        rows.into_iter()
            .map(|row| {
                let product = state.product(row.product_id)?;
                Ok(CartLine {
                    line_id: row.id,
                    product_id: row.product_id,
                    quantity: row.quantity,
                    product_name: product.name.clone(),
                    unit_price: product.price,
                    stock_on_hand: product.stock,
                })
            })
            .collect()
    }

    async fn remove_item(
        &self,
        tx: &mut MemoryTx,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<()> {
        let lines = &mut tx.state().cart_lines;
        let before = lines.len();
        lines.retain(|l| !(l.cart_id == cart_id && l.product_id == product_id));
        if lines.len() == before {
            return Err(StoreError::CartLineNotFound {
                cart_id,
                product_id,
            });
        }
        Ok(())
    }

    async fn clear_all(&self, tx: &mut MemoryTx, owner_id: &OwnerId) -> Result<u64> {
        let state = tx.state();
        let Some(cart_id) = state.carts.get(owner_id).map(|c| c.id) else {
            return Ok(0);
        };
        let before = state.cart_lines.len();
        state.cart_lines.retain(|l| l.cart_id != cart_id);
        Ok((before - state.cart_lines.len()) as u64)
    }
}
