use async_trait::async_trait;
use common::ProductId;

use super::{MemoryTx, SharedState};
use crate::stock::{StockLedger, StockLevel, add_quantity, ensure_positive};
use crate::{Result, StoreError};

/// In-memory stock ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockLedger {
    shared: SharedState,
}

impl InMemoryStockLedger {
    pub(super) fn new(shared: SharedState) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    type Tx = MemoryTx;

    async fn decrease_stock(
        &self,
        tx: &mut MemoryTx,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        ensure_positive(quantity)?;
        let product = tx
            .state()
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::ProductNotFound(product_id))?;

        // Guard and mutation happen under the same lock.
        if product.stock < quantity {
            return Err(StoreError::InsufficientStock {
                product_id,
                requested: quantity,
            });
        }
        product.stock -= quantity;
        product.version += 1;
        Ok(())
    }

    async fn increase_stock(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        ensure_positive(quantity)?;
        let mut state = self.shared.lock().await;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::ProductNotFound(product_id))?;

        product.stock = add_quantity(product.stock, quantity)?;
        product.version += 1;
        Ok(())
    }

    async fn stock_level(&self, product_id: ProductId) -> Result<StockLevel> {
        let state = self.shared.lock().await;
        let product = state.product(product_id)?;
        Ok(StockLevel {
            product_id,
            on_hand: product.stock,
            version: product.version,
        })
    }
}
