use common::ProductId;
use storage::{StockLedger, StockLevel, Store};

use crate::config::ServiceConfig;
use crate::error::CheckoutError;

/// Restocking and stock inspection, outside any checkout.
#[derive(Debug, Clone)]
pub struct InventoryService<L> {
    ledger: L,
    config: ServiceConfig,
}

impl<L: StockLedger> InventoryService<L> {
    pub fn new(ledger: L, config: ServiceConfig) -> Self {
        Self { ledger, config }
    }

    pub fn from_store<S>(store: &S, config: ServiceConfig) -> Self
    where
        S: Store<StockLedger = L>,
    {
        Self::new(store.stock_ledger(), config)
    }

    /// Adds `quantity` units to a product's stock and returns the new level.
    #[tracing::instrument(skip(self))]
    pub async fn restock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<StockLevel, CheckoutError> {
        if quantity == 0 {
            return Err(CheckoutError::Invalid(
                "quantity must be greater than zero".into(),
            ));
        }

        let deadline = self.config.deadline();
        deadline
            .run(self.ledger.increase_stock(product_id, quantity))
            .await
            .map_err(CheckoutError::at("increase stock"))?;
        metrics::counter!("stock_restocked_units_total").increment(u64::from(quantity));

        let level = deadline
            .run(self.ledger.stock_level(product_id))
            .await
            .map_err(CheckoutError::at("read stock level"))?;
        tracing::info!(%product_id, on_hand = level.on_hand, "product restocked");
        Ok(level)
    }

    pub async fn stock_level(&self, product_id: ProductId) -> Result<StockLevel, CheckoutError> {
        self.config
            .deadline()
            .run(self.ledger.stock_level(product_id))
            .await
            .map_err(CheckoutError::at("read stock level"))
    }
}
