use async_trait::async_trait;
use common::ProductId;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{PgTx, from_db_quantity, out_of_range, to_db_quantity};
use crate::stock::{StockLedger, StockLevel, ensure_positive};
use crate::{Result, StoreError};

/// PostgreSQL stock ledger over the `products` table.
#[derive(Debug, Clone)]
pub struct PgStockLedger {
    pool: PgPool,
}

impl PgStockLedger {
    /// Creates a ledger over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StockLedger for PgStockLedger {
    type Tx = PgTx;

    async fn decrease_stock(
        &self,
        tx: &mut PgTx,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        ensure_positive(quantity)?;
        let qty = to_db_quantity(quantity)?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $1, version = version + 1, updated_at = NOW()
            WHERE id = $2 AND stock >= $1
            "#,
        )
        .bind(qty)
        .bind(product_id.as_i64())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id.as_i64())
                .fetch_one(&mut **tx)
                .await?;

        if exists {
            Err(StoreError::InsufficientStock {
                product_id,
                requested: quantity,
            })
        } else {
            Err(StoreError::ProductNotFound(product_id))
        }
    }

    async fn increase_stock(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        ensure_positive(quantity)?;
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + $1, version = version + 1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(to_db_quantity(quantity)?)
        .bind(product_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if out_of_range(&e) {
                return StoreError::InvalidQuantity(quantity);
            }
            StoreError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(product_id));
        }
        Ok(())
    }

    async fn stock_level(&self, product_id: ProductId) -> Result<StockLevel> {
        let row: Option<PgRow> = sqlx::query("SELECT stock, version FROM products WHERE id = $1")
            .bind(product_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        let row = row.ok_or(StoreError::ProductNotFound(product_id))?;
        Ok(StockLevel {
            product_id,
            on_hand: from_db_quantity(row.try_get("stock")?)?,
            version: row.try_get("version")?,
        })
    }
}
