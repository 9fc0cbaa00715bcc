use async_trait::async_trait;
use common::{CartId, CartLineId, Money, OwnerId, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{PgTx, from_db_quantity, out_of_range, to_db_quantity, violates};
use crate::cart::{CartLine, CartRepository};
use crate::stock::ensure_positive;
use crate::{Result, StoreError};

/// PostgreSQL cart repository over `carts` and `cart_items`.
#[derive(Debug, Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    /// Creates a repository over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_line(row: PgRow) -> Result<CartLine> {
        Ok(CartLine {
            line_id: CartLineId::new(row.try_get("id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: from_db_quantity(row.try_get("quantity")?)?,
            product_name: row.try_get("product_name")?,
            unit_price: Money::from_minor(row.try_get("price")?),
            stock_on_hand: from_db_quantity(row.try_get("stock")?)?,
        })
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    type Tx = PgTx;

    async fn resolve_cart_id(&self, tx: &mut PgTx, owner_id: &OwnerId) -> Result<CartId> {
        // The unique constraint on user_id makes concurrent first adds converge
        // on one row.
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO carts (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(owner_id.as_str())
        .fetch_one(&mut **tx)
        .await?;

        Ok(CartId::new(id))
    }

    async fn add_item(
        &self,
        tx: &mut PgTx,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        ensure_positive(quantity)?;

        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT cart_items_unique DO UPDATE SET
                quantity = cart_items.quantity + EXCLUDED.quantity,
                updated_at = NOW()
            "#,
        )
        .bind(cart_id.as_i64())
        .bind(product_id.as_i64())
        .bind(to_db_quantity(quantity)?)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if violates(&e, "cart_items_product_fk") {
                return StoreError::ProductNotFound(product_id);
            }
            if violates(&e, "cart_items_cart_fk") {
                return StoreError::Integrity(format!("cart {cart_id} does not exist"));
            }
            if out_of_range(&e) {
                return StoreError::InvalidQuantity(quantity);
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn list_items(&self, owner_id: &OwnerId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            r#"
            SELECT ci.id, ci.product_id, ci.quantity, p.name AS product_name, p.price, p.stock
            FROM cart_items ci
            JOIN products p ON ci.product_id = p.id
            WHERE ci.cart_id = (SELECT id FROM carts WHERE user_id = $1)
            ORDER BY ci.created_at DESC, ci.id DESC
            "#,
        )
        .bind(owner_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    async fn remove_item(
        &self,
        tx: &mut PgTx,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<()> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id.as_i64())
            .bind(product_id.as_i64())
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CartLineNotFound {
                cart_id,
                product_id,
            });
        }
        Ok(())
    }

    async fn clear_all(&self, tx: &mut PgTx, owner_id: &OwnerId) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM cart_items
            WHERE cart_id = (SELECT id FROM carts WHERE user_id = $1)
            "#,
        )
        .bind(owner_id.as_str())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}
