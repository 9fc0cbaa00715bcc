use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderLineId, OwnerId, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{PgTx, from_db_quantity, to_db_quantity, violates};
use crate::order::{
    NewOrderLine, OrderDetails, OrderHeader, OrderLine, OrderPage, OrderReceipt, OrderRepository,
    PageRequest,
};
use crate::stock::ensure_positive;
use crate::{Result, StoreError};

/// PostgreSQL order repository over `orders` and `order_items`.
#[derive(Debug, Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Creates a repository over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_header(row: &PgRow) -> Result<OrderHeader> {
        let status: String = row.try_get("status")?;
        Ok(OrderHeader {
            id: OrderId::new(row.try_get("id")?),
            owner_id: OwnerId::new(row.try_get::<String, _>("user_id")?),
            total_amount: Money::from_minor(row.try_get("total_amount")?),
            status: status.parse()?,
            address: row.try_get("address")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            id: OrderLineId::new(row.try_get("id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: from_db_quantity(row.try_get("quantity")?)?,
            unit_price: Money::from_minor(row.try_get("price")?),
        })
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    type Tx = PgTx;

    async fn insert_order_header(
        &self,
        tx: &mut PgTx,
        owner_id: &OwnerId,
        total_amount: Money,
        address: &str,
    ) -> Result<OrderReceipt> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (user_id, total_amount, status, address)
            VALUES ($1, $2, 'PENDING', $3)
            RETURNING id, created_at
            "#,
        )
        .bind(owner_id.as_str())
        .bind(total_amount.minor())
        .bind(address)
        .fetch_one(&mut **tx)
        .await?;

        Ok(OrderReceipt {
            order_id: OrderId::new(row.try_get("id")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    async fn insert_order_line(&self, tx: &mut PgTx, line: NewOrderLine) -> Result<()> {
        ensure_positive(line.quantity)?;

        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(line.order_id.as_i64())
        .bind(line.product_id.as_i64())
        .bind(to_db_quantity(line.quantity)?)
        .bind(line.unit_price.minor())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if violates(&e, "order_items_product_fk") {
                return StoreError::ProductNotFound(line.product_id);
            }
            if violates(&e, "order_items_order_fk") {
                return StoreError::OrderNotFound(line.order_id);
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn find_order_details(&self, order_id: OrderId) -> Result<OrderDetails> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, user_id, total_amount, status, address, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let header = match row {
            Some(row) => Self::row_to_header(&row)?,
            None => return Err(StoreError::OrderNotFound(order_id)),
        };

        let rows = sqlx::query(
            r#"
            SELECT oi.id, oi.product_id, p.name AS product_name, oi.quantity, oi.price
            FROM order_items oi
            JOIN products p ON oi.product_id = p.id
            WHERE oi.order_id = $1
            ORDER BY oi.id ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(Self::row_to_line)
            .collect::<Result<Vec<_>>>()?;

        if lines.is_empty() {
            return Err(StoreError::Integrity(format!(
                "order {order_id} has no lines"
            )));
        }

        Ok(OrderDetails { header, lines })
    }

    async fn find_orders_by_owner(
        &self,
        owner_id: &OwnerId,
        page: PageRequest,
    ) -> Result<OrderPage> {
        let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(owner_id.as_str())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, total_amount, status, address, created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id.as_str())
        .bind(i64::from(page.page_size()))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let orders = rows
            .iter()
            .map(Self::row_to_header)
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderPage {
            orders,
            total_count: u64::try_from(total_count).unwrap_or_default(),
        })
    }
}
