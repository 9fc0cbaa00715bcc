//! PostgreSQL-backed store implementation.
//!
//! Transactions run at Postgres' default READ COMMITTED level. Stock safety
//! does not depend on a stricter level: the ledger's decrement is a single
//! `UPDATE … WHERE stock >= $qty`, and Postgres re-checks that predicate
//! against the latest row version after acquiring the row lock.

mod cart;
mod order;
mod stock;

use async_trait::async_trait;
use common::{Money, ProductId};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::catalog::NewProduct;
use crate::store::Store;
use crate::uow::UnitOfWork;
use crate::{Result, StoreError};

pub use cart::PgCartRepository;
pub use order::PgOrderRepository;
pub use stock::PgStockLedger;

/// Transaction handle of the PostgreSQL store.
///
/// sqlx rolls the transaction back if it is dropped without a commit.
pub type PgTx = sqlx::Transaction<'static, sqlx::Postgres>;

/// Converts a quantity to the store's `INTEGER` column type.
fn to_db_quantity(quantity: u32) -> Result<i32> {
    i32::try_from(quantity).map_err(|_| StoreError::InvalidQuantity(quantity))
}

/// Converts a stored `INTEGER` quantity back, rejecting negative values.
fn from_db_quantity(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Integrity(format!("negative quantity {value}")))
}

/// Returns true if `err` is a violation of the named constraint.
fn violates(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some(constraint))
}

/// Returns true if `err` is a numeric overflow (SQLSTATE 22003).
fn out_of_range(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("22003"))
}

/// Unit of work over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    /// Creates a unit of work over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: PgTx) -> Result<()> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: PgTx) -> Result<()> {
        tx.rollback().await?;
        Ok(())
    }
}

/// PostgreSQL backend bundling all components over one pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Adds a product to the catalog with version 1.
    ///
    /// Returns the existing id if the SKU is already present.
    pub async fn insert_product(&self, product: NewProduct) -> Result<ProductId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (sku, name, price, stock)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT products_sku_unique DO UPDATE SET sku = EXCLUDED.sku
            RETURNING id
            "#,
        )
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price.minor())
        .bind(to_db_quantity(product.stock)?)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProductId::new(id))
    }

    /// Changes a product's catalog price.
    pub async fn set_price(&self, product_id: ProductId, price: Money) -> Result<()> {
        let result =
            sqlx::query("UPDATE products SET price = $1, updated_at = NOW() WHERE id = $2")
                .bind(price.minor())
                .bind(product_id.as_i64())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(product_id));
        }
        Ok(())
    }
}

impl Store for PostgresStore {
    type Tx = PgTx;
    type UnitOfWork = PgUnitOfWork;
    type StockLedger = PgStockLedger;
    type Carts = PgCartRepository;
    type Orders = PgOrderRepository;

    fn unit_of_work(&self) -> PgUnitOfWork {
        PgUnitOfWork::new(self.pool.clone())
    }

    fn stock_ledger(&self) -> PgStockLedger {
        PgStockLedger::new(self.pool.clone())
    }

    fn carts(&self) -> PgCartRepository {
        PgCartRepository::new(self.pool.clone())
    }

    fn orders(&self) -> PgOrderRepository {
        PgOrderRepository::new(self.pool.clone())
    }
}
