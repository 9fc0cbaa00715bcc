//! In-memory store implementation for testing.
//!
//! All components share one state behind an async mutex. A transaction holds
//! that mutex for its whole lifetime, which serializes transactions, and keeps
//! an undo copy of the state taken at `begin`. Committing discards the undo
//! copy; rolling back (or dropping the transaction) restores it.

mod cart;
mod order;
mod stock;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, CartLineId, Money, OrderId, OrderLineId, OwnerId, ProductId};
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

use crate::catalog::NewProduct;
use crate::order::OrderHeader;
use crate::store::Store;
use crate::uow::UnitOfWork;
use crate::{Result, StoreError};

pub use cart::InMemoryCartRepository;
pub use order::InMemoryOrderRepository;
pub use stock::InMemoryStockLedger;

#[derive(Debug, Clone)]
struct ProductRow {
    name: String,
    price: Money,
    stock: u32,
    version: i64,
}

#[derive(Debug, Clone)]
struct CartRow {
    id: CartId,
}

#[derive(Debug, Clone)]
struct CartLineRow {
    id: CartLineId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: u32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct OrderLineRow {
    id: OrderLineId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: u32,
    unit_price: Money,
}

/// Tables and sequences of the in-memory store.
#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: BTreeMap<ProductId, ProductRow>,
    skus: HashMap<String, ProductId>,
    carts: HashMap<OwnerId, CartRow>,
    cart_lines: Vec<CartLineRow>,
    orders: BTreeMap<OrderId, OrderHeader>,
    order_lines: Vec<OrderLineRow>,
    last_id: i64,
}

impl MemoryState {
    /// Shared sequence for every table, like a BIGSERIAL per row kind.
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn product(&self, product_id: ProductId) -> Result<&ProductRow> {
        self.products
            .get(&product_id)
            .ok_or(StoreError::ProductNotFound(product_id))
    }
}

#[derive(Debug, Clone, Default)]
struct SharedState(Arc<Mutex<MemoryState>>);

impl SharedState {
    async fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.0.lock().await
    }

    async fn lock_owned(&self) -> OwnedMutexGuard<MemoryState> {
        self.0.clone().lock_owned().await
    }
}

/// Transaction handle of the in-memory store.
///
/// Dropping it without committing restores the state it started from.
pub struct MemoryTx {
    state: OwnedMutexGuard<MemoryState>,
    undo: Option<MemoryState>,
}

impl MemoryTx {
    fn state(&mut self) -> &mut MemoryState {
        &mut self.state
    }
}

impl std::fmt::Debug for MemoryTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTx")
            .field("open", &self.undo.is_some())
            .finish()
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(undo) = self.undo.take() {
            *self.state = undo;
        }
    }
}

/// Unit of work over the in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUnitOfWork {
    shared: SharedState,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let state = self.shared.lock_owned().await;
        let undo = state.clone();
        Ok(MemoryTx {
            state,
            undo: Some(undo),
        })
    }

    async fn commit(&self, mut tx: MemoryTx) -> Result<()> {
        tx.undo = None;
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<()> {
        drop(tx);
        Ok(())
    }
}

/// In-memory backend bundling all components over one shared state.
///
/// Also exposes catalog seeding and inspection helpers, since the catalog
/// itself is owned elsewhere.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    shared: SharedState,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product to the catalog with version 1.
    ///
    /// Returns the existing id if the SKU is already present.
    pub async fn insert_product(&self, product: NewProduct) -> ProductId {
        let mut state = self.shared.lock().await;
        if let Some(id) = state.skus.get(&product.sku) {
            return *id;
        }
        let id = ProductId::new(state.next_id());
        state.skus.insert(product.sku, id);
        state.products.insert(
            id,
            ProductRow {
                name: product.name,
                price: product.price,
                stock: product.stock,
                version: 1,
            },
        );
        id
    }

    /// Changes a product's catalog price.
    pub async fn set_price(&self, product_id: ProductId, price: Money) -> Result<()> {
        let mut state = self.shared.lock().await;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::ProductNotFound(product_id))?;
        product.price = price;
        Ok(())
    }

    /// Returns the number of order headers stored.
    pub async fn order_count(&self) -> usize {
        self.shared.lock().await.orders.len()
    }

    /// Returns the number of order lines stored.
    pub async fn order_line_count(&self) -> usize {
        self.shared.lock().await.order_lines.len()
    }

    /// Returns the number of cart lines stored across all carts.
    pub async fn cart_line_count(&self) -> usize {
        self.shared.lock().await.cart_lines.len()
    }
}

impl Store for InMemoryStore {
    type Tx = MemoryTx;
    type UnitOfWork = InMemoryUnitOfWork;
    type StockLedger = InMemoryStockLedger;
    type Carts = InMemoryCartRepository;
    type Orders = InMemoryOrderRepository;

    fn unit_of_work(&self) -> InMemoryUnitOfWork {
        InMemoryUnitOfWork {
            shared: self.shared.clone(),
        }
    }

    fn stock_ledger(&self) -> InMemoryStockLedger {
        InMemoryStockLedger::new(self.shared.clone())
    }

    fn carts(&self) -> InMemoryCartRepository {
        InMemoryCartRepository::new(self.shared.clone())
    }

    fn orders(&self) -> InMemoryOrderRepository {
        InMemoryOrderRepository::new(self.shared.clone())
    }
}
