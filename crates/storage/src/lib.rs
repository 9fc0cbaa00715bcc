pub mod cart;
pub mod catalog;
pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod stock;
pub mod store;
pub mod uow;

pub use cart::{CartLine, CartRepository};
pub use catalog::NewProduct;
pub use error::{ErrorKind, Result, StoreError};
pub use memory::{
    InMemoryCartRepository, InMemoryOrderRepository, InMemoryStockLedger, InMemoryStore,
    InMemoryUnitOfWork, MemoryTx,
};
pub use order::{
    NewOrderLine, OrderDetails, OrderHeader, OrderLine, OrderPage, OrderReceipt, OrderRepository,
    OrderStatus, PageRequest,
};
pub use postgres::{
    PgCartRepository, PgOrderRepository, PgStockLedger, PgUnitOfWork, PostgresStore,
};
pub use stock::{MAX_QUANTITY, StockLedger, StockLevel};
pub use store::Store;
pub use uow::{Deadline, UnitOfWork, UnitOfWorkExt};
