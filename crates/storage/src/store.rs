use crate::{CartRepository, OrderRepository, StockLedger, UnitOfWork};

/// A complete backend: one unit of work plus the components that take part
/// in its transactions.
///
/// Components stay individually substitutable; this trait only names a set
/// that shares a transaction type so services can be wired from one value.
pub trait Store: Clone + Send + Sync + 'static {
    /// The transaction handle shared by every component.
    type Tx: Send + 'static;
    type UnitOfWork: UnitOfWork<Tx = Self::Tx> + Clone + 'static;
    type StockLedger: StockLedger<Tx = Self::Tx> + Clone + 'static;
    type Carts: CartRepository<Tx = Self::Tx> + Clone + 'static;
    type Orders: OrderRepository<Tx = Self::Tx> + Clone + 'static;

    fn unit_of_work(&self) -> Self::UnitOfWork;
    fn stock_ledger(&self) -> Self::StockLedger;
    fn carts(&self) -> Self::Carts;
    fn orders(&self) -> Self::Orders;
}
