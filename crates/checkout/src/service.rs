//! Checkout orchestration and the order read side.

use common::{Money, OrderId, OwnerId};
use storage::{
    CartRepository, NewOrderLine, OrderReceipt, OrderRepository, PageRequest,
    StockLedger, Store, StoreError, UnitOfWork, UnitOfWorkExt,
};

use crate::config::ServiceConfig;
use crate::error::CheckoutError;
use crate::order_number::OrderNumber;
use crate::views::{OrderDetailView, OrderListView};

/// Converts carts into orders and serves the resulting order history.
///
/// Each component is injected separately so any one of them can be replaced
/// by a test double; they only need to agree on the transaction type.
#[derive(Debug, Clone)]
pub struct CheckoutService<U, L, C, O> {
    uow: U,
    ledger: L,
    carts: C,
    orders: O,
    config: ServiceConfig,
}

/// Checkout service wired from one [`Store`].
pub type StoreCheckoutService<S> = CheckoutService<
    <S as Store>::UnitOfWork,
    <S as Store>::StockLedger,
    <S as Store>::Carts,
    <S as Store>::Orders,
>;

impl<U, L, C, O> CheckoutService<U, L, C, O>
where
    U: UnitOfWork,
    L: StockLedger<Tx = U::Tx> + Clone + 'static,
    C: CartRepository<Tx = U::Tx> + Clone + 'static,
    O: OrderRepository<Tx = U::Tx> + Clone + 'static,
{
    /// Creates a new checkout service from its components.
    pub fn new(uow: U, ledger: L, carts: C, orders: O, config: ServiceConfig) -> Self {
        Self {
            uow,
            ledger,
            carts,
            orders,
            config,
        }
    }

    /// Creates a checkout service from a store's components.
    pub fn from_store<S>(store: &S, config: ServiceConfig) -> Self
    where
        S: Store<UnitOfWork = U, StockLedger = L, Carts = C, Orders = O>,
    {
        Self::new(
            store.unit_of_work(),
            store.stock_ledger(),
            store.carts(),
            store.orders(),
            config,
        )
    }

    /// Converts the owner's cart into a `Pending` order.
    ///
    /// The cart is read once, before the transaction opens, and that read
    /// fixes both the charged total and every line's unit price. Inside one
    /// transaction the header is inserted, stock is conditionally decremented
    /// and a line is inserted per cart line, and the cart is cleared. Any
    /// failure rolls everything back. Not idempotent: a retried call after a
    /// committed one places a second order.
    #[tracing::instrument(skip(self, owner_id, address), fields(owner_id = %owner_id))]
    pub async fn create_order(
        &self,
        owner_id: &OwnerId,
        address: &str,
    ) -> Result<OrderNumber, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();

        let result = self.checkout(owner_id, address).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(order_no) => {
                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(%order_no, "checkout completed");
            }
            Err(e) => match e.rejection_reason() {
                Some(reason) => {
                    metrics::counter!("checkout_rejected_total", "reason" => reason).increment(1);
                    tracing::warn!(reason, error = %e, "checkout rejected");
                }
                None => {
                    metrics::counter!("checkout_failed_total").increment(1);
                    tracing::error!(error = %e, "checkout failed");
                }
            },
        }

        result
    }

    async fn checkout(
        &self,
        owner_id: &OwnerId,
        address: &str,
    ) -> Result<OrderNumber, CheckoutError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(CheckoutError::Invalid("address must not be blank".into()));
        }

        let deadline = self.config.deadline();
        let lines = deadline
            .run(self.carts.list_items(owner_id))
            .await
            .map_err(CheckoutError::at("list cart items"))?;

        if lines.is_empty() {
            return Err(CheckoutError::CartEmpty);
        }

        let total_amount = lines
            .iter()
            .try_fold(Money::zero(), |acc, line| {
                line.checked_line_total()
                    .and_then(|line_total| acc.checked_add(line_total))
            })
            .ok_or_else(|| CheckoutError::Invalid("order total overflows".into()))?;

        let ledger = self.ledger.clone();
        let carts = self.carts.clone();
        let orders = self.orders.clone();
        let owner_id = owner_id.clone();
        let address = address.to_owned();

        let receipt = self
            .uow
            .with_transaction::<OrderReceipt, CheckoutError, _>(deadline, move |tx| {
                Box::pin(async move {
                    let receipt = orders
                        .insert_order_header(tx, &owner_id, total_amount, &address)
                        .await
                        .map_err(CheckoutError::at("insert order header"))?;

                    for line in &lines {
                        ledger
                            .decrease_stock(tx, line.product_id, line.quantity)
                            .await
                            .map_err(|e| match e {
                                StoreError::InsufficientStock {
                                    product_id,
                                    requested,
                                } => {
                                    tracing::warn!(
                                        %product_id,
                                        product_name = %line.product_name,
                                        requested,
                                        "product out of stock"
                                    );
                                    CheckoutError::InsufficientStock {
                                        product_id,
                                        requested,
                                    }
                                }
                                other => CheckoutError::at("decrease stock")(other),
                            })?;

                        orders
                            .insert_order_line(
                                tx,
                                NewOrderLine {
                                    order_id: receipt.order_id,
                                    product_id: line.product_id,
                                    quantity: line.quantity,
                                    unit_price: line.unit_price,
                                },
                            )
                            .await
                            .map_err(CheckoutError::at("insert order line"))?;
                    }

                    carts
                        .clear_all(tx, &owner_id)
                        .await
                        .map_err(CheckoutError::at("clear cart"))?;

                    Ok(receipt)
                })
            })
            .await?;

        Ok(OrderNumber::derive(receipt.order_id, receipt.created_at))
    }

    /// Loads one order with its lines.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_details(
        &self,
        order_id: OrderId,
    ) -> Result<OrderDetailView, CheckoutError> {
        let details = self
            .config
            .deadline()
            .run(self.orders.find_order_details(order_id))
            .await
            .map_err(CheckoutError::at("find order details"))?;

        Ok(OrderDetailView::from(details))
    }

    /// Lists the owner's orders, newest first.
    ///
    /// `page < 1` is treated as the first page; a non-positive `page_size`
    /// falls back to the configured default.
    #[tracing::instrument(skip(self, owner_id), fields(owner_id = %owner_id))]
    pub async fn my_orders(
        &self,
        owner_id: &OwnerId,
        page: i64,
        page_size: i64,
    ) -> Result<OrderListView, CheckoutError> {
        let request = PageRequest::new(page, page_size, self.config.default_page_size);
        let page = self
            .config
            .deadline()
            .run(self.orders.find_orders_by_owner(owner_id, request))
            .await
            .map_err(CheckoutError::at("list orders"))?;

        Ok(OrderListView::new(page, request))
    }
}

#[cfg(test)]
mod tests {
    use storage::{InMemoryStore, NewProduct};

    use super::*;

    async fn service_with_cart() -> (InMemoryStore, StoreCheckoutService<InMemoryStore>, OwnerId) {
        let store = InMemoryStore::new();
        let product = store
            .insert_product(NewProduct::new("SKU-1", "Widget", 100, 10))
            .await;
        let owner = OwnerId::new("alice");

        let uow = store.unit_of_work();
        let carts = store.carts();
        let mut tx = uow.begin().await.unwrap();
        let cart_id = carts.resolve_cart_id(&mut tx, &owner).await.unwrap();
        carts.add_item(&mut tx, cart_id, product, 2).await.unwrap();
        uow.commit(tx).await.unwrap();

        let service = CheckoutService::from_store(&store, ServiceConfig::default());
        (store, service, owner)
    }

    #[tokio::test]
    async fn blank_address_is_invalid() {
        let (store, service, owner) = service_with_cart().await;

        let err = service.create_order(&owner, "   ").await.unwrap_err();

        assert!(matches!(err, CheckoutError::Invalid(_)));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.cart_line_count().await, 1);
    }

    #[tokio::test]
    async fn create_order_returns_number_matching_details() {
        let (_store, service, owner) = service_with_cart().await;

        let order_no = service.create_order(&owner, "1 Main St").await.unwrap();
        let listing = service.my_orders(&owner, 1, 10).await.unwrap();
        let details = service
            .get_order_details(listing.orders[0].id)
            .await
            .unwrap();

        assert_eq!(details.order_no, order_no);
        assert_eq!(details.amount, Money::from_minor(200));
        assert!(order_no.as_str().starts_with("ORD-"));
        assert!(
            order_no
                .as_str()
                .ends_with(&format!("-{:06}", listing.orders[0].id.as_i64()))
        );
    }

    #[tokio::test]
    async fn my_orders_normalizes_paging() {
        let (_store, service, owner) = service_with_cart().await;
        service.create_order(&owner, "1 Main St").await.unwrap();

        let listing = service.my_orders(&owner, 0, 0).await.unwrap();

        assert_eq!(listing.page, 1);
        assert_eq!(listing.page_size, PageRequest::DEFAULT_PAGE_SIZE);
        assert_eq!(listing.total_count, 1);
        assert_eq!(listing.orders.len(), 1);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (_store, service, _owner) = service_with_cart().await;

        let err = service
            .get_order_details(OrderId::new(999))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), storage::ErrorKind::NotFound);
    }
}
