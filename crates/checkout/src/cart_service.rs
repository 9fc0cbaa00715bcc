//! Cart mutations and the cart read model.
//!
//! Every mutation runs in its own short transaction; nothing here coordinates
//! with a concurrent checkout beyond what the store's constraints enforce.

use common::{OwnerId, ProductId};
use storage::{CartRepository, StockLedger, Store, UnitOfWork, UnitOfWorkExt};

use crate::config::ServiceConfig;
use crate::error::CheckoutError;
use crate::views::CartView;

/// Adds, removes and lists cart lines for an owner.
#[derive(Debug, Clone)]
pub struct CartService<U, L, C> {
    uow: U,
    ledger: L,
    carts: C,
    config: ServiceConfig,
}

/// Cart service wired from one [`Store`].
pub type StoreCartService<S> =
    CartService<<S as Store>::UnitOfWork, <S as Store>::StockLedger, <S as Store>::Carts>;

impl<U, L, C> CartService<U, L, C>
where
    U: UnitOfWork,
    L: StockLedger<Tx = U::Tx>,
    C: CartRepository<Tx = U::Tx> + Clone + 'static,
{
    pub fn new(uow: U, ledger: L, carts: C, config: ServiceConfig) -> Self {
        Self {
            uow,
            ledger,
            carts,
            config,
        }
    }

    pub fn from_store<S>(store: &S, config: ServiceConfig) -> Self
    where
        S: Store<UnitOfWork = U, StockLedger = L, Carts = C>,
    {
        Self::new(
            store.unit_of_work(),
            store.stock_ledger(),
            store.carts(),
            config,
        )
    }

    /// Adds `quantity` of a product to the owner's cart.
    ///
    /// Rejected up front when the catalog holds less than `quantity`. The
    /// check is advisory; checkout re-checks atomically when it decrements.
    #[tracing::instrument(skip(self, owner_id), fields(owner_id = %owner_id))]
    pub async fn add_item(
        &self,
        owner_id: &OwnerId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), CheckoutError> {
        if quantity == 0 {
            return Err(CheckoutError::Invalid(
                "quantity must be greater than zero".into(),
            ));
        }

        let deadline = self.config.deadline();
        let level = deadline
            .run(self.ledger.stock_level(product_id))
            .await
            .map_err(CheckoutError::at("read stock level"))?;

        if level.on_hand < quantity {
            tracing::warn!(%product_id, on_hand = level.on_hand, quantity, "not enough stock to add");
            return Err(CheckoutError::InsufficientStock {
                product_id,
                requested: quantity,
            });
        }

        let carts = self.carts.clone();
        let owner_id = owner_id.clone();
        self.uow
            .with_transaction::<(), CheckoutError, _>(deadline, move |tx| {
                Box::pin(async move {
                    let cart_id = carts
                        .resolve_cart_id(tx, &owner_id)
                        .await
                        .map_err(CheckoutError::at("resolve cart"))?;
                    carts
                        .add_item(tx, cart_id, product_id, quantity)
                        .await
                        .map_err(CheckoutError::at("add cart item"))
                })
            })
            .await?;

        metrics::counter!("cart_items_added_total").increment(u64::from(quantity));
        Ok(())
    }

    /// Returns the owner's cart with live prices, totals and stock flags.
    #[tracing::instrument(skip(self, owner_id), fields(owner_id = %owner_id))]
    pub async fn get_cart(&self, owner_id: &OwnerId) -> Result<CartView, CheckoutError> {
        let lines = self
            .config
            .deadline()
            .run(self.carts.list_items(owner_id))
            .await
            .map_err(CheckoutError::at("list cart items"))?;

        Ok(CartView::from(lines))
    }

    /// Removes a product's line from the owner's cart.
    #[tracing::instrument(skip(self, owner_id), fields(owner_id = %owner_id))]
    pub async fn remove_item(
        &self,
        owner_id: &OwnerId,
        product_id: ProductId,
    ) -> Result<(), CheckoutError> {
        let carts = self.carts.clone();
        let owner_id = owner_id.clone();
        self.uow
            .with_transaction::<(), CheckoutError, _>(self.config.deadline(), move |tx| {
                Box::pin(async move {
                    let cart_id = carts
                        .resolve_cart_id(tx, &owner_id)
                        .await
                        .map_err(CheckoutError::at("resolve cart"))?;
                    carts
                        .remove_item(tx, cart_id, product_id)
                        .await
                        .map_err(CheckoutError::at("remove cart item"))
                })
            })
            .await
    }

    /// Empties the owner's cart, returning the number of lines removed.
    #[tracing::instrument(skip(self, owner_id), fields(owner_id = %owner_id))]
    pub async fn clear_cart(&self, owner_id: &OwnerId) -> Result<u64, CheckoutError> {
        let carts = self.carts.clone();
        let owner_id = owner_id.clone();
        self.uow
            .with_transaction::<u64, CheckoutError, _>(self.config.deadline(), move |tx| {
                Box::pin(async move {
                    carts
                        .clear_all(tx, &owner_id)
                        .await
                        .map_err(CheckoutError::at("clear cart"))
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use common::Money;
    use storage::{ErrorKind, InMemoryStore, NewProduct};

    use super::*;

    async fn setup() -> (InMemoryStore, StoreCartService<InMemoryStore>, ProductId) {
        let store = InMemoryStore::new();
        let product = store
            .insert_product(NewProduct::new("SKU-1", "Widget", 100, 5))
            .await;
        let service = CartService::from_store(&store, ServiceConfig::default());
        (store, service, product)
    }

    #[tokio::test]
    async fn add_then_view() {
        let (_store, service, product) = setup().await;
        let owner = OwnerId::new("alice");

        service.add_item(&owner, product, 2).await.unwrap();
        let cart = service.get_cart(&owner).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.total_amount, Money::from_minor(200));
        assert!(cart.items[0].is_stock_ok);
    }

    #[tokio::test]
    async fn add_rejects_zero_and_oversized_quantities() {
        let (store, service, product) = setup().await;
        let owner = OwnerId::new("alice");

        let err = service.add_item(&owner, product, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);

        let err = service.add_item(&owner, product, 6).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InsufficientStock { requested: 6, .. }
        ));
        assert_eq!(store.cart_line_count().await, 0);
    }

    #[tokio::test]
    async fn add_unknown_product_is_not_found() {
        let (_store, service, _product) = setup().await;

        let err = service
            .add_item(&OwnerId::new("alice"), ProductId::new(404), 1)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn empty_cart_is_not_an_error() {
        let (_store, service, _product) = setup().await;

        let cart = service.get_cart(&OwnerId::new("nobody")).await.unwrap();

        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn remove_missing_line_is_not_found() {
        let (_store, service, product) = setup().await;
        let owner = OwnerId::new("alice");

        let err = service.remove_item(&owner, product).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        service.add_item(&owner, product, 1).await.unwrap();
        service.remove_item(&owner, product).await.unwrap();
        assert!(service.get_cart(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_cart_counts_removed_lines() {
        let (store, service, product) = setup().await;
        let other = store
            .insert_product(NewProduct::new("SKU-2", "Gadget", 50, 5))
            .await;
        let owner = OwnerId::new("alice");
        service.add_item(&owner, product, 1).await.unwrap();
        service.add_item(&owner, other, 1).await.unwrap();

        assert_eq!(service.clear_cart(&owner).await.unwrap(), 2);
        assert_eq!(service.clear_cart(&owner).await.unwrap(), 0);
    }
}
