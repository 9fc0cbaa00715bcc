//! End-to-end checkout behavior against the in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use checkout::{
    CartService, CheckoutError, CheckoutService, ServiceConfig, StoreCartService,
    StoreCheckoutService,
};
use common::{CartId, Money, OrderId, OwnerId, ProductId};
use storage::{
    CartLine, CartRepository, ErrorKind, InMemoryCartRepository, InMemoryOrderRepository,
    InMemoryStore, MemoryTx, NewOrderLine, NewProduct, OrderDetails, OrderPage, OrderReceipt,
    OrderRepository, PageRequest, StockLedger, Store, StoreError, UnitOfWork,
};

struct Fixture {
    store: InMemoryStore,
    carts: StoreCartService<InMemoryStore>,
}

impl Fixture {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let carts = CartService::from_store(&store, ServiceConfig::default());
        Self { store, carts }
    }

    async fn product(&self, sku: &str, price: i64, stock: u32) -> ProductId {
        self.store
            .insert_product(NewProduct::new(sku, format!("Product {sku}"), price, stock))
            .await
    }

    fn checkout(&self) -> StoreCheckoutService<InMemoryStore> {
        CheckoutService::from_store(&self.store, ServiceConfig::default())
    }

    async fn stock(&self, product_id: ProductId) -> u32 {
        self.store
            .stock_ledger()
            .stock_level(product_id)
            .await
            .unwrap()
            .on_hand
    }

    /// Asserts that nothing a checkout writes exists.
    async fn assert_untouched(&self, owner: &OwnerId, cart_lines: usize) {
        assert_eq!(self.store.order_count().await, 0);
        assert_eq!(self.store.order_line_count().await, 0);
        assert_eq!(
            self.store.carts().list_items(owner).await.unwrap().len(),
            cart_lines
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    /// Every line insert after the first `n` fails.
    FailLinesAfter(usize),
    /// Header inserts sleep before delegating.
    StallHeader(Duration),
}

/// Order repository that injects a fault into the checkout transaction.
#[derive(Clone)]
struct FaultyOrders {
    inner: InMemoryOrderRepository,
    fault: Fault,
    inserted: Arc<AtomicUsize>,
}

impl FaultyOrders {
    fn new(inner: InMemoryOrderRepository, fault: Fault) -> Self {
        Self {
            inner,
            fault,
            inserted: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl OrderRepository for FaultyOrders {
    type Tx = MemoryTx;

    async fn insert_order_header(
        &self,
        tx: &mut MemoryTx,
        owner_id: &OwnerId,
        total_amount: Money,
        address: &str,
    ) -> storage::Result<OrderReceipt> {
        if let Fault::StallHeader(delay) = self.fault {
            tokio::time::sleep(delay).await;
        }
        self.inner
            .insert_order_header(tx, owner_id, total_amount, address)
            .await
    }

    async fn insert_order_line(&self, tx: &mut MemoryTx, line: NewOrderLine) -> storage::Result<()> {
        if let Fault::FailLinesAfter(allowed) = self.fault {
            if self.inserted.fetch_add(1, Ordering::SeqCst) >= allowed {
                return Err(StoreError::Integrity("injected line failure".into()));
            }
        }
        self.inner.insert_order_line(tx, line).await
    }

    async fn find_order_details(&self, order_id: OrderId) -> storage::Result<OrderDetails> {
        self.inner.find_order_details(order_id).await
    }

    async fn find_orders_by_owner(
        &self,
        owner_id: &OwnerId,
        page: PageRequest,
    ) -> storage::Result<OrderPage> {
        self.inner.find_orders_by_owner(owner_id, page).await
    }
}

/// Cart repository whose `clear_all` always fails.
#[derive(Clone)]
struct FailingClear {
    inner: InMemoryCartRepository,
}

#[async_trait]
impl CartRepository for FailingClear {
    type Tx = MemoryTx;

    async fn resolve_cart_id(&self, tx: &mut MemoryTx, owner_id: &OwnerId) -> storage::Result<CartId> {
        self.inner.resolve_cart_id(tx, owner_id).await
    }

    async fn add_item(
        &self,
        tx: &mut MemoryTx,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> storage::Result<()> {
        self.inner.add_item(tx, cart_id, product_id, quantity).await
    }

    async fn list_items(&self, owner_id: &OwnerId) -> storage::Result<Vec<CartLine>> {
        self.inner.list_items(owner_id).await
    }

    async fn remove_item(
        &self,
        tx: &mut MemoryTx,
        cart_id: CartId,
        product_id: ProductId,
    ) -> storage::Result<()> {
        self.inner.remove_item(tx, cart_id, product_id).await
    }

    async fn clear_all(&self, _tx: &mut MemoryTx, _owner_id: &OwnerId) -> storage::Result<u64> {
        Err(StoreError::Integrity("injected clear failure".into()))
    }
}

#[tokio::test]
async fn total_uses_cart_prices_and_lines_keep_snapshots() {
    let fx = Fixture::new();
    let a = fx.product("A", 100, 10).await;
    let b = fx.product("B", 50, 10).await;
    let owner = OwnerId::new("alice");
    fx.carts.add_item(&owner, a, 2).await.unwrap();
    fx.carts.add_item(&owner, b, 3).await.unwrap();
    let service = fx.checkout();

    let order_no = service.create_order(&owner, "1 Main St").await.unwrap();
    fx.store.set_price(a, Money::from_minor(999)).await.unwrap();
    fx.store.set_price(b, Money::from_minor(1)).await.unwrap();

    let listing = service.my_orders(&owner, 1, 10).await.unwrap();
    let details = service
        .get_order_details(listing.orders[0].id)
        .await
        .unwrap();

    assert_eq!(details.order_no, order_no);
    assert_eq!(details.amount, Money::from_minor(350));
    assert_eq!(details.address, "1 Main St");
    let mut prices: Vec<i64> = details.items.iter().map(|i| i.price.minor()).collect();
    prices.sort_unstable();
    assert_eq!(prices, vec![50, 100]);
    assert_eq!(fx.stock(a).await, 8);
    assert_eq!(fx.stock(b).await, 7);
}

#[tokio::test]
async fn cart_is_empty_after_checkout() {
    let fx = Fixture::new();
    let a = fx.product("A", 100, 10).await;
    let owner = OwnerId::new("alice");
    fx.carts.add_item(&owner, a, 1).await.unwrap();

    fx.checkout().create_order(&owner, "addr").await.unwrap();

    assert!(fx.carts.get_cart(&owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_cart_short_circuits_without_stock_mutation() {
    let fx = Fixture::new();
    let a = fx.product("A", 100, 10).await;
    let owner = OwnerId::new("alice");

    let err = fx.checkout().create_order(&owner, "addr").await.unwrap_err();

    assert!(matches!(err, CheckoutError::CartEmpty));
    assert_eq!(err.kind(), ErrorKind::Invalid);
    let level = fx.store.stock_ledger().stock_level(a).await.unwrap();
    assert_eq!(level.on_hand, 10);
    assert_eq!(level.version, 1);
    fx.assert_untouched(&owner, 0).await;
}

#[tokio::test]
async fn insufficient_stock_aborts_whole_order() {
    let fx = Fixture::new();
    let a = fx.product("A", 100, 10).await;
    let owner = OwnerId::new("alice");
    fx.carts.add_item(&owner, a, 5).await.unwrap();
    // Stock drops below the cart quantity after the item was added.
    drain(&fx, a, 7).await;
    assert_eq!(fx.stock(a).await, 3);

    let err = fx.checkout().create_order(&owner, "addr").await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::InsufficientStock { requested: 5, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(fx.stock(a).await, 3);
    fx.assert_untouched(&owner, 1).await;
}

#[tokio::test]
async fn overflowing_total_is_rejected_before_any_write() {
    let fx = Fixture::new();
    let a = fx.product("A", i64::MAX / 2, 10).await;
    let owner = OwnerId::new("alice");
    fx.carts.add_item(&owner, a, 3).await.unwrap();

    let err = fx.checkout().create_order(&owner, "addr").await.unwrap_err();

    assert!(matches!(err, CheckoutError::Invalid(_)));
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(fx.stock(a).await, 10);
    fx.assert_untouched(&owner, 1).await;
}

#[tokio::test]
async fn overflowing_lines_sum_is_rejected() {
    let fx = Fixture::new();
    let a = fx.product("A", i64::MAX / 2, 10).await;
    let b = fx.product("B", i64::MAX / 2, 10).await;
    let owner = OwnerId::new("alice");
    fx.carts.add_item(&owner, a, 1).await.unwrap();
    fx.carts.add_item(&owner, b, 2).await.unwrap();

    let err = fx.checkout().create_order(&owner, "addr").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Invalid);
    fx.assert_untouched(&owner, 2).await;
}

#[tokio::test]
async fn cart_view_clamps_overflowing_totals() {
    let fx = Fixture::new();
    let a = fx.product("A", i64::MAX / 2, 10).await;
    let owner = OwnerId::new("alice");
    fx.carts.add_item(&owner, a, 3).await.unwrap();

    let cart = fx.carts.get_cart(&owner).await.unwrap();

    assert_eq!(cart.items[0].total, Money::from_minor(i64::MAX));
    assert_eq!(cart.total_amount, Money::from_minor(i64::MAX));
    assert_eq!(cart.total_qty, 3);
}

#[tokio::test]
async fn later_line_shortfall_restores_earlier_decrements() {
    let fx = Fixture::new();
    let plenty = fx.product("PLENTY", 10, 10).await;
    let scarce = fx.product("SCARCE", 10, 10).await;
    let owner = OwnerId::new("alice");
    // Listed newest first, so `plenty` is decremented before `scarce`.
    fx.carts.add_item(&owner, scarce, 2).await.unwrap();
    fx.carts.add_item(&owner, plenty, 4).await.unwrap();
    drain(&fx, scarce, 9).await;

    let err = fx.checkout().create_order(&owner, "addr").await.unwrap_err();

    assert!(matches!(err, CheckoutError::InsufficientStock { .. }));
    assert_eq!(fx.stock(plenty).await, 10);
    assert_eq!(fx.stock(scarce).await, 1);
    fx.assert_untouched(&owner, 2).await;
}

#[tokio::test]
async fn failing_line_insert_rolls_everything_back() {
    let fx = Fixture::new();
    let a = fx.product("A", 100, 10).await;
    let b = fx.product("B", 50, 10).await;
    let owner = OwnerId::new("alice");
    fx.carts.add_item(&owner, a, 2).await.unwrap();
    fx.carts.add_item(&owner, b, 3).await.unwrap();

    let orders = FaultyOrders::new(fx.store.orders(), Fault::FailLinesAfter(1));
    let service = CheckoutService::new(
        fx.store.unit_of_work(),
        fx.store.stock_ledger(),
        fx.store.carts(),
        orders,
        ServiceConfig::default(),
    );

    let err = service.create_order(&owner, "addr").await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Store {
            step: "insert order line",
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(fx.stock(a).await, 10);
    assert_eq!(fx.stock(b).await, 10);
    fx.assert_untouched(&owner, 2).await;
}

#[tokio::test]
async fn failing_cart_clear_rolls_everything_back() {
    let fx = Fixture::new();
    let a = fx.product("A", 100, 10).await;
    let owner = OwnerId::new("alice");
    fx.carts.add_item(&owner, a, 2).await.unwrap();

    let service = CheckoutService::new(
        fx.store.unit_of_work(),
        fx.store.stock_ledger(),
        FailingClear {
            inner: fx.store.carts(),
        },
        fx.store.orders(),
        ServiceConfig::default(),
    );

    let err = service.create_order(&owner, "addr").await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Store {
            step: "clear cart",
            ..
        }
    ));
    assert_eq!(fx.stock(a).await, 10);
    fx.assert_untouched(&owner, 1).await;
}

#[tokio::test]
async fn expired_deadline_fails_without_writes() {
    let fx = Fixture::new();
    let a = fx.product("A", 100, 10).await;
    let owner = OwnerId::new("alice");
    fx.carts.add_item(&owner, a, 2).await.unwrap();
    let config = ServiceConfig {
        operation_timeout: Duration::from_millis(50),
        ..ServiceConfig::default()
    };
    let service = CheckoutService::new(
        fx.store.unit_of_work(),
        fx.store.stock_ledger(),
        fx.store.carts(),
        FaultyOrders::new(
            fx.store.orders(),
            Fault::StallHeader(Duration::from_millis(500)),
        ),
        config,
    );

    let err = service.create_order(&owner, "addr").await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Store {
            source: StoreError::DeadlineExceeded,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(fx.stock(a).await, 10);
    fx.assert_untouched(&owner, 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_never_oversell() {
    let fx = Fixture::new();
    let hot = fx.product("HOT", 100, 5).await;
    let owners: Vec<OwnerId> = (0..12).map(|i| OwnerId::new(format!("buyer-{i}"))).collect();
    for owner in &owners {
        fx.carts.add_item(owner, hot, 1).await.unwrap();
    }

    let service = Arc::new(fx.checkout());
    let handles: Vec<_> = owners
        .iter()
        .cloned()
        .map(|owner| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.create_order(&owner, "addr").await })
        })
        .collect();

    let mut placed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(CheckoutError::InsufficientStock { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(placed, 5);
    assert_eq!(rejected, 7);
    assert_eq!(fx.stock(hot).await, 0);
    assert_eq!(fx.store.order_count().await, 5);
}

#[tokio::test]
async fn repeated_adds_merge_into_one_line() {
    let fx = Fixture::new();
    let a = fx.product("A", 100, 10).await;
    let owner = OwnerId::new("alice");

    fx.carts.add_item(&owner, a, 2).await.unwrap();
    fx.carts.add_item(&owner, a, 3).await.unwrap();

    let cart = fx.carts.get_cart(&owner).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.total_qty, 5);
}

#[tokio::test]
async fn order_number_is_stable_across_reads() {
    let fx = Fixture::new();
    let a = fx.product("A", 100, 10).await;
    let owner = OwnerId::new("alice");
    fx.carts.add_item(&owner, a, 1).await.unwrap();
    let service = fx.checkout();

    let placed = service.create_order(&owner, "addr").await.unwrap();
    let id = service.my_orders(&owner, 1, 10).await.unwrap().orders[0].id;

    let first = service.get_order_details(id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = service.get_order_details(id).await.unwrap();

    assert_eq!(first.order_no, second.order_no);
    assert_eq!(first.order_no, placed);
    assert_eq!(first.order_date, second.order_date);
}

#[tokio::test]
async fn history_is_paged_newest_first() {
    let fx = Fixture::new();
    let a = fx.product("A", 10, 100).await;
    let owner = OwnerId::new("alice");
    let service = fx.checkout();

    let mut placed = Vec::new();
    for _ in 0..3 {
        fx.carts.add_item(&owner, a, 1).await.unwrap();
        placed.push(service.create_order(&owner, "addr").await.unwrap());
    }

    let first = service.my_orders(&owner, 1, 2).await.unwrap();
    assert_eq!(first.total_count, 3);
    assert_eq!(first.orders.len(), 2);
    assert_eq!(first.orders[0].order_no, placed[2]);

    let second = service.my_orders(&owner, 2, 2).await.unwrap();
    assert_eq!(second.orders.len(), 1);
    assert_eq!(second.orders[0].order_no, placed[0]);

    let other = service.my_orders(&OwnerId::new("bob"), 1, 10).await.unwrap();
    assert_eq!(other.total_count, 0);
}

async fn drain(fx: &Fixture, product_id: ProductId, quantity: u32) {
    let uow = fx.store.unit_of_work();
    let mut tx = uow.begin().await.unwrap();
    fx.store
        .stock_ledger()
        .decrease_stock(&mut tx, product_id, quantity)
        .await
        .unwrap();
    uow.commit(tx).await.unwrap();
}
