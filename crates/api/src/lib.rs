//! HTTP API server with observability for the order-fulfillment core.
//!
//! Provides REST endpoints for carts, checkout and order history, with
//! structured logging (tracing) and Prometheus metrics. Callers identify
//! themselves with the `x-user-id` header.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use checkout::{
    CartService, CheckoutService, InventoryService, ServiceConfig, StoreCartService,
    StoreCheckoutService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use storage::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub checkout: StoreCheckoutService<S>,
    pub carts: StoreCartService<S>,
    pub inventory: InventoryService<S::StockLedger>,
}

impl<S: Store> AppState<S> {
    /// Wires every service from one store.
    pub fn new(store: &S, config: ServiceConfig) -> Self {
        Self {
            checkout: CheckoutService::from_store(store, config),
            carts: CartService::from_store(store, config),
            inventory: InventoryService::from_store(store, config),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/cart/items/{product_id}",
            delete(routes::cart::remove_item::<S>),
        )
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route(
            "/products/{id}/restock",
            post(routes::products::restock::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state for a store.
pub fn create_default_state<S: Store>(store: &S, config: ServiceConfig) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, config))
}
