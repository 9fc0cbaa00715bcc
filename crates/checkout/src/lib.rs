//! Checkout core for the order-fulfillment system.
//!
//! This crate provides:
//! - `CheckoutService`: converts a cart into an order in one transaction and
//!   serves order details and history
//! - `CartService`: cart mutations with an add-time stock check
//! - `InventoryService`: restocking
//! - Order number derivation and the read views returned to callers

pub mod cart_service;
pub mod config;
pub mod error;
pub mod inventory;
pub mod order_number;
pub mod service;
pub mod views;

pub use cart_service::{CartService, StoreCartService};
pub use config::ServiceConfig;
pub use error::CheckoutError;
pub use inventory::InventoryService;
pub use order_number::{OrderNumber, format_order_date};
pub use service::{CheckoutService, StoreCheckoutService};
pub use views::{
    CartLineView, CartView, OrderDetailView, OrderLineView, OrderListView, OrderSummary,
};
