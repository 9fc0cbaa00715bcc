//! Shared types for the order-fulfillment core.
//!
//! Identifiers are thin newtypes over the store-generated integer keys so
//! that a product id can never be passed where an order id is expected.

mod ids;
mod money;

pub use ids::{CartId, CartLineId, OrderId, OrderLineId, OwnerId, ProductId};
pub use money::Money;
