//! Service error types.

use common::ProductId;
use storage::{ErrorKind, StoreError};
use thiserror::Error;

/// Errors returned by the checkout, cart and inventory services.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout was attempted on a cart with no lines.
    #[error("Cart is empty")]
    CartEmpty,

    /// A product does not have enough stock on hand for the request.
    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: ProductId, requested: u32 },

    /// The request was rejected before reaching the store.
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// A store call failed at the named step.
    #[error("{step} failed: {source}")]
    Store {
        step: &'static str,
        #[source]
        source: StoreError,
    },
}

impl CheckoutError {
    /// Returns a mapper that wraps a store error with the step it failed at.
    pub(crate) fn at(step: &'static str) -> impl FnOnce(StoreError) -> CheckoutError {
        move |source| CheckoutError::Store { step, source }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::CartEmpty | CheckoutError::Invalid(_) => ErrorKind::Invalid,
            CheckoutError::InsufficientStock { .. } => ErrorKind::Conflict,
            CheckoutError::Store { source, .. } => source.kind(),
        }
    }

    /// Short label for expected rejections, `None` for failures.
    pub fn rejection_reason(&self) -> Option<&'static str> {
        match self {
            CheckoutError::CartEmpty => Some("cart_empty"),
            CheckoutError::InsufficientStock { .. } => Some("insufficient_stock"),
            CheckoutError::Invalid(_) => Some("invalid"),
            CheckoutError::Store { .. } => None,
        }
    }
}

impl From<StoreError> for CheckoutError {
    fn from(source: StoreError) -> Self {
        CheckoutError::Store {
            step: "transaction",
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;

    #[test]
    fn originated_conditions_have_client_kinds() {
        assert_eq!(CheckoutError::CartEmpty.kind(), ErrorKind::Invalid);
        assert_eq!(
            CheckoutError::InsufficientStock {
                product_id: ProductId::new(1),
                requested: 5
            }
            .kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn store_errors_keep_their_kind() {
        let err = CheckoutError::at("find order details")(StoreError::OrderNotFound(
            OrderId::new(7),
        ));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "find order details failed: Order not found: 7");

        let err = CheckoutError::from(StoreError::DeadlineExceeded);
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.rejection_reason().is_none());
    }
}
