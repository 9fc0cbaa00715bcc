use common::{CartId, OrderId, ProductId};
use thiserror::Error;

/// Coarse classification of a failure, independent of its concrete type.
///
/// Boundary layers map these to transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A cart, product, line or order is absent.
    NotFound,
    /// The request conflicts with current state (e.g. insufficient stock).
    Conflict,
    /// Malformed input.
    Invalid,
    /// Identity missing.
    Unauthorized,
    /// Store or transport failure.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The conditional decrement matched no row because stock is too low.
    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: ProductId, requested: u32 },

    /// No cart line exists for the (cart, product) pair.
    #[error("Cart line not found: cart {cart_id}, product {product_id}")]
    CartLineNotFound {
        cart_id: CartId,
        product_id: ProductId,
    },

    /// The order header does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Quantities must be strictly positive and fit the store's column type.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// The operation deadline passed before the work finished.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Persisted data violates an invariant the store relies on.
    #[error("Data integrity violation: {0}")]
    Integrity(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::ProductNotFound(_)
            | StoreError::CartLineNotFound { .. }
            | StoreError::OrderNotFound(_) => ErrorKind::NotFound,
            StoreError::InsufficientStock { .. } => ErrorKind::Conflict,
            StoreError::InvalidQuantity(_) => ErrorKind::Invalid,
            StoreError::DeadlineExceeded
            | StoreError::Integrity(_)
            | StoreError::Database(_)
            | StoreError::Migration(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
