//! Order aggregate: an immutable header plus immutable lines.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderLineId, OwnerId, ProductId};
use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};

/// The status of an order.
///
/// State transitions:
/// ```text
/// Pending ──► Paid ──► Shipped ──► Completed
///    │          │
///    └──────────┴──► Cancelled
/// ```
/// Orders are always created `Pending`; nothing in this crate moves them on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if an order may move from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Paid, Shipped)
                | (Shipped, Completed)
                | (Pending, Cancelled)
                | (Paid, Cancelled)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns the stored spelling of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PAID" => Ok(OrderStatus::Paid),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(StoreError::Integrity(format!("unknown order status {other:?}"))),
        }
    }
}

/// Identity and timestamp generated when an order header is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub created_at: DateTime<Utc>,
}

/// A persisted order header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHeader {
    pub id: OrderId,
    pub owner_id: OwnerId,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line to insert alongside a new order header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price captured when the cart was read; never re-read later.
    pub unit_price: Money,
}

/// A persisted order line joined with the product's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub product_id: ProductId,
    /// Denormalized for display; not authoritative.
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns `unit_price * quantity`, clamped at `i64::MAX` minor units.
    pub fn line_total(&self) -> Money {
        self.unit_price.saturating_multiply(self.quantity)
    }
}

/// An order header with its lines in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetails {
    pub header: OrderHeader,
    pub lines: Vec<OrderLine>,
}

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Page size used when the caller supplies a non-positive one.
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    /// Largest page size served.
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Builds a page request from raw caller input.
    ///
    /// Pages are 1-based; `page < 1` becomes 1. A `page_size <= 0` falls back
    /// to `default_size`, and sizes above `MAX_PAGE_SIZE` are capped.
    pub fn new(page: i64, page_size: i64, default_size: u32) -> Self {
        let page = u32::try_from(page.max(1)).unwrap_or(u32::MAX);
        let page_size = if page_size <= 0 {
            default_size
        } else {
            u32::try_from(page_size).unwrap_or(u32::MAX)
        };
        Self {
            page,
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    /// Returns the 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Returns the number of rows per page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns the number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 0, Self::DEFAULT_PAGE_SIZE)
    }
}

/// One page of an owner's orders, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPage {
    pub orders: Vec<OrderHeader>,
    pub total_count: u64,
}

/// Persistence for orders and order lines.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// The transaction handle this repository participates in.
    type Tx: Send;

    /// Inserts a header with status `Pending`, returning its generated
    /// identity and creation timestamp.
    async fn insert_order_header(
        &self,
        tx: &mut Self::Tx,
        owner_id: &OwnerId,
        total_amount: Money,
        address: &str,
    ) -> Result<OrderReceipt>;

    /// Inserts one immutable order line.
    async fn insert_order_line(&self, tx: &mut Self::Tx, line: NewOrderLine) -> Result<()>;

    /// Loads a header and its lines.
    ///
    /// Fails with `OrderNotFound` if the header is absent and with
    /// `Integrity` if the header exists but has no lines.
    async fn find_order_details(&self, order_id: OrderId) -> Result<OrderDetails>;

    /// Lists an owner's order headers, newest first, with the total count.
    async fn find_orders_by_owner(
        &self,
        owner_id: &OwnerId,
        page: PageRequest,
    ) -> Result<OrderPage>;
}
