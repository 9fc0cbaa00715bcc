//! Read models returned by the services.

use common::{CartLineId, Money, OrderId, ProductId};
use serde::Serialize;
use storage::{CartLine, OrderDetails, OrderHeader, OrderLine, OrderPage, OrderStatus, PageRequest};

use crate::order_number::{OrderNumber, format_order_date};

/// One cart line with live catalog price and stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Money,
    pub quantity: u32,
    pub total: Money,
    /// False when the catalog no longer holds enough stock for this line.
    pub is_stock_ok: bool,
}

impl From<CartLine> for CartLineView {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.line_id,
            product_id: line.product_id,
            total: line.line_total(),
            is_stock_ok: line.stock_on_hand >= line.quantity,
            product_name: line.product_name,
            price: line.unit_price,
            quantity: line.quantity,
        }
    }
}

/// An owner's cart, most recently added line first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_amount: Money,
    pub total_qty: u64,
}

impl CartView {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<CartLine>> for CartView {
    fn from(lines: Vec<CartLine>) -> Self {
        let items: Vec<CartLineView> = lines.into_iter().map(CartLineView::from).collect();
        Self {
            total_amount: items
                .iter()
                .fold(Money::zero(), |acc, item| acc.saturating_add(item.total)),
            total_qty: items.iter().map(|item| u64::from(item.quantity)).sum(),
            items,
        }
    }
}

/// One order line as shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    pub product_name: String,
    pub quantity: u32,
    pub price: Money,
    pub total: Money,
}

impl From<OrderLine> for OrderLineView {
    fn from(line: OrderLine) -> Self {
        Self {
            total: line.line_total(),
            product_name: line.product_name,
            quantity: line.quantity,
            price: line.unit_price,
        }
    }
}

/// A committed order with its lines in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetailView {
    pub order_no: OrderNumber,
    pub order_date: String,
    pub status: OrderStatus,
    pub address: String,
    pub amount: Money,
    pub items: Vec<OrderLineView>,
}

impl From<OrderDetails> for OrderDetailView {
    fn from(details: OrderDetails) -> Self {
        let header = details.header;
        Self {
            order_no: OrderNumber::derive(header.id, header.created_at),
            order_date: format_order_date(header.created_at),
            status: header.status,
            address: header.address,
            amount: header.total_amount,
            items: details.lines.into_iter().map(OrderLineView::from).collect(),
        }
    }
}

/// One row of an owner's order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_no: OrderNumber,
    pub order_date: String,
    pub status: OrderStatus,
    pub amount: Money,
}

impl From<OrderHeader> for OrderSummary {
    fn from(header: OrderHeader) -> Self {
        Self {
            id: header.id,
            order_no: OrderNumber::derive(header.id, header.created_at),
            order_date: format_order_date(header.created_at),
            status: header.status,
            amount: header.total_amount,
        }
    }
}

/// A page of order summaries, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderListView {
    pub orders: Vec<OrderSummary>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl OrderListView {
    pub(crate) fn new(page: OrderPage, request: PageRequest) -> Self {
        Self {
            orders: page.orders.into_iter().map(OrderSummary::from).collect(),
            total_count: page.total_count,
            page: request.page(),
            page_size: request.page_size(),
        }
    }
}
