use async_trait::async_trait;
use chrono::Utc;
use common::{Money, OrderId, OrderLineId, OwnerId};

use super::{MemoryTx, OrderLineRow, SharedState};
use crate::order::{
    NewOrderLine, OrderDetails, OrderHeader, OrderLine, OrderPage, OrderReceipt, OrderRepository,
    OrderStatus, PageRequest,
};
use crate::stock::ensure_positive;
use crate::{Result, StoreError};

/// In-memory order repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    shared: SharedState,
}

impl InMemoryOrderRepository {
    pub(super) fn new(shared: SharedState) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    type Tx = MemoryTx;

    async fn insert_order_header(
        &self,
        tx: &mut MemoryTx,
        owner_id: &OwnerId,
        total_amount: Money,
        address: &str,
    ) -> Result<OrderReceipt> {
        let state = tx.state();
        let order_id = OrderId::new(state.next_id());
        let created_at = Utc::now();
        state.orders.insert(
            order_id,
            OrderHeader {
                id: order_id,
                owner_id: owner_id.clone(),
                total_amount,
                status: OrderStatus::Pending,
                address: address.to_string(),
                created_at,
                updated_at: created_at,
            },
        );
        Ok(OrderReceipt {
            order_id,
            created_at,
        })
    }

    async fn insert_order_line(&self, tx: &mut MemoryTx, line: NewOrderLine) -> Result<()> {
        ensure_positive(line.quantity)?;
        let state = tx.state();
        state.product(line.product_id)?;
        if !state.orders.contains_key(&line.order_id) {
            return Err(StoreError::OrderNotFound(line.order_id));
        }
        let id = OrderLineId::new(state.next_id());
        state.order_lines.push(OrderLineRow {
            id,
            order_id: line.order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
        });
        Ok(())
    }

    async fn find_order_details(&self, order_id: OrderId) -> Result<OrderDetails> {
        let state = self.shared.lock().await;
        let header = state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(order_id))?;

        let mut rows: Vec<&OrderLineRow> = state
            .order_lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .collect();
        rows.sort_by_key(|l| l.id);

        let lines = rows
            .into_iter()
            .map(|row| {
                let product = state.product(row.product_id)?;
                Ok(OrderLine {
                    id: row.id,
                    product_id: row.product_id,
                    product_name: product.name.clone(),
                    quantity: row.quantity,
                    unit_price: row.unit_price,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if lines.is_empty() {
            return Err(StoreError::Integrity(format!(
                "order {order_id} has no lines"
            )));
        }

        Ok(OrderDetails { header, lines })
    }

    async fn find_orders_by_owner(
        &self,
        owner_id: &OwnerId,
        page: PageRequest,
    ) -> Result<OrderPage> {
        let state = self.shared.lock().await;
        let mut orders: Vec<&OrderHeader> = state
            .orders
            .values()
            .filter(|o| &o.owner_id == owner_id)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total_count = orders.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let orders = orders
            .into_iter()
            .skip(offset)
            .take(page.page_size() as usize)
            .cloned()
            .collect();

        Ok(OrderPage {
            orders,
            total_count,
        })
    }
}
