//! Checkout and order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use checkout::{OrderDetailView, OrderListView, OrderNumber};
use common::OrderId;
use serde::{Deserialize, Serialize};
use storage::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Owner;

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub address: String,
}

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order_no: OrderNumber,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /orders: check out the caller's cart.
#[tracing::instrument(skip(state, owner, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    if req.address.trim().is_empty() {
        return Err(ApiError::BadRequest("address is required".into()));
    }

    let order_no = state.checkout.create_order(&owner, &req.address).await?;
    Ok((StatusCode::CREATED, Json(OrderCreatedResponse { order_no })))
}

/// GET /orders?page&limit: the caller's order history, newest first.
#[tracing::instrument(skip(state, owner, query))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderListView>, ApiError> {
    let listing = state
        .checkout
        .my_orders(&owner, query.page.unwrap_or(1), query.limit.unwrap_or(0))
        .await?;
    Ok(Json(listing))
}

/// GET /orders/{id}: one order with its lines.
#[tracing::instrument(skip(state, _owner))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<OrderDetailView>, ApiError> {
    let details = state.checkout.get_order_details(OrderId::new(id)).await?;
    Ok(Json(details))
}
