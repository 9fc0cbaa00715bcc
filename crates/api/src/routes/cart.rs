//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::CartView;
use common::ProductId;
use serde::Deserialize;
use storage::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Owner;

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

/// GET /cart: the caller's cart with live prices and totals.
#[tracing::instrument(skip(state, owner))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts.get_cart(&owner).await?))
}

/// POST /cart/items: add a product to the caller's cart.
#[tracing::instrument(skip(state, owner, req))]
pub async fn add_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartView>), ApiError> {
    let quantity = u32::try_from(req.quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| ApiError::BadRequest("quantity must be greater than zero".into()))?;

    state
        .carts
        .add_item(&owner, ProductId::new(req.product_id), quantity)
        .await?;

    let cart = state.carts.get_cart(&owner).await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

/// DELETE /cart/items/{product_id}: remove a product's line.
#[tracing::instrument(skip(state, owner))]
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Path(product_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .carts
        .remove_item(&owner, ProductId::new(product_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
