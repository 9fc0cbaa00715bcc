//! Inventory endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ProductId;
use serde::Deserialize;
use storage::{StockLevel, Store};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
}

/// POST /products/{id}/restock: add units to a product's stock.
#[tracing::instrument(skip(state, req))]
pub async fn restock<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<StockLevel>, ApiError> {
    let quantity = u32::try_from(req.quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| ApiError::BadRequest("quantity must be greater than zero".into()))?;

    let level = state
        .inventory
        .restock(ProductId::new(id), quantity)
        .await?;
    Ok(Json(level))
}
