//! Inventory screen handlers: batch listing and manual batch edits.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use pharmacy_core::inventory::{BatchDraft, OutOfStockEntry};
use pharmacy_core::{InventoryBatch, InventoryListing, StockMovement};

use crate::error::{ok, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/inventory", get(list).post(create))
        .route("/api/inventory/out-of-stock", get(out_of_stock))
        .route("/api/inventory/movements", get(movements))
        .route("/api/inventory/{id}", get(get_by_id).put(update).delete(delete))
}

#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    #[serde(default)]
    pub reference: String,
}

/// GET /api/inventory - every batch with its medicine
async fn list(State(state): State<AppState>) -> ApiResult<Vec<InventoryListing>> {
    ok(state.services.batches.listings().await?)
}

/// POST /api/inventory
async fn create(State(state): State<AppState>, Json(draft): Json<BatchDraft>) -> ApiResult<InventoryBatch> {
    ok(state.services.batches.create_batch(draft).await?)
}

/// GET /api/inventory/out-of-stock
async fn out_of_stock(State(state): State<AppState>) -> ApiResult<Vec<OutOfStockEntry>> {
    ok(state.services.ledger.out_of_stock().await?)
}

/// GET /api/inventory/movements?reference=
async fn movements(
    State(state): State<AppState>,
    Query(q): Query<MovementQuery>,
) -> ApiResult<Vec<StockMovement>> {
    ok(state.services.ledger.movements(&q.reference).await?)
}

/// GET /api/inventory/{id}
async fn get_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<InventoryBatch> {
    ok(state.services.batches.get_batch(&id).await?)
}

/// PUT /api/inventory/{id}
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<BatchDraft>,
) -> ApiResult<InventoryBatch> {
    ok(state.services.batches.update_batch(&id, draft).await?)
}

/// DELETE /api/inventory/{id} - empty batches only
async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<bool> {
    state.services.batches.delete_batch(&id).await?;
    ok(true)
}
