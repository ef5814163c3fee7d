//! Stock-in document handlers.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use pharmacy_core::stock_in::StockInDraft;
use pharmacy_core::{Page, StockIn, StockInDetail, StockInStatus};

use super::{DateRangeQuery, PageQuery};
use crate::error::{ok, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stock-ins", get(page).post(create))
        .route("/api/stock-ins/search", get(search))
        .route("/api/stock-ins/range", get(between))
        .route("/api/stock-ins/status/{status}", get(by_status))
        .route("/api/stock-ins/no/{stock_in_no}", get(by_number))
        .route("/api/stock-ins/{id}", get(get_by_id).put(update).delete(delete))
        .route("/api/stock-ins/{id}/approve", post(approve))
        .route("/api/stock-ins/{id}/cancel", post(cancel))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
    pub status: Option<StockInStatus>,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_size() -> u32 {
    20
}

/// GET /api/stock-ins?page&size
async fn page(State(state): State<AppState>, Query(q): Query<PageQuery>) -> ApiResult<Page<StockIn>> {
    ok(state.services.stock_ins.list(q.page, q.size).await?)
}

/// POST /api/stock-ins - records a PENDING document
async fn create(State(state): State<AppState>, Json(draft): Json<StockInDraft>) -> ApiResult<StockInDetail> {
    ok(state.services.stock_ins.create_stock_in(draft).await?)
}

/// GET /api/stock-ins/search?keyword&status&page&size
async fn search(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> ApiResult<Page<StockIn>> {
    ok(state
        .services
        .stock_ins
        .search(&q.keyword, q.status, q.page, q.size)
        .await?)
}

/// GET /api/stock-ins/range?start&end
async fn between(State(state): State<AppState>, Query(q): Query<DateRangeQuery>) -> ApiResult<Vec<StockIn>> {
    ok(state.services.stock_ins.between(q.start, q.end).await?)
}

/// GET /api/stock-ins/status/{pending|approved|cancelled}
async fn by_status(
    State(state): State<AppState>,
    Path(status): Path<StockInStatus>,
) -> ApiResult<Vec<StockIn>> {
    ok(state.services.stock_ins.by_status(status).await?)
}

/// GET /api/stock-ins/no/{stock_in_no}
async fn by_number(
    State(state): State<AppState>,
    Path(stock_in_no): Path<String>,
) -> ApiResult<StockInDetail> {
    ok(state.services.stock_ins.get_by_no(&stock_in_no).await?)
}

/// GET /api/stock-ins/{id}
async fn get_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StockInDetail> {
    ok(state.services.stock_ins.get(id).await?)
}

/// PUT /api/stock-ins/{id} - PENDING only; lines are replaced wholesale
async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<StockInDraft>,
) -> ApiResult<StockInDetail> {
    ok(state.services.stock_ins.update_stock_in(id, draft).await?)
}

/// DELETE /api/stock-ins/{id} - PENDING only
async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<bool> {
    state.services.stock_ins.delete_stock_in(id).await?;
    ok(true)
}

/// POST /api/stock-ins/{id}/approve
async fn approve(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StockInDetail> {
    ok(state.services.stock_ins.approve_stock_in(id).await?)
}

/// POST /api/stock-ins/{id}/cancel
async fn cancel(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StockInDetail> {
    ok(state.services.stock_ins.cancel_stock_in(id).await?)
}
