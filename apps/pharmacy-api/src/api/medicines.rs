//! Medicine catalog and per-medicine stock handlers.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use pharmacy_core::catalog::{MedicineStockGroup, NewMedicine};
use pharmacy_core::{InventoryBatch, Medicine, Page};
use pharmacy_service::MedicineCreation;

use super::PageQuery;
use crate::error::{ok, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/medicines", get(page).post(create))
        .route("/api/medicines/search", get(search))
        .route("/api/medicines/search-with-stock", get(search_with_stock))
        .route("/api/medicines/{id}", get(get_by_id))
        .route("/api/medicines/{id}/stock", get(stock))
        .route("/api/medicines/{id}/stock/check", get(check_stock))
        .route("/api/medicines/{id}/batches", get(batches))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
    pub category: Option<i64>,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_size() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
pub struct GroupedSearchQuery {
    #[serde(default)]
    pub keyword: String,
    pub category: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct StockLevel {
    pub medicine_id: String,
    pub current_stock: i64,
}

#[derive(Debug, Serialize)]
pub struct StockCheck {
    pub medicine_id: String,
    pub quantity: i64,
    pub sufficient: bool,
}

/// GET /api/medicines?page&size
async fn page(State(state): State<AppState>, Query(q): Query<PageQuery>) -> ApiResult<Page<Medicine>> {
    ok(state.services.medicines.page(q.page, q.size).await?)
}

/// POST /api/medicines - returns the existing medicine when an equivalent one exists
async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NewMedicine>,
) -> ApiResult<MedicineCreation> {
    ok(state.services.medicines.create(payload).await?)
}

/// GET /api/medicines/search?keyword&category&page&size
async fn search(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> ApiResult<Page<Medicine>> {
    ok(state
        .services
        .medicines
        .search(&q.keyword, q.category, q.page, q.size)
        .await?)
}

/// GET /api/medicines/search-with-stock?keyword&category
async fn search_with_stock(
    State(state): State<AppState>,
    Query(q): Query<GroupedSearchQuery>,
) -> ApiResult<Vec<MedicineStockGroup>> {
    ok(state
        .services
        .ledger
        .search_medicines_with_stock(&q.keyword, q.category)
        .await?)
}

/// GET /api/medicines/{id}
async fn get_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Medicine> {
    ok(state.services.medicines.get(&id).await?)
}

/// GET /api/medicines/{id}/stock
async fn stock(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StockLevel> {
    let current_stock = state.services.ledger.get_current_stock(&id).await?;
    ok(StockLevel {
        medicine_id: id,
        current_stock,
    })
}

/// GET /api/medicines/{id}/stock/check?quantity=
async fn check_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<CheckQuery>,
) -> ApiResult<StockCheck> {
    let sufficient = state.services.ledger.check_stock(&id, q.quantity).await?;
    ok(StockCheck {
        medicine_id: id,
        quantity: q.quantity,
        sufficient,
    })
}

/// GET /api/medicines/{id}/batches - FEFO order
async fn batches(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<InventoryBatch>> {
    ok(state.services.ledger.batches(&id).await?)
}
