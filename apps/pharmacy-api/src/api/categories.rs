use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use pharmacy_core::Category;

use crate::error::{ok, ApiResult};
use crate::extract::{Path, Query};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list))
        .route("/api/categories/top-level", get(top_level))
        .route("/api/categories/search", get(search))
        .route("/api/categories/{id}", get(get_by_id))
        .route("/api/categories/{id}/children", get(children))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
}

/// GET /api/categories
async fn list(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    ok(state.services.categories.list().await?)
}

/// GET /api/categories/top-level
async fn top_level(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    ok(state.services.categories.top_level().await?)
}

/// GET /api/categories/search?keyword
async fn search(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> ApiResult<Vec<Category>> {
    ok(state.services.categories.search(&q.keyword).await?)
}

/// GET /api/categories/{id}
async fn get_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Category> {
    ok(state.services.categories.get(id).await?)
}

/// GET /api/categories/{id}/children
async fn children(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Vec<Category>> {
    ok(state.services.categories.children(id).await?)
}
