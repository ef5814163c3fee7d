use axum::extract::State;
use axum::routing::get;
use axum::Router;

use pharmacy_core::Supplier;
use pharmacy_db::repository::supplier::NewSupplier;

use crate::error::{ok, ApiResult};
use crate::extract::Json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/suppliers", get(list).post(create))
}

/// GET /api/suppliers
async fn list(State(state): State<AppState>) -> ApiResult<Vec<Supplier>> {
    ok(state.services.suppliers.list().await?)
}

/// POST /api/suppliers
async fn create(State(state): State<AppState>, Json(payload): Json<NewSupplier>) -> ApiResult<Supplier> {
    ok(state.services.suppliers.create(payload).await?)
}
