//! Persisted stock alert handlers. The live alert lists stay on
//! `GET /api/stock-alerts` (dashboard).

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;

use pharmacy_core::{AlertType, StockAlertRecord};
use pharmacy_service::ServiceError;

use crate::error::{ok, ApiResult};
use crate::extract::Path;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stock-alerts/records", get(all))
        .route("/api/stock-alerts/records/unhandled", get(unhandled))
        .route("/api/stock-alerts/records/type/{alert_type}", get(by_type))
        .route("/api/stock-alerts/records/{id}/handle", post(handle))
        .route("/api/stock-alerts/check", post(check))
}

/// GET /api/stock-alerts/records
async fn all(State(state): State<AppState>) -> ApiResult<Vec<StockAlertRecord>> {
    ok(state.services.alerts.all_alerts().await?)
}

/// GET /api/stock-alerts/records/unhandled
async fn unhandled(State(state): State<AppState>) -> ApiResult<Vec<StockAlertRecord>> {
    ok(state.services.alerts.unhandled_alerts().await?)
}

/// GET /api/stock-alerts/records/type/{low_stock|near_expiry}
async fn by_type(
    State(state): State<AppState>,
    Path(alert_type): Path<AlertType>,
) -> ApiResult<Vec<StockAlertRecord>> {
    ok(state.services.alerts.alerts_by_type(alert_type).await?)
}

/// POST /api/stock-alerts/records/{id}/handle
async fn handle(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<bool> {
    if !state.services.alerts.handle_alert(id).await? {
        return Err(ServiceError::not_found("Stock alert", id.to_string()).into());
    }
    ok(true)
}

/// POST /api/stock-alerts/check - scan now; returns how many were raised
async fn check(State(state): State<AppState>) -> ApiResult<usize> {
    ok(state.services.alerts.check_and_generate_alerts().await?)
}
