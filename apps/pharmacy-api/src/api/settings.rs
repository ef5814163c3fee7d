use axum::extract::State;
use axum::routing::get;
use axum::Router;

use pharmacy_core::{Settings, SettingsPatch};

use crate::error::{ok, ApiResult};
use crate::extract::Json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/settings", get(current).post(update))
}

/// GET /api/settings - defaults until something is saved
async fn current(State(state): State<AppState>) -> ApiResult<Settings> {
    ok(state.services.settings.get().await?)
}

/// POST /api/settings - partial update; unknown keys are ignored
async fn update(State(state): State<AppState>, Json(patch): Json<SettingsPatch>) -> ApiResult<Settings> {
    ok(state.services.settings.update(patch).await?)
}
