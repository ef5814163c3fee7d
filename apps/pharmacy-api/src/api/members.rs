//! Member handlers.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use pharmacy_core::member::{MemberFilter, MemberStats, MemberUpdate, NewMember};
use pharmacy_core::{Member, Page};
use pharmacy_service::ServiceError;

use super::PageQuery;
use crate::error::{ok, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/members", get(list).post(create))
        .route("/api/members/page", get(page))
        .route("/api/members/search", get(search))
        .route("/api/members/filter", get(filter))
        .route("/api/members/stats", get(stats))
        .route("/api/members/next-id", get(next_id))
        .route("/api/members/check-phone", get(check_phone))
        .route("/api/members/phone/{phone}", get(by_phone))
        .route("/api/members/batch-delete", post(batch_delete))
        .route("/api/members/{id}", get(get_by_id).put(update).delete(delete))
        .route("/api/members/{id}/points/add", post(add_points))
        .route("/api/members/{id}/points/use", post(use_points))
}

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Deserialize)]
pub struct PhoneQuery {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct PointsQuery {
    pub points: i64,
}

#[derive(Debug, Serialize)]
pub struct PointsBalance {
    pub member_id: String,
    pub points: i64,
}

/// GET /api/members
async fn list(State(state): State<AppState>) -> ApiResult<Vec<Member>> {
    ok(state.services.members.list().await?)
}

/// POST /api/members
async fn create(State(state): State<AppState>, Json(payload): Json<NewMember>) -> ApiResult<Member> {
    ok(state.services.members.create(payload).await?)
}

/// GET /api/members/page?page&size
async fn page(State(state): State<AppState>, Query(q): Query<PageQuery>) -> ApiResult<Page<Member>> {
    ok(state.services.members.page(q.page, q.size).await?)
}

/// GET /api/members/search?keyword - phone, name, then card number
async fn search(State(state): State<AppState>, Query(q): Query<KeywordQuery>) -> ApiResult<Vec<Member>> {
    ok(state.services.members.search(&q.keyword).await?)
}

/// GET /api/members/filter?name&phone&level&start&end
async fn filter(State(state): State<AppState>, Query(q): Query<MemberFilter>) -> ApiResult<Vec<Member>> {
    ok(state.services.members.filter(q).await?)
}

/// GET /api/members/stats
async fn stats(State(state): State<AppState>) -> ApiResult<MemberStats> {
    ok(state.services.members.stats().await?)
}

/// GET /api/members/next-id
async fn next_id(State(state): State<AppState>) -> ApiResult<String> {
    ok(state.services.members.next_id().await?)
}

/// GET /api/members/check-phone?phone=
async fn check_phone(State(state): State<AppState>, Query(q): Query<PhoneQuery>) -> ApiResult<bool> {
    ok(state.services.members.is_phone_exists(&q.phone).await?)
}

/// GET /api/members/phone/{phone}
async fn by_phone(State(state): State<AppState>, Path(phone): Path<String>) -> ApiResult<Member> {
    ok(state.services.members.by_phone(&phone).await?)
}

/// POST /api/members/batch-delete - body is a list of member ids
async fn batch_delete(State(state): State<AppState>, Json(ids): Json<Vec<String>>) -> ApiResult<u64> {
    ok(state.services.members.batch_delete(&ids).await?)
}

/// GET /api/members/{id}
async fn get_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Member> {
    ok(state.services.members.get(&id).await?)
}

/// PUT /api/members/{id}
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<MemberUpdate>,
) -> ApiResult<Member> {
    ok(state.services.members.update(&id, changes).await?)
}

/// DELETE /api/members/{id}
async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<bool> {
    if !state.services.members.delete(&id).await? {
        return Err(ServiceError::not_found("Member", id).into());
    }
    ok(true)
}

/// POST /api/members/{id}/points/add?points=
async fn add_points(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<PointsQuery>,
) -> ApiResult<PointsBalance> {
    let points = state.services.members.add_points(&id, q.points).await?;
    ok(PointsBalance { member_id: id, points })
}

/// POST /api/members/{id}/points/use?points=
async fn use_points(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<PointsQuery>,
) -> ApiResult<PointsBalance> {
    let points = state.services.members.use_points(&id, q.points).await?;
    ok(PointsBalance { member_id: id, points })
}
