//! Order handlers.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use pharmacy_core::order::{OrderRequest, SalesSummary};
use pharmacy_core::{Order, OrderDetail};
use pharmacy_service::ServiceError;

use super::DateRangeQuery;
use crate::error::{ok, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(between).post(create))
        .route("/api/orders/today", get(today))
        .route("/api/orders/summary", get(summary))
        .route("/api/orders/member/{member_id}", get(for_member))
        .route("/api/orders/{order_id}", get(get_by_id).delete(delete))
        .route("/api/orders/{order_id}/refund", post(refund))
}

#[derive(Debug, Deserialize)]
pub struct RefundQuery {
    pub reason: Option<String>,
}

/// POST /api/orders - place an order and decrement stock
async fn create(State(state): State<AppState>, Json(payload): Json<OrderRequest>) -> ApiResult<OrderDetail> {
    ok(state.services.orders.create_order(payload).await?)
}

/// GET /api/orders?start&end
async fn between(State(state): State<AppState>, Query(q): Query<DateRangeQuery>) -> ApiResult<Vec<Order>> {
    ok(state.services.orders.orders_between(q.start, q.end).await?)
}

/// GET /api/orders/today
async fn today(State(state): State<AppState>) -> ApiResult<Vec<Order>> {
    ok(state.services.orders.today_orders().await?)
}

/// GET /api/orders/summary?start&end - paid orders only
async fn summary(State(state): State<AppState>, Query(q): Query<DateRangeQuery>) -> ApiResult<SalesSummary> {
    ok(state.services.orders.sales_summary(q.start, q.end).await?)
}

/// GET /api/orders/member/{member_id}
async fn for_member(State(state): State<AppState>, Path(member_id): Path<String>) -> ApiResult<Vec<Order>> {
    ok(state.services.orders.orders_for_member(&member_id).await?)
}

/// GET /api/orders/{order_id}
async fn get_by_id(State(state): State<AppState>, Path(order_id): Path<String>) -> ApiResult<OrderDetail> {
    ok(state.services.orders.get_order(&order_id).await?)
}

/// DELETE /api/orders/{order_id} - removes the record; stock is untouched
async fn delete(State(state): State<AppState>, Path(order_id): Path<String>) -> ApiResult<bool> {
    if !state.services.orders.delete_order(&order_id).await? {
        return Err(ServiceError::not_found("Order", order_id).into());
    }
    ok(true)
}

/// POST /api/orders/{order_id}/refund?reason=
async fn refund(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Query(q): Query<RefundQuery>,
) -> ApiResult<Order> {
    ok(state
        .services
        .orders
        .refund_order(&order_id, q.reason.as_deref())
        .await?)
}
