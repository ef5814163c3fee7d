//! Dashboard handlers.
//!
//! The aggregator never fails; a broken query yields empty or cached data,
//! so every handler here answers 200.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use pharmacy_core::dashboard::{
    CategoryDistribution, DashboardReport, DashboardStats, HotProduct, SalesTrend, TrendPeriod,
};
use pharmacy_core::inventory::{ExpiryAlert, StockAlerts};

use crate::error::{ok, ApiResult};
use crate::extract::Query;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/stats", get(stats))
        .route("/api/dashboard/refresh", post(refresh))
        .route("/api/dashboard/sales-trend", get(sales_trend))
        .route("/api/dashboard/category-distribution", get(category_distribution))
        .route("/api/dashboard/expiring", get(expiring))
        .route("/api/stock-alerts", get(stock_alerts))
        .route("/api/hot-products", get(hot_products))
        .route("/api/export/dashboard-report", post(export_report))
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

/// GET /api/dashboard/stats
async fn stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    ok(state.services.dashboard.stats().await)
}

/// POST /api/dashboard/refresh - drops the cached stats and recomputes
async fn refresh(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    state.services.dashboard.refresh().await;
    ok(state.services.dashboard.stats().await)
}

/// GET /api/dashboard/sales-trend?period=day|week|month
async fn sales_trend(State(state): State<AppState>, Query(q): Query<TrendQuery>) -> ApiResult<SalesTrend> {
    let period = TrendPeriod::parse(q.period.as_deref());
    ok(state.services.dashboard.sales_trend(period).await)
}

/// GET /api/dashboard/category-distribution
async fn category_distribution(State(state): State<AppState>) -> ApiResult<CategoryDistribution> {
    ok(state.services.dashboard.category_distribution().await)
}

/// GET /api/dashboard/expiring
async fn expiring(State(state): State<AppState>) -> ApiResult<Vec<ExpiryAlert>> {
    ok(state.services.dashboard.expiring_medicines().await)
}

/// GET /api/stock-alerts
async fn stock_alerts(State(state): State<AppState>) -> ApiResult<StockAlerts> {
    ok(state.services.dashboard.stock_alerts().await)
}

/// GET /api/hot-products?limit=
async fn hot_products(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> ApiResult<Vec<HotProduct>> {
    ok(state.services.dashboard.hot_products(q.limit).await)
}

/// POST /api/export/dashboard-report
async fn export_report(State(state): State<AppState>) -> ApiResult<DashboardReport> {
    ok(state.services.dashboard.export_report().await)
}
