//! # REST Routes
//!
//! One module per resource, each exposing a `router()` that is merged here.
//!
//! ```text
//! /api/health                    health
//! /api/medicines/...             medicines   (catalog + stock)
//! /api/categories/...            categories
//! /api/suppliers                 suppliers
//! /api/inventory/...             inventory   (batch listing + manual edits)
//! /api/orders/...                orders
//! /api/stock-ins/...             stock_ins
//! /api/members/...               members
//! /api/settings                  settings
//! /api/dashboard/...             dashboard
//! /api/stock-alerts              dashboard   (live lists)
//! /api/stock-alerts/records/...  alerts      (persisted, handled/unhandled)
//! /api/stock-alerts/check        alerts
//! /api/hot-products              dashboard
//! /api/export/dashboard-report   dashboard
//! ```

mod alerts;
mod categories;
mod dashboard;
mod health;
mod inventory;
mod medicines;
mod members;
mod orders;
mod settings;
mod stock_ins;
mod suppliers;

use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(medicines::router())
        .merge(categories::router())
        .merge(suppliers::router())
        .merge(inventory::router())
        .merge(orders::router())
        .merge(stock_ins::router())
        .merge(members::router())
        .merge(settings::router())
        .merge(dashboard::router())
        .merge(alerts::router())
}

// =============================================================================
// Shared Query Parameters
// =============================================================================

/// `?page=&size=`, zero-based.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

fn default_page_size() -> u32 {
    20
}

/// `?start=YYYY-MM-DD&end=YYYY-MM-DD`, both days included.
#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}
