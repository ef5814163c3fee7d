//! # pharmacy-api: HTTP Surface of the Pharmacy Backend
//!
//! Thin axum layer over `pharmacy-service`. Handlers only parse requests,
//! call one service method and wrap the result in the response envelope.
//!
//! ```text
//! ┌────────────┐   JSON   ┌──────────────┐        ┌──────────────────┐
//! │  Frontend  │ ───────► │ api::router  │ ─────► │ pharmacy-service │
//! │  (browser) │ ◄─────── │  + envelope  │ ◄───── │    Services      │
//! └────────────┘          └──────────────┘        └────────┬─────────┘
//!                                                          │
//!                                                 ┌────────▼─────────┐
//!                                                 │   pharmacy-db    │
//!                                                 │     (SQLite)     │
//!                                                 └──────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{ApiConfig, ConfigError};
pub use state::AppState;

/// Full application router with CORS and request tracing.
pub fn router(state: AppState) -> Router {
    api::router()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
