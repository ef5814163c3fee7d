//! Shared application state.

use std::sync::Arc;

use pharmacy_service::Services;

/// Handed to every handler through axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        AppState {
            services: Arc::new(services),
        }
    }
}
