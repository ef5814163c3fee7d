//! # Workflow Configuration
//!
//! Explicit knobs handed to the workflows at construction. The API binary
//! fills them from environment variables; tests use the defaults.

use std::time::Duration;

// =============================================================================
// Stock-In
// =============================================================================

/// Configuration of the stock-in workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockInConfig {
    /// Supplier used when a document names none, or an unknown one.
    pub fallback_supplier_id: i64,
}

impl StockInConfig {
    pub fn new(fallback_supplier_id: i64) -> Self {
        StockInConfig {
            fallback_supplier_id,
        }
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Configuration of the dashboard aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// How long the headline stats stay cached.
    pub cache_ttl: Duration,

    /// Expiry window of the dashboard alerts, in days.
    pub dashboard_expiry_days: i64,

    /// Expiry window of the report's expiring list, in days.
    pub report_expiry_days: i64,

    /// Maximum entries in the report's expiring list.
    pub report_expiry_limit: usize,

    /// Default number of hot products.
    pub hot_product_limit: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            cache_ttl: Duration::from_secs(300),
            dashboard_expiry_days: 60,
            report_expiry_days: 90,
            report_expiry_limit: 20,
            hot_product_limit: 10,
        }
    }
}

impl DashboardConfig {
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}
