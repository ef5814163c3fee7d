//! # pharmacy-service: Business Workflows for the Pharmacy Backend
//!
//! Everything that spans more than one table or needs a transaction lives
//! here. Callers (the REST app, the seed tool, tests) build a [`Services`]
//! bundle from a [`Database`] and call workflows on it.
//!
//! ## Dependency Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   InventoryLedger ◄── StockInWorkflow    (credit_batch on approve)     │
//! │         ▲  ▲                                                            │
//! │         │  └───────── OrderWorkflow      (FEFO decrement / restore)    │
//! │         │                   │                                           │
//! │   StockAlertService         │ invalidates       BatchMaintenance       │
//! │   (persisted alerts)        │                   (manual batch edits)   │
//! │                             ▼                                           │
//! │                       TtlCache<DashboardStats> ◄── DashboardAggregator  │
//! │                                                                         │
//! │   MedicineCatalog  CategoryDirectory  SupplierDirectory                │
//! │   MemberService    SettingsService                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Surface
//! Every operation returns [`ServiceResult`]. [`ServiceError::kind`] gives
//! the coarse category the REST layer maps to a status code.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod batches;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod ledger;
pub mod member;
pub mod order;
pub mod settings;
pub mod stock_in;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use alerts::StockAlertService;
pub use batches::BatchMaintenance;
pub use cache::TtlCache;
pub use catalog::{CategoryDirectory, MedicineCatalog, MedicineCreation, SupplierDirectory};
pub use config::{DashboardConfig, StockInConfig};
pub use dashboard::DashboardAggregator;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use ledger::InventoryLedger;
pub use member::MemberService;
pub use order::OrderWorkflow;
pub use settings::SettingsService;
pub use stock_in::StockInWorkflow;

use std::sync::Arc;

use pharmacy_db::Database;

// =============================================================================
// Bundle
// =============================================================================

/// Every service wired to one database.
///
/// The order, stock-in and batch services share the dashboard's stats cache
/// so that any stock write invalidates the headline figures.
#[derive(Debug, Clone)]
pub struct Services {
    pub db: Arc<Database>,
    pub ledger: InventoryLedger,
    pub batches: BatchMaintenance,
    pub alerts: StockAlertService,
    pub orders: OrderWorkflow,
    pub stock_ins: StockInWorkflow,
    pub dashboard: DashboardAggregator,
    pub medicines: MedicineCatalog,
    pub categories: CategoryDirectory,
    pub suppliers: SupplierDirectory,
    pub members: MemberService,
    pub settings: SettingsService,
}

impl Services {
    pub fn new(db: Arc<Database>, stock_in: StockInConfig, dashboard: DashboardConfig) -> Self {
        let stats_cache = Arc::new(TtlCache::new(dashboard.cache_ttl));
        let ledger = InventoryLedger::new(db.clone());

        Services {
            batches: BatchMaintenance::new(db.clone(), stats_cache.clone()),
            alerts: StockAlertService::new(db.clone(), ledger.clone()),
            ledger,
            orders: OrderWorkflow::new(db.clone(), stats_cache.clone()),
            stock_ins: StockInWorkflow::new(db.clone(), stock_in, stats_cache.clone()),
            dashboard: DashboardAggregator::new(db.clone(), stats_cache, dashboard),
            medicines: MedicineCatalog::new(db.clone()),
            categories: CategoryDirectory::new(db.clone()),
            suppliers: SupplierDirectory::new(db.clone()),
            members: MemberService::new(db.clone()),
            settings: SettingsService::new(db.clone()),
            db,
        }
    }
}
