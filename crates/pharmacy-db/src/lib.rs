//! # pharmacy-db: Database Layer for the Pharmacy Backend
//!
//! This crate provides database access for the pharmacy backend.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Pharmacy Backend Data Flow                         │
//! │                                                                         │
//! │  HTTP handler (POST /api/orders)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pharmacy-service (OrderWorkflow: one transaction per order)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   pharmacy-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ MedicineRepo   │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo  │   │ 001_initial  │  │   │
//! │  │   │ begin()       │    │ OrderRepo ...  │   │ _schema.sql  │  │   │
//! │  │   │               │    │                │   │ 002_stock    │  │   │
//! │  │   │               │    │                │   │ _alerts.sql  │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ./pharmacy.db (PHARMACY_DATABASE_PATH)                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations and transactional writes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pharmacy_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./pharmacy.db")).await?;
//!
//! let stock = db.inventory().current_stock("M1001").await?;
//! let (medicines, total) = db.medicines().search("amox", None, 0, 20).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CategoryRepository, DashboardRepository, InventoryRepository, MedicineRepository,
    MemberRepository, OrderRepository, SettingRepository, StockAlertRepository, StockInRepository,
    SupplierRepository,
};
