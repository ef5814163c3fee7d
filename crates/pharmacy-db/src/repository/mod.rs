//! # Repository Module
//!
//! Database repository implementations for the pharmacy backend.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Workflow (pharmacy-service)                                           │
//! │       │                                                                 │
//! │       │  db.members().use_points("M00001", 30)                         │
//! │       ▼                                                                 │
//! │  MemberRepository { pool }                                             │
//! │       │                                                                 │
//! │       │  UPDATE members SET points = points - ?                        │
//! │       │  WHERE member_id = ? AND points >= ?                           │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Transactional work takes `&mut SqliteConnection` instead of the pool, │
//! │  so a workflow can chain header, lines and stock in one transaction:   │
//! │                                                                         │
//! │  let mut tx = db.begin().await?;                                       │
//! │  order::insert_order(&mut tx, &order).await?;                          │
//! │  inventory::decrement_for_order(&mut tx, "M1", 3, &order_id).await?;   │
//! │  tx.commit().await?;                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`MedicineRepository`] - Catalog CRUD, dedup lookups, search
//! - [`CategoryRepository`] - Category tree lookups
//! - [`SupplierRepository`] - Suppliers and the fallback supplier
//! - [`InventoryRepository`] - Batch reads and listings; [`inventory`] holds the mutations
//! - [`OrderRepository`] - Orders, lines and sales summaries
//! - [`StockInRepository`] - Receiving documents
//! - [`MemberRepository`] - Members and points
//! - [`SettingRepository`] - Latest-row settings
//! - [`DashboardRepository`] - Read-only aggregates
//! - [`StockAlertRepository`] - Persisted stock alerts

pub mod alert;
pub mod category;
pub mod dashboard;
pub mod inventory;
pub mod medicine;
pub mod member;
pub mod order;
pub mod setting;
pub mod stock_in;
pub mod supplier;

pub use alert::StockAlertRepository;
pub use category::CategoryRepository;
pub use dashboard::DashboardRepository;
pub use inventory::InventoryRepository;
pub use medicine::MedicineRepository;
pub use member::MemberRepository;
pub use order::OrderRepository;
pub use setting::SettingRepository;
pub use stock_in::StockInRepository;
pub use supplier::SupplierRepository;

/// Random suffix for time-based identifiers.
pub(crate) fn random_suffix() -> u32 {
    (uuid::Uuid::new_v4().as_u128() % 1000) as u32
}

/// Escapes `%` and `_` for a `LIKE ... ESCAPE '\'` pattern and wraps the
/// keyword for a contains-match.
pub(crate) fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("amox"), "%amox%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_random_suffix_range() {
        for _ in 0..100 {
            assert!(random_suffix() < 1000);
        }
    }
}
