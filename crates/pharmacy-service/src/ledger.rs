//! # Inventory Ledger
//!
//! Read side of the stock ledger: aggregate stock, stock checks and the
//! three alert lists. The mutations (FEFO decrement, refund restore, batch
//! credit) are transactional primitives in
//! [`pharmacy_db::repository::inventory`] and are driven by the order and
//! stock-in workflows.
//!
//! ## Alert Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock_levels()  ──► low_stock_alerts(levels, settings threshold)      │
//! │        │                                                                │
//! │        └────────► out_of_stock(levels)                                 │
//! │                                                                         │
//! │  dated_batches(today, today + N) ──► expiry_alerts(batches, today, N)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tracing::debug;

use pharmacy_core::catalog::{group_with_stock, MedicineStockGroup};
use pharmacy_core::inventory::{
    self as rules, ExpiryAlert, LowStockAlert, OutOfStockEntry, StockAlerts,
};
use pharmacy_core::validation::validate_search_query;
use pharmacy_core::{InventoryBatch, Settings, StockMovement};
use pharmacy_db::Database;

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct InventoryLedger {
    db: Arc<Database>,
}

impl InventoryLedger {
    pub fn new(db: Arc<Database>) -> Self {
        InventoryLedger { db }
    }

    /// Σ quantity over the medicine's batches; 0 when it has none.
    pub async fn get_current_stock(&self, medicine_id: &str) -> ServiceResult<i64> {
        Ok(self.db.inventory().current_stock(medicine_id).await?)
    }

    /// Whether aggregate stock covers `quantity`.
    ///
    /// ## Errors
    /// - `quantity <= 0` is a validation error
    pub async fn check_stock(&self, medicine_id: &str, quantity: i64) -> ServiceResult<bool> {
        if quantity <= 0 {
            return Err(ServiceError::validation("quantity must be positive"));
        }
        let available = self.get_current_stock(medicine_id).await?;
        debug!(medicine_id = %medicine_id, available, requested = quantity, "Stock check");
        Ok(available >= quantity)
    }

    /// The medicine's batches in FEFO order.
    pub async fn batches(&self, medicine_id: &str) -> ServiceResult<Vec<InventoryBatch>> {
        self.db.medicines().require(medicine_id).await?;
        Ok(self.db.inventory().batches(medicine_id).await?)
    }

    async fn low_stock_threshold(&self) -> ServiceResult<i64> {
        Ok(self
            .db
            .settings()
            .latest()
            .await?
            .unwrap_or_else(Settings::default)
            .low_stock_threshold)
    }

    /// Medicines at or below 1.5× their minimum, CRITICAL first.
    pub async fn low_stock_alerts(&self) -> ServiceResult<Vec<LowStockAlert>> {
        let levels = self.db.inventory().stock_levels().await?;
        let threshold = self.low_stock_threshold().await?;
        Ok(rules::low_stock_alerts(&levels, threshold))
    }

    /// Non-empty batches expiring within `within_days` from today.
    pub async fn expiry_alerts(&self, within_days: i64) -> ServiceResult<Vec<ExpiryAlert>> {
        let today = Utc::now().date_naive();
        self.expiry_alerts_on(today, within_days).await
    }

    async fn expiry_alerts_on(&self, today: NaiveDate, within_days: i64) -> ServiceResult<Vec<ExpiryAlert>> {
        let days = u64::try_from(within_days.max(0)).unwrap_or_default();
        let until = today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
        let batches = self.db.inventory().dated_batches(today, until).await?;
        Ok(rules::expiry_alerts(&batches, today, within_days))
    }

    /// Medicines with batches but no stock left.
    pub async fn out_of_stock(&self) -> ServiceResult<Vec<OutOfStockEntry>> {
        let levels = self.db.inventory().stock_levels().await?;
        Ok(rules::out_of_stock(&levels))
    }

    /// Journal entries under an order id, refund reference, stock-in number
    /// or `ADJ...` adjustment reference.
    pub async fn movements(&self, reference: &str) -> ServiceResult<Vec<StockMovement>> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ServiceError::validation("reference is required"));
        }
        Ok(self.db.inventory().movements(reference).await?)
    }

    /// Expiry, low-stock and out-of-stock lists together.
    pub async fn stock_alerts(&self, expiry_days: i64) -> ServiceResult<StockAlerts> {
        let levels = self.db.inventory().stock_levels().await?;
        let threshold = self.low_stock_threshold().await?;

        Ok(StockAlerts {
            expiry: self.expiry_alerts(expiry_days).await?,
            low_stock: rules::low_stock_alerts(&levels, threshold),
            out_of_stock: rules::out_of_stock(&levels),
            degraded: false,
        })
    }

    /// Catalog search grouped by [`group_key`](pharmacy_core::catalog::group_key)
    /// with stock summed per group.
    pub async fn search_medicines_with_stock(
        &self,
        keyword: &str,
        category_id: Option<i64>,
    ) -> ServiceResult<Vec<MedicineStockGroup>> {
        let keyword = validate_search_query(keyword)?;
        let rows = self
            .db
            .medicines()
            .search_with_stock(&keyword, category_id)
            .await?;
        Ok(group_with_stock(rows))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, add_medicine, add_stock};
    use pharmacy_core::inventory::{AlertLevel, AlertPriority};

    #[tokio::test]
    async fn test_current_stock_and_check() {
        let db = testing::db().await;
        let ledger = InventoryLedger::new(db.clone());
        add_medicine(&db, "M1", "Amoxicillin", 1000).await;
        add_stock(&db, "M1", "B1", 5, None, 0).await;
        add_stock(&db, "M1", "B2", 15, None, 0).await;

        assert_eq!(ledger.get_current_stock("M1").await.unwrap(), 20);
        assert_eq!(ledger.get_current_stock("unknown").await.unwrap(), 0);
        assert!(ledger.check_stock("M1", 20).await.unwrap());
        assert!(!ledger.check_stock("M1", 21).await.unwrap());

        let err = ledger.check_stock("M1", 0).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_low_stock_alert_boundaries() {
        let db = testing::db().await;
        let ledger = InventoryLedger::new(db.clone());
        add_medicine(&db, "M1", "At minimum", 100).await;
        add_medicine(&db, "M2", "Within half again", 100).await;
        add_medicine(&db, "M3", "Above", 100).await;
        add_stock(&db, "M1", "B1", 10, None, 10).await;
        add_stock(&db, "M2", "B1", 14, None, 10).await;
        add_stock(&db, "M3", "B1", 16, None, 10).await;

        let alerts = ledger.low_stock_alerts().await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].medicine_id, "M1");
        assert_eq!(alerts[0].level, AlertLevel::Critical);
        assert_eq!(alerts[1].medicine_id, "M2");
        assert_eq!(alerts[1].level, AlertLevel::Low);
        assert_eq!(alerts[1].priority, AlertPriority::Medium);
    }

    #[tokio::test]
    async fn test_settings_threshold_applies_without_own_minimum() {
        let db = testing::db().await;
        let ledger = InventoryLedger::new(db.clone());
        add_medicine(&db, "M1", "Amoxicillin", 100).await;
        add_stock(&db, "M1", "B1", 12, None, 0).await;

        // Default threshold 10: 12 is LOW.
        assert_eq!(ledger.low_stock_alerts().await.unwrap().len(), 1);

        db.settings()
            .save(&Settings {
                low_stock_threshold: 5,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(ledger.low_stock_alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expiry_window_and_out_of_stock() {
        let db = testing::db().await;
        let ledger = InventoryLedger::new(db.clone());
        let today = Utc::now().date_naive();
        let in_days = |n: u64| today.checked_add_days(Days::new(n));

        add_medicine(&db, "M1", "Amoxicillin", 100).await;
        add_medicine(&db, "M2", "Ibuprofen", 100).await;
        add_stock(&db, "M1", "SOON", 3, in_days(10), 0).await;
        add_stock(&db, "M1", "LATER", 3, in_days(45), 0).await;
        add_stock(&db, "M1", "FAR", 3, in_days(200), 0).await;
        add_stock(&db, "M2", "EMPTY", 0, in_days(5), 0).await;

        let alerts = ledger.expiry_alerts(60).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].batch_number, "SOON");
        assert_eq!(alerts[0].priority, AlertPriority::High);
        assert_eq!(alerts[1].priority, AlertPriority::Low);

        let empty = ledger.out_of_stock().await.unwrap();
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].medicine_id, "M2");

        let bundle = ledger.stock_alerts(60).await.unwrap();
        assert_eq!(bundle.expiry.len(), 2);
        assert_eq!(bundle.out_of_stock.len(), 1);
        assert!(!bundle.degraded);
    }

    #[tokio::test]
    async fn test_movements_by_reference() {
        let db = testing::db().await;
        let ledger = InventoryLedger::new(db.clone());
        add_medicine(&db, "M1", "Amoxicillin", 100).await;
        add_stock(&db, "M1", "B1", 5, None, 0).await;

        let mut tx = db.begin().await.unwrap();
        pharmacy_db::repository::inventory::decrement_for_order(&mut tx, "M1", 2, "O1")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let journal = ledger.movements(" O1 ").await.unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].quantity_delta, -2);
        assert!(ledger.movements("O2").await.unwrap().is_empty());

        let err = ledger.movements("  ").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_batches_of_unknown_medicine_is_not_found() {
        let db = testing::db().await;
        let ledger = InventoryLedger::new(db);
        let err = ledger.batches("ghost").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }
}
