//! # Stock Alert Records
//!
//! Turns the ledger's live alert lists into records someone can work
//! through and tick off.
//!
//! ```text
//! check_and_generate_alerts
//!   ledger.low_stock_alerts()             ─┐
//!   ledger.expiry_alerts(ALERT_EXPIRY_DAYS)─┼─► alert_candidates ─► insert_if_absent
//!                                           │        (one per medicine and type)
//!   open alert already there? ──► skipped ◄─┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use pharmacy_core::inventory::{alert_candidates, ALERT_EXPIRY_DAYS};
use pharmacy_core::{AlertType, StockAlertRecord};
use pharmacy_db::Database;

use crate::error::ServiceResult;
use crate::ledger::InventoryLedger;

#[derive(Debug, Clone)]
pub struct StockAlertService {
    db: Arc<Database>,
    ledger: InventoryLedger,
}

impl StockAlertService {
    pub fn new(db: Arc<Database>, ledger: InventoryLedger) -> Self {
        StockAlertService { db, ledger }
    }

    pub async fn all_alerts(&self) -> ServiceResult<Vec<StockAlertRecord>> {
        Ok(self.db.alerts().all().await?)
    }

    pub async fn unhandled_alerts(&self) -> ServiceResult<Vec<StockAlertRecord>> {
        Ok(self.db.alerts().unhandled().await?)
    }

    /// Open alerts of one type.
    pub async fn alerts_by_type(&self, alert_type: AlertType) -> ServiceResult<Vec<StockAlertRecord>> {
        Ok(self.db.alerts().unhandled_of_type(alert_type).await?)
    }

    /// Marks an alert handled; `false` when it does not exist. Handling an
    /// alert twice succeeds.
    pub async fn handle_alert(&self, id: i64) -> ServiceResult<bool> {
        let handled = self.db.alerts().mark_handled(id, Utc::now()).await?;
        debug!(alert_id = id, handled, "Handle alert");
        Ok(handled)
    }

    /// Scans stock and records an alert for every low or soon-expiring
    /// medicine that has no open alert of that type. Returns how many
    /// were written.
    pub async fn check_and_generate_alerts(&self) -> ServiceResult<usize> {
        let low_stock = self.ledger.low_stock_alerts().await?;
        let expiring = self.ledger.expiry_alerts(ALERT_EXPIRY_DAYS).await?;
        let candidates = alert_candidates(&low_stock, &expiring);

        let now = Utc::now();
        let mut written = 0;
        for candidate in &candidates {
            if self.db.alerts().insert_if_absent(candidate, now).await? {
                written += 1;
            }
        }

        info!(candidates = candidates.len(), written, "Stock alert scan finished");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, add_medicine, add_stock};
    use chrono::Days;

    async fn service() -> (Arc<Database>, StockAlertService) {
        let db = testing::db().await;
        let service = StockAlertService::new(db.clone(), InventoryLedger::new(db.clone()));
        (db, service)
    }

    #[tokio::test]
    async fn test_scan_records_each_problem_once() {
        let (db, service) = service().await;
        let today = Utc::now().date_naive();
        add_medicine(&db, "M1", "Amoxicillin", 100).await;
        add_medicine(&db, "M2", "Ibuprofen", 100).await;
        add_medicine(&db, "M3", "Healthy", 100).await;
        add_stock(&db, "M1", "LOW", 2, None, 10).await;
        add_stock(&db, "M2", "SOON", 50, today.checked_add_days(Days::new(20)), 0).await;
        add_stock(&db, "M2", "SOONER", 50, today.checked_add_days(Days::new(5)), 0).await;
        add_stock(&db, "M3", "FINE", 50, today.checked_add_days(Days::new(400)), 0).await;

        assert_eq!(service.check_and_generate_alerts().await.unwrap(), 2);
        assert_eq!(service.check_and_generate_alerts().await.unwrap(), 0);

        let low = service.alerts_by_type(AlertType::LowStock).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].medicine_id, "M1");
        let expiring = service.alerts_by_type(AlertType::NearExpiry).await.unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].expiry_date, today.checked_add_days(Days::new(5)));
    }

    #[tokio::test]
    async fn test_handled_alert_is_raised_again_on_next_scan() {
        let (db, service) = service().await;
        add_medicine(&db, "M1", "Amoxicillin", 100).await;
        add_stock(&db, "M1", "LOW", 2, None, 10).await;

        service.check_and_generate_alerts().await.unwrap();
        let id = service.unhandled_alerts().await.unwrap()[0].id;
        assert!(service.handle_alert(id).await.unwrap());
        assert!(service.handle_alert(id).await.unwrap());
        assert!(!service.handle_alert(id + 100).await.unwrap());
        assert!(service.unhandled_alerts().await.unwrap().is_empty());

        assert_eq!(service.check_and_generate_alerts().await.unwrap(), 1);
        let all = service.all_alerts().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().filter(|a| a.is_handled).count(), 1);
    }
}
