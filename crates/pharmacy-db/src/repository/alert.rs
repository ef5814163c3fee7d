//! # Stock Alert Repository
//!
//! Persisted stock alerts. The partial unique index
//! `idx_alerts_open (medicine_id, alert_type) WHERE is_handled = 0` keeps
//! one open alert per medicine and type, so a scan can insert blindly.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use pharmacy_core::inventory::NewStockAlert;
use pharmacy_core::{AlertType, StockAlertRecord};

const SELECT: &str = "SELECT a.id, a.medicine_id, m.generic_name AS medicine_name, a.alert_type, \
     a.current_stock, a.min_stock, a.expiry_date, a.alert_message, a.is_handled, \
     a.created_at, a.handled_at \
     FROM stock_alerts a JOIN medicines m ON m.medicine_id = a.medicine_id";

const NEWEST_FIRST: &str = "ORDER BY a.created_at DESC, a.id DESC";

#[derive(Debug, Clone)]
pub struct StockAlertRepository {
    pool: SqlitePool,
}

impl StockAlertRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockAlertRepository { pool }
    }

    /// Every alert, handled or not, newest first.
    pub async fn all(&self) -> DbResult<Vec<StockAlertRecord>> {
        let sql = format!("{SELECT} {NEWEST_FIRST}");
        Ok(sqlx::query_as::<_, StockAlertRecord>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn unhandled(&self) -> DbResult<Vec<StockAlertRecord>> {
        let sql = format!("{SELECT} WHERE a.is_handled = 0 {NEWEST_FIRST}");
        Ok(sqlx::query_as::<_, StockAlertRecord>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn unhandled_of_type(&self, alert_type: AlertType) -> DbResult<Vec<StockAlertRecord>> {
        let sql = format!("{SELECT} WHERE a.is_handled = 0 AND a.alert_type = ?1 {NEWEST_FIRST}");
        Ok(sqlx::query_as::<_, StockAlertRecord>(&sql)
            .bind(alert_type)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<StockAlertRecord>> {
        let sql = format!("{SELECT} WHERE a.id = ?1");
        Ok(sqlx::query_as::<_, StockAlertRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Records an alert unless the medicine already has an open one of the
    /// same type. Returns whether a row was written.
    pub async fn insert_if_absent(&self, alert: &NewStockAlert, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO stock_alerts (
                medicine_id, alert_type, current_stock, min_stock, expiry_date,
                alert_message, is_handled, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
            ON CONFLICT (medicine_id, alert_type) WHERE is_handled = 0 DO NOTHING
            "#,
        )
        .bind(&alert.medicine_id)
        .bind(alert.alert_type)
        .bind(alert.current_stock)
        .bind(alert.min_stock)
        .bind(alert.expiry_date)
        .bind(&alert.message)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let written = result.rows_affected() > 0;
        if written {
            debug!(medicine_id = %alert.medicine_id, alert_type = %alert.alert_type, "Raised stock alert");
        }
        Ok(written)
    }

    /// Marks an alert handled. Handling it again keeps the first
    /// `handled_at`. `false` when no alert has this id.
    pub async fn mark_handled(&self, id: i64, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE stock_alerts SET is_handled = 1, handled_at = COALESCE(handled_at, ?2) WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{self, medicine};
    use chrono::{Duration, NaiveDate};

    fn low_stock(medicine_id: &str, current: i64) -> NewStockAlert {
        NewStockAlert {
            medicine_id: medicine_id.to_string(),
            alert_type: AlertType::LowStock,
            current_stock: current,
            min_stock: Some(10),
            expiry_date: None,
            message: format!("{medicine_id} is low"),
        }
    }

    #[tokio::test]
    async fn test_one_open_alert_per_medicine_and_type() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        let now = Utc::now();

        assert!(db.alerts().insert_if_absent(&low_stock("M1", 3), now).await.unwrap());
        assert!(!db.alerts().insert_if_absent(&low_stock("M1", 2), now).await.unwrap());

        let expiring = NewStockAlert {
            alert_type: AlertType::NearExpiry,
            min_stock: None,
            expiry_date: NaiveDate::from_ymd_opt(2027, 1, 1),
            ..low_stock("M1", 3)
        };
        assert!(db.alerts().insert_if_absent(&expiring, now).await.unwrap());

        let open = db.alerts().unhandled().await.unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].medicine_name, "Amoxicillin");

        let low = db.alerts().unhandled_of_type(AlertType::LowStock).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].current_stock, 3);
        assert_eq!(low[0].min_stock, Some(10));
    }

    #[tokio::test]
    async fn test_handled_alert_allows_a_new_one() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        let now = Utc::now();
        db.alerts().insert_if_absent(&low_stock("M1", 3), now).await.unwrap();
        let id = db.alerts().unhandled().await.unwrap()[0].id;

        assert!(db.alerts().mark_handled(id, now).await.unwrap());
        assert!(db.alerts().mark_handled(id, now + Duration::hours(1)).await.unwrap());
        assert!(!db.alerts().mark_handled(9999, now).await.unwrap());

        let handled = db.alerts().get(id).await.unwrap().unwrap();
        assert!(handled.is_handled);
        assert_eq!(
            handled.handled_at.map(|t| t.timestamp_millis()),
            Some(now.timestamp_millis())
        );

        assert!(db.alerts().insert_if_absent(&low_stock("M1", 1), now).await.unwrap());
        assert_eq!(db.alerts().all().await.unwrap().len(), 2);
        assert_eq!(db.alerts().unhandled().await.unwrap().len(), 1);
    }
}
