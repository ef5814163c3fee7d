//! # Setting Repository
//!
//! Store settings. The table may hold several rows; the most recently
//! created one is authoritative and is the one rewritten on save.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharmacy_core::Settings;

const NOTIFY_METHODS_COLUMN: &str = "settings.notify_methods";

/// Row shape with `notify_methods` still JSON-encoded.
#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    id: i64,
    store_name: String,
    store_phone: String,
    store_address: String,
    store_desc: String,
    low_stock_threshold: i64,
    notify_methods: String,
    points_rule: f64,
    cash_rule: i64,
    operation_log: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SettingsRow> for Settings {
    type Error = DbError;

    fn try_from(row: SettingsRow) -> Result<Self, Self::Error> {
        let notify_methods = serde_json::from_str(&row.notify_methods)
            .map_err(|e| DbError::json(NOTIFY_METHODS_COLUMN, e))?;

        Ok(Settings {
            store_name: row.store_name,
            store_phone: row.store_phone,
            store_address: row.store_address,
            store_desc: row.store_desc,
            low_stock_threshold: row.low_stock_threshold,
            notify_methods,
            points_rule: row.points_rule,
            cash_rule: row.cash_rule,
            operation_log: row.operation_log,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SettingRepository {
    pool: SqlitePool,
}

impl SettingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingRepository { pool }
    }

    async fn latest_row(&self) -> DbResult<Option<SettingsRow>> {
        Ok(sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT id, store_name, store_phone, store_address, store_desc,
                   low_stock_threshold, notify_methods, points_rule, cash_rule,
                   operation_log, created_at, updated_at
            FROM settings
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?)
    }

    /// The authoritative settings row, if any has been saved.
    pub async fn latest(&self) -> DbResult<Option<Settings>> {
        self.latest_row().await?.map(Settings::try_from).transpose()
    }

    /// Overwrites the latest row, or inserts the first one.
    pub async fn save(&self, settings: &Settings) -> DbResult<Settings> {
        let notify_methods = serde_json::to_string(&settings.notify_methods)
            .map_err(|e| DbError::json(NOTIFY_METHODS_COLUMN, e))?;
        let now = Utc::now();

        let id = match self.latest_row().await? {
            Some(row) => {
                debug!(settings_id = row.id, "Updating settings");
                sqlx::query(
                    r#"
                    UPDATE settings
                    SET store_name = ?2, store_phone = ?3, store_address = ?4, store_desc = ?5,
                        low_stock_threshold = ?6, notify_methods = ?7, points_rule = ?8,
                        cash_rule = ?9, operation_log = ?10, updated_at = ?11
                    WHERE id = ?1
                    "#,
                )
                .bind(row.id)
                .bind(&settings.store_name)
                .bind(&settings.store_phone)
                .bind(&settings.store_address)
                .bind(&settings.store_desc)
                .bind(settings.low_stock_threshold)
                .bind(&notify_methods)
                .bind(settings.points_rule)
                .bind(settings.cash_rule)
                .bind(settings.operation_log)
                .bind(now)
                .execute(&self.pool)
                .await?;
                row.id
            }
            None => {
                debug!("Inserting first settings row");
                sqlx::query_scalar(
                    r#"
                    INSERT INTO settings (
                        store_name, store_phone, store_address, store_desc,
                        low_stock_threshold, notify_methods, points_rule, cash_rule,
                        operation_log, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                    RETURNING id
                    "#,
                )
                .bind(&settings.store_name)
                .bind(&settings.store_phone)
                .bind(&settings.store_address)
                .bind(&settings.store_desc)
                .bind(settings.low_stock_threshold)
                .bind(&notify_methods)
                .bind(settings.points_rule)
                .bind(settings.cash_rule)
                .bind(settings.operation_log)
                .bind(now)
                .fetch_one(&self.pool)
                .await?
            }
        };

        debug!(settings_id = id, "Settings saved");
        self.latest()
            .await?
            .ok_or_else(|| DbError::not_found("Settings", id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    #[tokio::test]
    async fn test_empty_table_has_no_settings() {
        let db = test_support::db().await;
        assert!(db.settings().latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_inserts_then_updates_in_place() {
        let db = test_support::db().await;
        let mut settings = Settings {
            store_name: "Corner Pharmacy".to_string(),
            notify_methods: vec!["sms".to_string(), "email".to_string()],
            ..Default::default()
        };

        let first = db.settings().save(&settings).await.unwrap();
        assert_eq!(first.notify_methods, vec!["sms", "email"]);
        assert!(first.created_at.is_some());

        settings.low_stock_threshold = 25;
        let second = db.settings().save(&settings).await.unwrap();
        assert_eq!(second.low_stock_threshold, 25);
        assert_eq!(second.created_at, first.created_at);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_corrupt_notify_methods_reported() {
        let db = test_support::db().await;
        sqlx::query(
            "INSERT INTO settings (notify_methods, created_at, updated_at) VALUES ('not json', ?1, ?1)",
        )
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();

        let err = db.settings().latest().await.unwrap_err();
        assert!(matches!(err, DbError::Json { .. }));
    }
}
