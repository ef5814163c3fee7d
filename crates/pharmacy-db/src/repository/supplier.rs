//! # Supplier Repository
//!
//! Suppliers and provisioning of the fallback supplier used by stock-in
//! documents that name none.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use pharmacy_core::Supplier;

const COLUMNS: &str = "id, name, contact, phone, address, created_at";

/// Input for creating a supplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewSupplier {
    pub name: String,
    pub contact: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let sql = format!("SELECT {COLUMNS} FROM suppliers ORDER BY id");
        Ok(sqlx::query_as::<_, Supplier>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Supplier>> {
        let sql = format!("SELECT {COLUMNS} FROM suppliers WHERE id = ?1");
        Ok(sqlx::query_as::<_, Supplier>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<Supplier>> {
        let sql = format!("SELECT {COLUMNS} FROM suppliers WHERE name = ?1");
        Ok(sqlx::query_as::<_, Supplier>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Creates a supplier. A duplicate name is a UniqueViolation.
    pub async fn create(&self, supplier: &NewSupplier) -> DbResult<Supplier> {
        debug!(name = %supplier.name, "Creating supplier");

        let sql = format!(
            "INSERT INTO suppliers (name, contact, phone, address, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Supplier>(&sql)
            .bind(supplier.name.trim())
            .bind(&supplier.contact)
            .bind(&supplier.phone)
            .bind(&supplier.address)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?)
    }

    /// Returns the supplier with this name, creating it if needed.
    pub async fn ensure(&self, name: &str) -> DbResult<Supplier> {
        if let Some(existing) = self.find_by_name(name).await? {
            return Ok(existing);
        }

        info!(name = %name, "Provisioning supplier");
        self.create(&NewSupplier {
            name: name.to_string(),
            ..Default::default()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support;

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let db = test_support::db().await;
        let first = db.suppliers().ensure("Default Supplier").await.unwrap();
        let second = db.suppliers().ensure("Default Supplier").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(db.suppliers().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = test_support::db().await;
        let input = NewSupplier {
            name: "North Pharma".to_string(),
            phone: Some("555-0100".to_string()),
            ..Default::default()
        };
        let created = db.suppliers().create(&input).await.unwrap();
        assert_eq!(created.phone.as_deref(), Some("555-0100"));

        let err = db.suppliers().create(&input).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
