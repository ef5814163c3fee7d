//! # Medicine Repository
//!
//! Catalog persistence: dedup lookups, inserts and searches.
//!
//! ## Search With Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  medicines ⟕ (Σ inventory_batches.quantity per medicine)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  (Medicine, stock) rows ordered by medicine_id                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pharmacy_core::catalog::group_with_stock ← grouping by group_key      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{like_pattern, random_suffix};
use pharmacy_core::catalog::{manual_approval_no, manual_medicine_id, PreparedMedicine};
use pharmacy_core::Medicine;

const COLUMNS: &str = "medicine_id, generic_name, trade_name, spec, manufacturer, approval_no, \
     category_id, unit, retail_price_cents, group_key, created_at, updated_at";

/// Keyword filter shared by the search queries. `?1` is the LIKE pattern,
/// `?2` the optional category.
const SEARCH_FILTER: &str = "(?1 = '%%' \
       OR generic_name LIKE ?1 ESCAPE '\\' \
       OR trade_name LIKE ?1 ESCAPE '\\' \
       OR medicine_id LIKE ?1 ESCAPE '\\' \
       OR approval_no LIKE ?1 ESCAPE '\\' \
       OR manufacturer LIKE ?1 ESCAPE '\\') \
     AND (?2 IS NULL OR category_id = ?2)";

/// A medicine row joined with its aggregate stock.
#[derive(Debug, sqlx::FromRow)]
struct MedicineWithStock {
    #[sqlx(flatten)]
    medicine: Medicine,
    total_stock: i64,
}

/// Repository for medicine database operations.
#[derive(Debug, Clone)]
pub struct MedicineRepository {
    pool: SqlitePool,
}

impl MedicineRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MedicineRepository { pool }
    }

    /// Gets a medicine by its id.
    pub async fn get(&self, medicine_id: &str) -> DbResult<Option<Medicine>> {
        let sql = format!("SELECT {COLUMNS} FROM medicines WHERE medicine_id = ?1");
        let medicine = sqlx::query_as::<_, Medicine>(&sql)
            .bind(medicine_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(medicine)
    }

    /// Gets a medicine or fails with NotFound.
    pub async fn require(&self, medicine_id: &str) -> DbResult<Medicine> {
        self.get(medicine_id)
            .await?
            .ok_or_else(|| DbError::not_found("Medicine", medicine_id))
    }

    pub async fn find_by_approval_no(&self, approval_no: &str) -> DbResult<Option<Medicine>> {
        let sql = format!("SELECT {COLUMNS} FROM medicines WHERE approval_no = ?1");
        let medicine = sqlx::query_as::<_, Medicine>(&sql)
            .bind(approval_no)
            .fetch_optional(&self.pool)
            .await?;
        Ok(medicine)
    }

    /// First medicine (lowest id) with the given group key.
    pub async fn find_by_group_key(&self, group_key: &str) -> DbResult<Option<Medicine>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM medicines WHERE group_key = ?1 ORDER BY medicine_id LIMIT 1"
        );
        let medicine = sqlx::query_as::<_, Medicine>(&sql)
            .bind(group_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(medicine)
    }

    /// Inserts a prepared medicine, generating the id and approval number
    /// when absent.
    pub async fn insert(&self, prepared: &PreparedMedicine) -> DbResult<Medicine> {
        let now = Utc::now();
        let medicine = Medicine {
            medicine_id: prepared
                .medicine_id
                .clone()
                .unwrap_or_else(|| manual_medicine_id(now, random_suffix())),
            generic_name: prepared.generic_name.clone(),
            trade_name: prepared.trade_name.clone(),
            spec: prepared.spec.clone(),
            manufacturer: prepared.manufacturer.clone(),
            approval_no: Some(
                prepared
                    .approval_no
                    .clone()
                    .unwrap_or_else(|| manual_approval_no(now, random_suffix())),
            ),
            category_id: prepared.category_id,
            unit: prepared.unit.clone(),
            retail_price_cents: prepared.retail_price_cents,
            group_key: prepared.group_key.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(medicine_id = %medicine.medicine_id, name = %medicine.generic_name, "Inserting medicine");

        sqlx::query(
            r#"
            INSERT INTO medicines (
                medicine_id, generic_name, trade_name, spec, manufacturer, approval_no,
                category_id, unit, retail_price_cents, group_key, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&medicine.medicine_id)
        .bind(&medicine.generic_name)
        .bind(&medicine.trade_name)
        .bind(&medicine.spec)
        .bind(&medicine.manufacturer)
        .bind(&medicine.approval_no)
        .bind(medicine.category_id)
        .bind(&medicine.unit)
        .bind(medicine.retail_price_cents)
        .bind(&medicine.group_key)
        .bind(medicine.created_at)
        .bind(medicine.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(medicine)
    }

    /// Lists medicines page by page, ordered by id.
    pub async fn page(&self, page: u32, size: u32) -> DbResult<(Vec<Medicine>, i64)> {
        self.search("", None, page, size).await
    }

    /// Keyword and category search, paged.
    ///
    /// The keyword matches name, trade name, id, approval number or
    /// manufacturer. An empty keyword matches everything.
    pub async fn search(
        &self,
        keyword: &str,
        category_id: Option<i64>,
        page: u32,
        size: u32,
    ) -> DbResult<(Vec<Medicine>, i64)> {
        debug!(keyword = %keyword, ?category_id, page, size, "Searching medicines");

        let pattern = like_pattern(keyword);
        let sql = format!(
            "SELECT {COLUMNS} FROM medicines WHERE {SEARCH_FILTER} \
             ORDER BY medicine_id LIMIT ?3 OFFSET ?4"
        );
        let rows = sqlx::query_as::<_, Medicine>(&sql)
            .bind(&pattern)
            .bind(category_id)
            .bind(i64::from(size))
            .bind(i64::from(page) * i64::from(size))
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM medicines WHERE {SEARCH_FILTER}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&pattern)
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Every matching medicine with its aggregate stock, ordered by id.
    pub async fn search_with_stock(
        &self,
        keyword: &str,
        category_id: Option<i64>,
    ) -> DbResult<Vec<(Medicine, i64)>> {
        debug!(keyword = %keyword, ?category_id, "Searching medicines with stock");

        let sql = format!(
            "SELECT {COLUMNS}, \
                COALESCE((SELECT SUM(b.quantity) FROM inventory_batches b \
                          WHERE b.medicine_id = medicines.medicine_id), 0) AS total_stock \
             FROM medicines WHERE {SEARCH_FILTER} ORDER BY medicine_id"
        );
        let rows = sqlx::query_as::<_, MedicineWithStock>(&sql)
            .bind(like_pattern(keyword))
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.medicine, row.total_stock))
            .collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use pharmacy_core::catalog::NewMedicine;

    #[tokio::test]
    async fn test_insert_generates_identifiers() {
        let db = test_support::db().await;
        let prepared = NewMedicine {
            generic_name: Some("Ibuprofen".to_string()),
            ..Default::default()
        }
        .prepare()
        .unwrap();

        let medicine = db.medicines().insert(&prepared).await.unwrap();
        assert!(medicine.medicine_id.starts_with('M'));
        assert!(medicine
            .approval_no
            .as_deref()
            .is_some_and(|no| no.starts_with("MANUAL-")));

        let fetched = db.medicines().get(&medicine.medicine_id).await.unwrap();
        assert_eq!(fetched.map(|m| m.generic_name), Some("Ibuprofen".to_string()));
    }

    #[tokio::test]
    async fn test_duplicate_approval_no_is_unique_violation() {
        let db = test_support::db().await;
        test_support::medicine(&db, "M1", "Amoxicillin", 1000).await;

        let prepared = NewMedicine {
            medicine_id: Some("M2".to_string()),
            approval_no: Some("H-M1".to_string()),
            ..Default::default()
        }
        .prepare()
        .unwrap();
        let err = db.medicines().insert(&prepared).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_search_by_keyword_and_category() {
        let db = test_support::db().await;
        test_support::medicine(&db, "M1", "Amoxicillin", 1000).await;
        test_support::medicine(&db, "M2", "Ibuprofen", 500).await;

        let (rows, total) = db.medicines().search("amox", None, 0, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].medicine_id, "M1");

        let (_, in_otc) = db.medicines().search("", Some(2), 0, 10).await.unwrap();
        assert_eq!(in_otc, 2);

        let (_, in_devices) = db.medicines().search("", Some(4), 0, 10).await.unwrap();
        assert_eq!(in_devices, 0);
    }

    #[tokio::test]
    async fn test_search_with_stock_sums_batches() {
        let db = test_support::db().await;
        test_support::medicine(&db, "M1", "Amoxicillin", 1000).await;
        test_support::stock(&db, "M1", "B1", 5, None, 0).await;
        test_support::stock(&db, "M1", "B2", 7, None, 0).await;

        let rows = db.medicines().search_with_stock("", None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, 12);
    }
}
