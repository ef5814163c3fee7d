//! # Stock-In Repository
//!
//! Receiving documents and their lines.
//!
//! Status changes are conditional updates on the current status so the
//! workflow can detect a lost race or an illegal transition without a
//! separate read:
//!
//! ```text
//! transition(id, Pending → Approved)   UPDATE ... WHERE status = 0
//!      │
//!      ├── 1 row  → caller credits inventory in the same transaction
//!      └── 0 rows → caller reports InvalidState (or NotFound)
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{like_pattern, random_suffix};
use pharmacy_core::stock_in::{stock_in_no, PreparedStockIn};
use pharmacy_core::{StockIn, StockInDetail, StockInItem, StockInStatus};

const COLUMNS: &str = "s.id, s.stock_in_no, s.supplier_id, s.stock_in_date, s.status, \
     s.total_amount_cents, s.remark, s.created_at, s.updated_at, s.approved_at";

const RETURNING: &str = "id, stock_in_no, supplier_id, stock_in_date, status, \
     total_amount_cents, remark, created_at, updated_at, approved_at";

const ITEM_COLUMNS: &str = "id, stock_in_id, medicine_id, quantity, unit_price_cents, \
     batch_number, production_date, expiry_date, remark";

/// `?1` keyword pattern, `?2` optional status.
const SEARCH_FILTER: &str = "(?1 = '%%' \
       OR s.stock_in_no LIKE ?1 ESCAPE '\\' \
       OR sp.name LIKE ?1 ESCAPE '\\' \
       OR s.remark LIKE ?1 ESCAPE '\\') \
     AND (?2 IS NULL OR s.status = ?2)";

#[derive(Debug, Clone)]
pub struct StockInRepository {
    pool: SqlitePool,
}

impl StockInRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockInRepository { pool }
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<StockIn>> {
        let sql = format!("SELECT {COLUMNS} FROM stock_ins s WHERE s.id = ?1");
        Ok(sqlx::query_as::<_, StockIn>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_by_no(&self, number: &str) -> DbResult<Option<StockIn>> {
        let sql = format!("SELECT {COLUMNS} FROM stock_ins s WHERE s.stock_in_no = ?1");
        Ok(sqlx::query_as::<_, StockIn>(&sql)
            .bind(number)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn items(&self, stock_in_id: i64) -> DbResult<Vec<StockInItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM stock_in_items WHERE stock_in_id = ?1 ORDER BY id");
        Ok(sqlx::query_as::<_, StockInItem>(&sql)
            .bind(stock_in_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Header, supplier name and lines.
    pub async fn detail(&self, id: i64) -> DbResult<Option<StockInDetail>> {
        let Some(stock_in) = self.get(id).await? else {
            return Ok(None);
        };
        let supplier_name: Option<String> =
            sqlx::query_scalar("SELECT name FROM suppliers WHERE id = ?1")
                .bind(stock_in.supplier_id)
                .fetch_optional(&self.pool)
                .await?;
        let items = self.items(id).await?;

        Ok(Some(StockInDetail {
            stock_in,
            supplier_name,
            items,
        }))
    }

    /// Keyword and status search, newest first.
    ///
    /// The keyword matches the document number, the supplier name or the
    /// remark. An empty keyword matches everything.
    pub async fn search(
        &self,
        keyword: &str,
        status: Option<StockInStatus>,
        page: u32,
        size: u32,
    ) -> DbResult<(Vec<StockIn>, i64)> {
        debug!(keyword = %keyword, ?status, page, size, "Searching stock-ins");

        let pattern = like_pattern(keyword);
        let sql = format!(
            "SELECT {COLUMNS} FROM stock_ins s LEFT JOIN suppliers sp ON sp.id = s.supplier_id \
             WHERE {SEARCH_FILTER} ORDER BY s.stock_in_date DESC, s.id DESC LIMIT ?3 OFFSET ?4"
        );
        let rows = sqlx::query_as::<_, StockIn>(&sql)
            .bind(&pattern)
            .bind(status)
            .bind(i64::from(size))
            .bind(i64::from(page) * i64::from(size))
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM stock_ins s LEFT JOIN suppliers sp ON sp.id = s.supplier_id \
             WHERE {SEARCH_FILTER}"
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&pattern)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn page(&self, page: u32, size: u32) -> DbResult<(Vec<StockIn>, i64)> {
        self.search("", None, page, size).await
    }

    pub async fn by_status(&self, status: StockInStatus) -> DbResult<Vec<StockIn>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM stock_ins s WHERE s.status = ?1 ORDER BY s.stock_in_date DESC, s.id DESC"
        );
        Ok(sqlx::query_as::<_, StockIn>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Documents dated in `[from, to)`.
    pub async fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<StockIn>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM stock_ins s \
             WHERE s.stock_in_date >= ?1 AND s.stock_in_date < ?2 ORDER BY s.stock_in_date DESC"
        );
        Ok(sqlx::query_as::<_, StockIn>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Deletes a PENDING document with its lines. Returns false when the
    /// document is absent or no longer pending.
    pub async fn delete_pending(&self, id: i64) -> DbResult<bool> {
        debug!(stock_in_id = id, "Deleting pending stock-in");

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM stock_ins WHERE id = ?1 AND status = ?2")
            .bind(id)
            .bind(StockInStatus::Pending)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 1 {
            sqlx::query("DELETE FROM stock_in_items WHERE stock_in_id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Transactional Writes
// =============================================================================

/// Inserts a PENDING document and its lines.
pub async fn insert(
    conn: &mut SqliteConnection,
    number: &str,
    supplier_id: i64,
    prepared: &PreparedStockIn,
    now: DateTime<Utc>,
) -> DbResult<StockIn> {
    debug!(stock_in_no = %number, supplier_id, lines = prepared.items.len(), "Inserting stock-in");

    let sql = format!(
        "INSERT INTO stock_ins (stock_in_no, supplier_id, stock_in_date, status, \
             total_amount_cents, remark, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) RETURNING {RETURNING}"
    );
    let stock_in = sqlx::query_as::<_, StockIn>(&sql)
        .bind(number)
        .bind(supplier_id)
        .bind(prepared.stock_in_date)
        .bind(StockInStatus::Pending)
        .bind(prepared.total_amount.cents())
        .bind(&prepared.remark)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    insert_items(conn, stock_in.id, prepared).await?;
    Ok(stock_in)
}

async fn insert_items(
    conn: &mut SqliteConnection,
    stock_in_id: i64,
    prepared: &PreparedStockIn,
) -> DbResult<()> {
    for line in &prepared.items {
        sqlx::query(
            r#"
            INSERT INTO stock_in_items (
                stock_in_id, medicine_id, quantity, unit_price_cents,
                batch_number, production_date, expiry_date, remark
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(stock_in_id)
        .bind(&line.medicine_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(&line.batch_number)
        .bind(line.production_date)
        .bind(line.expiry_date)
        .bind(&line.remark)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Rewrites a PENDING document's header and lines.
///
/// Returns false (and writes nothing) when the document is absent or no
/// longer pending.
pub async fn replace_pending(
    conn: &mut SqliteConnection,
    id: i64,
    supplier_id: i64,
    prepared: &PreparedStockIn,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE stock_ins
        SET supplier_id = ?2, stock_in_date = ?3, total_amount_cents = ?4,
            remark = ?5, updated_at = ?6
        WHERE id = ?1 AND status = ?7
        "#,
    )
    .bind(id)
    .bind(supplier_id)
    .bind(prepared.stock_in_date)
    .bind(prepared.total_amount.cents())
    .bind(&prepared.remark)
    .bind(now)
    .bind(StockInStatus::Pending)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query("DELETE FROM stock_in_items WHERE stock_in_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    insert_items(conn, id, prepared).await?;
    Ok(true)
}

/// Moves a document from `from` to `to`. Returns false when its current
/// status is not `from`.
pub async fn transition(
    conn: &mut SqliteConnection,
    id: i64,
    from: StockInStatus,
    to: StockInStatus,
    at: DateTime<Utc>,
) -> DbResult<bool> {
    let approved_at = (to == StockInStatus::Approved).then_some(at);
    let result = sqlx::query(
        r#"
        UPDATE stock_ins
        SET status = ?3, updated_at = ?4, approved_at = COALESCE(?5, approved_at)
        WHERE id = ?1 AND status = ?2
        "#,
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(at)
    .bind(approved_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Lines as seen by the transaction.
pub async fn items_on(conn: &mut SqliteConnection, stock_in_id: i64) -> DbResult<Vec<StockInItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM stock_in_items WHERE stock_in_id = ?1 ORDER BY id");
    Ok(sqlx::query_as::<_, StockInItem>(&sql)
        .bind(stock_in_id)
        .fetch_all(&mut *conn)
        .await?)
}

/// Generates a document number: `SI` + epoch millis + 3 random digits.
pub fn generate_stock_in_no(now: DateTime<Utc>) -> String {
    stock_in_no(now, random_suffix())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::{self, medicine};
    use pharmacy_core::stock_in::{StockInDraft, StockInLineDraft};

    fn draft(lines: &[(&str, i64, i64)]) -> PreparedStockIn {
        StockInDraft {
            remark: Some("weekly delivery".to_string()),
            items: lines
                .iter()
                .map(|(id, qty, price)| StockInLineDraft {
                    medicine_id: id.to_string(),
                    quantity: *qty,
                    unit_price_cents: *price,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
        .prepare(Utc::now())
        .unwrap()
    }

    async fn create(db: &crate::Database, number: &str, lines: &[(&str, i64, i64)]) -> StockIn {
        let supplier = db.suppliers().ensure("North Pharma").await.unwrap();
        let mut tx = db.begin().await.unwrap();
        let stock_in = insert(&mut tx, number, supplier.id, &draft(lines), Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        stock_in
    }

    #[tokio::test]
    async fn test_insert_and_detail() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        let created = create(&db, "SI1", &[("M1", 10, 250), ("M1", 2, 300)]).await;

        assert_eq!(created.status, StockInStatus::Pending);
        assert_eq!(created.total_amount_cents, 3100);

        let detail = db.stock_ins().detail(created.id).await.unwrap().unwrap();
        assert_eq!(detail.supplier_name.as_deref(), Some("North Pharma"));
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].batch_number, pharmacy_core::DEFAULT_BATCH_NUMBER);
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        create(&db, "SI1", &[("M1", 1, 100)]).await;

        let supplier = db.suppliers().ensure("North Pharma").await.unwrap();
        let mut tx = db.begin().await.unwrap();
        let err = insert(&mut tx, "SI1", supplier.id, &draft(&[("M1", 1, 100)]), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_transition_is_conditional() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        let created = create(&db, "SI1", &[("M1", 1, 100)]).await;

        let mut tx = db.begin().await.unwrap();
        let now = Utc::now();
        assert!(transition(&mut tx, created.id, StockInStatus::Pending, StockInStatus::Cancelled, now)
            .await
            .unwrap());
        assert!(!transition(&mut tx, created.id, StockInStatus::Pending, StockInStatus::Approved, now)
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let cancelled = db.stock_ins().get(created.id).await.unwrap().unwrap();
        assert_eq!(cancelled.status, StockInStatus::Cancelled);
        assert!(cancelled.approved_at.is_none());
        assert!(!db.stock_ins().delete_pending(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_pending_rewrites_lines() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        medicine(&db, "M2", "Ibuprofen", 500).await;
        let created = create(&db, "SI1", &[("M1", 1, 100)]).await;

        let mut tx = db.begin().await.unwrap();
        let replaced = replace_pending(
            &mut tx,
            created.id,
            created.supplier_id,
            &draft(&[("M2", 4, 50)]),
            Utc::now(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        assert!(replaced);

        let detail = db.stock_ins().detail(created.id).await.unwrap().unwrap();
        assert_eq!(detail.stock_in.total_amount_cents, 200);
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].medicine_id, "M2");
    }

    #[tokio::test]
    async fn test_search_by_supplier_and_status() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        create(&db, "SI1", &[("M1", 1, 100)]).await;
        create(&db, "SI2", &[("M1", 1, 100)]).await;

        let (rows, total) = db.stock_ins().search("north", None, 0, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 2);

        let (_, approved) = db
            .stock_ins()
            .search("", Some(StockInStatus::Approved), 0, 10)
            .await
            .unwrap();
        assert_eq!(approved, 0);
        assert_eq!(db.stock_ins().by_status(StockInStatus::Pending).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_pending_removes_lines() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        let created = create(&db, "SI1", &[("M1", 1, 100)]).await;

        assert!(db.stock_ins().delete_pending(created.id).await.unwrap());
        assert!(db.stock_ins().items(created.id).await.unwrap().is_empty());
        assert!(db.stock_ins().get(created.id).await.unwrap().is_none());
    }

    #[test]
    fn test_generated_number_shape() {
        let number = generate_stock_in_no(Utc::now());
        assert!(number.starts_with("SI"));
        assert!(number[2..].bytes().all(|b| b.is_ascii_digit()));
    }
}
