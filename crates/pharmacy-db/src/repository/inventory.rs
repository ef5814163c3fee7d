//! # Inventory Repository
//!
//! The stock ledger: per-batch quantities plus the movement journal.
//!
//! ## Mutation Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every mutation runs on the caller's transaction (&mut SqliteConnection)│
//! │                                                                         │
//! │  decrement_for_order                                                   │
//! │    1. read batches of the medicine                                     │
//! │    2. allocate_fefo (pure, pharmacy-core)                              │
//! │    3. per allocation:                                                  │
//! │         UPDATE ... SET quantity = quantity - n                         │
//! │         WHERE id = ? AND quantity >= n     ← 0 rows → InsufficientStock │
//! │         INSERT stock_movements (−n, order, order_id)                   │
//! │                                                                         │
//! │  restore_for_refund                                                    │
//! │    1. outstanding = −Σ movements under order_id / refund reference     │
//! │    2. plan_restore (pure) → back into those batches                    │
//! │    3. untracked remainder → REFUND batch (upsert)                      │
//! │                                                                         │
//! │  credit_batch                                                          │
//! │    upsert keyed by (medicine_id, batch_number), quantity += n          │
//! │                                                                         │
//! │  insert_batch / update_batch / remove_empty_batch (manual edits)       │
//! │    quantity change journaled as (±n, adjustment, ADJ...)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A batch can never go negative: the table carries `CHECK (quantity >= 0)`
//! and every decrement is conditional.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmacy_core::inventory::{
    allocate_fefo, plan_restore, Allocation, DatedBatch, MedicineStockLevel, PreparedBatch,
    RestorePlan,
};
use pharmacy_core::{
    CoreError, InventoryBatch, InventoryListing, MovementReason, StockMovement, ValidationError,
    REFUND_BATCH_NUMBER,
};

const BATCH_COLUMNS: &str = "id, medicine_id, batch_number, quantity, unit_cost_cents, \
     production_date, expiry_date, min_stock, max_stock, supplier_id, created_at, updated_at";

const LISTING_COLUMNS: &str = "b.id, b.medicine_id, b.batch_number, b.quantity, \
     b.unit_cost_cents, b.production_date, b.expiry_date, b.min_stock, b.max_stock, \
     b.supplier_id, b.created_at, b.updated_at, \
     m.generic_name, m.trade_name, m.spec, m.retail_price_cents";

/// FEFO display order: dated batches by expiry, undated last, then oldest.
const FEFO_ORDER: &str =
    "ORDER BY (expiry_date IS NULL), expiry_date, created_at, id";

// =============================================================================
// Read Side
// =============================================================================

/// Read access to stock.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Σ quantity over the medicine's batches; 0 when it has none.
    pub async fn current_stock(&self, medicine_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM inventory_batches WHERE medicine_id = ?1",
        )
        .bind(medicine_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    /// Batches of a medicine in FEFO order.
    pub async fn batches(&self, medicine_id: &str) -> DbResult<Vec<InventoryBatch>> {
        let sql = format!(
            "SELECT {BATCH_COLUMNS} FROM inventory_batches WHERE medicine_id = ?1 {FEFO_ORDER}"
        );
        Ok(sqlx::query_as::<_, InventoryBatch>(&sql)
            .bind(medicine_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Aggregate level of every medicine that has at least one batch.
    ///
    /// `min_stock` is the largest threshold over the medicine's batches.
    pub async fn stock_levels(&self) -> DbResult<Vec<MedicineStockLevel>> {
        Ok(sqlx::query_as::<_, MedicineStockLevel>(
            r#"
            SELECT
                m.medicine_id,
                m.generic_name AS medicine_name,
                SUM(b.quantity) AS quantity,
                MAX(b.min_stock) AS min_stock
            FROM inventory_batches b
            JOIN medicines m ON m.medicine_id = b.medicine_id
            GROUP BY m.medicine_id, m.generic_name
            ORDER BY m.medicine_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Non-empty batches expiring in `(after, until]`, earliest first.
    pub async fn dated_batches(&self, after: NaiveDate, until: NaiveDate) -> DbResult<Vec<DatedBatch>> {
        Ok(sqlx::query_as::<_, DatedBatch>(
            r#"
            SELECT
                b.id AS batch_id,
                b.medicine_id,
                m.generic_name AS medicine_name,
                b.batch_number,
                b.quantity,
                b.expiry_date
            FROM inventory_batches b
            JOIN medicines m ON m.medicine_id = b.medicine_id
            WHERE b.quantity > 0
              AND b.expiry_date IS NOT NULL
              AND b.expiry_date > ?1
              AND b.expiry_date <= ?2
            ORDER BY b.expiry_date, b.id
            "#,
        )
        .bind(after)
        .bind(until)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Every batch with its medicine's catalog fields, by medicine then FEFO.
    pub async fn listings(&self) -> DbResult<Vec<InventoryListing>> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM inventory_batches b \
             JOIN medicines m ON m.medicine_id = b.medicine_id \
             ORDER BY b.medicine_id, (b.expiry_date IS NULL), b.expiry_date, b.created_at, b.id"
        );
        Ok(sqlx::query_as::<_, InventoryListing>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_batch(&self, id: &str) -> DbResult<Option<InventoryBatch>> {
        let sql = format!("SELECT {BATCH_COLUMNS} FROM inventory_batches WHERE id = ?1");
        Ok(sqlx::query_as::<_, InventoryBatch>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Journal entries recorded under a reference, oldest first.
    pub async fn movements(&self, reference: &str) -> DbResult<Vec<StockMovement>> {
        Ok(sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, batch_id, medicine_id, quantity_delta, reason, reference, created_at
            FROM stock_movements
            WHERE reference = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?)
    }
}

// =============================================================================
// Write Side (transactional)
// =============================================================================

/// Quantity credited to a batch by a stock-in line (or a refund remainder).
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCredit {
    pub medicine_id: String,
    pub batch_number: String,
    pub quantity: i64,
    /// Purchase price; 0 keeps the batch's current cost.
    pub unit_cost_cents: i64,
    pub production_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<i64>,
    /// `None` keeps the batch's current threshold (0 for new batches).
    pub min_stock: Option<i64>,
}

async fn medicine_exists(conn: &mut SqliteConnection, medicine_id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM medicines WHERE medicine_id = ?1")
        .bind(medicine_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn record_movement(
    conn: &mut SqliteConnection,
    batch_id: &str,
    medicine_id: &str,
    quantity_delta: i64,
    reason: MovementReason,
    reference: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (id, batch_id, medicine_id, quantity_delta, reason, reference, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(generate_movement_id())
    .bind(batch_id)
    .bind(medicine_id)
    .bind(quantity_delta)
    .bind(reason)
    .bind(reference)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Σ quantity of a medicine as seen by the transaction.
pub async fn current_stock_on(conn: &mut SqliteConnection, medicine_id: &str) -> DbResult<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0) FROM inventory_batches WHERE medicine_id = ?1",
    )
    .bind(medicine_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(total)
}

/// Takes `quantity` units of a medicine out of its batches, earliest
/// expiry first.
///
/// ## Errors
/// - [`CoreError::InsufficientStock`] (as [`DbError::Domain`]) when the
///   aggregate is too small or a concurrent writer got there first. The
///   caller's transaction must then be rolled back.
pub async fn decrement_for_order(
    conn: &mut SqliteConnection,
    medicine_id: &str,
    quantity: i64,
    order_id: &str,
) -> DbResult<Vec<Allocation>> {
    debug!(medicine_id = %medicine_id, quantity, order_id = %order_id, "Decrementing stock");

    let sql = format!(
        "SELECT {BATCH_COLUMNS} FROM inventory_batches WHERE medicine_id = ?1 AND quantity > 0 {FEFO_ORDER}"
    );
    let batches = sqlx::query_as::<_, InventoryBatch>(&sql)
        .bind(medicine_id)
        .fetch_all(&mut *conn)
        .await?;

    let plan = allocate_fefo(medicine_id, &batches, quantity)?;
    let now = Utc::now();

    for allocation in &plan {
        let result = sqlx::query(
            r#"
            UPDATE inventory_batches
            SET quantity = quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND quantity >= ?2
            "#,
        )
        .bind(&allocation.batch_id)
        .bind(allocation.quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let available = current_stock_on(conn, medicine_id).await?;
            return Err(CoreError::InsufficientStock {
                medicine_id: medicine_id.to_string(),
                available,
                requested: quantity,
            }
            .into());
        }

        record_movement(
            conn,
            &allocation.batch_id,
            medicine_id,
            -allocation.quantity,
            MovementReason::Order,
            order_id,
        )
        .await?;
    }

    Ok(plan)
}

/// Puts `quantity` units of a refunded order back into stock.
///
/// Quantities return to the batches the order drew from (as recorded in
/// the journal), up to what was drawn from each. Whatever cannot be traced
/// goes to the medicine's [`REFUND_BATCH_NUMBER`] batch.
///
/// ## Errors
/// - NotFound when the medicine no longer exists
pub async fn restore_for_refund(
    conn: &mut SqliteConnection,
    medicine_id: &str,
    quantity: i64,
    order_id: &str,
    refund_reference: &str,
) -> DbResult<RestorePlan> {
    debug!(medicine_id = %medicine_id, quantity, order_id = %order_id, "Restoring stock");

    if !medicine_exists(conn, medicine_id).await? {
        return Err(DbError::not_found("Medicine", medicine_id));
    }

    let outstanding: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT batch_id, -SUM(quantity_delta) AS open_quantity
        FROM stock_movements
        WHERE medicine_id = ?1 AND reference IN (?2, ?3)
        GROUP BY batch_id
        HAVING -SUM(quantity_delta) > 0
        ORDER BY MIN(created_at), batch_id
        "#,
    )
    .bind(medicine_id)
    .bind(order_id)
    .bind(refund_reference)
    .fetch_all(&mut *conn)
    .await?;

    let plan = plan_restore(&outstanding, quantity);
    let now = Utc::now();

    for allocation in &plan.allocations {
        sqlx::query(
            "UPDATE inventory_batches SET quantity = quantity + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(&allocation.batch_id)
        .bind(allocation.quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        record_movement(
            conn,
            &allocation.batch_id,
            medicine_id,
            allocation.quantity,
            MovementReason::Refund,
            refund_reference,
        )
        .await?;
    }

    if plan.untracked > 0 {
        let credit = BatchCredit {
            medicine_id: medicine_id.to_string(),
            batch_number: REFUND_BATCH_NUMBER.to_string(),
            quantity: plan.untracked,
            unit_cost_cents: 0,
            production_date: None,
            expiry_date: None,
            supplier_id: None,
            min_stock: None,
        };
        upsert_batch(conn, &credit, MovementReason::Refund, refund_reference).await?;
    }

    Ok(plan)
}

/// Adds received stock to the batch keyed by `(medicine_id, batch_number)`,
/// creating it if needed. Returns the batch id.
pub async fn credit_batch(
    conn: &mut SqliteConnection,
    credit: &BatchCredit,
    reference: &str,
) -> DbResult<String> {
    debug!(
        medicine_id = %credit.medicine_id,
        batch_number = %credit.batch_number,
        quantity = credit.quantity,
        "Crediting batch"
    );

    if !medicine_exists(conn, &credit.medicine_id).await? {
        return Err(DbError::not_found("Medicine", &credit.medicine_id));
    }

    upsert_batch(conn, credit, MovementReason::StockIn, reference).await
}

async fn upsert_batch(
    conn: &mut SqliteConnection,
    credit: &BatchCredit,
    reason: MovementReason,
    reference: &str,
) -> DbResult<String> {
    let now = Utc::now();

    let batch_id: String = sqlx::query_scalar(
        r#"
        INSERT INTO inventory_batches (
            id, medicine_id, batch_number, quantity, unit_cost_cents,
            production_date, expiry_date, min_stock, supplier_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, COALESCE(?8, 0), ?9, ?10, ?10)
        ON CONFLICT (medicine_id, batch_number) DO UPDATE SET
            quantity        = inventory_batches.quantity + excluded.quantity,
            unit_cost_cents = CASE WHEN excluded.unit_cost_cents > 0
                                   THEN excluded.unit_cost_cents
                                   ELSE inventory_batches.unit_cost_cents END,
            production_date = COALESCE(excluded.production_date, inventory_batches.production_date),
            expiry_date     = COALESCE(excluded.expiry_date, inventory_batches.expiry_date),
            min_stock       = COALESCE(?8, inventory_batches.min_stock),
            supplier_id     = COALESCE(excluded.supplier_id, inventory_batches.supplier_id),
            updated_at      = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(generate_batch_id())
    .bind(&credit.medicine_id)
    .bind(&credit.batch_number)
    .bind(credit.quantity)
    .bind(credit.unit_cost_cents)
    .bind(credit.production_date)
    .bind(credit.expiry_date)
    .bind(credit.min_stock)
    .bind(credit.supplier_id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    record_movement(
        conn,
        &batch_id,
        &credit.medicine_id,
        credit.quantity,
        reason,
        reference,
    )
    .await?;

    Ok(batch_id)
}

// =============================================================================
// Manual Batch Maintenance (transactional)
// =============================================================================

async fn batch_on(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<InventoryBatch>> {
    let sql = format!("SELECT {BATCH_COLUMNS} FROM inventory_batches WHERE id = ?1");
    Ok(sqlx::query_as::<_, InventoryBatch>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?)
}

/// Creates a batch by hand. An opening quantity is journaled as an
/// adjustment.
///
/// ## Errors
/// - NotFound when the medicine does not exist
/// - UniqueViolation when the medicine already has that batch number
pub async fn insert_batch(
    conn: &mut SqliteConnection,
    batch: &PreparedBatch,
    reference: &str,
) -> DbResult<InventoryBatch> {
    debug!(
        medicine_id = %batch.medicine_id,
        batch_number = %batch.batch_number,
        quantity = batch.quantity,
        "Inserting batch"
    );

    if !medicine_exists(conn, &batch.medicine_id).await? {
        return Err(DbError::not_found("Medicine", &batch.medicine_id));
    }

    let sql = format!(
        "INSERT INTO inventory_batches (
            id, medicine_id, batch_number, quantity, unit_cost_cents, production_date,
            expiry_date, min_stock, max_stock, supplier_id, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
         RETURNING {BATCH_COLUMNS}"
    );
    let inserted = sqlx::query_as::<_, InventoryBatch>(&sql)
        .bind(generate_batch_id())
        .bind(&batch.medicine_id)
        .bind(&batch.batch_number)
        .bind(batch.quantity)
        .bind(batch.unit_cost_cents)
        .bind(batch.production_date)
        .bind(batch.expiry_date)
        .bind(batch.min_stock)
        .bind(batch.max_stock)
        .bind(batch.supplier_id)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

    if inserted.quantity > 0 {
        record_movement(
            conn,
            &inserted.id,
            &inserted.medicine_id,
            inserted.quantity,
            MovementReason::Adjustment,
            reference,
        )
        .await?;
    }
    Ok(inserted)
}

/// Overwrites a batch's fields. The quantity difference is journaled as an
/// adjustment. `None` when the batch does not exist.
///
/// ## Errors
/// - Validation when the draft names a different medicine
/// - UniqueViolation when the new batch number is taken
pub async fn update_batch(
    conn: &mut SqliteConnection,
    id: &str,
    batch: &PreparedBatch,
    reference: &str,
) -> DbResult<Option<InventoryBatch>> {
    let Some(current) = batch_on(conn, id).await? else {
        return Ok(None);
    };
    if current.medicine_id != batch.medicine_id {
        return Err(CoreError::Validation(ValidationError::InvalidFormat {
            field: "medicine_id".to_string(),
            reason: "a batch cannot move to another medicine".to_string(),
        })
        .into());
    }

    let sql = format!(
        "UPDATE inventory_batches SET
            batch_number = ?2, quantity = ?3, unit_cost_cents = ?4, production_date = ?5,
            expiry_date = ?6, min_stock = ?7, max_stock = ?8, supplier_id = ?9, updated_at = ?10
         WHERE id = ?1
         RETURNING {BATCH_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, InventoryBatch>(&sql)
        .bind(id)
        .bind(&batch.batch_number)
        .bind(batch.quantity)
        .bind(batch.unit_cost_cents)
        .bind(batch.production_date)
        .bind(batch.expiry_date)
        .bind(batch.min_stock)
        .bind(batch.max_stock)
        .bind(batch.supplier_id)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

    let delta = updated.quantity - current.quantity;
    debug!(batch_id = %id, delta, "Updated batch");
    if delta != 0 {
        record_movement(
            conn,
            id,
            &updated.medicine_id,
            delta,
            MovementReason::Adjustment,
            reference,
        )
        .await?;
    }
    Ok(Some(updated))
}

/// Outcome of [`remove_empty_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchRemoval {
    Removed,
    Missing,
    /// Left in place; it still holds this many units.
    Holding(i64),
}

/// Deletes a batch that holds nothing, together with its journal entries.
pub async fn remove_empty_batch(conn: &mut SqliteConnection, id: &str) -> DbResult<BatchRemoval> {
    let Some(current) = batch_on(conn, id).await? else {
        return Ok(BatchRemoval::Missing);
    };
    if current.quantity > 0 {
        return Ok(BatchRemoval::Holding(current.quantity));
    }

    sqlx::query("DELETE FROM stock_movements WHERE batch_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("DELETE FROM inventory_batches WHERE id = ?1 AND quantity = 0")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(BatchRemoval::Missing);
    }
    debug!(batch_id = %id, "Removed empty batch");
    Ok(BatchRemoval::Removed)
}

/// Generates a new batch ID.
pub fn generate_batch_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new stock movement ID.
pub fn generate_movement_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{self, medicine, stock};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_current_stock_sums_batches() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        assert_eq!(db.inventory().current_stock("M1").await.unwrap(), 0);

        stock(&db, "M1", "B1", 5, None, 0).await;
        stock(&db, "M1", "B2", 15, None, 0).await;
        assert_eq!(db.inventory().current_stock("M1").await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_credit_same_batch_number_merges() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        let first = stock(&db, "M1", "B1", 5, Some(date("2027-01-01")), 0).await;
        let second = stock(&db, "M1", "B1", 3, None, 0).await;

        assert_eq!(first, second);
        let batches = db.inventory().batches("M1").await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].quantity, 8);
        assert_eq!(batches[0].expiry_date, Some(date("2027-01-01")));
    }

    #[tokio::test]
    async fn test_credit_unknown_medicine_is_not_found() {
        let db = test_support::db().await;
        let mut tx = db.begin().await.unwrap();
        let err = credit_batch(
            &mut tx,
            &BatchCredit {
                medicine_id: "nope".to_string(),
                batch_number: "B1".to_string(),
                quantity: 1,
                unit_cost_cents: 0,
                production_date: None,
                expiry_date: None,
                supplier_id: None,
                min_stock: None,
            },
            "SI1",
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_decrement_uses_fefo_and_journals() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        let late = stock(&db, "M1", "LATE", 10, Some(date("2027-06-01")), 0).await;
        let early = stock(&db, "M1", "EARLY", 4, Some(date("2027-01-01")), 0).await;

        let mut tx = db.begin().await.unwrap();
        let plan = decrement_for_order(&mut tx, "M1", 6, "O1").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].batch_id, early);
        assert_eq!(plan[1].batch_id, late);

        let batches = db.inventory().batches("M1").await.unwrap();
        assert_eq!(batches[0].quantity, 0);
        assert_eq!(batches[1].quantity, 8);

        let journal = db.inventory().movements("O1").await.unwrap();
        assert_eq!(journal.iter().map(|m| m.quantity_delta).sum::<i64>(), -6);
        assert!(journal.iter().all(|m| m.reason == MovementReason::Order));
    }

    #[tokio::test]
    async fn test_decrement_insufficient_mutates_nothing() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        stock(&db, "M1", "B1", 2, None, 0).await;

        let mut tx = db.begin().await.unwrap();
        let err = decrement_for_order(&mut tx, "M1", 5, "O1").await.unwrap_err();
        tx.rollback().await.unwrap();

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                medicine_id,
                available,
                requested,
            }) => {
                assert_eq!(medicine_id, "M1");
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.inventory().current_stock("M1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_restore_returns_to_drawn_batches() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        stock(&db, "M1", "EARLY", 4, Some(date("2027-01-01")), 0).await;
        stock(&db, "M1", "LATE", 10, Some(date("2027-06-01")), 0).await;

        let mut tx = db.begin().await.unwrap();
        decrement_for_order(&mut tx, "M1", 6, "O1").await.unwrap();
        let plan = restore_for_refund(&mut tx, "M1", 6, "O1", "O1_REFUND").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(plan.untracked, 0);
        let batches = db.inventory().batches("M1").await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].quantity, 4);
        assert_eq!(batches[1].quantity, 10);
    }

    #[tokio::test]
    async fn test_restore_untracked_goes_to_refund_batch() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;

        let mut tx = db.begin().await.unwrap();
        let plan = restore_for_refund(&mut tx, "M1", 3, "LEGACY", "LEGACY_REFUND")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(plan.untracked, 3);
        let batches = db.inventory().batches("M1").await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].batch_number, REFUND_BATCH_NUMBER);
        assert_eq!(batches[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_restore_missing_medicine_is_not_found() {
        let db = test_support::db().await;
        let mut tx = db.begin().await.unwrap();
        let err = restore_for_refund(&mut tx, "ghost", 1, "O1", "O1_REFUND")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_stock_levels_and_dated_batches() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        medicine(&db, "M2", "Ibuprofen", 500).await;
        stock(&db, "M1", "B1", 4, Some(date("2026-02-01")), 5).await;
        stock(&db, "M1", "B2", 6, Some(date("2026-12-01")), 10).await;
        stock(&db, "M2", "B1", 0, Some(date("2026-02-01")), 0).await;

        let levels = db.inventory().stock_levels().await.unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].quantity, 10);
        assert_eq!(levels[0].min_stock, 10);
        assert_eq!(levels[1].quantity, 0);

        let dated = db
            .inventory()
            .dated_batches(date("2026-01-01"), date("2026-03-01"))
            .await
            .unwrap();
        assert_eq!(dated.len(), 1);
        assert_eq!(dated[0].medicine_id, "M1");
        assert_eq!(dated[0].batch_number, "B1");
    }

    fn draft(medicine_id: &str, batch_number: &str, quantity: i64) -> PreparedBatch {
        PreparedBatch {
            medicine_id: medicine_id.to_string(),
            batch_number: batch_number.to_string(),
            quantity,
            unit_cost_cents: 300,
            production_date: None,
            expiry_date: Some(date("2027-03-01")),
            min_stock: 5,
            max_stock: Some(100),
            supplier_id: None,
        }
    }

    #[tokio::test]
    async fn test_manual_batch_lifecycle_is_journaled() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;

        let mut tx = db.begin().await.unwrap();
        let created = insert_batch(&mut tx, &draft("M1", "HAND-1", 12), "ADJ1").await.unwrap();
        let updated = update_batch(&mut tx, &created.id, &draft("M1", "HAND-1", 7), "ADJ2")
            .await
            .unwrap()
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(updated.quantity, 7);
        assert_eq!(updated.max_stock, Some(100));
        let opening = db.inventory().movements("ADJ1").await.unwrap();
        assert_eq!(opening.len(), 1);
        assert_eq!(opening[0].quantity_delta, 12);
        assert_eq!(opening[0].reason, MovementReason::Adjustment);
        let correction = db.inventory().movements("ADJ2").await.unwrap();
        assert_eq!(correction[0].quantity_delta, -5);

        let mut tx = db.begin().await.unwrap();
        assert_eq!(
            remove_empty_batch(&mut tx, &created.id).await.unwrap(),
            BatchRemoval::Holding(7)
        );
        update_batch(&mut tx, &created.id, &draft("M1", "HAND-1", 0), "ADJ3")
            .await
            .unwrap();
        assert_eq!(
            remove_empty_batch(&mut tx, &created.id).await.unwrap(),
            BatchRemoval::Removed
        );
        assert_eq!(
            remove_empty_batch(&mut tx, &created.id).await.unwrap(),
            BatchRemoval::Missing
        );
        tx.commit().await.unwrap();

        assert!(db.inventory().get_batch(&created.id).await.unwrap().is_none());
        assert!(db.inventory().movements("ADJ1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manual_batch_conflicts() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        medicine(&db, "M2", "Ibuprofen", 500).await;
        let existing = stock(&db, "M1", "B1", 3, None, 0).await;

        let mut tx = db.begin().await.unwrap();
        let duplicate = insert_batch(&mut tx, &draft("M1", "B1", 1), "ADJ1").await.unwrap_err();
        assert!(matches!(duplicate, DbError::UniqueViolation { .. }));

        let moved = update_batch(&mut tx, &existing, &draft("M2", "B1", 3), "ADJ2")
            .await
            .unwrap_err();
        assert!(matches!(moved, DbError::Domain(CoreError::Validation(_))));

        let missing = update_batch(&mut tx, "nope", &draft("M1", "B9", 3), "ADJ3").await.unwrap();
        assert!(missing.is_none());

        let orphan = insert_batch(&mut tx, &draft("ghost", "B1", 1), "ADJ4").await.unwrap_err();
        assert!(orphan.is_not_found());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_listings_carry_catalog_fields() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1250).await;
        let id = stock(&db, "M1", "B1", 3, Some(date("2027-01-01")), 0).await;

        let listings = db.inventory().listings().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].batch.id, id);
        assert_eq!(listings[0].generic_name, "Amoxicillin");
        assert_eq!(listings[0].retail_price_cents, 1250);

        let json = serde_json::to_value(&listings[0]).unwrap();
        assert_eq!(json["batch_number"], "B1");
        assert_eq!(json["generic_name"], "Amoxicillin");

        assert_eq!(db.inventory().get_batch(&id).await.unwrap().unwrap().quantity, 3);
    }
}
