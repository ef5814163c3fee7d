//! # Order Repository
//!
//! Orders, order lines and paid-sales summaries.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE (one transaction, driven by OrderWorkflow)                  │
//! │     └── insert_order()  → Order { payment_status: Paid }               │
//! │     └── insert_item()   × n                                            │
//! │     └── inventory::decrement_for_order() × n                           │
//! │                                                                         │
//! │  2. REFUND (one transaction)                                           │
//! │     └── mark_refunded() → WHERE payment_status = 1 (loser gets false)  │
//! │     └── inventory::restore_for_refund() × n                            │
//! │                                                                         │
//! │  3. DELETE (no stock effect)                                           │
//! │     └── items first, then header                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use pharmacy_core::order::SalesSummary;
use pharmacy_core::{Order, OrderDetail, OrderItem, PaymentStatus};

const ORDER_COLUMNS: &str = "order_id, member_id, customer_name, total_amount_cents, \
     original_amount_cents, discount_amount_cents, actual_payment_cents, payment_type, \
     payment_status, order_time, pay_time, refund_time, refund_reason, used_points, \
     created_points, cashier_id";

const ITEM_COLUMNS: &str = "id, order_id, medicine_id, medicine_name, quantity, \
     unit_price_cents, subtotal_cents, created_at";

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn get(&self, order_id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1");
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at, id"
        );
        Ok(sqlx::query_as::<_, OrderItem>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Order header with its lines.
    pub async fn detail(&self, order_id: &str) -> DbResult<Option<OrderDetail>> {
        let Some(order) = self.get(order_id).await? else {
            return Ok(None);
        };
        let items = self.items(order_id).await?;
        Ok(Some(OrderDetail { order, items }))
    }

    /// Orders placed in `[from, to)`, newest first.
    pub async fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE order_time >= ?1 AND order_time < ?2 ORDER BY order_time DESC"
        );
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn for_member(&self, member_id: &str) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE member_id = ?1 ORDER BY order_time DESC"
        );
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(member_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Σ actual payment and count of paid orders in `[from, to)`.
    pub async fn sales_summary(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<SalesSummary> {
        let (total_sales_cents, order_count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(actual_payment_cents), 0), COUNT(*)
            FROM orders
            WHERE payment_status = ?3 AND order_time >= ?1 AND order_time < ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(PaymentStatus::Paid)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesSummary {
            total_sales_cents,
            order_count,
        })
    }

    /// Deletes an order and its lines. Returns false when absent.
    pub async fn delete(&self, order_id: &str) -> DbResult<bool> {
        debug!(order_id = %order_id, "Deleting order");

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM orders WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Transactional Writes
// =============================================================================

pub async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(order_id = %order.order_id, total = order.actual_payment_cents, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            order_id, member_id, customer_name, total_amount_cents, original_amount_cents,
            discount_amount_cents, actual_payment_cents, payment_type, payment_status,
            order_time, pay_time, refund_time, refund_reason, used_points, created_points,
            cashier_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
    )
    .bind(&order.order_id)
    .bind(&order.member_id)
    .bind(&order.customer_name)
    .bind(order.total_amount_cents)
    .bind(order.original_amount_cents)
    .bind(order.discount_amount_cents)
    .bind(order.actual_payment_cents)
    .bind(order.payment_type)
    .bind(order.payment_status)
    .bind(order.order_time)
    .bind(order.pay_time)
    .bind(order.refund_time)
    .bind(&order.refund_reason)
    .bind(order.used_points)
    .bind(order.created_points)
    .bind(order.cashier_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, medicine_id, medicine_name, quantity,
            unit_price_cents, subtotal_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.medicine_id)
    .bind(&item.medicine_name)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.subtotal_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Flips a PAID order to REFUNDED.
///
/// Returns false when the order is not (or no longer) PAID, so of two
/// concurrent refunds exactly one wins.
pub async fn mark_refunded(
    conn: &mut SqliteConnection,
    order_id: &str,
    reason: Option<&str>,
    at: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET payment_status = ?2, refund_time = ?3, refund_reason = ?4
        WHERE order_id = ?1 AND payment_status = ?5
        "#,
    )
    .bind(order_id)
    .bind(PaymentStatus::Refunded)
    .bind(at)
    .bind(reason)
    .bind(PaymentStatus::Paid)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Order lines as seen by the transaction.
pub async fn items_on(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at, id"
    );
    Ok(sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?)
}

/// Generates an order id: `O` + timestamp + 4 hex chars.
pub fn generate_order_id(now: DateTime<Utc>) -> String {
    let suffix = (Uuid::new_v4().as_u128() & 0xffff) as u16;
    pharmacy_core::order::order_id(now, suffix)
}

/// Generates a new order item ID.
pub fn generate_order_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{self, medicine};
    use chrono::Duration;
    use pharmacy_core::PaymentType;

    fn order(order_id: &str, status: PaymentStatus, at: DateTime<Utc>, paid: i64) -> Order {
        Order {
            order_id: order_id.to_string(),
            member_id: Some("M00001".to_string()),
            customer_name: None,
            total_amount_cents: paid,
            original_amount_cents: paid,
            discount_amount_cents: 0,
            actual_payment_cents: paid,
            payment_type: PaymentType::Wechat,
            payment_status: status,
            order_time: at,
            pay_time: Some(at),
            refund_time: None,
            refund_reason: None,
            used_points: 0,
            created_points: 0,
            cashier_id: 1,
        }
    }

    fn item(order_id: &str, medicine_id: &str, qty: i64, price: i64) -> OrderItem {
        OrderItem {
            id: generate_order_item_id(),
            order_id: order_id.to_string(),
            medicine_id: medicine_id.to_string(),
            medicine_name: "Amoxicillin".to_string(),
            quantity: qty,
            unit_price_cents: price,
            subtotal_cents: qty * price,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        let now = Utc::now();

        let mut tx = db.begin().await.unwrap();
        insert_order(&mut tx, &order("O1", PaymentStatus::Paid, now, 3000)).await.unwrap();
        insert_item(&mut tx, &item("O1", "M1", 3, 1000)).await.unwrap();
        tx.commit().await.unwrap();

        let detail = db.orders().detail("O1").await.unwrap().unwrap();
        assert_eq!(detail.order.payment_type, PaymentType::Wechat);
        assert_eq!(detail.order.payment_status, PaymentStatus::Paid);
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].subtotal_cents, 3000);
        assert!(db.orders().detail("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_refunded_only_once() {
        let db = test_support::db().await;
        let now = Utc::now();
        let mut tx = db.begin().await.unwrap();
        insert_order(&mut tx, &order("O1", PaymentStatus::Paid, now, 100)).await.unwrap();
        assert!(mark_refunded(&mut tx, "O1", Some("damaged"), now).await.unwrap());
        assert!(!mark_refunded(&mut tx, "O1", Some("again"), now).await.unwrap());
        tx.commit().await.unwrap();

        let refunded = db.orders().get("O1").await.unwrap().unwrap();
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
        assert_eq!(refunded.refund_reason.as_deref(), Some("damaged"));
    }

    #[tokio::test]
    async fn test_sales_summary_counts_paid_only() {
        let db = test_support::db().await;
        let now = Utc::now();
        let mut tx = db.begin().await.unwrap();
        insert_order(&mut tx, &order("O1", PaymentStatus::Paid, now, 1500)).await.unwrap();
        insert_order(&mut tx, &order("O2", PaymentStatus::Paid, now, 500)).await.unwrap();
        insert_order(&mut tx, &order("O3", PaymentStatus::Refunded, now, 999)).await.unwrap();
        insert_order(&mut tx, &order("O4", PaymentStatus::Paid, now - Duration::days(3), 700))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let summary = db
            .orders()
            .sales_summary(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(summary.total_sales_cents, 2000);
        assert_eq!(summary.order_count, 2);

        let recent = db
            .orders()
            .between(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(db.orders().for_member("M00001").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_delete_removes_lines() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        let mut tx = db.begin().await.unwrap();
        insert_order(&mut tx, &order("O1", PaymentStatus::Paid, Utc::now(), 1000)).await.unwrap();
        insert_item(&mut tx, &item("O1", "M1", 1, 1000)).await.unwrap();
        tx.commit().await.unwrap();

        assert!(db.orders().delete("O1").await.unwrap());
        assert!(db.orders().items("O1").await.unwrap().is_empty());
        assert!(!db.orders().delete("O1").await.unwrap());
    }

    #[test]
    fn test_generated_order_id_shape() {
        let id = generate_order_id(Utc::now());
        assert_eq!(id.len(), 1 + 14 + 4);
        assert!(id.starts_with('O'));
    }
}
