//! # Dashboard Repository
//!
//! Read-only aggregates behind the dashboard. Every query here reads paid
//! orders only; refunded orders drop out of the figures.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::DbResult;
use pharmacy_core::dashboard::{CategoryShare, DayFigures, HotProduct};
use pharmacy_core::PaymentStatus;

#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: SqlitePool,
}

impl DashboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DashboardRepository { pool }
    }

    /// Sales, order count and distinct paying members in `[from, to)`.
    pub async fn day_figures(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<DayFigures> {
        Ok(sqlx::query_as::<_, DayFigures>(
            r#"
            SELECT COALESCE(SUM(actual_payment_cents), 0) AS sales_cents,
                   COUNT(*)                               AS orders,
                   COUNT(DISTINCT member_id)              AS members
            FROM orders
            WHERE payment_status = ?3 AND order_time >= ?1 AND order_time < ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(PaymentStatus::Paid)
        .fetch_one(&self.pool)
        .await?)
    }

    /// `(order_time, actual_payment)` of every paid order in `[from, to)`.
    pub async fn paid_sales(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<(DateTime<Utc>, i64)>> {
        Ok(sqlx::query_as(
            r#"
            SELECT order_time, actual_payment_cents
            FROM orders
            WHERE payment_status = ?3 AND order_time >= ?1 AND order_time < ?2
            ORDER BY order_time
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(PaymentStatus::Paid)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Medicine count per category, largest first. Empty categories are
    /// left out.
    pub async fn category_distribution(&self) -> DbResult<Vec<CategoryShare>> {
        Ok(sqlx::query_as::<_, CategoryShare>(
            r#"
            SELECT c.name AS category_name, COUNT(m.medicine_id) AS medicine_count
            FROM categories c
            JOIN medicines m ON m.category_id = c.id
            GROUP BY c.id, c.name
            ORDER BY medicine_count DESC, c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Best sellers by quantity among paid lines in `[from, to)`, with the
    /// current stock of each.
    pub async fn hot_products(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<HotProduct>> {
        Ok(sqlx::query_as::<_, HotProduct>(
            r#"
            SELECT m.medicine_id,
                   m.generic_name                  AS medicine_name,
                   m.trade_name,
                   m.spec,
                   m.retail_price_cents            AS unit_price_cents,
                   SUM(i.quantity)                 AS today_quantity,
                   SUM(i.subtotal_cents)           AS today_amount_cents,
                   COALESCE((SELECT SUM(b.quantity) FROM inventory_batches b
                             WHERE b.medicine_id = m.medicine_id), 0) AS current_stock
            FROM order_items i
            JOIN orders o    ON o.order_id = i.order_id
            JOIN medicines m ON m.medicine_id = i.medicine_id
            WHERE o.payment_status = ?3 AND o.order_time >= ?1 AND o.order_time < ?2
            GROUP BY m.medicine_id
            ORDER BY today_quantity DESC, m.medicine_id
            LIMIT ?4
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(PaymentStatus::Paid)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::order::{insert_item, insert_order};
    use crate::repository::test_support::{self, medicine, stock};
    use chrono::Duration;
    use pharmacy_core::{Order, OrderItem, PaymentType};

    async fn sell(
        db: &crate::Database,
        order_id: &str,
        member: Option<&str>,
        status: PaymentStatus,
        lines: &[(&str, i64, i64)],
    ) {
        let now = Utc::now();
        let total: i64 = lines.iter().map(|(_, q, p)| q * p).sum();
        let mut tx = db.begin().await.unwrap();
        insert_order(
            &mut tx,
            &Order {
                order_id: order_id.to_string(),
                member_id: member.map(str::to_string),
                customer_name: None,
                total_amount_cents: total,
                original_amount_cents: total,
                discount_amount_cents: 0,
                actual_payment_cents: total,
                payment_type: PaymentType::Cash,
                payment_status: status,
                order_time: now,
                pay_time: Some(now),
                refund_time: None,
                refund_reason: None,
                used_points: 0,
                created_points: 0,
                cashier_id: 1,
            },
        )
        .await
        .unwrap();
        for (i, (medicine_id, qty, price)) in lines.iter().enumerate() {
            insert_item(
                &mut tx,
                &OrderItem {
                    id: format!("{order_id}-{i}"),
                    order_id: order_id.to_string(),
                    medicine_id: medicine_id.to_string(),
                    medicine_name: medicine_id.to_string(),
                    quantity: *qty,
                    unit_price_cents: *price,
                    subtotal_cents: qty * price,
                    created_at: now,
                },
            )
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();
    }

    fn today() -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now - Duration::hours(1), now + Duration::hours(1))
    }

    #[tokio::test]
    async fn test_day_figures_count_distinct_members() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        sell(&db, "O1", Some("M00001"), PaymentStatus::Paid, &[("M1", 1, 1000)]).await;
        sell(&db, "O2", Some("M00001"), PaymentStatus::Paid, &[("M1", 2, 1000)]).await;
        sell(&db, "O3", None, PaymentStatus::Paid, &[("M1", 1, 1000)]).await;
        sell(&db, "O4", Some("M00002"), PaymentStatus::Refunded, &[("M1", 1, 1000)]).await;

        let (from, to) = today();
        let figures = db.dashboard().day_figures(from, to).await.unwrap();
        assert_eq!(figures.sales_cents, 4000);
        assert_eq!(figures.orders, 3);
        assert_eq!(figures.members, 1);

        assert_eq!(db.dashboard().paid_sales(from, to).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_hot_products_ranked_by_quantity() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        medicine(&db, "M2", "Ibuprofen", 500).await;
        stock(&db, "M2", "B1", 40, None, 0).await;
        sell(&db, "O1", None, PaymentStatus::Paid, &[("M1", 2, 1000), ("M2", 3, 500)]).await;
        sell(&db, "O2", None, PaymentStatus::Paid, &[("M2", 4, 500)]).await;
        sell(&db, "O3", None, PaymentStatus::Refunded, &[("M1", 50, 1000)]).await;

        let (from, to) = today();
        let hot = db.dashboard().hot_products(from, to, 10).await.unwrap();
        assert_eq!(hot.len(), 2);
        assert_eq!(hot[0].medicine_id, "M2");
        assert_eq!(hot[0].today_quantity, 7);
        assert_eq!(hot[0].today_amount_cents, 3500);
        assert_eq!(hot[0].current_stock, 40);
        assert_eq!(hot[1].current_stock, 0);

        let top = db.dashboard().hot_products(from, to, 1).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_category_distribution() {
        let db = test_support::db().await;
        medicine(&db, "M1", "Amoxicillin", 1000).await;
        medicine(&db, "M2", "Ibuprofen", 500).await;

        let shares = db.dashboard().category_distribution().await.unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].category_name, "OTC");
        assert_eq!(shares[0].medicine_count, 2);
    }
}
