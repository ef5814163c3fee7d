//! # Order Workflow
//!
//! Placing, refunding and querying orders.
//!
//! ## State Machine
//! ```text
//! PENDING ──(create)──► PAID ──(refund)──► REFUNDED (terminal)
//! ```
//! Orders are written as PAID directly; PENDING exists only as a stored
//! value and cannot be refunded.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate shape, resolve medicines, check aggregate stock           │
//! │     (any failure here writes nothing)                                  │
//! │  2. price lines and compute totals                                     │
//! │  3. BEGIN                                                              │
//! │       insert header (PAID) → insert lines → FEFO decrement per line    │
//! │     COMMIT  (any failure rolls everything back)                        │
//! │  4. invalidate dashboard cache                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use pharmacy_core::dashboard::DashboardStats;
use pharmacy_core::order::{compute_totals, day_range, refund_reference, OrderRequest, PricedLine, SalesSummary};
use pharmacy_core::{CoreError, Money, Order, OrderDetail, OrderItem, PaymentStatus, PaymentType};
use pharmacy_db::repository::{inventory, order as orders};
use pharmacy_db::{Database, DbError};

use crate::cache::TtlCache;
use crate::error::{ServiceError, ServiceResult};

/// Cashier recorded when the request names none.
const DEFAULT_CASHIER_ID: i64 = 1;

#[derive(Debug, Clone)]
pub struct OrderWorkflow {
    db: Arc<Database>,
    stats_cache: Arc<TtlCache<DashboardStats>>,
}

impl OrderWorkflow {
    pub fn new(db: Arc<Database>, stats_cache: Arc<TtlCache<DashboardStats>>) -> Self {
        OrderWorkflow { db, stats_cache }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Places an order and decrements stock, all or nothing.
    ///
    /// ## Errors
    /// - Validation: empty/oversized order, bad quantity, bad amounts
    /// - NotFound: a line names an unknown medicine
    /// - InsufficientStock: aggregate stock does not cover a medicine
    pub async fn create_order(&self, request: OrderRequest) -> ServiceResult<OrderDetail> {
        request.validate()?;

        let mut lines = Vec::with_capacity(request.items.len());
        let mut needed: HashMap<String, i64> = HashMap::new();
        for line in &request.items {
            let medicine_id = line.medicine_id.trim();
            let medicine = self
                .db
                .medicines()
                .get(medicine_id)
                .await?
                .ok_or_else(|| CoreError::MedicineNotFound(medicine_id.to_string()))?;

            *needed.entry(medicine.medicine_id.clone()).or_default() += line.quantity;
            lines.push(PricedLine {
                unit_price: Money::from_cents(line.unit_price_cents.unwrap_or(medicine.retail_price_cents)),
                medicine_name: medicine.display_name().to_string(),
                medicine_id: medicine.medicine_id,
                quantity: line.quantity,
            });
        }

        // Pre-check so the common shortage is reported before anything is
        // written. The conditional decrement still guards against races.
        for line in &lines {
            let requested = needed.get(&line.medicine_id).copied().unwrap_or(line.quantity);
            let available = self.db.inventory().current_stock(&line.medicine_id).await?;
            if available < requested {
                return Err(CoreError::InsufficientStock {
                    medicine_id: line.medicine_id.clone(),
                    available,
                    requested,
                }
                .into());
            }
        }

        let totals = compute_totals(
            &lines,
            request.original_amount_cents,
            request.discount_amount_cents,
            request.actual_payment_cents,
        )?;

        let now = Utc::now();
        let order = Order {
            order_id: orders::generate_order_id(now),
            member_id: request.member_id(),
            customer_name: request.customer_name.clone(),
            total_amount_cents: totals.total.cents(),
            original_amount_cents: totals.original.cents(),
            discount_amount_cents: totals.discount.cents(),
            actual_payment_cents: totals.actual.cents(),
            payment_type: PaymentType::parse_or_cash(request.payment_type.as_deref()),
            payment_status: PaymentStatus::Paid,
            order_time: now,
            pay_time: Some(now),
            refund_time: None,
            refund_reason: None,
            used_points: request.used_points.unwrap_or(0),
            created_points: 0,
            cashier_id: request.cashier_id.unwrap_or(DEFAULT_CASHIER_ID),
        };

        let items: Vec<OrderItem> = lines
            .iter()
            .map(|line| OrderItem {
                id: orders::generate_order_item_id(),
                order_id: order.order_id.clone(),
                medicine_id: line.medicine_id.clone(),
                medicine_name: line.medicine_name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                subtotal_cents: line.subtotal().cents(),
                created_at: now,
            })
            .collect();

        let mut tx = self.db.begin().await?;
        orders::insert_order(&mut tx, &order).await?;
        for item in &items {
            orders::insert_item(&mut tx, item).await?;
            let drawn =
                inventory::decrement_for_order(&mut tx, &item.medicine_id, item.quantity, &order.order_id)
                    .await?;
            debug!(
                order_id = %order.order_id,
                medicine_id = %item.medicine_id,
                batches = drawn.len(),
                "Stock drawn"
            );
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order.order_id,
            lines = items.len(),
            actual_payment = order.actual_payment_cents,
            payment_type = %order.payment_type.as_str(),
            "Order placed"
        );
        self.stats_cache.invalidate().await;

        Ok(OrderDetail { order, items })
    }

    /// Refunds a PAID order and restores its stock.
    ///
    /// ## Errors
    /// - NotFound: no such order
    /// - InvalidState: the order is not PAID (including a lost race with a
    ///   concurrent refund)
    pub async fn refund_order(&self, order_id: &str, reason: Option<&str>) -> ServiceResult<Order> {
        let order = self.require(order_id).await?;
        if order.payment_status != PaymentStatus::Paid {
            return Err(invalid_status(order_id, order.payment_status));
        }

        let now = Utc::now();
        let reference = refund_reference(order_id);

        let mut tx = self.db.begin().await?;
        if !orders::mark_refunded(&mut tx, order_id, reason, now).await? {
            tx.rollback().await.map_err(DbError::from)?;
            let current = self.require(order_id).await?;
            return Err(invalid_status(order_id, current.payment_status));
        }

        let items = orders::items_on(&mut tx, order_id).await?;
        for item in &items {
            match inventory::restore_for_refund(
                &mut tx,
                &item.medicine_id,
                item.quantity,
                order_id,
                &reference,
            )
            .await
            {
                Ok(plan) => debug!(
                    order_id = %order_id,
                    medicine_id = %item.medicine_id,
                    untracked = plan.untracked,
                    "Stock restored"
                ),
                Err(e) if e.is_not_found() => warn!(
                    order_id = %order_id,
                    medicine_id = %item.medicine_id,
                    error = %e,
                    "Skipping restore for missing medicine"
                ),
                Err(e) => return Err(e.into()),
            }
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(order_id = %order_id, reason = ?reason, "Order refunded");
        if let Some(member_id) = &order.member_id {
            if order.used_points > 0 || order.created_points > 0 {
                info!(
                    member_id = %member_id,
                    used_points = order.used_points,
                    created_points = order.created_points,
                    "Member points are not reversed on refund"
                );
            }
        }
        self.stats_cache.invalidate().await;

        self.require(order_id).await
    }

    /// Deletes an order and its lines without touching stock.
    pub async fn delete_order(&self, order_id: &str) -> ServiceResult<bool> {
        let deleted = self.db.orders().delete(order_id).await?;
        if deleted {
            info!(order_id = %order_id, "Order deleted");
            self.stats_cache.invalidate().await;
        }
        Ok(deleted)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    async fn require(&self, order_id: &str) -> ServiceResult<Order> {
        self.db
            .orders()
            .get(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))
    }

    pub async fn get_order(&self, order_id: &str) -> ServiceResult<OrderDetail> {
        self.db
            .orders()
            .detail(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))
    }

    /// Orders placed on the days `start..=end`, newest first.
    pub async fn orders_between(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<Vec<Order>> {
        let (from, to) = day_range(start, end)?;
        Ok(self.db.orders().between(from, to).await?)
    }

    pub async fn orders_for_member(&self, member_id: &str) -> ServiceResult<Vec<Order>> {
        Ok(self.db.orders().for_member(member_id.trim()).await?)
    }

    pub async fn today_orders(&self) -> ServiceResult<Vec<Order>> {
        let today = Utc::now().date_naive();
        self.orders_between(today, today).await
    }

    /// Paid sales and order count on the days `start..=end`.
    pub async fn sales_summary(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<SalesSummary> {
        let (from, to) = day_range(start, end)?;
        Ok(self.db.orders().sales_summary(from, to).await?)
    }

    pub async fn total_sales_between(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<i64> {
        Ok(self.sales_summary(start, end).await?.total_sales_cents)
    }

    pub async fn order_count_between(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<i64> {
        Ok(self.sales_summary(start, end).await?.order_count)
    }
}

fn invalid_status(order_id: &str, status: PaymentStatus) -> ServiceError {
    CoreError::InvalidOrderStatus {
        order_id: order_id.to_string(),
        current_status: status.label().to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================
