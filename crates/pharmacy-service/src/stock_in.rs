//! # Stock-In Workflow
//!
//! Receiving documents: draft, approve into inventory, or cancel.
//!
//! ## Lifecycle
//! ```text
//!              update / delete allowed
//!                ┌────────┐
//!                ▼        │
//! create ──► PENDING ─────┘
//!               │
//!               ├──(approve)──► APPROVED   each line credited to
//!               │                          (medicine_id, batch_number)
//!               │
//!               └──(cancel)───► CANCELLED  no inventory effect
//! ```
//!
//! Every transition is a conditional update on the current status, so two
//! concurrent approvals credit stock once. An approval invalidates the
//! dashboard figures, since low-stock counts move with it.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use pharmacy_core::dashboard::DashboardStats;
use pharmacy_core::order::day_range;
use pharmacy_core::stock_in::{PreparedStockIn, StockInDraft};
use pharmacy_core::validation::{validate_page, validate_search_query};
use pharmacy_core::{CoreError, Page, StockIn, StockInDetail, StockInStatus};
use pharmacy_db::repository::inventory::{self, BatchCredit};
use pharmacy_db::repository::stock_in as documents;
use pharmacy_db::{Database, DbError};

use crate::cache::TtlCache;
use crate::config::StockInConfig;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct StockInWorkflow {
    db: Arc<Database>,
    config: StockInConfig,
    stats_cache: Arc<TtlCache<DashboardStats>>,
}

impl StockInWorkflow {
    pub fn new(
        db: Arc<Database>,
        config: StockInConfig,
        stats_cache: Arc<TtlCache<DashboardStats>>,
    ) -> Self {
        StockInWorkflow {
            db,
            config,
            stats_cache,
        }
    }

    // =========================================================================
    // Draft Resolution
    // =========================================================================

    /// The draft's supplier when it exists, else the configured fallback.
    async fn resolve_supplier(&self, requested: Option<i64>) -> ServiceResult<i64> {
        if let Some(id) = requested {
            if self.db.suppliers().get(id).await?.is_some() {
                return Ok(id);
            }
        }
        warn!(
            requested = ?requested,
            fallback = self.config.fallback_supplier_id,
            "Unknown supplier on stock-in, using fallback"
        );
        Ok(self.config.fallback_supplier_id)
    }

    async fn ensure_medicines_exist(&self, prepared: &PreparedStockIn) -> ServiceResult<()> {
        for line in &prepared.items {
            if self.db.medicines().get(&line.medicine_id).await?.is_none() {
                return Err(ServiceError::validation(format!(
                    "unknown medicine_id {}",
                    line.medicine_id
                )));
            }
        }
        Ok(())
    }

    async fn require(&self, id: i64) -> ServiceResult<StockIn> {
        self.db
            .stock_ins()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Stock-in", id.to_string()))
    }

    /// NotFound when the document is gone, else InvalidState naming its
    /// current status. Used after a conditional write matched nothing.
    async fn rejection(&self, id: i64) -> ServiceError {
        match self.require(id).await {
            Ok(current) => invalid_status(&current),
            Err(e) => e,
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Records a PENDING receiving document.
    ///
    /// ## Errors
    /// - Validation: no lines, bad quantity/price, unknown medicine
    /// - Conflict: the supplied document number is taken
    pub async fn create_stock_in(&self, draft: StockInDraft) -> ServiceResult<StockInDetail> {
        let now = Utc::now();
        let prepared = draft.prepare(now)?;
        self.ensure_medicines_exist(&prepared).await?;
        let supplier_id = self.resolve_supplier(draft.supplier_id).await?;
        let number = draft
            .stock_in_no()
            .unwrap_or_else(|| documents::generate_stock_in_no(now));

        let mut tx = self.db.begin().await?;
        let stock_in = documents::insert(&mut tx, &number, supplier_id, &prepared, now).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            stock_in_id = stock_in.id,
            stock_in_no = %stock_in.stock_in_no,
            supplier_id,
            lines = prepared.items.len(),
            total = stock_in.total_amount_cents,
            "Stock-in created"
        );
        self.get(stock_in.id).await
    }

    /// Replaces a PENDING document's header fields and lines.
    pub async fn update_stock_in(&self, id: i64, draft: StockInDraft) -> ServiceResult<StockInDetail> {
        let now = Utc::now();
        let prepared = draft.prepare(now)?;
        self.ensure_medicines_exist(&prepared).await?;

        let current = self.require(id).await?;
        if current.status != StockInStatus::Pending {
            return Err(invalid_status(&current));
        }
        let supplier_id = self.resolve_supplier(draft.supplier_id).await?;

        let mut tx = self.db.begin().await?;
        if !documents::replace_pending(&mut tx, id, supplier_id, &prepared, now).await? {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(self.rejection(id).await);
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(stock_in_id = id, lines = prepared.items.len(), "Stock-in updated");
        self.get(id).await
    }

    /// PENDING → APPROVED, crediting every line to inventory in the same
    /// transaction.
    ///
    /// ## Errors
    /// - NotFound: no such document
    /// - InvalidState: already approved or cancelled
    pub async fn approve_stock_in(&self, id: i64) -> ServiceResult<StockInDetail> {
        let header = self.require(id).await?;
        if header.status != StockInStatus::Pending {
            return Err(invalid_status(&header));
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        if !documents::transition(&mut tx, id, StockInStatus::Pending, StockInStatus::Approved, now).await? {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(self.rejection(id).await);
        }

        let items = documents::items_on(&mut tx, id).await?;
        for item in &items {
            let credit = BatchCredit {
                medicine_id: item.medicine_id.clone(),
                batch_number: item.batch_number.clone(),
                quantity: item.quantity,
                unit_cost_cents: item.unit_price_cents,
                production_date: item.production_date,
                expiry_date: item.expiry_date,
                supplier_id: Some(header.supplier_id),
                min_stock: None,
            };
            let batch_id = inventory::credit_batch(&mut tx, &credit, &header.stock_in_no).await?;
            debug!(
                stock_in_id = id,
                medicine_id = %item.medicine_id,
                batch_id = %batch_id,
                quantity = item.quantity,
                "Batch credited"
            );
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            stock_in_id = id,
            stock_in_no = %header.stock_in_no,
            lines = items.len(),
            "Stock-in approved"
        );
        self.stats_cache.invalidate().await;
        self.get(id).await
    }

    /// PENDING → CANCELLED. Inventory is untouched.
    pub async fn cancel_stock_in(&self, id: i64) -> ServiceResult<StockInDetail> {
        let mut tx = self.db.begin().await?;
        let moved = documents::transition(
            &mut tx,
            id,
            StockInStatus::Pending,
            StockInStatus::Cancelled,
            Utc::now(),
        )
        .await?;
        if !moved {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(self.rejection(id).await);
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(stock_in_id = id, "Stock-in cancelled");
        self.get(id).await
    }

    /// Deletes a PENDING document with its lines.
    pub async fn delete_stock_in(&self, id: i64) -> ServiceResult<()> {
        if !self.db.stock_ins().delete_pending(id).await? {
            return Err(self.rejection(id).await);
        }
        info!(stock_in_id = id, "Stock-in deleted");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get(&self, id: i64) -> ServiceResult<StockInDetail> {
        self.db
            .stock_ins()
            .detail(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Stock-in", id.to_string()))
    }

    /// Looks a document up by its number (`SI...` or one supplied on create).
    pub async fn get_by_no(&self, stock_in_no: &str) -> ServiceResult<StockInDetail> {
        let number = stock_in_no.trim();
        let header = self
            .db
            .stock_ins()
            .find_by_no(number)
            .await?
            .ok_or_else(|| ServiceError::not_found("Stock-in", number))?;
        self.get(header.id).await
    }

    pub async fn list(&self, page: u32, size: u32) -> ServiceResult<Page<StockIn>> {
        let (page, size) = validate_page(page, size)?;
        let (rows, total) = self.db.stock_ins().page(page, size).await?;
        Ok(Page::new(rows, page, size, total))
    }

    /// Matches document number, supplier name or remark; an empty keyword
    /// lists everything.
    pub async fn search(
        &self,
        keyword: &str,
        status: Option<StockInStatus>,
        page: u32,
        size: u32,
    ) -> ServiceResult<Page<StockIn>> {
        let keyword = validate_search_query(keyword)?;
        let (page, size) = validate_page(page, size)?;
        let (rows, total) = self
            .db
            .stock_ins()
            .search(&keyword, status, page, size)
            .await?;
        Ok(Page::new(rows, page, size, total))
    }

    pub async fn by_status(&self, status: StockInStatus) -> ServiceResult<Vec<StockIn>> {
        Ok(self.db.stock_ins().by_status(status).await?)
    }

    /// Documents dated on the days `start..=end`.
    pub async fn between(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<Vec<StockIn>> {
        let (from, to) = day_range(start, end)?;
        Ok(self.db.stock_ins().between(from, to).await?)
    }
}

fn invalid_status(stock_in: &StockIn) -> ServiceError {
    CoreError::InvalidStockInStatus {
        stock_in_no: stock_in.stock_in_no.clone(),
        current_status: stock_in.status.label().to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, add_medicine};
    use crate::ErrorKind;
    use pharmacy_core::stock_in::StockInLineDraft;
    use pharmacy_core::DEFAULT_BATCH_NUMBER;
    use std::time::Duration;

    async fn setup() -> (Arc<Database>, StockInWorkflow) {
        let db = testing::db().await;
        let fallback = db.suppliers().ensure("Default Supplier").await.unwrap();
        add_medicine(&db, "M1", "Amoxicillin", 1000).await;
        add_medicine(&db, "M2", "Ibuprofen", 500).await;
        let workflow = StockInWorkflow::new(
            db.clone(),
            StockInConfig::new(fallback.id),
            Arc::new(TtlCache::new(Duration::from_secs(60))),
        );
        (db, workflow)
    }

    fn draft(lines: &[(&str, i64, i64, Option<&str>)]) -> StockInDraft {
        StockInDraft {
            remark: Some("monthly restock".to_string()),
            items: lines
                .iter()
                .map(|(id, qty, price, batch)| StockInLineDraft {
                    medicine_id: id.to_string(),
                    quantity: *qty,
                    unit_price_cents: *price,
                    batch_number: batch.map(str::to_string),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_fills_defaults() {
        let (_db, workflow) = setup().await;
        let created = workflow
            .create_stock_in(draft(&[("M1", 10, 250, None), ("M2", 3, 1000, Some("B7"))]))
            .await
            .unwrap();

        assert_eq!(created.stock_in.status, StockInStatus::Pending);
        assert!(created.stock_in.stock_in_no.starts_with("SI"));
        assert_eq!(created.stock_in.total_amount_cents, 5500);
        assert_eq!(created.supplier_name.as_deref(), Some("Default Supplier"));
        assert_eq!(created.items.len(), 2);
        assert_eq!(created.items[0].batch_number, DEFAULT_BATCH_NUMBER);
        assert_eq!(created.items[1].batch_number, "B7");
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_medicine() {
        let (_db, workflow) = setup().await;
        let err = workflow
            .create_stock_in(draft(&[("M1", 1, 100, None), ("ghost", 1, 100, None)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("ghost"));
        assert_eq!(workflow.list(0, 10).await.unwrap().total_items, 0);
    }

    #[tokio::test]
    async fn test_approve_credits_inventory_once() {
        let (db, workflow) = setup().await;
        let created = workflow
            .create_stock_in(draft(&[("M1", 10, 250, Some("B1")), ("M1", 5, 250, Some("B1"))]))
            .await
            .unwrap();
        let id = created.stock_in.id;
        assert_eq!(db.inventory().current_stock("M1").await.unwrap(), 0);

        let approved = workflow.approve_stock_in(id).await.unwrap();
        assert_eq!(approved.stock_in.status, StockInStatus::Approved);
        assert!(approved.stock_in.approved_at.is_some());
        assert_eq!(db.inventory().current_stock("M1").await.unwrap(), 15);
        assert_eq!(db.inventory().batches("M1").await.unwrap().len(), 1);

        let again = workflow.approve_stock_in(id).await.unwrap_err();
        assert_eq!(again.kind(), ErrorKind::InvalidState);
        assert_eq!(db.inventory().current_stock("M1").await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_approve_invalidates_dashboard_figures() {
        let db = testing::db().await;
        let fallback = db.suppliers().ensure("Default Supplier").await.unwrap();
        add_medicine(&db, "M1", "Amoxicillin", 1000).await;
        let cache = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let workflow = StockInWorkflow::new(db.clone(), StockInConfig::new(fallback.id), cache.clone());

        let cached = DashboardStats {
            low_stock_count: 7,
            ..Default::default()
        };
        let _ = cache
            .get_or_recompute(|| async { Ok::<_, ()>(cached.clone()) })
            .await;

        let id = workflow
            .create_stock_in(draft(&[("M1", 10, 250, None)]))
            .await
            .unwrap()
            .stock_in
            .id;
        let still_cached = cache
            .get_or_recompute(|| async { Ok::<_, ()>(DashboardStats::default()) })
            .await
            .unwrap();
        assert_eq!(still_cached.low_stock_count, 7);

        workflow.approve_stock_in(id).await.unwrap();
        let recomputed = cache
            .get_or_recompute(|| async { Ok::<_, ()>(DashboardStats::default()) })
            .await
            .unwrap();
        assert_eq!(recomputed.low_stock_count, 0);
    }

    #[tokio::test]
    async fn test_cancel_then_approve_is_invalid_state() {
        let (db, workflow) = setup().await;
        let id = workflow
            .create_stock_in(draft(&[("M2", 4, 100, None)]))
            .await
            .unwrap()
            .stock_in
            .id;

        let cancelled = workflow.cancel_stock_in(id).await.unwrap();
        assert_eq!(cancelled.stock_in.status, StockInStatus::Cancelled);

        let err = workflow.approve_stock_in(id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(err.to_string().contains("cancelled"));
        assert_eq!(db.inventory().current_stock("M2").await.unwrap(), 0);

        assert_eq!(
            workflow.cancel_stock_in(id).await.unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            workflow.approve_stock_in(9999).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_only_while_pending() {
        let (_db, workflow) = setup().await;
        let id = workflow
            .create_stock_in(draft(&[("M1", 1, 100, None)]))
            .await
            .unwrap()
            .stock_in
            .id;

        let updated = workflow
            .update_stock_in(id, draft(&[("M2", 2, 300, None), ("M1", 1, 100, None)]))
            .await
            .unwrap();
        assert_eq!(updated.items.len(), 2);
        assert_eq!(updated.stock_in.total_amount_cents, 700);

        workflow.approve_stock_in(id).await.unwrap();
        let err = workflow
            .update_stock_in(id, draft(&[("M1", 1, 100, None)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(
            workflow.delete_stock_in(id).await.unwrap_err().kind(),
            ErrorKind::InvalidState
        );

        let pending = workflow
            .create_stock_in(draft(&[("M1", 1, 100, None)]))
            .await
            .unwrap()
            .stock_in
            .id;
        workflow.delete_stock_in(pending).await.unwrap();
        assert_eq!(
            workflow.get(pending).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_unknown_supplier_falls_back_and_queries() {
        let (_db, workflow) = setup().await;
        let mut with_bad_supplier = draft(&[("M1", 1, 100, None)]);
        with_bad_supplier.supplier_id = Some(404);
        with_bad_supplier.stock_in_no = Some("SI-MANUAL-1".to_string());
        let created = workflow.create_stock_in(with_bad_supplier).await.unwrap();
        assert_eq!(created.supplier_name.as_deref(), Some("Default Supplier"));
        assert_eq!(created.stock_in.stock_in_no, "SI-MANUAL-1");
        let found = workflow.get_by_no(" SI-MANUAL-1 ").await.unwrap();
        assert_eq!(found.stock_in.id, created.stock_in.id);
        assert_eq!(found.items.len(), 1);
        assert_eq!(
            workflow.get_by_no("SI-NOPE").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );

        let mut duplicate = draft(&[("M1", 1, 100, None)]);
        duplicate.stock_in_no = Some("SI-MANUAL-1".to_string());
        assert_eq!(
            workflow.create_stock_in(duplicate).await.unwrap_err().kind(),
            ErrorKind::Conflict
        );

        workflow.create_stock_in(draft(&[("M2", 1, 100, None)])).await.unwrap();

        let hits = workflow.search("manual", None, 0, 10).await.unwrap();
        assert_eq!(hits.total_items, 1);
        let by_supplier = workflow.search("default supp", None, 0, 10).await.unwrap();
        assert_eq!(by_supplier.total_items, 2);
        assert_eq!(
            workflow.by_status(StockInStatus::Pending).await.unwrap().len(),
            2
        );

        let today = Utc::now().date_naive();
        assert_eq!(workflow.between(today, today).await.unwrap().len(), 2);
    }
}
