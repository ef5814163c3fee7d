//! # Batch Maintenance
//!
//! The inventory screen's manual edits: list, create, correct and remove
//! batches outside the stock-in and order flows. Every quantity change is
//! journaled as an `adjustment` under an `ADJ...` reference, and every
//! write invalidates the dashboard figures.
//!
//! Only an empty batch can be deleted; stock leaves the shelf through an
//! order or a correction to zero.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use pharmacy_core::dashboard::DashboardStats;
use pharmacy_core::inventory::{adjustment_reference, BatchDraft, PreparedBatch};
use pharmacy_core::{InventoryBatch, InventoryListing};
use pharmacy_db::repository::inventory::{self, BatchRemoval};
use pharmacy_db::{Database, DbError};

use crate::cache::TtlCache;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct BatchMaintenance {
    db: Arc<Database>,
    stats_cache: Arc<TtlCache<DashboardStats>>,
}

impl BatchMaintenance {
    pub fn new(db: Arc<Database>, stats_cache: Arc<TtlCache<DashboardStats>>) -> Self {
        BatchMaintenance { db, stats_cache }
    }

    /// Every batch with its medicine's name, spec and price.
    pub async fn listings(&self) -> ServiceResult<Vec<InventoryListing>> {
        Ok(self.db.inventory().listings().await?)
    }

    pub async fn get_batch(&self, id: &str) -> ServiceResult<InventoryBatch> {
        self.db
            .inventory()
            .get_batch(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Batch", id))
    }

    async fn prepare(&self, draft: &BatchDraft) -> ServiceResult<PreparedBatch> {
        let prepared = draft.prepare()?;
        if let Some(supplier_id) = prepared.supplier_id {
            if self.db.suppliers().get(supplier_id).await?.is_none() {
                return Err(ServiceError::not_found("Supplier", supplier_id.to_string()));
            }
        }
        Ok(prepared)
    }

    /// ## Errors
    /// - Validation for a bad draft
    /// - NotFound for an unknown medicine or supplier
    /// - Conflict when the medicine already has that batch number
    pub async fn create_batch(&self, draft: BatchDraft) -> ServiceResult<InventoryBatch> {
        let prepared = self.prepare(&draft).await?;
        let reference = adjustment_reference(Utc::now());

        let mut tx = self.db.begin().await?;
        let batch = inventory::insert_batch(&mut tx, &prepared, &reference).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            batch_id = %batch.id,
            medicine_id = %batch.medicine_id,
            quantity = batch.quantity,
            "Batch created"
        );
        self.stats_cache.invalidate().await;
        Ok(batch)
    }

    /// Overwrites a batch. The medicine cannot change.
    pub async fn update_batch(&self, id: &str, draft: BatchDraft) -> ServiceResult<InventoryBatch> {
        let prepared = self.prepare(&draft).await?;
        let reference = adjustment_reference(Utc::now());

        let mut tx = self.db.begin().await?;
        let Some(batch) = inventory::update_batch(&mut tx, id, &prepared, &reference).await? else {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(ServiceError::not_found("Batch", id));
        };
        tx.commit().await.map_err(DbError::from)?;

        info!(batch_id = %id, quantity = batch.quantity, "Batch updated");
        self.stats_cache.invalidate().await;
        Ok(batch)
    }

    /// ## Errors
    /// - NotFound when the batch does not exist
    /// - InvalidState while the batch still holds stock
    pub async fn delete_batch(&self, id: &str) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;
        match inventory::remove_empty_batch(&mut tx, id).await? {
            BatchRemoval::Removed => {
                tx.commit().await.map_err(DbError::from)?;
            }
            BatchRemoval::Missing => {
                tx.rollback().await.map_err(DbError::from)?;
                return Err(ServiceError::not_found("Batch", id));
            }
            BatchRemoval::Holding(quantity) => {
                tx.rollback().await.map_err(DbError::from)?;
                return Err(ServiceError::InvalidState {
                    entity: "Batch".to_string(),
                    id: id.to_string(),
                    status: format!("holding {quantity} units"),
                });
            }
        }

        info!(batch_id = %id, "Batch deleted");
        self.stats_cache.invalidate().await;
        Ok(())
    }
}
