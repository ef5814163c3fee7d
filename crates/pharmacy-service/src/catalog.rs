//! # Catalog Services
//!
//! Medicines, categories and suppliers.
//!
//! ## Medicine Dedup
//! ```text
//! NewMedicine ──prepare()──► PreparedMedicine { dedup }
//!                                   │
//!            ┌──────────────────────┴─────────────────────┐
//!            ▼                                            ▼
//!   ApprovalNo(no)                               GroupKey(key)
//!   find_by_approval_no                          find_by_group_key
//!            │                                            │
//!            └───── hit → existing row (created: false) ──┘
//!                   miss → insert       (created: true)
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use pharmacy_core::catalog::{DedupKey, NewMedicine};
use pharmacy_core::validation::{validate_name, validate_page, validate_search_query};
use pharmacy_core::{Category, Medicine, Page, Supplier};
use pharmacy_db::repository::supplier::NewSupplier;
use pharmacy_db::Database;

use crate::error::{ServiceError, ServiceResult};

// =============================================================================
// Medicines
// =============================================================================

/// Outcome of a create: the stored row and whether it is new.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicineCreation {
    pub medicine: Medicine,
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct MedicineCatalog {
    db: Arc<Database>,
}

impl MedicineCatalog {
    pub fn new(db: Arc<Database>) -> Self {
        MedicineCatalog { db }
    }

    /// Creates a medicine unless an equivalent one exists.
    ///
    /// Equivalent means same approval number when one is given, else same
    /// generic name, spec and manufacturer.
    pub async fn create(&self, input: NewMedicine) -> ServiceResult<MedicineCreation> {
        let prepared = input.prepare()?;

        if self.db.categories().get(prepared.category_id).await?.is_none() {
            return Err(ServiceError::validation(format!(
                "unknown category_id {}",
                prepared.category_id
            )));
        }

        let existing = match &prepared.dedup {
            DedupKey::ApprovalNo(no) => self.db.medicines().find_by_approval_no(no).await?,
            DedupKey::GroupKey(key) => self.db.medicines().find_by_group_key(key).await?,
        };
        if let Some(medicine) = existing {
            info!(medicine_id = %medicine.medicine_id, "Matched existing medicine");
            return Ok(MedicineCreation {
                medicine,
                created: false,
            });
        }

        let medicine = self.db.medicines().insert(&prepared).await?;
        info!(medicine_id = %medicine.medicine_id, name = %medicine.generic_name, "Medicine created");
        Ok(MedicineCreation {
            medicine,
            created: true,
        })
    }

    pub async fn get(&self, medicine_id: &str) -> ServiceResult<Medicine> {
        Ok(self.db.medicines().require(medicine_id).await?)
    }

    pub async fn page(&self, page: u32, size: u32) -> ServiceResult<Page<Medicine>> {
        let (page, size) = validate_page(page, size)?;
        let (rows, total) = self.db.medicines().page(page, size).await?;
        Ok(Page::new(rows, page, size, total))
    }

    pub async fn search(
        &self,
        keyword: &str,
        category_id: Option<i64>,
        page: u32,
        size: u32,
    ) -> ServiceResult<Page<Medicine>> {
        let keyword = validate_search_query(keyword)?;
        let (page, size) = validate_page(page, size)?;
        let (rows, total) = self
            .db
            .medicines()
            .search(&keyword, category_id, page, size)
            .await?;
        Ok(Page::new(rows, page, size, total))
    }
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone)]
pub struct CategoryDirectory {
    db: Arc<Database>,
}

impl CategoryDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        CategoryDirectory { db }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.db.categories().list().await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Category> {
        self.db
            .categories()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", id.to_string()))
    }

    pub async fn children(&self, parent_id: i64) -> ServiceResult<Vec<Category>> {
        Ok(self.db.categories().children(parent_id).await?)
    }

    pub async fn top_level(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.db.categories().top_level().await?)
    }

    pub async fn find_by_name(&self, name: &str) -> ServiceResult<Option<Category>> {
        Ok(self.db.categories().find_by_name(name.trim()).await?)
    }

    pub async fn search(&self, keyword: &str) -> ServiceResult<Vec<Category>> {
        let keyword = validate_search_query(keyword)?;
        Ok(self.db.categories().search(&keyword).await?)
    }
}

// =============================================================================
// Suppliers
// =============================================================================

#[derive(Debug, Clone)]
pub struct SupplierDirectory {
    db: Arc<Database>,
}

impl SupplierDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        SupplierDirectory { db }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Supplier>> {
        Ok(self.db.suppliers().list().await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Supplier> {
        self.db
            .suppliers()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Supplier", id.to_string()))
    }

    pub async fn create(&self, input: NewSupplier) -> ServiceResult<Supplier> {
        validate_name("name", &input.name)?;
        let supplier = self.db.suppliers().create(&input).await?;
        info!(supplier_id = supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    /// Returns the supplier with this name, creating it when missing.
    pub async fn ensure(&self, name: &str) -> ServiceResult<Supplier> {
        validate_name("name", name)?;
        Ok(self.db.suppliers().ensure(name.trim()).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::ErrorKind;

    fn ibuprofen(approval_no: Option<&str>) -> NewMedicine {
        NewMedicine {
            generic_name: Some("Ibuprofen".to_string()),
            spec: Some("200mg x 20".to_string()),
            manufacturer: Some("Sunrise Health".to_string()),
            approval_no: approval_no.map(str::to_string),
            retail_price_cents: Some(890),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_dedups_by_approval_no() {
        let catalog = MedicineCatalog::new(testing::db().await);
        let first = catalog.create(ibuprofen(Some("H100"))).await.unwrap();
        assert!(first.created);

        let mut again = ibuprofen(Some("H100"));
        again.generic_name = Some("Different name".to_string());
        let second = catalog.create(again).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.medicine.medicine_id, first.medicine.medicine_id);
    }

    #[tokio::test]
    async fn test_create_dedups_by_group_key_without_approval_no() {
        let catalog = MedicineCatalog::new(testing::db().await);
        let first = catalog.create(ibuprofen(None)).await.unwrap();

        let mut same_product = ibuprofen(None);
        same_product.spec = Some(" 200MG  x 20 ".to_string());
        let second = catalog.create(same_product).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.medicine.medicine_id, first.medicine.medicine_id);

        let mut other_pack = ibuprofen(None);
        other_pack.spec = Some("400mg x 10".to_string());
        assert!(catalog.create(other_pack).await.unwrap().created);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_category() {
        let catalog = MedicineCatalog::new(testing::db().await);
        let mut input = ibuprofen(None);
        input.category_id = Some(99);
        let err = catalog.create(input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_search_pages() {
        let db = testing::db().await;
        let catalog = MedicineCatalog::new(db.clone());
        for i in 0..5 {
            testing::add_medicine(&db, &format!("M{i}"), &format!("Vitamin {i}"), 100).await;
        }

        let page = catalog.search("vitamin", None, 1, 2).await.unwrap();
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].medicine_id, "M2");

        assert_eq!(catalog.page(0, 10).await.unwrap().data.len(), 5);
        assert_eq!(catalog.get("nope").await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_categories_and_suppliers() {
        let db = testing::db().await;
        let categories = CategoryDirectory::new(db.clone());
        assert_eq!(categories.top_level().await.unwrap().len(), 4);
        assert_eq!(categories.get(9).await.unwrap_err().kind(), ErrorKind::NotFound);

        let suppliers = SupplierDirectory::new(db);
        let created = suppliers
            .create(NewSupplier {
                name: "North Pharma".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let err = suppliers
            .create(NewSupplier {
                name: "North Pharma".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(suppliers.ensure("North Pharma").await.unwrap().id, created.id);
    }
}
