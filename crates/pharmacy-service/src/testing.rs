//! Fixtures shared by the workflow tests.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use pharmacy_core::catalog::NewMedicine;
use pharmacy_core::Medicine;
use pharmacy_db::repository::inventory::{self, BatchCredit};
use pharmacy_db::{Database, DbConfig};

pub async fn db() -> Arc<Database> {
    Arc::new(Database::new(DbConfig::in_memory()).await.unwrap())
}

pub async fn add_medicine(db: &Database, id: &str, name: &str, price_cents: i64) -> Medicine {
    let prepared = NewMedicine {
        medicine_id: Some(id.to_string()),
        generic_name: Some(name.to_string()),
        approval_no: Some(format!("H-{id}")),
        retail_price_cents: Some(price_cents),
        ..Default::default()
    }
    .prepare()
    .unwrap();
    db.medicines().insert(&prepared).await.unwrap()
}

pub async fn add_stock(
    db: &Database,
    medicine_id: &str,
    batch_number: &str,
    quantity: i64,
    expiry: Option<NaiveDate>,
    min_stock: i64,
) {
    let mut tx = db.begin().await.unwrap();
    inventory::credit_batch(
        &mut tx,
        &BatchCredit {
            medicine_id: medicine_id.to_string(),
            batch_number: batch_number.to_string(),
            quantity,
            unit_cost_cents: 0,
            production_date: None,
            expiry_date: expiry,
            supplier_id: None,
            min_stock: Some(min_stock),
        },
        &format!("TEST-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default()),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
}
