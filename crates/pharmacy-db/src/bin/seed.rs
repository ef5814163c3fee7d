//! # Seed Data Generator
//!
//! Populates the database with a development catalog.
//!
//! ## Usage
//! ```bash
//! # Seed ./pharmacy_dev.db
//! cargo run -p pharmacy-db --bin seed
//!
//! # Specify database path
//! cargo run -p pharmacy-db --bin seed -- --db ./data/pharmacy.db
//! ```
//!
//! ## Generated Data
//! - One supplier
//! - Medicines across the seeded categories, each in a few pack sizes
//! - Two batches per medicine with staggered expiry dates, some of them
//!   close enough to show up as expiry alerts
//! - A handful of members, one of them VIP

use chrono::{Days, Utc};
use std::env;

use pharmacy_core::catalog::NewMedicine;
use pharmacy_core::Member;
use pharmacy_db::repository::inventory::{self, BatchCredit};
use pharmacy_db::{Database, DbConfig};

/// (category_id, generic name, manufacturer, base price in cents)
const MEDICINES: &[(i64, &str, &str, i64)] = &[
    (1, "Amoxicillin Capsules", "North Pharma", 1850),
    (1, "Cefuroxime Tablets", "North Pharma", 3200),
    (1, "Metformin Tablets", "Harbor Labs", 1200),
    (1, "Amlodipine Tablets", "Harbor Labs", 1590),
    (2, "Ibuprofen Tablets", "Sunrise Health", 890),
    (2, "Paracetamol Tablets", "Sunrise Health", 650),
    (2, "Loratadine Tablets", "Harbor Labs", 1420),
    (2, "Cough Syrup", "Sunrise Health", 1100),
    (3, "Vitamin C Tablets", "Green Leaf", 2500),
    (3, "Calcium Tablets", "Green Leaf", 3800),
    (4, "Digital Thermometer", "MediTools", 4500),
    (4, "Blood Pressure Monitor", "MediTools", 19900),
];

/// Pack sizes and their price multiplier in percent.
const SPECS: &[(&str, i64)] = &[("10 tablets", 100), ("20 tablets", 180), ("50 tablets", 400)];

const MEMBERS: &[(&str, &str, i64, i64)] = &[
    ("Li Wei", "13800000001", 1, 120),
    ("Zhang Min", "13800000002", 2, 40),
    ("Wang Fang", "13800000003", 3, 560),
    ("Chen Jie", "13800000004", 1, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./pharmacy_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Pharmacy Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./pharmacy_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Pharmacy Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.medicines().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} medicines", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let supplier = db.suppliers().ensure("North Pharma Distribution").await?;
    println!("✓ Supplier: {}", supplier.name);

    println!();
    println!("Generating medicines...");
    let start = std::time::Instant::now();
    let today = Utc::now().date_naive();
    let mut generated = 0usize;

    for (idx, (category_id, name, manufacturer, base_price)) in MEDICINES.iter().enumerate() {
        for (spec_idx, (spec, multiplier)) in SPECS.iter().enumerate() {
            let seed = idx * 10 + spec_idx;
            let prepared = NewMedicine {
                medicine_id: Some(format!("MED{:04}", seed)),
                generic_name: Some(name.to_string()),
                spec: Some(spec.to_string()),
                manufacturer: Some(manufacturer.to_string()),
                approval_no: Some(format!("H2026{:04}", seed)),
                category_id: Some(*category_id),
                unit: Some("box".to_string()),
                retail_price_cents: Some(base_price * multiplier / 100),
                ..Default::default()
            }
            .prepare()?;

            let medicine = match db.medicines().insert(&prepared).await {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", name, e);
                    continue;
                }
            };

            // Early batch expires within weeks for some medicines so the
            // dashboard has alerts to show.
            let batches = [
                ("B-EARLY", (seed % 40) as i64, 10 + (seed % 80) as u64),
                ("B-LATE", 20 + (seed % 60) as i64, 400 + (seed % 200) as u64),
            ];

            let mut tx = db.begin().await?;
            for (batch_number, quantity, days) in batches {
                inventory::credit_batch(
                    &mut tx,
                    &BatchCredit {
                        medicine_id: medicine.medicine_id.clone(),
                        batch_number: batch_number.to_string(),
                        quantity,
                        unit_cost_cents: medicine.retail_price_cents * 6 / 10,
                        production_date: today.checked_sub_days(Days::new(180)),
                        expiry_date: today.checked_add_days(Days::new(days)),
                        supplier_id: Some(supplier.id),
                        min_stock: Some(10),
                    },
                    "SEED",
                )
                .await?;
            }
            tx.commit().await?;

            generated += 1;
        }
    }

    println!("✓ Generated {} medicines in {:?}", generated, start.elapsed());

    println!();
    println!("Generating members...");
    let now = Utc::now();
    for (idx, (name, phone, level, points)) in MEMBERS.iter().enumerate() {
        db.members()
            .insert(&Member {
                member_id: format!("M{:05}", idx + 1),
                name: name.to_string(),
                phone: phone.to_string(),
                card_no: Some(format!("CARD{:04}", idx + 1)),
                points: *points,
                level: *level,
                create_time: now,
                remark: None,
            })
            .await?;
    }
    println!("✓ Generated {} members", MEMBERS.len());

    println!();
    let (_, total) = db.medicines().search("tablets", None, 0, 10).await?;
    println!("  Search 'tablets': {} results", total);
    let levels = db.inventory().stock_levels().await?;
    println!("  Medicines in stock: {}", levels.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
