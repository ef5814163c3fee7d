//! # Catalog Rules
//!
//! Medicine identity, deduplication and grouping.
//!
//! ## Deduplication
//! ```text
//! NewMedicine
//!      │
//!      ├── approval_no present? ──► same approval_no exists → return existing
//!      │
//!      └── otherwise ─────────────► same group_key exists   → return existing
//!                                   (generic | spec | manufacturer)
//! ```
//!
//! The same key drives the grouped "search with stock" view: rows that
//! differ only in case or spacing are shown as one medicine with their
//! stock summed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::Medicine;
use crate::validation::{validate_amount_cents, validate_name, ValidationResult};
use crate::DEFAULT_CATEGORY_ID;

/// Generic name given to manual entries that carry no name at all.
pub const MANUAL_ENTRY_NAME: &str = "Manual entry";

// =============================================================================
// Group Key
// =============================================================================

/// Normalizes one part of the key: trimmed, lowercased, inner whitespace
/// collapsed to a single space.
fn normalize_part(part: Option<&str>) -> String {
    part.unwrap_or("")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Builds the grouping key of a medicine from its generic name, spec and
/// manufacturer.
///
/// ## Example
/// ```rust
/// use pharmacy_core::catalog::group_key;
///
/// let a = group_key("Amoxicillin ", Some("0.25g*24"), Some("North  Pharma"));
/// let b = group_key("amoxicillin", Some(" 0.25G*24"), Some("north pharma"));
/// assert_eq!(a, b);
/// assert_eq!(a, "amoxicillin|0.25g*24|north pharma");
/// ```
pub fn group_key(generic_name: &str, spec: Option<&str>, manufacturer: Option<&str>) -> String {
    format!(
        "{}|{}|{}",
        normalize_part(Some(generic_name)),
        normalize_part(spec),
        normalize_part(manufacturer)
    )
}

// =============================================================================
// New Medicine
// =============================================================================

/// Input for creating a medicine. Everything is optional; defaults are
/// filled by [`NewMedicine::prepare`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMedicine {
    pub medicine_id: Option<String>,
    pub generic_name: Option<String>,
    pub trade_name: Option<String>,
    pub spec: Option<String>,
    pub manufacturer: Option<String>,
    pub approval_no: Option<String>,
    pub category_id: Option<i64>,
    pub unit: Option<String>,
    pub retail_price_cents: Option<i64>,
}

/// How a new medicine is matched against the existing catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupKey {
    ApprovalNo(String),
    GroupKey(String),
}

/// A validated medicine ready to insert, minus the generated identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMedicine {
    pub medicine_id: Option<String>,
    pub generic_name: String,
    pub trade_name: Option<String>,
    pub spec: Option<String>,
    pub manufacturer: Option<String>,
    /// `None` means the repository generates a `MANUAL-` number.
    pub approval_no: Option<String>,
    pub category_id: i64,
    pub unit: Option<String>,
    pub retail_price_cents: i64,
    pub group_key: String,
    pub dedup: DedupKey,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl NewMedicine {
    /// Applies creation defaults and validates.
    ///
    /// ## Defaults
    /// - `generic_name`: trade name, else [`MANUAL_ENTRY_NAME`]
    /// - `category_id`: [`DEFAULT_CATEGORY_ID`]
    /// - `retail_price_cents`: 0
    pub fn prepare(self) -> ValidationResult<PreparedMedicine> {
        let trade_name = non_blank(self.trade_name);
        let generic_name = non_blank(self.generic_name)
            .or_else(|| trade_name.clone())
            .unwrap_or_else(|| MANUAL_ENTRY_NAME.to_string());
        validate_name("generic_name", &generic_name)?;

        let retail_price_cents = self.retail_price_cents.unwrap_or(0);
        validate_amount_cents("retail_price", retail_price_cents)?;

        let category_id = self.category_id.unwrap_or(DEFAULT_CATEGORY_ID);
        if category_id <= 0 {
            return Err(ValidationError::must_be_positive("category_id"));
        }

        let spec = non_blank(self.spec);
        let manufacturer = non_blank(self.manufacturer);
        let approval_no = non_blank(self.approval_no);
        let key = group_key(&generic_name, spec.as_deref(), manufacturer.as_deref());

        let dedup = match &approval_no {
            Some(no) => DedupKey::ApprovalNo(no.clone()),
            None => DedupKey::GroupKey(key.clone()),
        };

        Ok(PreparedMedicine {
            medicine_id: non_blank(self.medicine_id),
            generic_name,
            trade_name,
            spec,
            manufacturer,
            approval_no,
            category_id,
            unit: non_blank(self.unit),
            retail_price_cents,
            group_key: key,
            dedup,
        })
    }
}

/// Formats the placeholder approval number given to manual entries.
pub fn manual_approval_no(now: DateTime<Utc>, suffix: u32) -> String {
    format!("MANUAL-{}{:03}", now.timestamp_millis(), suffix % 1000)
}

/// Formats a medicine id for manual entries.
pub fn manual_medicine_id(now: DateTime<Utc>, suffix: u32) -> String {
    format!("M{}{:03}", now.timestamp_millis(), suffix % 1000)
}

// =============================================================================
// Grouping With Stock
// =============================================================================

/// One row of the grouped catalog view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineStockGroup {
    /// Display row: the member with the lowest `medicine_id`.
    pub medicine: Medicine,
    /// Σ stock over every medicine in the group.
    pub total_stock: i64,
    /// Every medicine id in the group, ascending.
    pub medicine_ids: Vec<String>,
}

/// Groups `(medicine, stock)` rows by [`Medicine::group_key`].
///
/// Groups keep the order in which their first row appears. The
/// representative of a group is the row with the lowest `medicine_id`, so
/// the result does not depend on row order within a group.
pub fn group_with_stock<I>(rows: I) -> Vec<MedicineStockGroup>
where
    I: IntoIterator<Item = (Medicine, i64)>,
{
    let mut groups: Vec<MedicineStockGroup> = Vec::new();
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for (medicine, stock) in rows {
        match index.get(&medicine.group_key) {
            Some(&i) => {
                let group = &mut groups[i];
                group.total_stock += stock;
                group.medicine_ids.push(medicine.medicine_id.clone());
                if medicine.medicine_id < group.medicine.medicine_id {
                    group.medicine = medicine;
                }
            }
            None => {
                index.insert(medicine.group_key.clone(), groups.len());
                groups.push(MedicineStockGroup {
                    medicine_ids: vec![medicine.medicine_id.clone()],
                    medicine,
                    total_stock: stock,
                });
            }
        }
    }

    for group in &mut groups {
        group.medicine_ids.sort();
    }

    groups
}

// =============================================================================
// Unit Tests
// =============================================================================
