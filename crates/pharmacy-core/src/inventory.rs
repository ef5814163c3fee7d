//! # Inventory Rules
//!
//! Batch allocation and stock alert classification.
//!
//! ## FEFO Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order line: Amoxicillin × 12                                           │
//! │                                                                         │
//! │  Batches sorted by expiry (undated last):                               │
//! │    B-2401  exp 2025-03-01  qty 5   ──► take 5                           │
//! │    B-2405  exp 2025-09-01  qty 10  ──► take 7                           │
//! │    B-2410  (no expiry)     qty 40  ──► untouched                        │
//! │                                                                         │
//! │  Σ available < requested? → InsufficientStock, nothing allocated        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Alert Classification
//! ```text
//!   qty ≤ min          → CRITICAL
//!   qty ≤ 1.5 × min    → LOW
//!   otherwise          → NORMAL (not reported)
//!
//!   days to expiry ≤ 15 → high,  ≤ 30 → medium,  else → low
//! ```
//!
//! ## Alert Records
//! A scan turns the live low-stock and expiry lists into persisted
//! records, one per medicine and [`AlertType`], which stay until handled.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{AlertType, InventoryBatch};
use crate::validation::{validate_amount_cents, ValidationResult};
use crate::DEFAULT_BATCH_NUMBER;

// =============================================================================
// FEFO Allocation
// =============================================================================

/// Quantity to take from (or return to) one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub batch_id: String,
    pub quantity: i64,
}

/// FEFO ordering: earliest expiry first, undated batches last, then oldest
/// batch first.
fn fefo_order(a: &InventoryBatch, b: &InventoryBatch) -> Ordering {
    match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.created_at.cmp(&b.created_at))
    .then_with(|| a.id.cmp(&b.id))
}

/// Plans how to take `requested` units of a medicine out of its batches.
///
/// Pure: the caller applies the plan inside its transaction.
///
/// ## Errors
/// - `requested <= 0` → Validation
/// - Σ batch quantity < requested → [`CoreError::InsufficientStock`]
pub fn allocate_fefo(
    medicine_id: &str,
    batches: &[InventoryBatch],
    requested: i64,
) -> CoreResult<Vec<Allocation>> {
    if requested <= 0 {
        return Err(crate::ValidationError::must_be_positive("quantity").into());
    }

    let available: i64 = batches.iter().map(|b| b.quantity.max(0)).sum();
    if available < requested {
        return Err(CoreError::InsufficientStock {
            medicine_id: medicine_id.to_string(),
            available,
            requested,
        });
    }

    let mut ordered: Vec<&InventoryBatch> = batches.iter().filter(|b| b.quantity > 0).collect();
    ordered.sort_by(|a, b| fefo_order(a, b));

    let mut remaining = requested;
    let mut plan = Vec::new();
    for batch in ordered {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(batch.quantity);
        plan.push(Allocation {
            batch_id: batch.id.clone(),
            quantity: take,
        });
        remaining -= take;
    }

    Ok(plan)
}

/// Result of [`plan_restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePlan {
    /// Quantities to put back into the batches the order drew from.
    pub allocations: Vec<Allocation>,
    /// Quantity that could not be traced to a batch.
    pub untracked: i64,
}

/// Plans how to return `quantity` units for a refund.
///
/// `outstanding` lists, per batch, how much the order drew that has not
/// been returned yet. Returned quantities fill those batches in order; any
/// excess is reported as `untracked`.
pub fn plan_restore(outstanding: &[(String, i64)], quantity: i64) -> RestorePlan {
    let mut remaining = quantity.max(0);
    let mut allocations = Vec::new();

    for (batch_id, open) in outstanding {
        if remaining == 0 {
            break;
        }
        if *open <= 0 {
            continue;
        }
        let give = remaining.min(*open);
        allocations.push(Allocation {
            batch_id: batch_id.clone(),
            quantity: give,
        });
        remaining -= give;
    }

    RestorePlan {
        allocations,
        untracked: remaining,
    }
}

// =============================================================================
// Low-Stock Alerts
// =============================================================================

/// Severity of a low-stock alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Critical,
    Low,
}

/// Classifies aggregate stock against its minimum.
///
/// Returns `None` for NORMAL stock and when no minimum is configured.
/// The 1.5× bound is evaluated in integers (`2·qty ≤ 3·min`).
///
/// ## Example
/// ```rust
/// use pharmacy_core::inventory::{classify_low_stock, AlertLevel};
///
/// assert_eq!(classify_low_stock(10, 10), Some(AlertLevel::Critical));
/// assert_eq!(classify_low_stock(15, 10), Some(AlertLevel::Low));
/// assert_eq!(classify_low_stock(16, 10), None);
/// ```
pub fn classify_low_stock(quantity: i64, min_stock: i64) -> Option<AlertLevel> {
    if min_stock <= 0 {
        return None;
    }
    if quantity <= min_stock {
        Some(AlertLevel::Critical)
    } else if 2 * quantity <= 3 * min_stock {
        Some(AlertLevel::Low)
    } else {
        None
    }
}

/// Urgency used by both alert kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    High,
    Medium,
    Low,
}

/// Low-stock priority: high when at or below 10% of the minimum.
pub fn low_stock_priority(quantity: i64, min_stock: i64) -> AlertPriority {
    if 10 * quantity <= min_stock {
        AlertPriority::High
    } else {
        AlertPriority::Medium
    }
}

/// Aggregate stock of one medicine, as read for alerting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MedicineStockLevel {
    pub medicine_id: String,
    pub medicine_name: String,
    /// Σ batch quantities.
    pub quantity: i64,
    /// Largest min_stock over the batches; 0 when none is set.
    pub min_stock: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub medicine_id: String,
    pub medicine_name: String,
    pub quantity: i64,
    /// Effective minimum after applying the store-wide default.
    pub min_stock: i64,
    pub level: AlertLevel,
    pub priority: AlertPriority,
}

/// Builds low-stock alerts from aggregate levels.
///
/// Medicines without their own minimum use `default_threshold`. Result is
/// CRITICAL first, then by ascending quantity.
pub fn low_stock_alerts(levels: &[MedicineStockLevel], default_threshold: i64) -> Vec<LowStockAlert> {
    let mut alerts: Vec<LowStockAlert> = levels
        .iter()
        .filter_map(|level| {
            let min_stock = if level.min_stock > 0 {
                level.min_stock
            } else {
                default_threshold
            };
            classify_low_stock(level.quantity, min_stock).map(|alert_level| LowStockAlert {
                medicine_id: level.medicine_id.clone(),
                medicine_name: level.medicine_name.clone(),
                quantity: level.quantity,
                min_stock,
                level: alert_level,
                priority: low_stock_priority(level.quantity, min_stock),
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| a.quantity.cmp(&b.quantity))
            .then_with(|| a.medicine_id.cmp(&b.medicine_id))
    });
    alerts
}

// =============================================================================
// Expiry Alerts
// =============================================================================

/// Days from `today` until `expiry` (negative once expired).
pub fn days_to_expiry(expiry: NaiveDate, today: NaiveDate) -> i64 {
    (expiry - today).num_days()
}

/// Expiry priority: high ≤ 15 days, medium ≤ 30, else low.
pub fn expiry_priority(days: i64) -> AlertPriority {
    if days <= 15 {
        AlertPriority::High
    } else if days <= 30 {
        AlertPriority::Medium
    } else {
        AlertPriority::Low
    }
}

/// A non-empty batch with an expiry date, as read for alerting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DatedBatch {
    pub batch_id: String,
    pub medicine_id: String,
    pub medicine_name: String,
    pub batch_number: String,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryAlert {
    pub batch_id: String,
    pub medicine_id: String,
    pub medicine_name: String,
    pub batch_number: String,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
    pub days_to_expiry: i64,
    pub priority: AlertPriority,
}

/// Builds expiry alerts for batches expiring within `(0, within_days]`.
///
/// Sorted by expiry date ascending. Already-expired and empty batches are
/// excluded.
pub fn expiry_alerts(batches: &[DatedBatch], today: NaiveDate, within_days: i64) -> Vec<ExpiryAlert> {
    let mut alerts: Vec<ExpiryAlert> = batches
        .iter()
        .filter(|b| b.quantity > 0)
        .filter_map(|b| {
            let days = days_to_expiry(b.expiry_date, today);
            (days > 0 && days <= within_days).then(|| ExpiryAlert {
                batch_id: b.batch_id.clone(),
                medicine_id: b.medicine_id.clone(),
                medicine_name: b.medicine_name.clone(),
                batch_number: b.batch_number.clone(),
                quantity: b.quantity,
                expiry_date: b.expiry_date,
                days_to_expiry: days,
                priority: expiry_priority(days),
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then_with(|| a.batch_id.cmp(&b.batch_id))
    });
    alerts
}

// =============================================================================
// Out of Stock
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutOfStockEntry {
    pub medicine_id: String,
    pub medicine_name: String,
}

/// Medicines that have batches but nothing left in any of them.
pub fn out_of_stock(levels: &[MedicineStockLevel]) -> Vec<OutOfStockEntry> {
    levels
        .iter()
        .filter(|l| l.quantity == 0)
        .map(|l| OutOfStockEntry {
            medicine_id: l.medicine_id.clone(),
            medicine_name: l.medicine_name.clone(),
        })
        .collect()
}

/// The three alert lists shown together on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockAlerts {
    pub expiry: Vec<ExpiryAlert>,
    pub low_stock: Vec<LowStockAlert>,
    pub out_of_stock: Vec<OutOfStockEntry>,
    pub degraded: bool,
}

// =============================================================================
// Alert Records
// =============================================================================

/// Expiry window of an alert scan, in days.
pub const ALERT_EXPIRY_DAYS: i64 = 60;

/// An alert record about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockAlert {
    pub medicine_id: String,
    pub alert_type: AlertType,
    pub current_stock: i64,
    pub min_stock: Option<i64>,
    pub expiry_date: Option<NaiveDate>,
    pub message: String,
}

/// One candidate per medicine and type.
///
/// A medicine with several expiring batches is reported once, for the
/// batch that expires first (`expiring` is expected in expiry order).
pub fn alert_candidates(low_stock: &[LowStockAlert], expiring: &[ExpiryAlert]) -> Vec<NewStockAlert> {
    let mut candidates: Vec<NewStockAlert> = low_stock
        .iter()
        .map(|alert| NewStockAlert {
            medicine_id: alert.medicine_id.clone(),
            alert_type: AlertType::LowStock,
            current_stock: alert.quantity,
            min_stock: Some(alert.min_stock),
            expiry_date: None,
            message: format!(
                "{} stock {} is below the safety level {}",
                alert.medicine_name, alert.quantity, alert.min_stock
            ),
        })
        .collect();

    let mut seen = HashSet::new();
    for alert in expiring {
        if !seen.insert(alert.medicine_id.as_str()) {
            continue;
        }
        candidates.push(NewStockAlert {
            medicine_id: alert.medicine_id.clone(),
            alert_type: AlertType::NearExpiry,
            current_stock: alert.quantity,
            min_stock: None,
            expiry_date: Some(alert.expiry_date),
            message: format!(
                "{} batch {} expires on {}",
                alert.medicine_name, alert.batch_number, alert.expiry_date
            ),
        });
    }
    candidates
}

// =============================================================================
// Manual Batch Maintenance
// =============================================================================

/// A batch as submitted on the inventory screen, for create or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchDraft {
    pub medicine_id: String,
    pub batch_number: Option<String>,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub production_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub min_stock: i64,
    pub max_stock: Option<i64>,
    pub supplier_id: Option<i64>,
}

/// A draft after validation and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBatch {
    pub medicine_id: String,
    pub batch_number: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub production_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub min_stock: i64,
    pub max_stock: Option<i64>,
    pub supplier_id: Option<i64>,
}

fn not_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

impl BatchDraft {
    /// ## Rules
    /// - `medicine_id` required; blank batch number → `DEFAULT_BATCH`
    /// - quantity, cost and thresholds not negative (a batch may hold 0)
    /// - `max_stock ≥ min_stock`, expiry not before production
    pub fn prepare(&self) -> ValidationResult<PreparedBatch> {
        let medicine_id = self.medicine_id.trim();
        if medicine_id.is_empty() {
            return Err(ValidationError::required("medicine_id"));
        }
        not_negative("quantity", self.quantity)?;
        not_negative("min_stock", self.min_stock)?;
        validate_amount_cents("unit_cost", self.unit_cost_cents)?;

        if let Some(max) = self.max_stock {
            if max < self.min_stock {
                return Err(ValidationError::InvalidFormat {
                    field: "max_stock".to_string(),
                    reason: "must not be below min_stock".to_string(),
                });
            }
        }
        if let (Some(made), Some(expires)) = (self.production_date, self.expiry_date) {
            if expires < made {
                return Err(ValidationError::InvalidFormat {
                    field: "expiry_date".to_string(),
                    reason: "must not be before production_date".to_string(),
                });
            }
        }

        let batch_number = self
            .batch_number
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BATCH_NUMBER)
            .to_string();

        Ok(PreparedBatch {
            medicine_id: medicine_id.to_string(),
            batch_number,
            quantity: self.quantity,
            unit_cost_cents: self.unit_cost_cents,
            production_date: self.production_date,
            expiry_date: self.expiry_date,
            min_stock: self.min_stock,
            max_stock: self.max_stock,
            supplier_id: self.supplier_id,
        })
    }
}

/// Movement reference of a manual batch edit: `ADJ` + epoch millis.
pub fn adjustment_reference(now: DateTime<Utc>) -> String {
    format!("ADJ{}", now.timestamp_millis())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn batch(id: &str, qty: i64, expiry: Option<&str>, age_secs: i64) -> InventoryBatch {
        let created = Utc::now() - Duration::seconds(age_secs);
        InventoryBatch {
            id: id.to_string(),
            medicine_id: "M1".to_string(),
            batch_number: id.to_string(),
            quantity: qty,
            unit_cost_cents: 0,
            production_date: None,
            expiry_date: expiry.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            min_stock: 5,
            max_stock: None,
            supplier_id: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_fefo_takes_earliest_expiry_first() {
        let batches = vec![
            batch("late", 10, Some("2026-09-01"), 0),
            batch("undated", 40, None, 100),
            batch("early", 5, Some("2026-03-01"), 0),
        ];

        let plan = allocate_fefo("M1", &batches, 12).unwrap();
        assert_eq!(
            plan,
            vec![
                Allocation { batch_id: "early".into(), quantity: 5 },
                Allocation { batch_id: "late".into(), quantity: 7 },
            ]
        );
    }

    #[test]
    fn test_fefo_undated_batches_by_age() {
        let batches = vec![batch("new", 10, None, 0), batch("old", 10, None, 3600)];
        let plan = allocate_fefo("M1", &batches, 3).unwrap();
        assert_eq!(plan[0].batch_id, "old");
    }

    #[test]
    fn test_fefo_insufficient_is_all_or_nothing() {
        let batches = vec![batch("a", 2, Some("2026-01-01"), 0)];
        let err = allocate_fefo("M1", &batches, 5).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                medicine_id,
                available,
                requested,
            } => {
                assert_eq!(medicine_id, "M1");
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_fefo_rejects_non_positive_quantity() {
        assert!(matches!(
            allocate_fefo("M1", &[], 0),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_plan_restore_fills_drawn_batches_then_untracked() {
        let outstanding = vec![("a".to_string(), 3), ("b".to_string(), 0), ("c".to_string(), 4)];
        let plan = plan_restore(&outstanding, 9);
        assert_eq!(
            plan.allocations,
            vec![
                Allocation { batch_id: "a".into(), quantity: 3 },
                Allocation { batch_id: "c".into(), quantity: 4 },
            ]
        );
        assert_eq!(plan.untracked, 2);
    }

    #[test]
    fn test_low_stock_boundaries() {
        assert_eq!(classify_low_stock(10, 10), Some(AlertLevel::Critical));
        assert_eq!(classify_low_stock(14, 10), Some(AlertLevel::Low));
        assert_eq!(classify_low_stock(15, 10), Some(AlertLevel::Low));
        assert_eq!(classify_low_stock(16, 10), None);
        assert_eq!(classify_low_stock(0, 0), None);
    }

    #[test]
    fn test_low_stock_alerts_use_default_threshold_and_sort() {
        let levels = vec![
            MedicineStockLevel {
                medicine_id: "A".into(),
                medicine_name: "Aspirin".into(),
                quantity: 14,
                min_stock: 10,
            },
            MedicineStockLevel {
                medicine_id: "B".into(),
                medicine_name: "Berberine".into(),
                quantity: 1,
                min_stock: 0,
            },
            MedicineStockLevel {
                medicine_id: "C".into(),
                medicine_name: "Cetirizine".into(),
                quantity: 100,
                min_stock: 10,
            },
        ];

        let alerts = low_stock_alerts(&levels, 10);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].medicine_id, "B");
        assert_eq!(alerts[0].level, AlertLevel::Critical);
        assert_eq!(alerts[0].priority, AlertPriority::High);
        assert_eq!(alerts[0].min_stock, 10);
        assert_eq!(alerts[1].medicine_id, "A");
        assert_eq!(alerts[1].level, AlertLevel::Low);
        assert_eq!(alerts[1].priority, AlertPriority::Medium);
    }

    #[test]
    fn test_expiry_alerts_window_and_priority() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let dated = |id: &str, days: i64, qty: i64| DatedBatch {
            batch_id: id.into(),
            medicine_id: "M1".into(),
            medicine_name: "Amoxicillin".into(),
            batch_number: id.into(),
            quantity: qty,
            expiry_date: today + Duration::days(days),
        };
        let batches = vec![
            dated("d40", 40, 5),
            dated("d10", 10, 5),
            dated("d0", 0, 5),
            dated("d61", 61, 5),
            dated("d20-empty", 20, 0),
            dated("d30", 30, 5),
        ];

        let alerts = expiry_alerts(&batches, today, 60);
        let ids: Vec<&str> = alerts.iter().map(|a| a.batch_id.as_str()).collect();
        assert_eq!(ids, vec!["d10", "d30", "d40"]);
        assert_eq!(alerts[0].priority, AlertPriority::High);
        assert_eq!(alerts[1].priority, AlertPriority::Medium);
        assert_eq!(alerts[2].priority, AlertPriority::Low);
    }

    #[test]
    fn test_out_of_stock() {
        let levels = vec![
            MedicineStockLevel {
                medicine_id: "A".into(),
                medicine_name: "Aspirin".into(),
                quantity: 0,
                min_stock: 5,
            },
            MedicineStockLevel {
                medicine_id: "B".into(),
                medicine_name: "Berberine".into(),
                quantity: 3,
                min_stock: 5,
            },
        ];
        let empty = out_of_stock(&levels);
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].medicine_id, "A");
    }

    #[test]
    fn test_alert_candidates_one_per_medicine_and_type() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let dated = |id: &str, medicine: &str, days: i64| DatedBatch {
            batch_id: id.into(),
            medicine_id: medicine.into(),
            medicine_name: medicine.into(),
            batch_number: id.into(),
            quantity: 5,
            expiry_date: today + Duration::days(days),
        };
        let expiring = expiry_alerts(
            &[dated("late", "M1", 50), dated("early", "M1", 10), dated("other", "M2", 20)],
            today,
            ALERT_EXPIRY_DAYS,
        );
        let low = low_stock_alerts(
            &[MedicineStockLevel {
                medicine_id: "M1".into(),
                medicine_name: "Aspirin".into(),
                quantity: 2,
                min_stock: 10,
            }],
            10,
        );

        let candidates = alert_candidates(&low, &expiring);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].alert_type, AlertType::LowStock);
        assert_eq!(candidates[0].min_stock, Some(10));
        assert_eq!(candidates[0].current_stock, 2);

        let m1_expiry = candidates
            .iter()
            .find(|c| c.medicine_id == "M1" && c.alert_type == AlertType::NearExpiry)
            .unwrap();
        assert_eq!(m1_expiry.expiry_date, Some(today + Duration::days(10)));
        assert!(m1_expiry.message.contains("early"));
    }

    #[test]
    fn test_batch_draft_defaults_and_rules() {
        let draft = BatchDraft {
            medicine_id: " M1 ".into(),
            batch_number: Some("  ".into()),
            quantity: 0,
            ..Default::default()
        };
        let prepared = draft.prepare().unwrap();
        assert_eq!(prepared.medicine_id, "M1");
        assert_eq!(prepared.batch_number, DEFAULT_BATCH_NUMBER);

        let missing = BatchDraft::default();
        assert!(matches!(missing.prepare(), Err(ValidationError::Required { .. })));

        let negative = BatchDraft {
            quantity: -1,
            ..draft.clone()
        };
        assert!(matches!(
            negative.prepare(),
            Err(ValidationError::MustNotBeNegative { .. })
        ));

        let inverted = BatchDraft {
            min_stock: 10,
            max_stock: Some(5),
            ..draft.clone()
        };
        assert!(matches!(inverted.prepare(), Err(ValidationError::InvalidFormat { .. })));

        let backwards = BatchDraft {
            production_date: NaiveDate::from_ymd_opt(2026, 6, 1),
            expiry_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            ..draft
        };
        assert!(matches!(backwards.prepare(), Err(ValidationError::InvalidFormat { .. })));
    }

    #[test]
    fn test_adjustment_reference() {
        let now = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(adjustment_reference(now), "ADJ1700000000123");
    }
}
