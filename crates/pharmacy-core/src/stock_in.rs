//! # Stock-In Rules
//!
//! Receiving document drafts and their defaults.
//!
//! ```text
//! StockInDraft ──prepare()──► PreparedStockIn
//!   items[].batch_number  absent → DEFAULT_BATCH
//!   stock_in_date         absent → now
//!   total_amount          Σ quantity × unit_price
//!   stock_in_no           absent → SI + epoch millis + 3 digits
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{validate_amount_cents, validate_quantity, ValidationResult};
use crate::DEFAULT_BATCH_NUMBER;

/// One received line as submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockInLineDraft {
    pub medicine_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub batch_number: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub remark: Option<String>,
}

/// A receiving document as submitted for create or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockInDraft {
    pub stock_in_no: Option<String>,
    pub supplier_id: Option<i64>,
    pub stock_in_date: Option<DateTime<Utc>>,
    pub remark: Option<String>,
    pub items: Vec<StockInLineDraft>,
}

/// A line after defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedLine {
    pub medicine_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub batch_number: String,
    pub production_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub remark: Option<String>,
}

/// A document after defaults. The number and supplier are resolved by the
/// caller since they need storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStockIn {
    pub stock_in_date: DateTime<Utc>,
    pub remark: Option<String>,
    pub total_amount: Money,
    pub items: Vec<PreparedLine>,
}

impl StockInDraft {
    /// Validates the lines and fills defaults.
    pub fn prepare(&self, now: DateTime<Utc>) -> ValidationResult<PreparedStockIn> {
        if self.items.is_empty() {
            return Err(ValidationError::required("items"));
        }

        let mut items = Vec::with_capacity(self.items.len());
        for line in &self.items {
            let medicine_id = line.medicine_id.trim();
            if medicine_id.is_empty() {
                return Err(ValidationError::required("medicine_id"));
            }
            validate_quantity(line.quantity)?;
            validate_amount_cents("unit_price", line.unit_price_cents)?;
            if let (Some(made), Some(expires)) = (line.production_date, line.expiry_date) {
                if expires < made {
                    return Err(ValidationError::InvalidFormat {
                        field: "expiry_date".to_string(),
                        reason: "must not be before production_date".to_string(),
                    });
                }
            }

            let batch_number = line
                .batch_number
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .unwrap_or(DEFAULT_BATCH_NUMBER)
                .to_string();

            items.push(PreparedLine {
                medicine_id: medicine_id.to_string(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                batch_number,
                production_date: line.production_date,
                expiry_date: line.expiry_date,
                remark: line.remark.clone(),
            });
        }

        let total_amount = items
            .iter()
            .try_fold(Money::default(), |acc, i| {
                let line_total =
                    Money::from_cents(i.unit_price_cents).checked_multiply_quantity(i.quantity)?;
                acc.checked_add(line_total)
            })
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "total_amount".to_string(),
                min: 0,
                max: i64::MAX,
            })?;

        Ok(PreparedStockIn {
            stock_in_date: self.stock_in_date.unwrap_or(now),
            remark: self.remark.clone(),
            total_amount,
            items,
        })
    }

    /// Supplied document number, trimmed; `None` when one must be generated.
    pub fn stock_in_no(&self) -> Option<String> {
        self.stock_in_no
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

/// Formats a stock-in document number: `SI` + millis + 3-digit suffix.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use pharmacy_core::stock_in::stock_in_no;
///
/// let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
/// assert_eq!(stock_in_no(now, 7), "SI1700000000123007");
/// ```
pub fn stock_in_no(now: DateTime<Utc>, suffix: u32) -> String {
    format!("SI{}{:03}", now.timestamp_millis(), suffix % 1000)
}
