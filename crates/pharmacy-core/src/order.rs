//! # Order Rules
//!
//! Pricing of an order request and the identifiers of orders and refunds.
//!
//! ## Amounts
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines:    Σ quantity × unit_price            = total                  │
//! │  original: caller override, else total                                 │
//! │  discount: caller override, else 0            (must be ≤ original)     │
//! │  actual:   caller override, else original − discount  (must be ≥ 0)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{validate_amount_cents, validate_order_lines, validate_quantity};

/// Suffix appended to an order id to form its refund reference.
pub const REFUND_SUFFIX: &str = "_REFUND";

// =============================================================================
// Request
// =============================================================================

/// One requested line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub medicine_id: String,
    pub quantity: i64,
    /// Selling price; the medicine's retail price when absent.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
}

/// A request to place an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderRequest {
    pub member_id: Option<String>,
    pub customer_name: Option<String>,
    pub items: Vec<OrderLineRequest>,
    /// Free-form; unknown values mean cash.
    pub payment_type: Option<String>,
    pub original_amount_cents: Option<i64>,
    pub discount_amount_cents: Option<i64>,
    pub actual_payment_cents: Option<i64>,
    pub used_points: Option<i64>,
    pub cashier_id: Option<i64>,
}

impl OrderRequest {
    /// Member id trimmed, blank treated as absent.
    pub fn member_id(&self) -> Option<String> {
        self.member_id
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }

    /// Checks the shape of the request before any lookup.
    pub fn validate(&self) -> CoreResult<()> {
        validate_order_lines(self.items.len())?;
        for line in &self.items {
            if line.medicine_id.trim().is_empty() {
                return Err(ValidationError::required("medicine_id").into());
            }
            validate_quantity(line.quantity)?;
            if let Some(price) = line.unit_price_cents {
                validate_amount_cents("unit_price", price)?;
            }
        }
        if matches!(self.used_points, Some(p) if p < 0) {
            return Err(ValidationError::MustNotBeNegative {
                field: "used_points".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// A line with its price resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub medicine_id: String,
    pub medicine_name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl PricedLine {
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    #[inline]
    pub fn checked_subtotal(&self) -> Option<Money> {
        self.unit_price.checked_multiply_quantity(self.quantity)
    }
}

/// Computed header amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub total: Money,
    pub original: Money,
    pub discount: Money,
    pub actual: Money,
}

/// Computes the header amounts of an order.
///
/// ## Errors
/// - an override is negative or above the amount ceiling
/// - the line total does not fit in an `i64`
/// - `discount > original`
/// - `actual < 0`
pub fn compute_totals(
    lines: &[PricedLine],
    original_override: Option<i64>,
    discount_override: Option<i64>,
    actual_override: Option<i64>,
) -> CoreResult<OrderTotals> {
    let total = lines
        .iter()
        .try_fold(Money::default(), |acc, line| {
            acc.checked_add(line.checked_subtotal()?)
        })
        .ok_or_else(|| CoreError::InvalidAmount {
            reason: "order total is too large".to_string(),
        })?;

    if let Some(v) = original_override {
        validate_amount_cents("original_amount", v)?;
    }
    if let Some(v) = discount_override {
        validate_amount_cents("discount_amount", v)?;
    }

    let original = original_override.map(Money::from_cents).unwrap_or(total);
    let discount = discount_override.map(Money::from_cents).unwrap_or_default();

    if discount > original {
        return Err(CoreError::InvalidAmount {
            reason: format!("discount {discount} exceeds original amount {original}"),
        });
    }

    let actual = actual_override
        .map(Money::from_cents)
        .unwrap_or(original - discount);

    if actual.is_negative() {
        return Err(CoreError::InvalidAmount {
            reason: format!("actual payment {actual} is negative"),
        });
    }

    Ok(OrderTotals {
        total,
        original,
        discount,
        actual,
    })
}

// =============================================================================
// Identifiers
// =============================================================================

/// Formats an order id: `O` + `yyyyMMddHHmmss` + 4 hex chars.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use pharmacy_core::order::order_id;
///
/// let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
/// assert_eq!(order_id(now, 0xbeef), "O20260314092653beef");
/// ```
pub fn order_id(now: DateTime<Utc>, suffix: u16) -> String {
    format!("O{}{:04x}", now.format("%Y%m%d%H%M%S"), suffix)
}

/// Movement reference used when restoring stock for a refunded order.
pub fn refund_reference(order_id: &str) -> String {
    format!("{order_id}{REFUND_SUFFIX}")
}

// =============================================================================
// Date Ranges
// =============================================================================

/// Converts an inclusive date range into a half-open UTC instant range
/// `[start 00:00, end + 1 day 00:00)`.
pub fn day_range(start: NaiveDate, end: NaiveDate) -> CoreResult<(DateTime<Utc>, DateTime<Utc>)> {
    if start > end {
        return Err(ValidationError::InvalidFormat {
            field: "range".to_string(),
            reason: "start must not be after end".to_string(),
        }
        .into());
    }
    let from = start.and_time(NaiveTime::MIN).and_utc();
    let to = end
        .checked_add_days(Days::new(1))
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "end".to_string(),
            reason: "date out of range".to_string(),
        })?
        .and_time(NaiveTime::MIN)
        .and_utc();
    Ok((from, to))
}

/// Summary of paid orders over a date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_sales_cents: i64,
    pub order_count: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn line(qty: i64, price: i64) -> PricedLine {
        PricedLine {
            medicine_id: "M1".to_string(),
            medicine_name: "Amoxicillin".to_string(),
            quantity: qty,
            unit_price: Money::from_cents(price),
        }
    }

    #[test]
    fn test_totals_without_overrides() {
        let totals = compute_totals(&[line(3, 1000), line(1, 250)], None, None, None).unwrap();
        assert_eq!(totals.total.cents(), 3250);
        assert_eq!(totals.original.cents(), 3250);
        assert_eq!(totals.discount.cents(), 0);
        assert_eq!(totals.actual.cents(), 3250);
    }

    #[test]
    fn test_totals_with_discount() {
        let totals = compute_totals(&[line(3, 1000)], None, Some(500), None).unwrap();
        assert_eq!(totals.original.cents(), 3000);
        assert_eq!(totals.actual.cents(), 2500);
    }

    #[test]
    fn test_totals_explicit_actual_wins() {
        let totals = compute_totals(&[line(3, 1000)], Some(3200), Some(200), Some(2999)).unwrap();
        assert_eq!(totals.total.cents(), 3000);
        assert_eq!(totals.original.cents(), 3200);
        assert_eq!(totals.actual.cents(), 2999);
    }

    #[test]
    fn test_discount_above_original_rejected() {
        let err = compute_totals(&[line(1, 1000)], None, Some(1001), None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));
    }

    #[test]
    fn test_negative_actual_rejected() {
        let err = compute_totals(&[line(1, 1000)], None, None, Some(-1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));
    }

    #[test]
    fn test_overflowing_total_rejected() {
        let err = compute_totals(&[line(3, i64::MAX / 2)], None, None, None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));

        let err = compute_totals(&[line(1, i64::MAX), line(1, 1)], None, None, None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));
    }

    #[test]
    fn test_oversized_unit_price_rejected() {
        let request = OrderRequest {
            items: vec![OrderLineRequest {
                medicine_id: "M1".to_string(),
                quantity: 3,
                unit_price_cents: Some(i64::MAX / 2),
            }],
            ..Default::default()
        };
        assert!(matches!(
            request.validate(),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_request_validation() {
        let mut request = OrderRequest::default();
        assert!(request.validate().is_err());

        request.items.push(OrderLineRequest {
            medicine_id: "M1".to_string(),
            quantity: 0,
            unit_price_cents: None,
        });
        assert!(request.validate().is_err());

        request.items[0].quantity = 2;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_member_id_blank_is_none() {
        let request = OrderRequest {
            member_id: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(request.member_id(), None);
    }

    #[test]
    fn test_identifiers() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(order_id(now, 0x00a1), "O2026010203040500a1");
        assert_eq!(refund_reference("O1"), "O1_REFUND");
    }

    #[test]
    fn test_day_range_is_half_open() {
        let d = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let (from, to) = day_range(d, d).unwrap();
        assert_eq!(to - from, chrono::Duration::days(1));
        assert!(day_range(d, d - Days::new(1)).is_err());
    }
}
