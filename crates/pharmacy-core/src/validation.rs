//! # Validation Module
//!
//! Input validation for catalog entries, orders, stock-in documents and
//! members.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractors (axum)                                       │
//! │  └── Type validation (JSON / query deserialization)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Workflows (pharmacy-service)                                 │
//! │  └── THIS MODULE: field rules before any storage access                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0), CHECK (points >= 0)                        │
//! │  ├── UNIQUE (approval_no), UNIQUE (phone)                              │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pharmacy_core::validation::{validate_phone, validate_quantity};
//!
//! assert!(validate_quantity(3).is_ok());
//! assert!(validate_phone("13800138000").is_ok());
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::{MAX_AMOUNT_CENTS, MAX_LINE_QUANTITY, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest page size the listing endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required display name (medicine generic name, member name,
/// supplier name).
///
/// ## Rules
/// - Must not be blank
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a member phone number.
///
/// ## Rules
/// - Must not be blank
/// - 5 to 20 characters of digits, `+`, `-` or spaces
///
/// ## Example
/// ```rust
/// use pharmacy_core::validation::validate_phone;
///
/// assert!(validate_phone("+86 138-0013-8000").is_ok());
/// assert!(validate_phone("").is_err());
/// assert!(validate_phone("call me").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::required("phone"));
    }

    let len = phone.chars().count();
    if !(5..=20).contains(&len) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be 5 to 20 characters".to_string(),
        });
    }

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ')
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, '+', '-' and spaces".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query and returns it trimmed.
///
/// ## Rules
/// - Can be empty (callers decide what an empty search means)
/// - Maximum 100 characters
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "keyword".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
///
/// ## User Workflow
/// ```text
/// Cashier scans Amoxicillin, enters quantity 3
///      │
///      ▼
/// validate_quantity(3) ← THIS FUNCTION
///      │
///      ├── qty <= 0?     → "quantity must be positive"
///      ├── qty > 9999?   → "quantity must be between 1 and 9999"
///      └── OK            → stock check
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or amount in cents.
///
/// ## Rules
/// - Zero is allowed, negatives are not
/// - Must not exceed [`MAX_AMOUNT_CENTS`]
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a points amount for add/use operations.
pub fn validate_points(points: i64) -> ValidationResult<()> {
    if points <= 0 {
        return Err(ValidationError::must_be_positive("points"));
    }

    Ok(())
}

/// Validates a member level (1 and up).
pub fn validate_level(level: i64) -> ValidationResult<()> {
    if !(1..=10).contains(&level) {
        return Err(ValidationError::OutOfRange {
            field: "level".to_string(),
            min: 1,
            max: 10,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines of an order.
///
/// ## Rules
/// - At least one line
/// - At most [`MAX_ORDER_LINES`]
pub fn validate_order_lines(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::required("items"));
    }

    if count > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    Ok(())
}

/// Validates a page request and returns the effective `(page, size)`.
///
/// Pages are zero-based. A size of 0 is rejected; sizes above
/// [`MAX_PAGE_SIZE`] are clamped.
pub fn validate_page(page: u32, size: u32) -> ValidationResult<(u32, u32)> {
    if size == 0 {
        return Err(ValidationError::must_be_positive("size"));
    }

    Ok((page, size.min(MAX_PAGE_SIZE)))
}

/// Validates that a time range is not inverted.
pub fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> ValidationResult<()> {
    if start > end {
        return Err(ValidationError::InvalidFormat {
            field: "range".to_string(),
            reason: "start must not be after end".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("generic_name", "Amoxicillin").is_ok());
        assert!(validate_name("generic_name", "   ").is_err());
        assert!(validate_name("generic_name", &"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("13800138000").is_ok());
        assert!(validate_phone("555-0100").is_ok());

        assert!(validate_phone("").is_err());
        assert!(validate_phone("123").is_err());
        assert!(validate_phone("phone-number").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_amount_cents() {
        assert!(validate_amount_cents("discount", 0).is_ok());
        assert!(validate_amount_cents("discount", 1099).is_ok());
        assert!(validate_amount_cents("discount", -100).is_err());
        assert!(validate_amount_cents("unit_price", MAX_AMOUNT_CENTS).is_ok());
        assert!(matches!(
            validate_amount_cents("unit_price", i64::MAX / 1000),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_order_lines() {
        assert!(validate_order_lines(1).is_ok());
        assert!(validate_order_lines(0).is_err());
        assert!(validate_order_lines(MAX_ORDER_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_page_clamps_size() {
        assert_eq!(validate_page(2, 10).unwrap(), (2, 10));
        assert_eq!(validate_page(0, 10_000).unwrap(), (0, MAX_PAGE_SIZE));
        assert!(validate_page(0, 0).is_err());
    }

    #[test]
    fn test_validate_range() {
        let now = Utc::now();
        assert!(validate_range(now - Duration::days(1), now).is_ok());
        assert!(validate_range(now, now - Duration::days(1)).is_err());
    }

    #[test]
    fn test_search_query_trimmed() {
        assert_eq!(validate_search_query("  aspirin ").unwrap(), "aspirin");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }
}
