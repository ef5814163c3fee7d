//! # Domain Errors
//!
//! ```text
//! ValidationError ──► CoreError ──► ServiceError ──► AppError ──► client
//!   (bad input)        (rules)     DbError ─┘
//! ```
//!
//! Variants carry the ids and statuses a cashier needs to see; the
//! service layer folds them into its coarse error kinds.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// A business rule refused the operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Medicine cannot be found.
    ///
    /// ## When This Occurs
    /// - Order line references an unknown medicine id
    /// - Stock-in line references an unknown medicine id
    #[error("Medicine not found: {0}")]
    MedicineNotFound(String),

    /// Aggregate stock is lower than the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Order line (M1, qty: 5)
    ///      │
    ///      ▼
    /// Σ batches of M1 = 2
    ///      │
    ///      ▼
    /// InsufficientStock { medicine_id: "M1", available: 2, requested: 5 }
    ///      │
    ///      ▼
    /// Cashier sees: "Insufficient stock for M1: available 2, requested 5"
    /// ```
    #[error("Insufficient stock for {medicine_id}: available {available}, requested {requested}")]
    InsufficientStock {
        medicine_id: String,
        available: i64,
        requested: i64,
    },

    /// Order is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Refunding an order that is still pending
    /// - Refunding an order twice
    #[error("Order {order_id} is {current_status}, cannot perform operation")]
    InvalidOrderStatus {
        order_id: String,
        current_status: String,
    },

    /// Stock-in document is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Approving a cancelled document
    /// - Editing an approved document
    #[error("Stock-in {stock_in_no} is {current_status}, cannot perform operation")]
    InvalidStockInStatus {
        stock_in_no: String,
        current_status: String,
    },

    /// Order amounts do not add up.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Member does not hold enough points.
    #[error("Member {member_id} has {balance} points, cannot use {requested}")]
    InsufficientPoints {
        member_id: String,
        balance: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input rejected before any rule or query runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., malformed phone, inverted date range).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::MustBePositive`].
    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            medicine_id: "M1".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for M1: available 2, requested 5"
        );

        let err = CoreError::InvalidOrderStatus {
            order_id: "O20240101120000ab12".to_string(),
            current_status: "refunded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Order O20240101120000ab12 is refunded, cannot perform operation"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("phone").to_string(), "phone is required");
        assert_eq!(
            ValidationError::must_be_positive("quantity").to_string(),
            "quantity must be positive"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("medicine_id").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
