//! # Service Error Types
//!
//! The coarse error kinds every workflow reports.
//!
//! ## Error Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Source                                   → ServiceError               │
//! │  ─────────────────────────────────────────────────────────────────────  │
//! │  ValidationError / InvalidAmount / ...    → Validation                 │
//! │  CoreError::MedicineNotFound              → NotFound                   │
//! │  CoreError::InsufficientStock             → InsufficientStock          │
//! │  CoreError::Invalid*Status                → InvalidState               │
//! │  DbError::NotFound                        → NotFound                   │
//! │  DbError::UniqueViolation                 → Conflict                   │
//! │  DbError::Domain(core)                    → (as CoreError above)       │
//! │  everything else from storage             → Internal                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use pharmacy_core::{CoreError, ValidationError};
use pharmacy_db::DbError;

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error kind, independent of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientStock,
    InvalidState,
    Conflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input was rejected before anything was written.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Aggregate stock does not cover the request.
    #[error("Insufficient stock for {medicine_id}: available {available}, requested {requested}")]
    InsufficientStock {
        medicine_id: String,
        available: i64,
        requested: i64,
    },

    /// The entity's current status does not allow the operation.
    ///
    /// ## When This Occurs
    /// - Refunding an order that is already refunded
    /// - Approving a cancelled stock-in
    #[error("{entity} {id} is {status}, cannot perform operation")]
    InvalidState {
        entity: String,
        id: String,
        status: String,
    },

    /// A uniqueness rule was violated (phone, approval number, ...).
    #[error("{0}")]
    Conflict(String),

    /// Storage or other unexpected failure. The message is for logs.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            ServiceError::InvalidState { .. } => ErrorKind::InvalidState,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MedicineNotFound(id) => ServiceError::not_found("Medicine", id),
            CoreError::InsufficientStock {
                medicine_id,
                available,
                requested,
            } => ServiceError::InsufficientStock {
                medicine_id,
                available,
                requested,
            },
            CoreError::InvalidOrderStatus {
                order_id,
                current_status,
            } => ServiceError::InvalidState {
                entity: "Order".to_string(),
                id: order_id,
                status: current_status,
            },
            CoreError::InvalidStockInStatus {
                stock_in_no,
                current_status,
            } => ServiceError::InvalidState {
                entity: "Stock-in".to_string(),
                id: stock_in_no,
                status: current_status,
            },
            CoreError::Validation(e) => e.into(),
            other @ (CoreError::InvalidAmount { .. }
            | CoreError::InsufficientPoints { .. }) => ServiceError::Validation(other.to_string()),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            dup @ DbError::UniqueViolation { .. } => ServiceError::Conflict(dup.to_string()),
            DbError::Domain(core) => core.into(),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}
