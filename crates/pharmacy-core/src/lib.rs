//! # pharmacy-core: Pure Business Logic for the Pharmacy Backend
//!
//! This crate holds the domain rules of the pharmacy backend as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Pharmacy Backend Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/pharmacy-api (axum)                     │   │
//! │  │   /api/orders  /api/stock-ins  /api/members  /api/dashboard    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  pharmacy-service (workflows)                   │   │
//! │  │   InventoryLedger, OrderWorkflow, StockInWorkflow, Dashboard    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ pharmacy-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌─────────┐ ┌───────┐  │   │
//! │  │   │  types  │ │  money  │ │ inventory │ │ catalog │ │ order │  │   │
//! │  │   │Medicine │ │  Money  │ │   FEFO    │ │groupKey │ │totals │  │   │
//! │  │   │ Order   │ │         │ │  alerts   │ │ dedup   │ │  ids  │  │   │
//! │  │   └─────────┘ └─────────┘ └───────────┘ └─────────┘ └───────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO CLOCK                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  pharmacy-db (Database Layer)                   │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Medicine, InventoryBatch, Order, StockIn, Member, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//! - [`catalog`] - Medicine grouping key and creation defaults
//! - [`inventory`] - FEFO allocation and stock alert classification
//! - [`order`] - Order totals and business id generation
//! - [`dashboard`] - Sales trend bucketing and change percentages
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic. Time is passed in, never read.
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use pharmacy_core::inventory::{classify_low_stock, AlertLevel};
//! use pharmacy_core::money::Money;
//!
//! let line = Money::from_cents(1000) * 3;
//! assert_eq!(line.cents(), 3000);
//!
//! assert_eq!(classify_low_stock(10, 10), Some(AlertLevel::Critical));
//! assert_eq!(classify_low_stock(14, 10), Some(AlertLevel::Low));
//! assert_eq!(classify_low_stock(16, 10), None);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod dashboard;
pub mod error;
pub mod inventory;
pub mod member;
pub mod money;
pub mod order;
pub mod stock_in;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Category assigned to manually entered medicines without one (OTC).
pub const DEFAULT_CATEGORY_ID: i64 = 2;

/// Batch number used when a stock-in line does not carry one.
pub const DEFAULT_BATCH_NUMBER: &str = "DEFAULT_BATCH";

/// Batch that absorbs refunded quantities which cannot be traced back to
/// the batch they were drawn from.
pub const REFUND_BATCH_NUMBER: &str = "REFUND";

/// Member level at or above which a member counts as VIP.
pub const VIP_LEVEL: i64 = 3;

/// Maximum lines allowed in a single order.
///
/// ## Business Reason
/// Prevents runaway carts and keeps the order transaction short.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single medicine per order line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_LINE_QUANTITY: i64 = 9999;

/// Largest unit price or header amount accepted, in fen (¥100,000,000).
///
/// ## Business Reason
/// Keeps every order and stock-in total far inside `i64`:
/// 100 lines × 9999 × this still fits.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000;
