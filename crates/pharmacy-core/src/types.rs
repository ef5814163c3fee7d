//! # Domain Types
//!
//! Core domain types used throughout the pharmacy backend.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Medicine     │◄──│ InventoryBatch  │◄──│  StockMovement  │       │
//! │  │  medicine_id    │   │  batch_number   │   │  quantity_delta │       │
//! │  │  approval_no    │   │  quantity ≥ 0   │   │  reason         │       │
//! │  │  group_key      │   │  expiry_date    │   │  reference      │       │
//! │  └────────┬────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │                    ▲                                        │
//! │           │                    │ credited on approval                   │
//! │  ┌────────┴────────┐   ┌───────┴─────────┐   ┌─────────────────┐       │
//! │  │   OrderItem     │   │   StockInItem   │   │     Member      │       │
//! │  │  quantity > 0   │   │  batch_number   │   │  phone (unique) │       │
//! │  │  subtotal       │   │  expiry_date    │   │  points ≥ 0     │       │
//! │  └────────┬────────┘   └───────┬─────────┘   └─────────────────┘       │
//! │           │                    │                                        │
//! │  ┌────────┴────────┐   ┌───────┴─────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │    StockIn      │   │    Settings     │       │
//! │  │  PaymentStatus  │   │  StockInStatus  │   │  (singleton)    │       │
//! │  │  PaymentType    │   │  total_amount   │   │  thresholds     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Encoding
//! Order and stock-in statuses are stored as small integers so that the
//! persisted values stay compatible with existing pharmacy data
//! (`0 = pending, 1 = paid/approved, 2 = refunded/cancelled`). On the wire
//! they serialize as snake_case names.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Medicine Catalog
// =============================================================================

/// A medicine in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Medicine {
    /// Business identifier (`M` + millis for manual entries, or supplied).
    pub medicine_id: String,

    /// Generic (INN) name.
    pub generic_name: String,

    /// Brand name printed on the box.
    pub trade_name: Option<String>,

    /// Dosage and packaging, e.g. "0.25g*24 tablets".
    pub spec: Option<String>,

    pub manufacturer: Option<String>,

    /// Regulatory approval number. Unique when present.
    pub approval_no: Option<String>,

    pub category_id: i64,

    /// Selling unit (box, bottle, ...).
    pub unit: Option<String>,

    /// Retail price in cents.
    pub retail_price_cents: i64,

    /// Normalized generic|spec|manufacturer key, see [`crate::catalog::group_key`].
    pub group_key: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    /// Returns the retail price as Money.
    #[inline]
    pub fn retail_price(&self) -> Money {
        Money::from_cents(self.retail_price_cents)
    }

    /// Name shown on receipts: trade name when present, else generic name.
    pub fn display_name(&self) -> &str {
        self.trade_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.generic_name)
    }
}

/// A medicine category. Top-level categories have `parent_id = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: i64,
    pub sort_order: i64,
    pub description: Option<String>,
}

/// A supplier that delivers stock-in shipments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub contact: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

/// One lot of a medicine with its own quantity, expiry and cost.
///
/// Total stock of a medicine is the sum of `quantity` over its batches.
/// A batch at zero is kept; zero is a valid state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryBatch {
    pub id: String,
    pub medicine_id: String,
    pub batch_number: String,
    /// Never negative.
    pub quantity: i64,
    /// Purchase price per unit in cents.
    pub unit_cost_cents: i64,
    #[ts(as = "Option<String>")]
    pub production_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    /// Low-stock threshold. 0 means "use the store-wide threshold".
    pub min_stock: i64,
    pub max_stock: Option<i64>,
    pub supplier_id: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Why a batch quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    /// Credited by an approved stock-in document.
    StockIn,
    /// Drawn by an order line.
    Order,
    /// Returned by a refund.
    Refund,
    /// Set by a manual batch edit.
    Adjustment,
}

/// Journal entry for one batch mutation.
///
/// Refunds read the `Order` movements of an order to put quantities back
/// into the batches they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub batch_id: String,
    pub medicine_id: String,
    /// Negative for draws, positive for credits.
    pub quantity_delta: i64,
    pub reason: MovementReason,
    /// Stock-in number, order id, or refund id.
    pub reference: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A batch with the catalog fields the inventory screen lists next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryListing {
    #[serde(flatten)]
    #[ts(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub batch: InventoryBatch,
    pub generic_name: String,
    pub trade_name: Option<String>,
    pub spec: Option<String>,
    pub retail_price_cents: i64,
}

// =============================================================================
// Stock Alert Records
// =============================================================================

/// What a persisted stock alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Aggregate stock at or below 1.5× the minimum.
    LowStock,
    /// A non-empty batch expires inside the alert window.
    NearExpiry,
}

impl AlertType {
    pub const fn label(self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::NearExpiry => "near_expiry",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stock alert kept until someone marks it handled.
///
/// ## Lifecycle
/// ```text
/// scan ──► unhandled ──(handle)──► handled
///   │          ▲
///   └──────────┘  at most one unhandled record per (medicine, type)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockAlertRecord {
    pub id: i64,
    pub medicine_id: String,
    pub medicine_name: String,
    pub alert_type: AlertType,
    /// Stock when the alert was raised: the aggregate for low stock, the
    /// batch quantity for expiry.
    pub current_stock: i64,
    pub min_stock: Option<i64>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub alert_message: String,
    pub is_handled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub handled_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Payment Status
// =============================================================================

/// Payment state of an order.
///
/// ```text
/// Pending ──► Paid ──► Refunded (terminal)
/// ```
/// Orders are created directly as `Paid`; `Pending` exists for data imported
/// from older systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[repr(i32)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending = 0,
    Paid = 1,
    Refunded = 2,
}

impl PaymentStatus {
    /// Integer code as persisted.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Human-readable label used in error messages.
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Payment Type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    #[default]
    Cash,
    Wechat,
    Alipay,
    /// Medical insurance card.
    Insurance,
}

impl PaymentType {
    /// Parses a client-supplied payment type, falling back to cash for
    /// anything unrecognized or absent.
    pub fn parse_or_cash(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Wechat => "wechat",
            PaymentType::Alipay => "alipay",
            PaymentType::Insurance => "insurance",
        }
    }
}

impl FromStr for PaymentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentType::Cash),
            "wechat" => Ok(PaymentType::Wechat),
            "alipay" => Ok(PaymentType::Alipay),
            "insurance" => Ok(PaymentType::Insurance),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_type".to_string(),
                allowed: ["cash", "wechat", "alipay", "insurance"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A sales order header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    /// `O` + yyyyMMddHHmmss + random suffix.
    pub order_id: String,
    pub member_id: Option<String>,
    pub customer_name: Option<String>,
    /// Σ line subtotals.
    pub total_amount_cents: i64,
    /// Amount before discount (caller override or total).
    pub original_amount_cents: i64,
    pub discount_amount_cents: i64,
    /// What the customer actually paid.
    pub actual_payment_cents: i64,
    pub payment_type: PaymentType,
    pub payment_status: PaymentStatus,
    #[ts(as = "String")]
    pub order_time: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub pay_time: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub refund_time: Option<DateTime<Utc>>,
    pub refund_reason: Option<String>,
    pub used_points: i64,
    pub created_points: i64,
    pub cashier_id: i64,
}

impl Order {
    #[inline]
    pub fn actual_payment(&self) -> Money {
        Money::from_cents(self.actual_payment_cents)
    }

    #[inline]
    pub fn original_amount(&self) -> Money {
        Money::from_cents(self.original_amount_cents)
    }
}

/// A line of an order. Immutable once written.
///
/// Uses the snapshot pattern: the medicine name is frozen at sale time so
/// receipts stay stable when the catalog changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub medicine_id: String,
    pub medicine_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// quantity × unit_price_cents
    pub subtotal_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An order with its lines, as returned by order endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// =============================================================================
// Stock-In
// =============================================================================

/// Lifecycle of a receiving document.
///
/// ```text
/// Pending ──► Approved   (terminal, credits inventory)
///    │
///    └──────► Cancelled  (terminal, no inventory effect)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[repr(i32)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockInStatus {
    #[default]
    Pending = 0,
    Approved = 1,
    Cancelled = 2,
}

impl StockInStatus {
    pub const fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(StockInStatus::Pending),
            1 => Some(StockInStatus::Approved),
            2 => Some(StockInStatus::Cancelled),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            StockInStatus::Pending => "pending",
            StockInStatus::Approved => "approved",
            StockInStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StockInStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A receiving document header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockIn {
    pub id: i64,
    /// `SI` + millis unless supplied.
    pub stock_in_no: String,
    pub supplier_id: i64,
    #[ts(as = "String")]
    pub stock_in_date: DateTime<Utc>,
    pub status: StockInStatus,
    /// Σ quantity × unit_price over items.
    pub total_amount_cents: i64,
    pub remark: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub approved_at: Option<DateTime<Utc>>,
}

/// A received line of a stock-in document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockInItem {
    pub id: i64,
    pub stock_in_id: i64,
    pub medicine_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub batch_number: String,
    #[ts(as = "Option<String>")]
    pub production_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub remark: Option<String>,
}

/// A stock-in document with its lines and supplier name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockInDetail {
    pub stock_in: StockIn,
    pub supplier_name: Option<String>,
    pub items: Vec<StockInItem>,
}

// =============================================================================
// Member
// =============================================================================

/// A loyalty member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Member {
    /// `M%05d` sequence or supplied.
    pub member_id: String,
    pub name: String,
    /// Unique across members.
    pub phone: String,
    pub card_no: Option<String>,
    /// Never negative.
    pub points: i64,
    pub level: i64,
    #[ts(as = "String")]
    pub create_time: DateTime<Utc>,
    pub remark: Option<String>,
}

impl Member {
    pub fn is_vip(&self) -> bool {
        self.level >= crate::VIP_LEVEL
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Store profile and business rule parameters.
///
/// A single logical row; the most recently created row is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settings {
    pub store_name: String,
    pub store_phone: String,
    pub store_address: String,
    pub store_desc: String,
    /// Store-wide low-stock threshold for batches without their own.
    pub low_stock_threshold: i64,
    /// Enabled notification channels, e.g. `["sms", "email"]`.
    pub notify_methods: Vec<String>,
    /// Points earned per unit of currency spent.
    pub points_rule: f64,
    /// Points needed to redeem one unit of currency.
    pub cash_rule: i64,
    pub operation_log: bool,
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            store_name: String::new(),
            store_phone: String::new(),
            store_address: String::new(),
            store_desc: String::new(),
            low_stock_threshold: 10,
            notify_methods: Vec::new(),
            points_rule: 1.0,
            cash_rule: 100,
            operation_log: true,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Partial settings update. Absent fields keep their current value.
///
/// Unknown keys in the JSON payload are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct SettingsPatch {
    pub store_name: Option<String>,
    pub store_phone: Option<String>,
    pub store_address: Option<String>,
    pub store_desc: Option<String>,
    pub low_stock_threshold: Option<i64>,
    pub notify_methods: Option<Vec<String>>,
    pub points_rule: Option<f64>,
    pub cash_rule: Option<i64>,
    pub operation_log: Option<bool>,
}

impl SettingsPatch {
    /// Validates the present fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(self.low_stock_threshold, Some(v) if v < 0) {
            return Err(ValidationError::MustNotBeNegative {
                field: "low_stock_threshold".to_string(),
            });
        }
        if matches!(self.points_rule, Some(v) if v < 0.0 || !v.is_finite()) {
            return Err(ValidationError::MustNotBeNegative {
                field: "points_rule".to_string(),
            });
        }
        if matches!(self.cash_rule, Some(v) if v <= 0) {
            return Err(ValidationError::must_be_positive("cash_rule"));
        }
        Ok(())
    }
}

impl Settings {
    /// Applies the fields present in `patch`.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.store_name {
            self.store_name = v;
        }
        if let Some(v) = patch.store_phone {
            self.store_phone = v;
        }
        if let Some(v) = patch.store_address {
            self.store_address = v;
        }
        if let Some(v) = patch.store_desc {
            self.store_desc = v;
        }
        if let Some(v) = patch.low_stock_threshold {
            self.low_stock_threshold = v;
        }
        if let Some(v) = patch.notify_methods {
            self.notify_methods = v;
        }
        if let Some(v) = patch.points_rule {
            self.points_rule = v;
        }
        if let Some(v) = patch.cash_rule {
            self.cash_rule = v;
        }
        if let Some(v) = patch.operation_log {
            self.operation_log = v;
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Zero-based page index.
    pub current_page: u32,
    pub page_size: u32,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, current_page: u32, page_size: u32, total_items: i64) -> Self {
        let size = i64::from(page_size.max(1));
        Page {
            data,
            current_page,
            page_size,
            total_items,
            total_pages: (total_items + size - 1) / size,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
