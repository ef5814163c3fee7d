//! # Dashboard Rules
//!
//! View types of the dashboard and the arithmetic behind them: change
//! percentages and sales trend bucketing. Reading the figures is the
//! database's job; caching and degradation live in the service layer.
//!
//! ## Trend Buckets
//! ```text
//! ┌──────────┬──────────────────────┬──────────────────────────────────────┐
//! │ period   │ window               │ bucket                               │
//! ├──────────┼──────────────────────┼──────────────────────────────────────┤
//! │ day      │ today                │ hour / 3            → 8 buckets      │
//! │ week     │ today − 6 ..= today  │ weekday (Mon..Sun)  → 7 buckets      │
//! │ month    │ today − 29 ..= today │ (day − 1) / 7, max 3 → 4 buckets     │
//! └──────────┴──────────────────────┴──────────────────────────────────────┘
//! ```
//! Anything else is treated as `week`.

use chrono::{DateTime, Datelike, Days, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::inventory::{ExpiryAlert, StockAlerts};

// =============================================================================
// Stats
// =============================================================================

/// Paid-order figures of one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DayFigures {
    pub sales_cents: i64,
    pub orders: i64,
    /// Distinct members with a paid order that day.
    pub members: i64,
}

/// Headline figures of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub today_sales_cents: i64,
    pub sales_change: f64,
    pub today_orders: i64,
    pub orders_change: f64,
    pub member_consumption: i64,
    pub member_change: f64,
    pub low_stock_count: i64,
    /// Set when the figures could not be read and a fallback is shown.
    pub degraded: bool,
}

impl DashboardStats {
    pub fn new(today: DayFigures, yesterday: DayFigures, low_stock_count: i64) -> Self {
        DashboardStats {
            today_sales_cents: today.sales_cents,
            sales_change: change_percent(today.sales_cents, yesterday.sales_cents),
            today_orders: today.orders,
            orders_change: change_percent(today.orders, yesterday.orders),
            member_consumption: today.members,
            member_change: change_percent(today.members, yesterday.members),
            low_stock_count,
            degraded: false,
        }
    }

    /// Zeroed stats marked degraded.
    pub fn fallback() -> Self {
        DashboardStats {
            degraded: true,
            ..Default::default()
        }
    }
}

/// Day-over-day change in percent, rounded to one decimal.
///
/// When `yesterday` is 0 the change is 100.0 if anything happened today,
/// else 0.0.
///
/// ## Example
/// ```rust
/// use pharmacy_core::dashboard::change_percent;
///
/// assert_eq!(change_percent(150, 100), 50.0);
/// assert_eq!(change_percent(2, 3), -33.3);
/// assert_eq!(change_percent(5, 0), 100.0);
/// assert_eq!(change_percent(0, 0), 0.0);
/// ```
pub fn change_percent(today: i64, yesterday: i64) -> f64 {
    if yesterday == 0 {
        return if today > 0 { 100.0 } else { 0.0 };
    }
    let pct = (today - yesterday) as f64 / yesterday as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

// =============================================================================
// Sales Trend
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    Day,
    #[default]
    Week,
    Month,
}

impl TrendPeriod {
    /// Parses a period name; unknown or absent values mean `week`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("day") => TrendPeriod::Day,
            Some("month") => TrendPeriod::Month,
            _ => TrendPeriod::Week,
        }
    }

    /// First day included in the trend ending `today`.
    pub fn window_start(self, today: NaiveDate) -> NaiveDate {
        let back = match self {
            TrendPeriod::Day => 0,
            TrendPeriod::Week => 6,
            TrendPeriod::Month => 29,
        };
        today.checked_sub_days(Days::new(back)).unwrap_or(today)
    }

    pub fn labels(self) -> Vec<String> {
        let labels: &[&str] = match self {
            TrendPeriod::Day => &[
                "00:00", "03:00", "06:00", "09:00", "12:00", "15:00", "18:00", "21:00",
            ],
            TrendPeriod::Week => &["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
            TrendPeriod::Month => &["Week 1", "Week 2", "Week 3", "Week 4"],
        };
        labels.iter().map(|l| l.to_string()).collect()
    }

    /// Bucket a sale at `at` falls into.
    pub fn bucket(self, at: DateTime<Utc>) -> usize {
        match self {
            TrendPeriod::Day => (at.hour() / 3) as usize,
            TrendPeriod::Week => at.weekday().num_days_from_monday() as usize,
            TrendPeriod::Month => (((at.day() - 1) / 7) as usize).min(3),
        }
    }
}

/// Sales per bucket, in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTrend {
    pub period: TrendPeriod,
    pub labels: Vec<String>,
    pub data: Vec<i64>,
    pub degraded: bool,
}

impl SalesTrend {
    /// Buckets `(paid_at, amount_cents)` sales for `period`.
    pub fn build<I>(period: TrendPeriod, sales: I) -> Self
    where
        I: IntoIterator<Item = (DateTime<Utc>, i64)>,
    {
        let labels = period.labels();
        let mut data = vec![0; labels.len()];
        for (at, cents) in sales {
            data[period.bucket(at)] += cents;
        }
        SalesTrend {
            period,
            labels,
            data,
            degraded: false,
        }
    }

    /// All-zero trend marked degraded.
    pub fn fallback(period: TrendPeriod) -> Self {
        SalesTrend {
            degraded: true,
            ..SalesTrend::build(period, std::iter::empty())
        }
    }
}

// =============================================================================
// Category Distribution
// =============================================================================

/// Number of medicines in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CategoryShare {
    pub category_name: String,
    pub medicine_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDistribution {
    pub entries: Vec<CategoryShare>,
    pub degraded: bool,
}

// =============================================================================
// Hot Products
// =============================================================================

/// A medicine sold today, with its current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct HotProduct {
    pub medicine_id: String,
    pub medicine_name: String,
    pub trade_name: Option<String>,
    pub spec: Option<String>,
    pub unit_price_cents: i64,
    pub today_quantity: i64,
    pub today_amount_cents: i64,
    pub current_stock: i64,
}

// =============================================================================
// Report
// =============================================================================

pub const REPORT_TITLE: &str = "Pharmacy Dashboard Report";

/// Everything on the dashboard in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub title: String,
    pub exported_at: DateTime<Utc>,
    pub stats: DashboardStats,
    pub sales_trend: SalesTrend,
    pub category_distribution: CategoryDistribution,
    pub stock_alerts: StockAlerts,
    pub hot_products: Vec<HotProduct>,
    pub expiring: Vec<ExpiryAlert>,
}

// =============================================================================
// Unit Tests
// =============================================================================
