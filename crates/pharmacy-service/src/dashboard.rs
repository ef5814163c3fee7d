//! # Dashboard Aggregator
//!
//! Read-only figures for the admin dashboard.
//!
//! ## Degradation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read ok            → value                                            │
//! │  read failed        → warn!, then                                      │
//! │     stats:            previously cached value, else zeroed fallback    │
//! │     everything else:  empty fallback with degraded = true              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! No dashboard read returns an error. Only the headline stats are cached;
//! order placement and refunds invalidate that cache.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, info, warn};

use pharmacy_core::dashboard::{
    CategoryDistribution, DashboardReport, DashboardStats, HotProduct, SalesTrend, TrendPeriod,
    REPORT_TITLE,
};
use pharmacy_core::inventory::{ExpiryAlert, StockAlerts};
use pharmacy_core::order::day_range;
use pharmacy_db::Database;

use crate::cache::TtlCache;
use crate::config::DashboardConfig;
use crate::error::ServiceResult;
use crate::ledger::InventoryLedger;

#[derive(Debug, Clone)]
pub struct DashboardAggregator {
    db: Arc<Database>,
    ledger: InventoryLedger,
    stats_cache: Arc<TtlCache<DashboardStats>>,
    config: DashboardConfig,
}

impl DashboardAggregator {
    pub fn new(
        db: Arc<Database>,
        stats_cache: Arc<TtlCache<DashboardStats>>,
        config: DashboardConfig,
    ) -> Self {
        DashboardAggregator {
            ledger: InventoryLedger::new(db.clone()),
            db,
            stats_cache,
            config,
        }
    }

    // =========================================================================
    // Stats
    // =========================================================================

    /// Today against yesterday, plus the low-stock count. Cached.
    pub async fn stats(&self) -> DashboardStats {
        let result = self
            .stats_cache
            .get_or_recompute(|| self.compute_stats(Utc::now().date_naive()))
            .await;

        match result {
            Ok(stats) => stats,
            Err(stale) => {
                warn!(error = %stale.error, has_previous = stale.previous.is_some(), "Dashboard stats unavailable");
                stale.previous.unwrap_or_else(DashboardStats::fallback)
            }
        }
    }

    async fn compute_stats(&self, today: NaiveDate) -> ServiceResult<DashboardStats> {
        let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);

        let (from, to) = day_range(today, today)?;
        let today_figures = self.db.dashboard().day_figures(from, to).await?;
        let (from, to) = day_range(yesterday, yesterday)?;
        let yesterday_figures = self.db.dashboard().day_figures(from, to).await?;
        let low_stock = self.ledger.low_stock_alerts().await?.len();

        debug!(?today_figures, ?yesterday_figures, low_stock, "Dashboard stats computed");
        Ok(DashboardStats::new(
            today_figures,
            yesterday_figures,
            i64::try_from(low_stock).unwrap_or(i64::MAX),
        ))
    }

    /// Drops the cached stats.
    pub async fn refresh(&self) {
        self.stats_cache.invalidate().await;
        info!("Dashboard cache refreshed");
    }

    // =========================================================================
    // Trend & Distribution
    // =========================================================================

    /// Paid sales bucketed for `period`.
    pub async fn sales_trend(&self, period: TrendPeriod) -> SalesTrend {
        match self.compute_trend(period).await {
            Ok(trend) => trend,
            Err(e) => {
                warn!(error = %e, ?period, "Sales trend unavailable");
                SalesTrend::fallback(period)
            }
        }
    }

    async fn compute_trend(&self, period: TrendPeriod) -> ServiceResult<SalesTrend> {
        let today = Utc::now().date_naive();
        let (from, to) = day_range(period.window_start(today), today)?;
        let sales = self.db.dashboard().paid_sales(from, to).await?;
        Ok(SalesTrend::build(period, sales))
    }

    pub async fn category_distribution(&self) -> CategoryDistribution {
        match self.db.dashboard().category_distribution().await {
            Ok(entries) => CategoryDistribution {
                entries,
                degraded: false,
            },
            Err(e) => {
                warn!(error = %e, "Category distribution unavailable");
                CategoryDistribution {
                    entries: Vec::new(),
                    degraded: true,
                }
            }
        }
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Expiry, low-stock and out-of-stock alerts.
    pub async fn stock_alerts(&self) -> StockAlerts {
        match self.ledger.stock_alerts(self.config.dashboard_expiry_days).await {
            Ok(alerts) => alerts,
            Err(e) => {
                warn!(error = %e, "Stock alerts unavailable");
                StockAlerts {
                    degraded: true,
                    ..Default::default()
                }
            }
        }
    }

    /// Today's best sellers by quantity. `None` uses the configured limit.
    pub async fn hot_products(&self, limit: Option<u32>) -> Vec<HotProduct> {
        let limit = limit.unwrap_or(self.config.hot_product_limit);
        match self.compute_hot_products(limit).await {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, limit, "Hot products unavailable");
                Vec::new()
            }
        }
    }

    async fn compute_hot_products(&self, limit: u32) -> ServiceResult<Vec<HotProduct>> {
        let today = Utc::now().date_naive();
        let (from, to) = day_range(today, today)?;
        Ok(self.db.dashboard().hot_products(from, to, limit).await?)
    }

    /// Batches expiring within the report window, soonest first.
    pub async fn expiring_medicines(&self) -> Vec<ExpiryAlert> {
        match self.ledger.expiry_alerts(self.config.report_expiry_days).await {
            Ok(mut alerts) => {
                alerts.truncate(self.config.report_expiry_limit);
                alerts
            }
            Err(e) => {
                warn!(error = %e, "Expiring medicines unavailable");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Export
    // =========================================================================

    pub async fn export_report(&self) -> DashboardReport {
        let report = DashboardReport {
            title: REPORT_TITLE.to_string(),
            exported_at: Utc::now(),
            stats: self.stats().await,
            sales_trend: self.sales_trend(TrendPeriod::Week).await,
            category_distribution: self.category_distribution().await,
            stock_alerts: self.stock_alerts().await,
            hot_products: self.hot_products(None).await,
            expiring: self.expiring_medicines().await,
        };
        info!(exported_at = %report.exported_at, "Dashboard report exported");
        report
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
