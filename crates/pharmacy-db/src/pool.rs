//! # Database Handle
//!
//! Opens the SQLite pool the whole backend shares and hands out
//! repositories over it.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   One SQLite file, many HTTP handlers                   │
//! │                                                                         │
//! │  POST /api/orders ──┐                                                   │
//! │  POST /api/orders ──┼──► db.begin() ──► BEGIN ... COMMIT               │
//! │  POST .../approve ──┘         │                                         │
//! │                               │  one writer at a time (SQLite lock);    │
//! │                               │  the others wait up to busy_timeout     │
//! │                               ▼                                         │
//! │                   UPDATE inventory_batches                              │
//! │                   SET quantity = quantity - ?                           │
//! │                   WHERE id = ? AND quantity >= ?                        │
//! │                                                                         │
//! │  GET /api/dashboard/* ──► pool reads, never blocked by the writer (WAL) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every connection is opened with foreign keys on. SQLite ships with
//! them off, and the order/stock-in line tables depend on them.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    CategoryRepository, DashboardRepository, InventoryRepository, MedicineRepository,
    MemberRepository, OrderRepository, SettingRepository, StockAlertRepository, StockInRepository,
    SupplierRepository,
};

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// DbConfig
// =============================================================================

/// Pool and connection settings.
///
/// ```rust,ignore
/// let config = DbConfig::new("./pharmacy.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; created on first open. `:memory:` for a private database.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a caller waits for a free pooled connection.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// How long a writer waits on SQLite's write lock before `SQLITE_BUSY`.
    pub busy_timeout: Duration,
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed defaults: 5 connections, 5s lock wait, migrations on.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private in-memory database for tests.
    ///
    /// Each SQLite connection to `:memory:` sees its own empty database, so
    /// the pool is pinned to a single connection. Code under test must not
    /// hold a transaction while reading through the pool.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = format!("sqlite://{}?mode=rwc", self.database_path.display());
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        // WAL needs a file; an in-memory database keeps its default journal.
        Ok(if self.is_in_memory() {
            options
        } else {
            options.journal_mode(SqliteJournalMode::Wal)
        })
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the pharmacy database.
///
/// Clones share one pool. Repositories are thin wrappers created per call:
///
/// ```rust,ignore
/// let stock = db.inventory().current_stock("M1001").await?;
/// let member = db.members().get("M00001").await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening pharmacy database");

        let options = config.connect_options()?;
        if config.is_in_memory() && config.max_connections > 1 {
            warn!(
                max_connections = config.max_connections,
                "In-memory database with several connections; each sees its own data"
            );
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending embedded migrations. Already-applied ones are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        info!("Schema up to date");
        Ok(())
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a transaction. Stock, order and stock-in writes take the
    /// resulting connection (`&mut tx`) so a workflow commits them together.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    pub fn medicines(&self) -> MedicineRepository {
        MedicineRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    pub fn suppliers(&self) -> SupplierRepository {
        SupplierRepository::new(self.pool.clone())
    }

    /// Batch reads. Mutations live in [`crate::repository::inventory`] as
    /// free functions over a transaction.
    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn stock_ins(&self) -> StockInRepository {
        StockInRepository::new(self.pool.clone())
    }

    pub fn members(&self) -> MemberRepository {
        MemberRepository::new(self.pool.clone())
    }

    pub fn settings(&self) -> SettingRepository {
        SettingRepository::new(self.pool.clone())
    }

    pub fn dashboard(&self) -> DashboardRepository {
        DashboardRepository::new(self.pool.clone())
    }

    pub fn alerts(&self) -> StockAlertRepository {
        StockAlertRepository::new(self.pool.clone())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Waits for checked-out connections and closes the pool. Every later
    /// query fails.
    pub async fn close(&self) {
        info!("Closing pharmacy database");
        self.pool.close().await;
    }

    /// `true` when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_migrations_seed_categories() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = sqlx::query(
            "INSERT INTO order_items (id, order_id, medicine_id, medicine_name, quantity, unit_price_cents, subtotal_cents, created_at) VALUES ('i', 'missing', 'missing', 'x', 1, 1, 1, '2026-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .map_err(DbError::from)
        .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/pharmacy-test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_secs(1));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
