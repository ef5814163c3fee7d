//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied by [`Database::new`](crate::Database::new).
//!
//! ```text
//! 001_initial_schema.sql   categories (seeded), suppliers, medicines,
//!                          inventory_batches, stock_movements, orders,
//!                          order_items, stock_ins, stock_in_items,
//!                          members, settings
//! 002_stock_alerts.sql     stock_alerts; stock_movements rebuilt to
//!                          accept the 'adjustment' reason
//! ```
//!
//! Applied files are recorded in `_sqlx_migrations` with a checksum; an
//! applied file must never be edited. Schema changes go in a new
//! `NNN_description.sql`.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;
    Ok((MIGRATOR.migrations.len(), usize::try_from(applied).unwrap_or(0)))
}
