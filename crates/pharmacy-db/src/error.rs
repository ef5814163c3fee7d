//! # Database Errors
//!
//! ```text
//! sqlx::Error ──┐
//! CoreError  ───┼──► DbError ──► ServiceError ──► AppError (HTTP)
//! serde_json ───┘
//! ```
//!
//! Constraint failures are classified here, from the driver's error kind,
//! so the service layer can turn a duplicate phone into a Conflict without
//! looking at SQL text.

use pharmacy_core::CoreError;
use sqlx::error::ErrorKind as SqlxErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A `require`-style lookup or a conditional write found no row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write.
    ///
    /// ## When This Occurs
    /// - Two members with one phone
    /// - A reused approval number or stock-in number
    /// - A second supplier with an existing name
    ///
    /// `constraint` is `table.column` as SQLite reports it.
    #[error("Duplicate value for {constraint}")]
    UniqueViolation { constraint: String },

    /// ## When This Occurs
    /// - An order or stock-in line naming a medicine that does not exist
    /// - Deleting a medicine that still has batches
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A domain rule failed mid-transaction (e.g. FEFO found too little stock).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// A JSON column could not be encoded or decoded.
    #[error("Bad JSON in {column}: {source}")]
    Json {
        column: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),

    /// Every pooled connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Query failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(constraint: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    pub fn json(column: impl Into<String>, source: serde_json::Error) -> Self {
        DbError::Json {
            column: column.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// SQLite reports a unique failure as
/// `UNIQUE constraint failed: members.phone`; keep the part after the colon.
fn unique_constraint(message: &str) -> String {
    message
        .rsplit_once(": ")
        .map(|(_, constraint)| constraint.to_string())
        .unwrap_or_else(|| message.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                SqlxErrorKind::UniqueViolation => DbError::UniqueViolation {
                    constraint: unique_constraint(db_err.message()),
                },
                SqlxErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                    message: db_err.message().to_string(),
                },
                _ => DbError::Query(sqlx::Error::Database(db_err)),
            },
            other => DbError::Query(other),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_constraint_name() {
        assert_eq!(
            unique_constraint("UNIQUE constraint failed: members.phone"),
            "members.phone"
        );
        assert_eq!(unique_constraint("odd message"), "odd message");
    }

    #[test]
    fn test_pool_errors() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolExhausted
        ));
        assert!(DbError::from(sqlx::Error::RowNotFound).is_not_found());
    }
}
