//! Error types for counter operations.

use seqctr_core::{CounterName, CounterValueError, NameError};
use sqlx::error::DatabaseError;
use sqlx::postgres::PgDatabaseError;
use sqlx::sqlite::SqliteError;

/// Result type for counter operations.
pub type Result<T> = std::result::Result<T, CounterError>;

/// PostgreSQL `deadlock_detected`.
const PG_DEADLOCK_DETECTED: &str = "40P01";

/// PostgreSQL `lock_not_available`, raised when `lock_timeout` expires.
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";

/// PostgreSQL `serialization_failure`.
const PG_SERIALIZATION_FAILURE: &str = "40001";

/// SQLite primary result codes for a database held by another connection.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Errors that can occur in counter operations.
///
/// Store failures are carried unchanged in [`CounterError::Store`]; the
/// operator never retries and never rolls back. Use [`CounterError::is_retryable`]
/// to decide whether the surrounding transaction is worth running again.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    /// An active counter with this name already exists.
    #[error("counter already exists: {name}")]
    DuplicateName {
        /// The name that was taken.
        name: String,
    },

    /// No active counter with this name exists.
    #[error("counter not found: {name}")]
    NotFound {
        /// The name that was looked up.
        name: String,
    },

    /// Invalid counter name.
    #[error("invalid counter name: {0}")]
    InvalidName(#[from] NameError),

    /// Counter value left the `u32` domain.
    #[error(transparent)]
    Value(#[from] CounterValueError),

    /// Database operation failed.
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CounterError {
    pub(crate) fn not_found(name: &CounterName) -> Self {
        Self::NotFound {
            name: name.to_string(),
        }
    }

    /// Map an insert failure, turning a uniqueness violation into `DuplicateName`.
    pub(crate) fn from_insert(err: sqlx::Error, name: &CounterName) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::DuplicateName {
                name: name.to_string(),
            },
            _ => Self::Store(err),
        }
    }

    /// The transaction was chosen as a deadlock victim.
    #[must_use]
    pub fn is_deadlock(&self) -> bool {
        self.pg_code() == Some(PG_DEADLOCK_DETECTED)
    }

    /// The wait for a row (or database) lock gave up.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        if self.pg_code() == Some(PG_LOCK_NOT_AVAILABLE) {
            return true;
        }

        self.sqlite_primary_code()
            .is_some_and(|code| code == SQLITE_BUSY || code == SQLITE_LOCKED)
    }

    /// Whether rerunning the whole enclosing transaction may succeed.
    ///
    /// True for deadlocks, lock timeouts, serialization failures, and pool
    /// acquisition timeouts. Never true for `NotFound` or `DuplicateName`.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_deadlock()
            || self.is_lock_timeout()
            || self.pg_code() == Some(PG_SERIALIZATION_FAILURE)
            || matches!(self, Self::Store(sqlx::Error::PoolTimedOut))
    }

    fn database_error(&self) -> Option<&(dyn DatabaseError + 'static)> {
        match self {
            Self::Store(sqlx::Error::Database(db)) => Some(&**db),
            _ => None,
        }
    }

    fn pg_code(&self) -> Option<&str> {
        self.database_error()?
            .try_downcast_ref::<PgDatabaseError>()
            .map(PgDatabaseError::code)
    }

    fn sqlite_primary_code(&self) -> Option<i32> {
        let db = self.database_error()?;
        db.try_downcast_ref::<SqliteError>()?;
        let code: i32 = db.code()?.parse().ok()?;
        Some(code & 0xff)
    }
}
