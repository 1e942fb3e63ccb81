//! PostgreSQL counter operator.
//!
//! `next` reads the counter row with `SELECT ... FOR UPDATE`. The row lock is
//! held by the caller's transaction, so a second transaction incrementing the
//! same counter waits until the first commits (and then sees its value) or
//! rolls back (and then reuses the value the first would have taken).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};

use seqctr_core::{Counter, CounterName};

use crate::config::StoreConfig;
use crate::error::{CounterError, Result};
use crate::schema::CounterRow;
use crate::CounterOperator;

const INSERT_COUNTER: &str = "INSERT INTO counters (name, value, created_at, updated_at) \
     VALUES ($1, 0, $2, $2) \
     RETURNING id, name, value, created_at, updated_at";

const SELECT_FOR_UPDATE: &str = "SELECT id, name, value, created_at, updated_at \
     FROM counters \
     WHERE name = $1 AND deleted_at IS NULL \
     FOR UPDATE";

const SELECT_CURRENT: &str = "SELECT id, name, value, created_at, updated_at \
     FROM counters \
     WHERE name = $1 AND deleted_at IS NULL";

const UPDATE_VALUE: &str = "UPDATE counters SET value = $1, updated_at = $2 WHERE id = $3";

const SOFT_DELETE: &str = "UPDATE counters SET deleted_at = $1, updated_at = $1 \
     WHERE name = $2 AND deleted_at IS NULL";

const SET_LOCK_TIMEOUT: &str = "SELECT set_config('lock_timeout', $1, true)";

/// Largest `lock_timeout` PostgreSQL accepts, in milliseconds (`i32::MAX`).
const MAX_LOCK_TIMEOUT_MS: u128 = 2_147_483_647;

/// Build a PostgreSQL connection pool.
///
/// # Errors
///
/// Returns `CounterError::Store` if the database cannot be reached.
pub async fn connect_postgres(config: &StoreConfig) -> Result<PgPool> {
    tracing::info!(
        max_connections = config.max_connections,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await?;

    Ok(pool)
}

/// Counter operator for PostgreSQL.
#[derive(Debug, Clone, Default)]
pub struct PgCounterOperator {
    lock_timeout: Option<Duration>,
}

impl PgCounterOperator {
    /// Create an operator that waits for row locks indefinitely.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an operator using the lock timeout from `config`.
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            lock_timeout: config.lock_timeout,
        }
    }

    /// Give up on a row lock after `timeout`.
    ///
    /// The limit is set transaction-locally before each locking read, which
    /// costs one extra statement per `next`. A timeout surfaces as a store
    /// error with `is_lock_timeout() == true`. Values beyond PostgreSQL's
    /// limit of `i32::MAX` milliseconds are clamped to it.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    async fn apply_lock_timeout(&self, conn: &mut PgConnection) -> Result<()> {
        if let Some(timeout) = self.lock_timeout {
            sqlx::query(SET_LOCK_TIMEOUT)
                .bind(lock_timeout_setting(timeout))
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

/// Render `timeout` as a `lock_timeout` value PostgreSQL will accept.
fn lock_timeout_setting(timeout: Duration) -> String {
    // 0 would disable the limit.
    let millis = timeout.as_millis().clamp(1, MAX_LOCK_TIMEOUT_MS);
    format!("{millis}ms")
}

#[async_trait]
impl CounterOperator for PgCounterOperator {
    type Connection = PgConnection;

    async fn create_counter(
        &self,
        conn: &mut PgConnection,
        name: &CounterName,
    ) -> Result<Counter> {
        let row: CounterRow = sqlx::query_as(INSERT_COUNTER)
            .bind(name.as_str())
            .bind(Utc::now())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| CounterError::from_insert(e, name))?;

        tracing::debug!(counter = %name, id = row.id, "Created counter");
        row.into_counter()
    }

    async fn delete_counter(&self, conn: &mut PgConnection, name: &CounterName) -> Result<()> {
        let result = sqlx::query(SOFT_DELETE)
            .bind(Utc::now())
            .bind(name.as_str())
            .execute(&mut *conn)
            .await?;

        tracing::debug!(
            counter = %name,
            deleted = result.rows_affected(),
            "Deleted counter"
        );
        Ok(())
    }

    async fn next(&self, conn: &mut PgConnection, name: &CounterName) -> Result<Counter> {
        self.apply_lock_timeout(conn).await?;

        // Blocks until any other holder of the row lock commits or rolls back.
        let row: Option<CounterRow> = sqlx::query_as(SELECT_FOR_UPDATE)
            .bind(name.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        let mut counter = row
            .ok_or_else(|| CounterError::not_found(name))?
            .into_counter()?;
        counter.advance(Utc::now())?;

        sqlx::query(UPDATE_VALUE)
            .bind(counter.stored_value())
            .bind(counter.updated_at)
            .bind(counter.id)
            .execute(&mut *conn)
            .await?;

        tracing::debug!(counter = %name, value = counter.value, "Advanced counter");
        Ok(counter)
    }

    async fn current(
        &self,
        conn: &mut PgConnection,
        name: &CounterName,
    ) -> Result<Option<Counter>> {
        let row: Option<CounterRow> = sqlx::query_as(SELECT_CURRENT)
            .bind(name.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.map(CounterRow::into_counter).transpose()
    }
}
