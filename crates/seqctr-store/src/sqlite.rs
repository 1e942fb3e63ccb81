//! SQLite counter operator.
//!
//! SQLite has no row locks. The pool from [`connect_sqlite`] holds exactly one
//! connection, so a transaction owns the whole database from `BEGIN` until it
//! commits or rolls back, and other transactions wait in the pool. That is a
//! coarser version of the PostgreSQL protocol: increments never interleave,
//! and a rolled-back increment is handed to the next transaction.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};

use seqctr_core::{Counter, CounterName};

use crate::config::StoreConfig;
use crate::error::{CounterError, Result};
use crate::schema::CounterRow;
use crate::CounterOperator;

const INSERT_COUNTER: &str = "INSERT INTO counters (name, value, created_at, updated_at) \
     VALUES (?1, 0, ?2, ?2) \
     RETURNING id, name, value, created_at, updated_at";

const SELECT_COUNTER: &str = "SELECT id, name, value, created_at, updated_at \
     FROM counters \
     WHERE name = ?1 AND deleted_at IS NULL";

const UPDATE_VALUE: &str = "UPDATE counters SET value = ?1, updated_at = ?2 WHERE id = ?3";

const SOFT_DELETE: &str = "UPDATE counters SET deleted_at = ?1, updated_at = ?1 \
     WHERE name = ?2 AND deleted_at IS NULL";

/// Build a single-connection SQLite pool, creating the database if needed.
///
/// `config.lock_timeout`, if set, becomes the connection's busy timeout,
/// which bounds waits on other processes sharing the file.
///
/// # Errors
///
/// Returns `CounterError::Store` if the URL is invalid or the database cannot be opened.
pub async fn connect_sqlite(config: &StoreConfig) -> Result<SqlitePool> {
    let mut options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    if let Some(timeout) = config.lock_timeout {
        options = options.busy_timeout(timeout);
    }

    tracing::info!(url = %config.database_url, "Opening SQLite database");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Counter operator for SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteCounterOperator;

impl SqliteCounterOperator {
    /// Create an operator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn select(conn: &mut SqliteConnection, name: &CounterName) -> Result<Option<Counter>> {
        let row: Option<CounterRow> = sqlx::query_as(SELECT_COUNTER)
            .bind(name.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.map(CounterRow::into_counter).transpose()
    }
}

#[async_trait]
impl CounterOperator for SqliteCounterOperator {
    type Connection = SqliteConnection;

    async fn create_counter(
        &self,
        conn: &mut SqliteConnection,
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

    async fn delete_counter(&self, conn: &mut SqliteConnection, name: &CounterName) -> Result<()> {
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

    async fn next(&self, conn: &mut SqliteConnection, name: &CounterName) -> Result<Counter> {
        // The connection itself is the lock; see the module docs.
        let mut counter = Self::select(conn, name)
            .await?
            .ok_or_else(|| CounterError::not_found(name))?;
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
        conn: &mut SqliteConnection,
        name: &CounterName,
    ) -> Result<Option<Counter>> {
        Self::select(conn, name).await
    }
}
