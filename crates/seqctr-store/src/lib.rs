//! Transactional named counters for seqctr.
//!
//! This crate hands out strictly sequential values from named counters stored
//! in a relational database. Values are produced exactly once per committed
//! call: a transaction that rolls back gives its value back, and the next
//! caller receives it instead.
//!
//! # Architecture
//!
//! The [`CounterOperator`] trait is the whole API. Its operations run on a
//! connection the caller already holds, normally the inside of a
//! `sqlx::Transaction`. The operator never begins, commits, or rolls back;
//! the caller decides what happens to the work.
//!
//! - [`PgCounterOperator`]: PostgreSQL. `next` takes a row lock with
//!   `SELECT ... FOR UPDATE`, so increments on one counter serialize and
//!   increments on different counters run in parallel.
//! - [`SqliteCounterOperator`]: SQLite. There are no row locks, so the pool
//!   built by [`connect_sqlite`] has a single connection and whole
//!   transactions take turns.
//!
//! # Lock Ordering
//!
//! A transaction that increments several counters must lock them in the same
//! order as every other transaction, or two of them can deadlock.
//! [`CounterOperator::next_many`] sorts the names for you.
//!
//! # Example
//!
//! ```no_run
//! use seqctr_store::{
//!     connect_postgres, migrate_postgres, CounterName, CounterOperator, PgCounterOperator,
//!     StoreConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::new().with_database_url("postgres://localhost/app");
//! let pool = connect_postgres(&config).await?;
//! migrate_postgres(&pool).await?;
//!
//! let op = PgCounterOperator::from_config(&config);
//! let name: CounterName = "invoices".parse()?;
//!
//! let mut tx = pool.begin().await?;
//! op.create_counter(&mut *tx, &name).await?;
//! tx.commit().await?;
//!
//! let mut tx = pool.begin().await?;
//! let counter = op.next(&mut *tx, &name).await?;
//! assert_eq!(counter.value, 1);
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod postgres;
pub mod schema;
pub mod sqlite;

pub use config::{Backend, StoreConfig};
pub use error::{CounterError, Result};
pub use postgres::{connect_postgres, PgCounterOperator};
pub use schema::{migrate_postgres, migrate_sqlite};
pub use sqlite::{connect_sqlite, SqliteCounterOperator};

pub use seqctr_core::{Counter, CounterName};

use async_trait::async_trait;

/// Counter operations over a caller-held transactional connection.
///
/// Every method runs entirely inside the connection it is given. Effects
/// become visible to others only when the caller commits. On error, the
/// caller should roll back; the operator leaves that decision to it.
///
/// Cancelling a call (dropping its future) abandons the in-flight statement,
/// including a pending row lock wait. Roll back the transaction afterwards.
#[async_trait]
pub trait CounterOperator: Send + Sync {
    /// The driver connection operations run on.
    type Connection: Send;

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a counter with value 0.
    ///
    /// # Errors
    ///
    /// - `CounterError::DuplicateName` if an active counter has this name.
    /// - `CounterError::Store` for any other database failure.
    async fn create_counter(
        &self,
        conn: &mut Self::Connection,
        name: &CounterName,
    ) -> Result<Counter>;

    /// Delete a counter.
    ///
    /// Deleting a name with no active counter succeeds and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `CounterError::Store` if the database operation fails.
    async fn delete_counter(&self, conn: &mut Self::Connection, name: &CounterName)
        -> Result<()>;

    // =========================================================================
    // Values
    // =========================================================================

    /// Lock the counter, increment it, and return it with its new value.
    ///
    /// Blocks while another transaction holds the counter's lock. The lock
    /// is held until the caller's transaction ends.
    ///
    /// # Errors
    ///
    /// - `CounterError::NotFound` if no active counter has this name.
    /// - `CounterError::Value` if the counter is exhausted.
    /// - `CounterError::Store` for database failures, including lock
    ///   timeouts and deadlocks (see [`CounterError::is_retryable`]).
    async fn next(&self, conn: &mut Self::Connection, name: &CounterName) -> Result<Counter>;

    /// Read a counter without locking or changing it.
    ///
    /// # Errors
    ///
    /// Returns `CounterError::Store` if the database operation fails.
    async fn current(
        &self,
        conn: &mut Self::Connection,
        name: &CounterName,
    ) -> Result<Option<Counter>>;

    /// Increment several counters, locking them in name order.
    ///
    /// Duplicate names are incremented once. Results are returned in sorted
    /// name order. Stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`CounterOperator::next`].
    async fn next_many(
        &self,
        conn: &mut Self::Connection,
        names: &[CounterName],
    ) -> Result<Vec<Counter>> {
        let mut ordered: Vec<&CounterName> = names.iter().collect();
        ordered.sort();
        ordered.dedup();

        let mut counters = Vec::with_capacity(ordered.len());
        for name in ordered {
            counters.push(self.next(conn, name).await?);
        }

        Ok(counters)
    }
}
