//! Table layout, row mapping, and embedded migrations.
//!
//! Both backends share one logical schema: a `counters` table whose `name`
//! is unique among rows with `deleted_at IS NULL`. Deleting a counter stamps
//! `deleted_at`, which frees the name for a fresh counter.

use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::{PgPool, SqlitePool};

use seqctr_core::{Counter, CounterName};

use crate::error::Result;

/// Name of the counters table.
pub const COUNTERS_TABLE: &str = "counters";

/// Embedded PostgreSQL migrations.
pub static POSTGRES_MIGRATOR: Migrator = sqlx::migrate!("./migrations/postgres");

/// Embedded SQLite migrations.
pub static SQLITE_MIGRATOR: Migrator = sqlx::migrate!("./migrations/sqlite");

/// Create or upgrade the counters table on a PostgreSQL database.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn migrate_postgres(pool: &PgPool) -> Result<()> {
    POSTGRES_MIGRATOR.run(pool).await?;
    tracing::info!(table = COUNTERS_TABLE, "PostgreSQL schema up to date");
    Ok(())
}

/// Create or upgrade the counters table on a SQLite database.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn migrate_sqlite(pool: &SqlitePool) -> Result<()> {
    SQLITE_MIGRATOR.run(pool).await?;
    tracing::info!(table = COUNTERS_TABLE, "SQLite schema up to date");
    Ok(())
}

/// A live row of the counters table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CounterRow {
    pub id: i64,
    pub name: String,
    pub value: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CounterRow {
    pub(crate) fn into_counter(self) -> Result<Counter> {
        let name = CounterName::new(self.name)?;
        let counter =
            Counter::from_stored(self.id, name, self.value, self.created_at, self.updated_at)?;
        Ok(counter)
    }
}
