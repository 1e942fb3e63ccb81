//! seqctr - command-line access to named counters.
//!
//! Every command runs in its own transaction. The transaction commits when the
//! command succeeds and rolls back otherwise.

use std::time::Duration;

use clap::{Parser, Subcommand};
use sqlx::{Database, Pool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seqctr_core::{Counter, CounterName};
use seqctr_store::{
    connect_postgres, connect_sqlite, migrate_postgres, migrate_sqlite, Backend, CounterError,
    CounterOperator, PgCounterOperator, SqliteCounterOperator, StoreConfig,
};

/// Named, gapless counters backed by PostgreSQL or SQLite.
#[derive(Debug, Parser)]
#[command(name = "seqctr", version)]
struct Cli {
    /// Database URL (overrides `DATABASE_URL`).
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Give up waiting for a counter lock after this many milliseconds.
    #[arg(long, global = true)]
    lock_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or upgrade the counters table.
    Migrate,

    /// Create a counter starting at 0.
    Create {
        /// Counter name.
        name: CounterName,
    },

    /// Advance one or more counters and print their new values.
    Next {
        /// Counter names; locked in sorted order.
        #[arg(required = true)]
        names: Vec<CounterName>,
    },

    /// Delete a counter. Deleting a missing counter is not an error.
    Delete {
        /// Counter name.
        name: CounterName,
    },

    /// Print a counter's current value without advancing it.
    Show {
        /// Counter name.
        name: CounterName,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,seqctr=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = StoreConfig::from_env();
    if let Some(url) = cli.database_url {
        config = config.with_database_url(url);
    }
    if let Some(ms) = cli.lock_timeout_ms {
        config = config.with_lock_timeout(Duration::from_millis(ms));
    }

    let backend = config.backend()?;
    tracing::debug!(?backend, command = ?cli.command, "Configuration loaded");

    match backend {
        Backend::Postgres => {
            let pool = connect_postgres(&config).await?;
            if matches!(cli.command, Command::Migrate) {
                migrate_postgres(&pool).await?;
            } else {
                let op = PgCounterOperator::from_config(&config);
                execute(&pool, &op, &cli.command).await?;
            }
        }
        Backend::Sqlite => {
            let pool = connect_sqlite(&config).await?;
            if matches!(cli.command, Command::Migrate) {
                migrate_sqlite(&pool).await?;
            } else {
                execute(&pool, &SqliteCounterOperator::new(), &cli.command).await?;
            }
        }
    }

    Ok(())
}

/// Run one command in its own transaction and print the affected counters.
async fn execute<DB, O>(pool: &Pool<DB>, op: &O, command: &Command) -> Result<(), CounterError>
where
    DB: Database,
    O: CounterOperator<Connection = DB::Connection>,
{
    let mut tx = pool.begin().await?;

    match apply(op, &mut *tx, command).await {
        Ok(counters) => {
            tx.commit().await?;
            for counter in counters {
                println!("{}\t{}", counter.name, counter.value);
            }
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rolling back");
            tx.rollback().await?;
            Err(e)
        }
    }
}

async fn apply<O: CounterOperator>(
    op: &O,
    conn: &mut O::Connection,
    command: &Command,
) -> Result<Vec<Counter>, CounterError> {
    match command {
        Command::Create { name } => Ok(vec![op.create_counter(conn, name).await?]),
        Command::Next { names } => op.next_many(conn, names).await,
        Command::Delete { name } => {
            op.delete_counter(conn, name).await?;
            Ok(Vec::new())
        }
        Command::Show { name } => {
            let counter = op
                .current(conn, name)
                .await?
                .ok_or_else(|| CounterError::NotFound {
                    name: name.to_string(),
                })?;
            Ok(vec![counter])
        }
        Command::Migrate => Ok(Vec::new()),
    }
}
