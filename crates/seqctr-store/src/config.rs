//! Store configuration.

use std::time::Duration;

use crate::error::{CounterError, Result};

/// Default database URL when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://seqctr.db";

/// Default PostgreSQL pool size.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default time to wait for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Which database engine a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// PostgreSQL, with real row-level locks.
    Postgres,
    /// SQLite, serialized through a single connection.
    Sqlite,
}

impl Backend {
    /// Detect the backend from a database URL scheme.
    ///
    /// # Errors
    ///
    /// Returns `CounterError::Configuration` for unsupported schemes.
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            let scheme = url.split(':').next().unwrap_or_default();
            Err(CounterError::Configuration(format!(
                "unsupported database scheme: {scheme:?}"
            )))
        }
    }
}

/// Connection and locking settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database URL (default: `sqlite://seqctr.db`).
    pub database_url: String,

    /// Maximum pooled connections. Ignored for SQLite, which always uses one.
    pub max_connections: u32,

    /// How long to wait for a pooled connection.
    pub acquire_timeout: Duration,

    /// Lock wait limit.
    ///
    /// On PostgreSQL this bounds how long `next` waits for a row lock, and is
    /// clamped to `i32::MAX` milliseconds. On SQLite it only becomes the
    /// connection's busy timeout, bounding waits on other connections to the
    /// same file; transactions in one process queue in `pool.begin()`, which
    /// `acquire_timeout` bounds. `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            lock_timeout: None,
        }
    }
}

impl StoreConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `DATABASE_URL`, `SEQCTR_MAX_CONNECTIONS`,
    /// `SEQCTR_ACQUIRE_TIMEOUT_SECONDS`, and `SEQCTR_LOCK_TIMEOUT_MS`.
    /// Unset or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: std::env::var("SEQCTR_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_connections),
            acquire_timeout: std::env::var("SEQCTR_ACQUIRE_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(defaults.acquire_timeout, Duration::from_secs),
            lock_timeout: std::env::var("SEQCTR_LOCK_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis),
        }
    }

    /// Set the database URL.
    #[must_use]
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// Set the pool size.
    #[must_use]
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection acquire timeout.
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the row lock wait timeout.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Backend named by `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `CounterError::Configuration` for unsupported schemes.
    pub fn backend(&self) -> Result<Backend> {
        Backend::from_url(&self.database_url)
    }
}
