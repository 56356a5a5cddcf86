//! Database connection pool management
//!
//! Uses sqlx `SqlitePool` with explicit connection limits and an acquire
//! timeout, so a saturated pool surfaces as `ResourceExhausted` instead of
//! blocking forever. Connections are handed out as `PooledConnection`
//! guards and go back to the pool when the guard drops, on every path.

use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::Sqlite;
use tracing::{debug, info};

use crate::config::WikiDbConfig;
use crate::error::{ServiceError, StartupError};

/// How long SQLite waits on a locked database before reporting busy.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Gauge {
    checked_out: AtomicUsize,
    peak: AtomicUsize,
}

/// Shared handle to the bounded connection pool.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    pool: SqlitePool,
    gauge: Arc<Gauge>,
}

impl ConnectionPool {
    /// Create the pool described by `config`.
    pub async fn connect(config: &WikiDbConfig) -> Result<Self, StartupError> {
        let url = config.database_url()?;
        Self::connect_with(&url, config.max_pool_size, config.acquire_timeout()).await
    }

    /// Create a pool with explicit options.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (`sqlite:path/to/file.db`)
    /// * `max_connections` - Maximum number of connections in the pool
    /// * `acquire_timeout` - How long `acquire` waits before giving up
    pub async fn connect_with(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StartupError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await?;

        info!(url = %database_url, max_connections, "connection pool ready");
        Ok(Self {
            pool,
            gauge: Arc::default(),
        })
    }

    /// Check out a connection, waiting up to the acquire timeout.
    pub async fn acquire(&self) -> Result<PooledConnection, ServiceError> {
        let conn = self.pool.acquire().await?;
        let now = self.gauge.checked_out.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauge.peak.fetch_max(now, Ordering::SeqCst);
        Ok(PooledConnection {
            conn,
            gauge: Arc::clone(&self.gauge),
        })
    }

    /// Connections currently checked out.
    pub fn checked_out(&self) -> usize {
        self.gauge.checked_out.load(Ordering::SeqCst)
    }

    /// Highest simultaneous checkout seen since the pool was created.
    pub fn peak_checked_out(&self) -> usize {
        self.gauge.peak.load(Ordering::SeqCst)
    }

    pub fn max_connections(&self) -> u32 {
        self.pool.options().get_max_connections()
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// A checked-out connection. Dropping it returns the connection.
#[derive(Debug)]
pub struct PooledConnection {
    conn: PoolConnection<Sqlite>,
    gauge: Arc<Gauge>,
}

impl Deref for PooledConnection {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        // `conn` is released right after this, when the fields drop
        self.gauge.checked_out.fetch_sub(1, Ordering::SeqCst);
    }
}
