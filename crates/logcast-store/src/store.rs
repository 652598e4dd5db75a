use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use logcast_core::{config::DatabaseConfig, LogRecord};
use logcast_producer::{format_embedding, mock_embedding};
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::{
    db,
    error::{Result, StoreError},
};

/// Write-only persistence boundary used by the ingest loop.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Persist `record` and return the identity the store assigned to it.
    async fn insert(&self, record: &LogRecord) -> Result<i64>;
}

/// SQLite-backed [`LogStore`] with a fixed cap on open connections.
///
/// Every statement runs on the blocking pool. A semaphore permit is held
/// for the whole blocking call, so the number of connections in use never
/// exceeds `max_connections` even when a caller gives up on a slow insert.
pub struct SqliteStore {
    pool: Arc<Pool>,
    permits: Arc<Semaphore>,
    op_timeout: Duration,
    embedding_dims: usize,
}

struct Pool {
    path: PathBuf,
    busy_timeout: Duration,
    idle: Mutex<Vec<Connection>>,
}

impl Pool {
    fn checkout(&self) -> Result<Connection> {
        let pooled = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match pooled {
            Some(conn) => Ok(conn),
            None => {
                debug!(path = %self.path.display(), "opening pooled connection");
                open_connection(&self.path, self.busy_timeout)
            }
        }
    }

    fn checkin(&self, conn: Connection) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(conn);
    }
}

impl SqliteStore {
    /// Open the database, run migrations and verify it answers queries.
    ///
    /// Any error here means the store is unusable and the service must not
    /// start.
    pub fn open(config: &DatabaseConfig, embedding_dims: usize) -> Result<Self> {
        let path = PathBuf::from(&config.path);
        ensure_parent_dir(&path)?;
        info!(path = %path.display(), "opening SQLite database");

        let conn = open_connection(&path, config.busy_timeout())?;
        db::init_db(&conn)?;
        db::ping(&conn)?;
        info!("database migrations complete");

        let pool = Pool {
            path,
            busy_timeout: config.busy_timeout(),
            idle: Mutex::new(vec![conn]),
        };
        Ok(Self {
            pool: Arc::new(pool),
            permits: Arc::new(Semaphore::new(config.max_connections.max(1))),
            op_timeout: config.op_timeout(),
            embedding_dims,
        })
    }

    /// Number of rows in the `logs` table.
    pub async fn count(&self) -> Result<i64> {
        self.with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0)))
            .await
    }

    /// Run `f` on a pooled connection, bounded by the operation timeout.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        let permits = Arc::clone(&self.permits);

        let work = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|_| StoreError::Closed)?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let conn = pool.checkout()?;
                let result = f(&conn);
                pool.checkin(conn);
                result.map_err(StoreError::from)
            })
            .await
            .map_err(|e| StoreError::Worker(e.to_string()))?
        };

        tokio::time::timeout(self.op_timeout, work)
            .await
            .map_err(|_| StoreError::Timeout {
                ms: self.op_timeout.as_millis() as u64,
            })?
    }
}

#[async_trait]
impl LogStore for SqliteStore {
    async fn insert(&self, record: &LogRecord) -> Result<i64> {
        let timestamp = record
            .timestamp()
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        let source = record.source().to_string();
        let severity = record.severity().to_string();
        let message = record.message().to_string();
        let ip_address = record.ip_address().to_string();
        let dims = self.embedding_dims;

        let result = self
            .with_conn(move |conn| {
                let embedding = format_embedding(&mock_embedding(dims, &mut rand::rng()));
                conn.prepare_cached(
                    "INSERT INTO logs (timestamp, source, severity, message, ip_address, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?
                .execute(rusqlite::params![
                    timestamp, source, severity, message, ip_address, embedding
                ])?;
                Ok(conn.last_insert_rowid())
            })
            .await;

        if let Err(StoreError::Timeout { ms }) = &result {
            // the blocking statement is not cancelled and may still commit
            warn!(
                timeout_ms = *ms,
                "insert timed out; the row may still be written but will not be broadcast"
            );
        }
        result
    }
}

fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let conn = Connection::open(path)?;
    db::configure(&conn, busy_timeout)?;
    Ok(conn)
}

/// Ensure the parent directory for a database file exists.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}
