use rusqlite::{Connection, Result};

/// Initialise the `logs` table. Safe to call on every startup (idempotent).
///
/// `processed` is owned by the downstream incident agent; the ingest side
/// only ever inserts rows with the default of 0.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp   TEXT    NOT NULL,   -- RFC 3339, UTC
            source      TEXT    NOT NULL,
            severity    TEXT    NOT NULL,
            message     TEXT    NOT NULL,
            ip_address  TEXT    NOT NULL,
            embedding   TEXT    NOT NULL,   -- fixed-length vector literal
            processed   INTEGER NOT NULL DEFAULT 0
        );

        -- Incident agent polling: unprocessed ALERT/CRITICAL rows
        CREATE INDEX IF NOT EXISTS idx_logs_processed_severity
            ON logs (processed, severity);

        -- Correlation: same address within a time window
        CREATE INDEX IF NOT EXISTS idx_logs_ip_timestamp
            ON logs (ip_address, timestamp);",
    )
}

/// Per-connection settings applied to every pooled connection.
pub fn configure(conn: &Connection, busy_timeout: std::time::Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout)?;
    // journal_mode returns a row, so it cannot go through execute_batch
    conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
    Ok(())
}

/// Cheap round trip proving the database is reachable and readable.
pub fn ping(conn: &Connection) -> Result<()> {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
    Ok(())
}
