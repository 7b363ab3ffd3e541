//! Table definitions for `execution_logs`.
//!
//! The column set matches tables already created by earlier releases of the
//! tool, so both dialects keep `python_version` as the version column name.

use rusqlite::Connection;

pub const TABLE: &str = "execution_logs";

/// SQLite stores timestamps as RFC 3339 text.
pub const SQLITE_DDL: &str = "CREATE TABLE IF NOT EXISTS execution_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    command VARCHAR(50) NOT NULL,
    environment VARCHAR(50) NOT NULL,
    python_version VARCHAR(100) NOT NULL,
    service_name VARCHAR(100)
)";

/// PostgreSQL stores naive UTC timestamps.
pub const POSTGRES_DDL: &str = "CREATE TABLE IF NOT EXISTS execution_logs (
    id SERIAL PRIMARY KEY,
    timestamp TIMESTAMP WITHOUT TIME ZONE NOT NULL,
    command VARCHAR(50) NOT NULL,
    environment VARCHAR(50) NOT NULL,
    python_version VARCHAR(100) NOT NULL,
    service_name VARCHAR(100)
)";

/// Create the table on a SQLite connection if it does not exist.
pub fn ensure_sqlite(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SQLITE_DDL)
}
