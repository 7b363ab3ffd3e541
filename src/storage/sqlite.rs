//! SQLite-backed execution log, selected with `DATABASE_URL=sqlite:...`.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use super::{schema, ExecutionRecord, ExecutionRepository, NewExecution, StoreError};

/// Where a `sqlite:` URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    File(PathBuf),
}

/// Parse the part of a URL after `sqlite:`.
///
/// `:memory:` is an in-memory database; `//path` and bare `path` are files.
pub fn parse_target(rest: &str) -> SqliteTarget {
    if rest == ":memory:" || rest == "//:memory:" {
        return SqliteTarget::Memory;
    }
    let path = rest.strip_prefix("//").unwrap_or(rest);
    SqliteTarget::File(PathBuf::from(path))
}

pub struct SqliteRepository {
    conn: Option<Connection>,
}

impl SqliteRepository {
    pub fn open(target: SqliteTarget) -> Result<Self, StoreError> {
        let conn = match &target {
            SqliteTarget::Memory => Connection::open_in_memory()?,
            SqliteTarget::File(path) => Connection::open(path)?,
        };
        Self::from_connection(conn)
    }

    /// Wrap an existing connection, creating the table if needed.
    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        schema::ensure_sqlite(&conn)?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut Connection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::Closed)
    }
}

#[async_trait]
impl ExecutionRepository for SqliteRepository {
    async fn insert(&mut self, record: &NewExecution) -> Result<ExecutionRecord, StoreError> {
        let conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO execution_logs (timestamp, command, environment, python_version, service_name)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                record.command,
                record.environment,
                record.runtime_version,
                record.service_name
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(id, "execution recorded");
        Ok(record.clone().into_record(id))
    }

    async fn recent(&mut self, limit: usize) -> Result<Vec<ExecutionRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, command, environment, python_version, service_name
             FROM execution_logs ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;

        let rows: Vec<(i64, String, String, String, String, Option<String>)> = stmt
            .query_map(params![limit], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<Result<_, _>>()?;

        rows.into_iter()
            .map(
                |(id, timestamp, command, environment, runtime_version, service_name)|
                 -> Result<ExecutionRecord, StoreError> {
                    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                        .map_err(|_| StoreError::InvalidTimestamp(timestamp.clone()))?
                        .with_timezone(&Utc);
                    Ok(ExecutionRecord {
                        id,
                        timestamp,
                        command,
                        environment,
                        runtime_version,
                        service_name,
                    })
                },
            )
            .collect()
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| e)?;
        }
        Ok(())
    }
}
