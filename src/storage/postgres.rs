//! PostgreSQL-backed execution log over a single `sqlx` connection.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{Connection, PgConnection, Row};
use tracing::debug;

use super::{schema, ExecutionRecord, ExecutionRepository, NewExecution, StoreError};

pub struct PostgresRepository {
    conn: Option<PgConnection>,
}

impl PostgresRepository {
    /// Connect and create the table if it does not exist.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let mut conn = PgConnection::connect(url).await?;
        sqlx::query(schema::POSTGRES_DDL).execute(&mut conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::Closed)
    }
}

#[async_trait]
impl ExecutionRepository for PostgresRepository {
    async fn insert(&mut self, record: &NewExecution) -> Result<ExecutionRecord, StoreError> {
        let conn = self.conn()?;
        let mut tx = conn.begin().await?;
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO execution_logs (timestamp, command, environment, python_version, service_name)
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(record.timestamp.naive_utc())
        .bind(&record.command)
        .bind(&record.environment)
        .bind(&record.runtime_version)
        .bind(&record.service_name)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(id, "execution recorded");
        Ok(record.clone().into_record(i64::from(id)))
    }

    async fn recent(&mut self, limit: usize) -> Result<Vec<ExecutionRecord>, StoreError> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT id, timestamp, command, environment, python_version, service_name
             FROM execution_logs ORDER BY timestamp DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(conn)
        .await?;

        rows.iter()
            .map(|row| -> Result<ExecutionRecord, StoreError> {
                let id: i32 = row.try_get("id")?;
                let timestamp: NaiveDateTime = row.try_get("timestamp")?;
                Ok(ExecutionRecord {
                    id: i64::from(id),
                    timestamp: timestamp.and_utc(),
                    command: row.try_get("command")?,
                    environment: row.try_get("environment")?,
                    runtime_version: row.try_get("python_version")?,
                    service_name: row.try_get("service_name")?,
                })
            })
            .collect()
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}
