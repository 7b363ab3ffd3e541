//! Execution audit log -- record types, repository trait, backend selection.

pub mod postgres;
pub mod schema;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::{self, DatabaseParams};

/// Number of rows `status --save-db` reads back.
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("missing database setting {0}")]
    MissingParameter(&'static str),

    #[error("unsupported database url scheme: {0}")]
    UnsupportedUrl(String),

    #[error("invalid timestamp in execution_logs: {0}")]
    InvalidTimestamp(String),

    #[error("connection already closed")]
    Closed,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Postgres(#[from] sqlx::Error),
}

/// A row in `execution_logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub environment: String,
    #[serde(rename = "python_version")]
    pub runtime_version: String,
    pub service_name: Option<String>,
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExecution {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub environment: String,
    pub runtime_version: String,
    pub service_name: Option<String>,
}

impl NewExecution {
    pub fn into_record(self, id: i64) -> ExecutionRecord {
        ExecutionRecord {
            id,
            timestamp: self.timestamp,
            command: self.command,
            environment: self.environment,
            runtime_version: self.runtime_version,
            service_name: self.service_name,
        }
    }
}

/// Append-only access to the execution log.
///
/// Implementations create the table on open, so a fresh repository is
/// always ready for `insert`.
#[async_trait]
pub trait ExecutionRepository: Send {
    /// Insert and commit one record, returning it with its assigned id.
    async fn insert(&mut self, record: &NewExecution) -> Result<ExecutionRecord, StoreError>;

    /// The newest `limit` records, newest first.
    async fn recent(&mut self, limit: usize) -> Result<Vec<ExecutionRecord>, StoreError>;

    /// Release the underlying connection.
    async fn close(&mut self) -> Result<(), StoreError>;
}

/// Build the connection target from resolved parameters.
///
/// `DATABASE_URL` is used verbatim when present. Otherwise user, host, port
/// and database are required; without a password (trust or peer auth) the
/// URL carries the user alone.
pub fn connection_url(params: &DatabaseParams) -> Result<String, StoreError> {
    let present = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
    if let Some(url) = present(&params.url) {
        return Ok(url);
    }

    let require = |value: &Option<String>, key: &'static str| {
        present(value).ok_or(StoreError::MissingParameter(key))
    };
    let user = require(&params.user, config::POSTGRES_USER)?;
    let host = require(&params.host, config::POSTGRES_HOST)?;
    let port = require(&params.port, config::POSTGRES_PORT)?;
    let name = require(&params.name, config::POSTGRES_DB)?;

    let credentials = match present(&params.password) {
        Some(password) => format!(
            "{}:{}",
            utf8_percent_encode(&user, NON_ALPHANUMERIC),
            utf8_percent_encode(&password, NON_ALPHANUMERIC)
        ),
        None => utf8_percent_encode(&user, NON_ALPHANUMERIC).to_string(),
    };
    Ok(format!("postgres://{credentials}@{host}:{port}/{name}"))
}

/// Hide the password component of a connection URL for logging.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, location)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{location}"),
        None => url.to_string(),
    }
}

/// Open the repository named by `url`, creating the table if needed.
pub async fn open(url: &str) -> Result<Box<dyn ExecutionRepository>, StoreError> {
    info!(url = %redact_url(url), "Opening execution log");
    if let Some(target) = url.strip_prefix("sqlite:") {
        let repo = sqlite::SqliteRepository::open(sqlite::parse_target(target))?;
        return Ok(Box::new(repo));
    }
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let repo = postgres::PostgresRepository::connect(url).await?;
        return Ok(Box::new(repo));
    }
    let scheme = url.split_once(':').map_or(url, |(scheme, _)| scheme);
    Err(StoreError::UnsupportedUrl(scheme.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_params() -> DatabaseParams {
        DatabaseParams {
            url: None,
            user: Some("app".into()),
            password: Some("s3cret".into()),
            host: Some("db".into()),
            port: Some("5432".into()),
            name: Some("audit".into()),
        }
    }

    #[test]
    fn test_connection_url_from_parts() {
        let url = connection_url(&full_params()).unwrap();
        assert_eq!(url, "postgres://app:s3cret@db:5432/audit");
    }

    #[test]
    fn test_connection_url_encodes_credentials() {
        let params = DatabaseParams {
            password: Some("p@ss:word/1".into()),
            ..full_params()
        };
        let url = connection_url(&params).unwrap();
        assert_eq!(url, "postgres://app:p%40ss%3Aword%2F1@db:5432/audit");
    }

    #[test]
    fn test_connection_url_override_wins() {
        let params = DatabaseParams {
            url: Some("sqlite::memory:".into()),
            ..DatabaseParams::default()
        };
        assert_eq!(connection_url(&params).unwrap(), "sqlite::memory:");
    }

    #[test]
    fn test_connection_url_without_password() {
        let params = DatabaseParams {
            password: None,
            ..full_params()
        };
        assert_eq!(connection_url(&params).unwrap(), "postgres://app@db:5432/audit");

        let empty = DatabaseParams {
            password: Some(String::new()),
            ..full_params()
        };
        assert_eq!(connection_url(&empty).unwrap(), "postgres://app@db:5432/audit");
    }

    #[test]
    fn test_connection_url_empty_required_value_is_missing() {
        let params = DatabaseParams {
            user: Some(String::new()),
            ..full_params()
        };
        assert!(matches!(
            connection_url(&params),
            Err(StoreError::MissingParameter("POSTGRES_USER"))
        ));
    }

    #[test]
    fn test_connection_url_missing_parameter() {
        let params = DatabaseParams {
            host: None,
            ..full_params()
        };
        let err = connection_url(&params).unwrap_err();
        assert!(matches!(err, StoreError::MissingParameter("POSTGRES_HOST")));
        assert_eq!(err.to_string(), "missing database setting POSTGRES_HOST");
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("postgres://app:s3cret@db:5432/audit"),
            "postgres://app:***@db:5432/audit"
        );
        assert_eq!(redact_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(redact_url("postgres://db/audit"), "postgres://db/audit");
    }

    #[tokio::test]
    async fn test_open_rejects_unknown_scheme() {
        let err = open("mysql://root@localhost/db").await.err().unwrap();
        assert!(matches!(err, StoreError::UnsupportedUrl(ref s) if s == "mysql"));
    }

    #[test]
    fn test_record_serializes_runtime_version_as_python_version() {
        let record = NewExecution {
            timestamp: Utc::now(),
            command: "status".into(),
            environment: "test".into(),
            runtime_version: "0.1.0 (linux x86_64)".into(),
            service_name: None,
        }
        .into_record(7);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["python_version"], "0.1.0 (linux x86_64)");
        assert!(json["service_name"].is_null());
        assert!(json.get("runtime_version").is_none());
    }
}
