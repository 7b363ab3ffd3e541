//! Status report with optional execution logging.
//!
//! The report itself never fails. When `--save-db` is given, the write to the
//! execution log is attempted and its outcome is merged into the report as
//! `database_status` (plus `database_error` on failure).

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::storage::{
    self, ExecutionRecord, ExecutionRepository, NewExecution, StoreError, RECENT_LIMIT,
};

/// Command name stored with every execution record.
pub const STATUS_COMMAND: &str = "status";

/// Version string for this build, e.g. `0.1.0 (linux x86_64)`.
pub fn runtime_version() -> String {
    format!(
        "{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Error,
}

impl DatabaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseStatus::Connected => "connected",
            DatabaseStatus::Error => "error",
        }
    }
}

/// Result of the persistence step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Connected { records: Vec<ExecutionRecord> },
    Failed { message: String },
}

impl From<Result<Vec<ExecutionRecord>, StoreError>> for PersistOutcome {
    fn from(result: Result<Vec<ExecutionRecord>, StoreError>) -> Self {
        match result {
            Ok(records) => PersistOutcome::Connected { records },
            Err(e) => PersistOutcome::Failed {
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    #[serde(rename = "python_version")]
    pub runtime_version: String,
    pub environment: String,
    pub service_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_executions: Option<Vec<ExecutionRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_status: Option<DatabaseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_error: Option<String>,
}

impl StatusReport {
    /// Snapshot of the current process, without persistence fields.
    pub fn capture(config: &ResolvedConfig) -> Self {
        Self {
            runtime_version: runtime_version(),
            environment: config.environment.clone(),
            service_name: config.service_name.clone(),
            timestamp: Utc::now(),
            recent_executions: None,
            database_status: None,
            database_error: None,
        }
    }

    pub fn with_persistence(mut self, outcome: PersistOutcome) -> Self {
        match outcome {
            PersistOutcome::Connected { records } => {
                self.recent_executions = Some(records);
                self.database_status = Some(DatabaseStatus::Connected);
            }
            PersistOutcome::Failed { message } => {
                self.database_status = Some(DatabaseStatus::Error);
                self.database_error = Some(message);
            }
        }
        self
    }

    /// The record this report is logged as, stamped now at the stores'
    /// microsecond precision.
    pub fn to_execution(&self) -> NewExecution {
        NewExecution {
            timestamp: Utc::now().trunc_subsecs(6),
            command: STATUS_COMMAND.to_string(),
            environment: self.environment.clone(),
            runtime_version: self.runtime_version.clone(),
            service_name: Some(self.service_name.clone()),
        }
    }
}

/// Build the status report, logging this execution first when `save` is set.
pub async fn status(config: &ResolvedConfig, save: bool) -> StatusReport {
    let report = StatusReport::capture(config);
    if !save {
        return report;
    }
    let outcome = persist(config, &report).await;
    report.with_persistence(outcome)
}

/// Open the configured store, record `report` and read back recent entries.
pub async fn persist(config: &ResolvedConfig, report: &StatusReport) -> PersistOutcome {
    let opened = match storage::connection_url(&config.database) {
        Ok(url) => storage::open(&url).await,
        Err(e) => Err(e),
    };
    let outcome = match opened {
        Ok(mut repo) => record_and_fetch(repo.as_mut(), &report.to_execution()).await,
        Err(e) => Err(e),
    };

    match &outcome {
        Ok(records) => info!(recent = records.len(), "Execution logged"),
        Err(e) => warn!(error = %e, "Execution log unavailable, reporting degraded status"),
    }
    outcome.into()
}

/// Insert `entry`, fetch the newest records, then close the repository.
///
/// The repository is closed even when the insert or query fails.
pub async fn record_and_fetch(
    repo: &mut dyn ExecutionRepository,
    entry: &NewExecution,
) -> Result<Vec<ExecutionRecord>, StoreError> {
    let result = write_then_read(&mut *repo, entry).await;
    let closed = repo.close().await;
    let records = result?;
    closed?;
    Ok(records)
}

async fn write_then_read(
    repo: &mut dyn ExecutionRepository,
    entry: &NewExecution,
) -> Result<Vec<ExecutionRecord>, StoreError> {
    repo.insert(entry).await?;
    repo.recent(RECENT_LIMIT).await
}
