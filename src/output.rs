//! Human-readable and JSON rendering of command results.

use anyhow::Result;
use chrono::SecondsFormat;
use serde::Serialize;

use crate::commands::{EchoResult, StatusReport};

/// Pretty-printed JSON, as written by `--json`.
pub fn json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Top-level failure line: `Error: ` followed by the error and its causes.
pub fn error_text(error: &anyhow::Error) -> String {
    format!("Error: {:#}", error)
}

pub fn echo_text(result: &EchoResult) -> String {
    let mut lines = vec![
        format!("Original: {}", result.original),
        format!("Length: {}", result.length),
    ];
    if let Some(reversed) = &result.reversed {
        lines.push(format!("Reversed: {}", reversed));
    }
    lines.join("\n")
}

/// Text form of a status report. Only the first token of the runtime
/// version is shown.
pub fn status_text(report: &StatusReport) -> String {
    let runtime = report
        .runtime_version
        .split_whitespace()
        .next()
        .unwrap_or_default();

    let mut lines = vec![
        format!("Service: {}", report.service_name),
        format!("Environment: {}", report.environment),
        format!("Runtime: {}", runtime),
        format!(
            "Timestamp: {}",
            report.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
        ),
    ];
    if let Some(status) = report.database_status {
        lines.push(format!("Database: {}", status.as_str()));
    }
    lines.join("\n")
}
