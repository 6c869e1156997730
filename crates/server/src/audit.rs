//! Export audit log
//!
//! One JSON object per line in `<data dir>/report-exports.log`. Appends are a
//! single `write_all` on an `O_APPEND` handle, so concurrent exports never
//! interleave or rewrite earlier lines. Failures are logged and swallowed:
//! an audit problem never turns a successful export into an error.

use crate::auth::AuthResult;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const AUDIT_FILE_NAME: &str = "report-exports.log";

pub const ACTION_EXPORT: &str = "export";

/// Filters as received, after defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFilters {
    pub project: String,
    #[serde(rename = "type")]
    pub incident_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub request_id: String,
    pub auth: AuthResult,
    pub action: &'static str,
    pub format: &'static str,
    pub filters: AppliedFilters,
    pub count: usize,
}

#[derive(Serialize)]
struct AuditRecord<'a> {
    ts: String,
    #[serde(flatten)]
    entry: &'a AuditEntry,
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(AUDIT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry` with a server timestamp. Never fails.
    pub async fn append(&self, entry: &AuditEntry) {
        let record = AuditRecord {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entry,
        };

        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize audit entry");
                return;
            }
        };
        line.push(b'\n');

        let path = self.path.clone();
        match tokio::task::spawn_blocking(move || append_line(&path, &line)).await {
            Ok(Ok(())) => {
                tracing::debug!(path = %self.path.display(), "audit entry written");
            }
            Ok(Err(e)) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to write audit log");
            }
            Err(e) => {
                tracing::error!(error = %e, "Audit writer task failed");
            }
        }
    }
}

fn append_line(path: &Path, line: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line)
}
