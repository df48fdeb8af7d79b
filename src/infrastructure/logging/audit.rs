//! Audit logging for confirmed membership role changes
//!
//! Provides a structured JSON-lines audit trail. Every record is also emitted
//! as a tracing event, so a tracing-only logger still leaves a trail.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::domain::models::MemberAuditRecord;
use crate::domain::ports::AuditEmitter;

/// Audit logger for confirmed role changes
#[derive(Clone, Default)]
pub struct AuditLogger {
    log_file: Option<Arc<Mutex<File>>>,
}

/// One line of the audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    /// Human-readable action label, e.g. "Grant role"
    pub operation: String,
    #[serde(flatten)]
    pub record: MemberAuditRecord,
}

impl AuditLogger {
    /// Create a new audit logger writing to the specified file
    ///
    /// Creates parent directories if they don't exist
    /// Opens file in append mode to preserve existing audit trail
    pub async fn new(log_path: impl AsRef<Path>) -> Result<Self> {
        let log_path = log_path.as_ref();

        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("failed to create audit log directory")?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .context("failed to open audit log file")?;

        Ok(Self {
            log_file: Some(Arc::new(Mutex::new(file))),
        })
    }

    /// Create an audit logger that only emits tracing events
    pub fn tracing_only() -> Self {
        Self::default()
    }

    /// Create from an optional path: file-backed when set, tracing only otherwise
    pub async fn from_path(log_path: Option<&str>) -> Result<Self> {
        match log_path {
            Some(path) => Self::new(path).await,
            None => Ok(Self::tracing_only()),
        }
    }

    /// Log an audit record
    ///
    /// Writes the record as a JSON line to the audit log file, if any,
    /// and emits a tracing info event
    pub fn log_record(&self, record: MemberAuditRecord) -> Result<()> {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            operation: record.action.label().to_string(),
            record,
        };

        if let Some(log_file) = &self.log_file {
            let json = serde_json::to_string(&entry).context("failed to serialize audit entry")?;

            let mut file = log_file
                .lock()
                .map_err(|e| anyhow::anyhow!("audit log mutex poisoned: {}", e))?;

            writeln!(file, "{}", json).context("failed to write audit entry")?;
            file.flush().context("failed to flush audit log")?;
        }

        info!(
            operation = %entry.operation,
            channel_id = %entry.record.channel_id,
            guild_id = %entry.record.guild_id,
            user_id = %entry.record.user_id,
            reason = %entry.record.reason,
            "audit event"
        );

        Ok(())
    }
}

#[async_trait]
impl AuditEmitter for AuditLogger {
    async fn emit(&self, record: MemberAuditRecord) {
        // File writes block, keep them off the runtime's worker threads.
        let logger = self.clone();
        let span = tracing::Span::current();
        let written =
            tokio::task::spawn_blocking(move || span.in_scope(|| logger.log_record(record))).await;

        match written {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "failed to write audit record"),
            Err(err) => warn!(error = %err, "audit writer task failed"),
        }
    }
}
