//! Per-table and per-run migration reports.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Lifecycle of one table migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStage {
    Pending,
    Deleting,
    Loading,
    SequenceReset,
    /// Loaded, parity not (yet) checked; terminal for import runs.
    Loaded,
    Verified,
    Mismatch,
    Failed,
}

/// Report for one table migration. Never mutated after the table
/// completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    /// Destination table name.
    pub table: String,

    /// Final stage reached.
    pub stage: TableStage,

    /// Records read from the source.
    pub attempted: u64,

    /// Rows present in the destination after the load.
    pub succeeded: u64,

    /// Records rejected during normalization.
    pub failed: u64,

    /// Source row count (inter-store runs only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_count: Option<i64>,

    /// Destination row count (inter-store runs only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_count: Option<i64>,

    /// Whether source and destination counts agree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parity: Option<bool>,

    /// Error message for failed tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableReport {
    /// Fresh report for a pending table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            stage: TableStage::Pending,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            source_count: None,
            dest_count: None,
            parity: None,
            error: None,
        }
    }

    /// Report for a table whose migration failed outright.
    pub fn failed(table: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stage: TableStage::Failed,
            error: Some(error.into()),
            ..Self::new(table)
        }
    }

    /// Whether anything about this table needs operator attention.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.failed > 0
            || self.stage == TableStage::Failed
            || self.stage == TableStage::Mismatch
            || self.parity == Some(false)
    }
}

/// Overall verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunVerdict {
    Success,
    SuccessWithErrors,
    FailedPrecondition,
}

impl std::fmt::Display for RunVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RunVerdict::Success => "success",
            RunVerdict::SuccessWithErrors => "success with errors",
            RunVerdict::FailedPrecondition => "failed precondition",
        };
        f.write_str(text)
    }
}

/// Result of one migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run identifier.
    pub run_id: String,

    /// Which pipeline ran ("import" or "transfer").
    pub operation: String,

    /// Overall verdict.
    pub verdict: RunVerdict,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Per-table reports, in processing order.
    pub tables: Vec<TableReport>,

    /// Pre-run backup artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,

    /// Post-run audit copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_copy: Option<PathBuf>,
}

impl RunSummary {
    /// Build a summary for a completed run, deriving the verdict from
    /// the per-table reports.
    pub fn new(
        operation: impl Into<String>,
        run_id: impl Into<String>,
        started_at: DateTime<Utc>,
        tables: Vec<TableReport>,
        backup_path: Option<PathBuf>,
        audit_copy: Option<PathBuf>,
    ) -> Self {
        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let verdict = if tables.iter().any(TableReport::has_errors) {
            RunVerdict::SuccessWithErrors
        } else {
            RunVerdict::Success
        };
        Self {
            run_id: run_id.into(),
            operation: operation.into(),
            verdict,
            started_at,
            completed_at,
            duration_seconds,
            tables,
            backup_path,
            audit_copy,
        }
    }

    /// Convert to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Log the per-table outcomes and the verdict.
    pub fn log(&self) {
        for table in &self.tables {
            match table.stage {
                TableStage::Failed => warn!(
                    "{}: FAILED - {}",
                    table.table,
                    table.error.as_deref().unwrap_or("unknown error")
                ),
                TableStage::Mismatch => warn!(
                    "{}: loaded {} rows but counts differ (source={:?}, dest={:?})",
                    table.table, table.succeeded, table.source_count, table.dest_count
                ),
                _ => info!(
                    "{}: {} loaded, {} rejected of {} read",
                    table.table, table.succeeded, table.failed, table.attempted
                ),
            }
        }
        info!(
            "{} {} in {:.1}s ({} tables)",
            self.operation,
            self.verdict,
            self.duration_seconds,
            self.tables.len()
        );
    }
}
