use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-table counters and duration for one invocation of the Orchestrator
/// (§3 `RunReport`). `error` is set only for a table-level failure —
/// `SourceIntegrity`, a store outage, an exhausted transient retry, or a
/// cancellation — never for row-level rejections, which only move `failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStats {
    pub table: String,
    pub extracted: u64,
    pub transformed: u64,
    pub validated: u64,
    pub loaded: u64,
    pub failed: u64,
    pub deleted: u64,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl TableStats {
    pub fn new(table: impl Into<String>) -> Self {
        TableStats {
            table: table.into(),
            extracted: 0,
            transformed: 0,
            validated: 0,
            loaded: 0,
            failed: 0,
            deleted: 0,
            duration_ms: 0,
            error: None,
        }
    }
}

/// Terminal status of a `RunReport`: `Failed` iff at least one table
/// reported a table-level error (§7's exit-code contract — row-level
/// rejections alone never flip this).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Ephemeral result of one Orchestrator invocation (§3). Owned by the
/// Orchestrator/Engine that produced it — never persisted, only rendered
/// (`sync --export`, `status`, the CLI's JSON output).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub tables: Vec<TableStats>,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        if self.tables.iter().any(|t| t.error.is_some()) {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        }
    }

    /// §6/§7: `0` success, `1` at least one table reported a non-row-level
    /// error. Row-level rejections (`failed > 0`) never flip this on their
    /// own.
    pub fn exit_code(&self) -> i32 {
        match self.status() {
            RunStatus::Completed => 0,
            RunStatus::Failed => 1,
        }
    }

    pub fn total_loaded(&self) -> u64 {
        self.tables.iter().map(|t| t.loaded).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.tables.iter().map(|t| t.failed).sum()
    }
}
