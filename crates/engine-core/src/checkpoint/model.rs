use chrono::{DateTime, Utc};
use model::pagination::cursor::Cursor;
use serde::{Deserialize, Serialize};

/// `status` field of a Checkpoint (§3): the lifecycle of one table's sync.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CheckpointStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckpointStatus::Idle => "idle",
            CheckpointStatus::Running => "running",
            CheckpointStatus::Completed => "completed",
            CheckpointStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One row per table in the Checkpoint Store (§3). `cursor` folds
/// `lastTimestamp`/`lastPrimaryKey` into the composite cursor type shared
/// with the Extractor — the same type that orders and resumes extraction is
/// the type durably parked here between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub table_name: String,
    pub cursor: Cursor,
    pub last_offset: i64,
    pub records_synced: u64,
    pub status: CheckpointStatus,
    pub run_id: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Checkpoint {
    pub fn idle(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            cursor: Cursor::None,
            last_offset: 0,
            records_synced: 0,
            status: CheckpointStatus::Idle,
            run_id: None,
            last_run_at: None,
            last_error: None,
        }
    }
}
