use chrono::{DateTime, Utc};
use model::records::row::RowData;
use serde::{Deserialize, Serialize};

/// Pipeline stage that rejected the row (§7's per-row error taxonomy).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Stage {
    Transform,
    Validate,
    Load,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Transform => "transform",
            Stage::Validate => "validate",
            Stage::Load => "load",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle status of a `FailedRecord` (§3). Only mutated by explicit
/// operator action — never by the pipeline itself once created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailureStatus {
    Pending,
    Resolved,
    Ignored,
    Retrying,
}

impl std::fmt::Display for FailureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureStatus::Pending => "pending",
            FailureStatus::Resolved => "resolved",
            FailureStatus::Ignored => "ignored",
            FailureStatus::Retrying => "retrying",
        };
        write!(f, "{s}")
    }
}

/// One rejected row, durably recorded for manual remediation (§3). Never
/// deleted by the pipeline itself; an explicit `cleanup` call (outside the
/// sync loop) may prune terminal rows past a retention window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRecord {
    pub id: u64,
    pub run_id: String,
    pub table_name: String,
    pub source_record_id: String,
    pub stage: Stage,
    pub error_kind: String,
    pub error_message: String,
    pub source_data: RowData,
    pub transformed_data: Option<RowData>,
    pub retry_count: u32,
    pub status: FailureStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter applied to `list`/`count` — every field is an optional `AND`
/// predicate.
#[derive(Debug, Clone, Default)]
pub struct FailureFilter {
    pub table: Option<String>,
    pub status: Option<FailureStatus>,
    pub stage: Option<Stage>,
}

impl FailureFilter {
    pub fn matches(&self, record: &FailedRecord) -> bool {
        if let Some(table) = &self.table
            && table != &record.table_name
        {
            return false;
        }
        if let Some(status) = self.status
            && status != record.status
        {
            return false;
        }
        if let Some(stage) = self.stage
            && stage != record.stage
        {
            return false;
        }
        true
    }
}

/// Aggregate return type of `statistics()` (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FailureStatistics {
    pub by_status: std::collections::BTreeMap<String, u64>,
    pub by_table: std::collections::BTreeMap<String, u64>,
    pub by_stage: std::collections::BTreeMap<String, u64>,
    pub total: u64,
}
