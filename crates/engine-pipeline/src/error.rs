use thiserror::Error;

/// Per-row failures produced by the Transformer (C4) and Validator (C5).
/// Neither variant is fatal to the run — both route the offending row to
/// the Failure Store while the rest of the batch proceeds (§7).
#[derive(Debug, Clone, Error)]
pub enum RowError {
    #[error("transform '{transform}' failed on field '{field}': {reason}")]
    Transform {
        field: String,
        transform: String,
        reason: String,
    },

    #[error("validation rule '{rule}' failed on field '{field}': {reason}")]
    Validation {
        field: String,
        rule: String,
        reason: String,
    },
}

impl RowError {
    pub fn stage(&self) -> &'static str {
        match self {
            RowError::Transform { .. } => "transform",
            RowError::Validation { .. } => "validate",
        }
    }

    /// The `errorKind` column of a `FailedRecord` (§3): the transform or
    /// rule name that rejected the row, e.g. `maxLength` or `toInt`.
    pub fn kind(&self) -> &str {
        match self {
            RowError::Transform { transform, .. } => transform,
            RowError::Validation { rule, .. } => rule,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            RowError::Transform { field, .. } => field,
            RowError::Validation { field, .. } => field,
        }
    }
}

/// Table-level errors raised by the Orchestrator (C7, §7): `SourceIntegrity`
/// and store outages are fatal to the table's run and surface in its
/// `RunReport` entry; `Cancelled` is raised when the cancellation token
/// fires between batches.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("checkpoint store error: {0}")]
    Checkpoint(#[from] engine_core::CheckpointError),

    #[error("failure store error: {0}")]
    FailureStore(#[from] engine_core::FailureStoreError),

    #[error("extractor error: {0}")]
    Connector(#[from] connectors::ConnectorError),

    #[error("sync cancelled")]
    Cancelled,
}
