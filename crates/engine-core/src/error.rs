use thiserror::Error;

/// `CheckpointConflict` in the §7 taxonomy: fatal, always surfaced to the
/// operator. A monotonicity violation or a concurrent-run conflict both
/// indicate a logic bug in the caller and must never be silently ignored.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("table '{table}' is already running under run id '{running_run_id}'")]
    Conflict {
        table: String,
        running_run_id: String,
    },

    #[error(
        "monotonicity violation on table '{table}': attempted cursor does not strictly follow the stored cursor"
    )]
    Monotonicity { table: String },

    #[error("no checkpoint found for table '{0}'")]
    NotFound(String),

    #[error("checkpoint store I/O error: {0}")]
    Storage(#[from] sled::Error),

    #[error("checkpoint serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("checkpoint transaction error: {0}")]
    Transaction(String),
}

/// Failure store errors. Persistence failures here are always fatal for the
/// current batch (§4.2) — the Orchestrator must not pretend a record was
/// recorded when it wasn't.
#[derive(Debug, Error)]
pub enum FailureStoreError {
    #[error("failure store I/O error: {0}")]
    Storage(#[from] sled::Error),

    #[error("failure record serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("failed record {0} not found")]
    NotFound(u64),

    #[error("failure export error: {0}")]
    Export(#[from] serde_json::Error),
}
