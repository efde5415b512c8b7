use thiserror::Error;

/// Top-level error composing every layer the runtime touches (§7). Surfaced
/// only for startup/config/lock failures that happen before or between
/// table runs — a single table's failure is captured in its `TableStats`
/// instead of propagating here.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("configuration error: {0}")]
    Config(#[from] engine_config::ConfigError),

    #[error("checkpoint store error: {0}")]
    Checkpoint(#[from] engine_core::CheckpointError),

    #[error("failure store error: {0}")]
    FailureStore(#[from] engine_core::FailureStoreError),

    #[error("connector error: {0}")]
    Connector(#[from] connectors::ConnectorError),

    #[error("sled storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("lock error: {0}")]
    Lock(#[from] crate::lock::LockError),

    #[error("task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("sync already running (run {0})")]
    AlreadyRunning(String),
}
