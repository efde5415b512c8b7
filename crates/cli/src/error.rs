use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to load configuration: {0}")]
    ConfigLoad(#[from] engine_config::ConfigError),

    #[error("runtime error: {0}")]
    Runtime(#[from] engine_runtime::RuntimeError),

    #[error("checkpoint store error: {0}")]
    Checkpoint(#[from] engine_core::CheckpointError),

    #[error("failure store error: {0}")]
    FailureStore(#[from] engine_core::FailureStoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid connection kind for testing: {0}")]
    InvalidConnectionKind(String),

    #[error("{0}")]
    Usage(String),

    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("{0}")]
    Unexpected(String),

    #[error("shutdown requested")]
    ShutdownRequested,
}

impl CliError {
    /// §6's exit-code contract: usage errors are 2, shutdown is handled
    /// separately by `main` (SIGINT convention), everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) | CliError::Config(_) | CliError::ConfigLoad(_) => 2,
            CliError::ShutdownRequested => 130,
            _ => 1,
        }
    }
}
